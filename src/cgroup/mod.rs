//! Delayed resource-limit reader (component E): reads per-subsystem
//! control-group files and range-checks the results before they're attached
//! to an existing container descriptor.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::runtime::image::count_cpuset;

/// Accepted range for a raw cgroup counter: `(0, 2^42)`. Runtimes report
/// "unlimited" as sentinels near `2^63`; 4 TiB is above any realistic
/// per-container limit and well below the overflow threshold of a 32-bit
/// kilobyte rendering (§4.E rationale).
const MAX_CGROUP_VALUE: i64 = (1i64 << 42) - 1;

/// Identifies a single cgroup lookup: the container id (used as a substring
/// match against each subsystem's cgroup path) plus the per-subsystem
/// cgroup path reported by the out-of-scope cgroup-path-from-pid lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CgroupKey {
    pub container_id: String,
    pub memory_cgroup_path: String,
    pub cpu_cgroup_path: String,
    pub cpuset_cgroup_path: String,
}

/// Resource fields read from the per-subsystem cgroup files. `None` means
/// the subsystem was skipped (shared cgroup) or its value failed the range
/// check; the caller must leave the corresponding descriptor field
/// unchanged in that case.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CgroupOutcome {
    pub memory_limit: Option<i64>,
    pub cpu_shares: Option<i64>,
    pub cpu_quota: Option<i64>,
    pub cpu_period: Option<i64>,
    pub cpuset_cpu_count: Option<u32>,
}

/// Reads cgroup files under the mount roots configured in
/// [`ResolverConfig::cgroup_mounts`].
pub struct CgroupReader {
    mounts: HashMap<String, String>,
}

impl CgroupReader {
    pub fn new(config: &ResolverConfig) -> Self {
        Self { mounts: config.cgroup_mounts.clone() }
    }

    /// The function handed to `AsyncSource::new` for the cgroup cache.
    pub fn read(&self, key: &CgroupKey) -> CgroupOutcome {
        CgroupOutcome {
            memory_limit: self.read_subsystem_value(
                "memory",
                &key.memory_cgroup_path,
                &key.container_id,
                "memory.limit_in_bytes",
            ),
            cpu_shares: self.read_subsystem_value("cpu", &key.cpu_cgroup_path, &key.container_id, "cpu.shares"),
            cpu_quota: self.read_subsystem_value("cpu", &key.cpu_cgroup_path, &key.container_id, "cpu.cfs_quota_us"),
            cpu_period: self.read_subsystem_value(
                "cpu",
                &key.cpu_cgroup_path,
                &key.container_id,
                "cpu.cfs_period_us",
            ),
            cpuset_cpu_count: self.read_cpuset(&key.cpuset_cgroup_path, &key.container_id),
        }
    }

    fn read_subsystem_value(
        &self,
        subsystem: &str,
        cgroup_path: &str,
        container_id: &str,
        file_name: &str,
    ) -> Option<i64> {
        if !cgroup_path.contains(container_id) {
            debug!(subsystem, cgroup_path, "shared cgroup, skipping subsystem");
            return None;
        }
        let mount = self.mounts.get(subsystem)?;
        let full_path = format!("{}{}/{}", mount, cgroup_path, file_name);

        let contents = match std::fs::read_to_string(&full_path) {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %full_path, error = %e, "cgroup file not readable");
                return None;
            }
        };

        let value: i64 = match contents.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                warn!(path = %full_path, "unparseable cgroup value");
                return None;
            }
        };

        if value <= 0 || value > MAX_CGROUP_VALUE {
            warn!(path = %full_path, value, "cgroup value out of range");
            return None;
        }
        Some(value)
    }

    fn read_cpuset(&self, cgroup_path: &str, container_id: &str) -> Option<u32> {
        if !cgroup_path.contains(container_id) {
            return None;
        }
        let mount = self.mounts.get("cpuset")?;
        let full_path = format!("{}{}/cpuset.effective_cpus", mount, cgroup_path);
        let contents = std::fs::read_to_string(&full_path).ok()?;
        Some(count_cpuset(contents.trim()))
    }
}

/// Write the fields a cgroup read produced onto an existing descriptor.
/// Fields the reader couldn't determine (shared cgroup, out-of-range,
/// unreadable) are left at their prior value.
pub fn apply_to_descriptor(descriptor: &mut crate::model::ContainerDescriptor, outcome: &CgroupOutcome) {
    if let Some(v) = outcome.memory_limit {
        descriptor.memory_limit = v;
    }
    if let Some(v) = outcome.cpu_shares {
        if v > 0 {
            descriptor.cpu_shares = v;
        }
    }
    if let Some(v) = outcome.cpu_quota {
        descriptor.cpu_quota = v;
    }
    if let Some(v) = outcome.cpu_period {
        if v > 0 {
            descriptor.cpu_period = v;
        }
    }
    if let Some(v) = outcome.cpuset_cpu_count {
        descriptor.cpuset_cpu_count = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContainerDescriptor;

    fn write_file(dir: &std::path::Path, relative: &str, contents: &str) {
        let path = dir.join(relative.trim_start_matches('/'));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    fn reader_over(dir: &std::path::Path) -> CgroupReader {
        let mut config = ResolverConfig::default();
        config.cgroup_mounts.insert("memory".into(), dir.join("memory").to_string_lossy().to_string());
        config.cgroup_mounts.insert("cpu".into(), dir.join("cpu").to_string_lossy().to_string());
        config.cgroup_mounts.insert("cpuset".into(), dir.join("cpuset").to_string_lossy().to_string());
        CgroupReader::new(&config)
    }

    #[test]
    fn out_of_range_memory_value_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "memory/docker/abc123/memory.limit_in_bytes", "9223372036854771712");

        let reader = reader_over(dir.path());
        let key = CgroupKey {
            container_id: "abc123".into(),
            memory_cgroup_path: "/docker/abc123".into(),
            cpu_cgroup_path: "/docker/abc123".into(),
            cpuset_cgroup_path: "/docker/abc123".into(),
        };
        let outcome = reader.read(&key);
        assert_eq!(outcome.memory_limit, None);

        let mut descriptor = ContainerDescriptor::stub("abc123", "c");
        descriptor.memory_limit = 1024;
        apply_to_descriptor(&mut descriptor, &outcome);
        assert_eq!(descriptor.memory_limit, 1024);
    }

    #[test]
    fn in_range_value_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "memory/docker/abc123/memory.limit_in_bytes", "536870912");
        write_file(dir.path(), "cpuset/docker/abc123/cpuset.effective_cpus", "0-2,5");

        let reader = reader_over(dir.path());
        let key = CgroupKey {
            container_id: "abc123".into(),
            memory_cgroup_path: "/docker/abc123".into(),
            cpu_cgroup_path: "/docker/abc123".into(),
            cpuset_cgroup_path: "/docker/abc123".into(),
        };
        let outcome = reader.read(&key);
        assert_eq!(outcome.memory_limit, Some(536_870_912));
        assert_eq!(outcome.cpuset_cpu_count, Some(4));
    }

    #[test]
    fn shared_cgroup_path_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "memory/docker/memory.limit_in_bytes", "12345");

        let reader = reader_over(dir.path());
        let key = CgroupKey {
            container_id: "abc123".into(),
            memory_cgroup_path: "/docker".into(),
            cpu_cgroup_path: "/docker".into(),
            cpuset_cgroup_path: "/docker".into(),
        };
        let outcome = reader.read(&key);
        assert_eq!(outcome.memory_limit, None);
    }
}

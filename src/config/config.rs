//! Configuration structures and loading

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Configuration for the container-metadata resolution core.
///
/// Mirrors the configuration toggles enumerated in the design: everything
/// the runtime resolver and cgroup reader need is a field here rather than a
/// process-global, so multiple `ResolverConfig`s can coexist in tests.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Enable the image-info sub-fetch (`/images/<id>/json?digests=1`).
    #[serde(default = "default_query_image_info")]
    pub query_image_info: bool,

    /// Synchronous-wait budget for `lookup` callers, in milliseconds.
    /// The dispatch glue (component F) always passes 0, so `lookup` never
    /// blocks the event path; a non-zero value only matters for other
    /// callers exercising the cache directly (e.g. tests).
    #[serde(default)]
    pub max_wait_ms: u64,

    /// Retention of completed results before they're considered stale.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// Path to the runtime's UNIX domain socket.
    #[serde(default = "default_docker_socket_path")]
    pub docker_socket_path: String,

    /// API version path prefix, e.g. `/v1.24`. Cleared permanently on this
    /// instance after the first `RESP_BAD_REQUEST` (see the runtime client).
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Connect/read deadline applied to every UNIX-socket request.
    #[serde(default = "default_socket_timeout_ms")]
    pub socket_timeout_ms: u64,

    /// Override for the external subsystem-mount-root lookup used by the
    /// cgroup reader. Keyed by subsystem name (`memory`, `cpu`, `cpuset`).
    #[serde(default = "default_cgroup_mounts")]
    pub cgroup_mounts: HashMap<String, String>,
}

impl ResolverConfig {
    /// Load configuration from a TOML file, falling back to defaults for any
    /// field the file omits.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: ResolverConfig =
            toml::from_str(&content).with_context(|| "failed to parse resolver configuration")?;
        Ok(config)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            query_image_info: default_query_image_info(),
            max_wait_ms: 0,
            ttl_ms: default_ttl_ms(),
            docker_socket_path: default_docker_socket_path(),
            api_version: default_api_version(),
            socket_timeout_ms: default_socket_timeout_ms(),
            cgroup_mounts: default_cgroup_mounts(),
        }
    }
}

fn default_query_image_info() -> bool {
    true
}

fn default_ttl_ms() -> u64 {
    60_000
}

fn default_docker_socket_path() -> String {
    "/var/run/docker.sock".into()
}

fn default_api_version() -> String {
    "/v1.24".into()
}

fn default_socket_timeout_ms() -> u64 {
    2_000
}

fn default_cgroup_mounts() -> HashMap<String, String> {
    let mut mounts = HashMap::new();
    mounts.insert("memory".into(), "/sys/fs/cgroup/memory".into());
    mounts.insert("cpu".into(), "/sys/fs/cgroup/cpu".into());
    mounts.insert("cpuset".into(), "/sys/fs/cgroup/cpuset".into());
    mounts
}

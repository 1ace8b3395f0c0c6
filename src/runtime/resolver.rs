//! Runtime metadata resolver (component D): turns a container id into a
//! [`ContainerDescriptor`] by talking to the runtime over its UNIX socket.

use std::collections::{HashMap, HashSet};
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ResolverConfig;
use crate::error::{ResolveError, ResolveResult};
use crate::model::{ContainerDescriptor, HealthProbe, Mount, PortMapping, ProbeKind, STUB_SENTINEL};

use super::http_client::{HttpOutcome, RuntimeHttpClient};
use super::image::{count_cpuset, normalize_arg, split_image_reference};

const POD_LAST_APPLIED_LABEL: &str = "annotation.kubectl.kubernetes.io/last-applied-configuration";
const MAX_NETWORK_MODE_RECURSION: usize = 4;

/// Outcome of a single resolution attempt, stored by the async cache and
/// delivered to every registered callback. Implements [`Default`] so the
/// cache can synthesise a failure value on `stop()`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveOutcome {
    pub success: bool,
    pub descriptor: Option<ContainerDescriptor>,
}

impl ResolveOutcome {
    fn unsuccessful() -> Self {
        Self { success: false, descriptor: None }
    }

    fn successful(descriptor: ContainerDescriptor) -> Self {
        Self { success: true, descriptor: Some(descriptor) }
    }
}

/// Resolves container metadata by querying the runtime's Engine API.
///
/// `api_version` starts as configured and is permanently cleared (for the
/// lifetime of this instance) the first time the runtime responds 4xx to a
/// versioned path — a deliberately sticky, instance-wide fallback rather
/// than a per-request one (see the design notes on this tradeoff).
pub struct RuntimeResolver {
    client: RuntimeHttpClient,
    api_version: Mutex<String>,
    query_image_info: AtomicBool,
}

impl RuntimeResolver {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            client: RuntimeHttpClient::new(
                config.docker_socket_path.clone(),
                Duration::from_millis(config.socket_timeout_ms),
            ),
            api_version: Mutex::new(config.api_version.clone()),
            query_image_info: AtomicBool::new(config.query_image_info),
        }
    }

    /// Process-wide toggle controlling the image-info sub-fetch (§4.D.5).
    pub fn set_query_image_info(&self, enabled: bool) {
        self.query_image_info.store(enabled, Ordering::Relaxed);
    }

    /// Resolve `id`, returning an outcome suitable for storage in the async
    /// cache. This is the function handed to `AsyncSource::new`.
    pub fn resolve(&self, id: &str) -> ResolveOutcome {
        let mut visited = HashSet::new();
        self.parse_docker(id, &mut visited, 0)
    }

    /// Fetch `path`, falling back to the unversioned API on the first 4xx
    /// and classifying every remaining failure into a [`ResolveError`]
    /// variant so callers can log the actual reason rather than a bare unit.
    fn fetch_with_fallback(&self, path: &str) -> ResolveResult<String> {
        let version = self.api_version.lock().clone();
        match self.client.get(&version, path)? {
            HttpOutcome::Ok(body) => Ok(body),
            HttpOutcome::BadRequest => {
                warn!(%path, "runtime rejected versioned request, falling back to unversioned API");
                *self.api_version.lock() = String::new();
                match self.client.get("", path)? {
                    HttpOutcome::Ok(body) => Ok(body),
                    HttpOutcome::BadRequest => {
                        Err(ResolveError::Protocol(format!("runtime rejected unversioned request: {}", path)))
                    }
                    HttpOutcome::Error => Err(ResolveError::Protocol(format!("non-OK status for {}", path))),
                }
            }
            HttpOutcome::Error => Err(ResolveError::Protocol(format!("non-OK status for {}", path))),
        }
    }

    fn fetch_json(&self, path: &str) -> ResolveResult<Value> {
        let body = self.fetch_with_fallback(path)?;
        serde_json::from_str(&body).map_err(|e| ResolveError::Parse(format!("{}: {}", path, e)))
    }

    fn parse_docker(&self, id: &str, visited: &mut HashSet<String>, depth: usize) -> ResolveOutcome {
        if depth > MAX_NETWORK_MODE_RECURSION || !visited.insert(id.to_string()) {
            warn!(%id, "network-mode recursion bound reached or cycle detected");
            return ResolveOutcome::unsuccessful();
        }

        let root = match self.fetch_json(&format!("/containers/{}/json", id)) {
            Ok(v) => v,
            Err(e) => {
                warn!(%id, error = %e, "failed to fetch container inspect");
                return ResolveOutcome::unsuccessful();
            }
        };

        let mut descriptor = ContainerDescriptor::stub(id, "");
        self.populate_identity(&mut descriptor, &root);
        self.populate_image(&mut descriptor, &root);
        self.populate_network(&mut descriptor, &root, visited, depth);
        self.populate_ports(&mut descriptor, &root);
        self.populate_labels_and_env(&mut descriptor, &root);
        self.populate_resources(&mut descriptor, &root);
        self.populate_mounts(&mut descriptor, &root);
        self.populate_probes(&mut descriptor, &root);

        descriptor.metadata_complete = true;
        debug!(id, image = %descriptor.image, "container metadata resolved");
        ResolveOutcome::successful(descriptor)
    }

    fn populate_identity(&self, descriptor: &mut ContainerDescriptor, root: &Value) {
        let raw_name = root.get("Name").and_then(Value::as_str).unwrap_or("");
        let name = raw_name.strip_prefix('/').unwrap_or(raw_name).to_string();
        descriptor.is_pod_sandbox = name.starts_with("k8s_POD");
        descriptor.name = name;
    }

    fn populate_image(&self, descriptor: &mut ContainerDescriptor, root: &Value) {
        let image = root
            .pointer("/Config/Image")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        let root_image = root.get("Image").and_then(Value::as_str).unwrap_or("");
        let image_id = match root_image.split_once(':') {
            Some((_, suffix)) => suffix.to_string(),
            None => root_image.to_string(),
        };

        descriptor.image = if image.is_empty() { STUB_SENTINEL.to_string() } else { image.clone() };
        descriptor.image_id = if image_id.is_empty() { STUB_SENTINEL.to_string() } else { image_id.clone() };

        let image_is_id = !image.is_empty()
            && (image_id.starts_with(&image) || root_image.starts_with(&image));
        let query_image_info = self.query_image_info.load(Ordering::Relaxed);

        if !image_is_id || !query_image_info {
            let (repo, tag, digest) = split_image_reference(&image);
            descriptor.image_repo = repo;
            descriptor.image_tag = tag;
            descriptor.image_digest = digest;
        }

        let image_id_present = !image_id.is_empty();
        let wants_image_info = query_image_info
            && image_id_present
            && (image_is_id || descriptor.image_digest.is_empty() || (!descriptor.image_digest.is_empty() && descriptor.image_tag.is_empty()));

        if wants_image_info {
            self.populate_image_info(descriptor, &image_id);
        }

        if descriptor.image_tag.is_empty() {
            descriptor.image_tag = "latest".to_string();
        }
        if descriptor.image_repo.is_empty() {
            descriptor.image_repo = STUB_SENTINEL.to_string();
        }
        if descriptor.image_digest.is_empty() {
            descriptor.image_digest = STUB_SENTINEL.to_string();
        }
    }

    fn populate_image_info(&self, descriptor: &mut ContainerDescriptor, image_id: &str) {
        let info = match self.fetch_json(&format!("/images/{}/json?digests=1", image_id)) {
            Ok(v) => v,
            Err(e) => {
                warn!(image_id, error = %e, "image-info sub-fetch failed");
                return;
            }
        };

        let repo_digests = info.get("RepoDigests").and_then(Value::as_array).cloned().unwrap_or_default();
        let mut distinct_digests: HashSet<String> = HashSet::new();
        let mut matched_digest: Option<String> = None;
        let mut first_name: Option<String> = None;

        for entry in &repo_digests {
            let entry = match entry.as_str() {
                Some(s) => s,
                None => continue,
            };
            let (name, digest) = match entry.split_once('@') {
                Some(parts) => parts,
                None => continue,
            };
            if first_name.is_none() {
                first_name = Some(name.to_string());
            }
            distinct_digests.insert(digest.to_string());
            let repo_matches = descriptor.image_repo == name
                || (descriptor.image_repo.is_empty() || descriptor.image_repo == STUB_SENTINEL);
            if matched_digest.is_none() && repo_matches {
                matched_digest = Some(digest.to_string());
                if descriptor.image_repo.is_empty() || descriptor.image_repo == STUB_SENTINEL {
                    descriptor.image_repo = name.to_string();
                }
            }
        }

        if let Some(digest) = matched_digest {
            descriptor.image_digest = digest;
        } else if descriptor.image_digest.is_empty() && distinct_digests.len() == 1 {
            descriptor.image_digest = distinct_digests.into_iter().next().unwrap();
        }

        let repo_tags = info.get("RepoTags").and_then(Value::as_array).cloned().unwrap_or_default();
        for entry in &repo_tags {
            let entry = match entry.as_str() {
                Some(s) => s,
                None => continue,
            };
            if let Some((name, tag)) = entry.rsplit_once(':') {
                if name == descriptor.image_repo {
                    descriptor.image_tag = tag.to_string();
                    break;
                }
            }
        }
    }

    fn populate_network(
        &self,
        descriptor: &mut ContainerDescriptor,
        root: &Value,
        visited: &mut HashSet<String>,
        depth: usize,
    ) {
        let ip = root.pointer("/NetworkSettings/IPAddress").and_then(Value::as_str).unwrap_or("");
        if let Ok(addr) = Ipv4Addr::from_str(ip) {
            if !addr.is_unspecified() {
                descriptor.container_ip = u32::from(addr);
                return;
            }
        }

        let network_mode = root.pointer("/HostConfig/NetworkMode").and_then(Value::as_str).unwrap_or("");
        if let Some(other_id) = network_mode.strip_prefix("container:") {
            let outcome = self.parse_docker(other_id, visited, depth + 1);
            if let Some(other) = outcome.descriptor {
                descriptor.container_ip = other.container_ip;
            }
        }
    }

    fn populate_ports(&self, descriptor: &mut ContainerDescriptor, root: &Value) {
        let ports = match root.pointer("/NetworkSettings/Ports").and_then(Value::as_object) {
            Some(p) => p,
            None => return,
        };

        for (key, bindings) in ports {
            if !key.contains("/tcp") {
                continue;
            }
            let container_port: u16 = match key.split('/').next().and_then(|p| p.parse().ok()) {
                Some(p) => p,
                None => continue,
            };

            let bindings = match bindings.as_array() {
                Some(b) => b,
                None => continue,
            };

            for binding in bindings {
                let host_ip_str = binding.get("HostIp").and_then(Value::as_str).unwrap_or("0.0.0.0");
                let host_ip = Ipv4Addr::from_str(host_ip_str).map(u32::from).unwrap_or(0);
                let host_port: u16 = binding
                    .get("HostPort")
                    .and_then(Value::as_str)
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(0);

                descriptor.port_mappings.push(PortMapping {
                    host_ip,
                    host_port,
                    container_port,
                });
            }
        }
    }

    fn populate_labels_and_env(&self, descriptor: &mut ContainerDescriptor, root: &Value) {
        if let Some(labels) = root.pointer("/Config/Labels").and_then(Value::as_object) {
            for (k, v) in labels {
                if let Some(v) = v.as_str() {
                    descriptor.labels.insert(k.clone(), v.to_string());
                }
            }
        }
        if let Some(env) = root.pointer("/Config/Env").and_then(Value::as_array) {
            descriptor.env = env.iter().filter_map(Value::as_str).map(str::to_string).collect();
        }
    }

    fn populate_resources(&self, descriptor: &mut ContainerDescriptor, root: &Value) {
        let host_config = match root.get("HostConfig") {
            Some(hc) => hc,
            None => return,
        };

        descriptor.memory_limit = host_config.get("Memory").and_then(Value::as_i64).unwrap_or(0);
        descriptor.swap_limit = host_config.get("MemorySwap").and_then(Value::as_i64).unwrap_or(0);
        descriptor.cpu_quota = host_config.get("CpuQuota").and_then(Value::as_i64).unwrap_or(0);

        if let Some(shares) = host_config.get("CpuShares").and_then(Value::as_i64) {
            if shares > 0 {
                descriptor.cpu_shares = shares;
            }
        }
        if let Some(period) = host_config.get("CpuPeriod").and_then(Value::as_i64) {
            if period > 0 {
                descriptor.cpu_period = period;
            }
        }

        if let Some(privileged) = host_config.get("Privileged").and_then(Value::as_bool) {
            descriptor.privileged = Some(privileged);
        }

        let cpuset = host_config.get("CpusetCpus").and_then(Value::as_str).unwrap_or("");
        descriptor.cpuset_cpu_count = count_cpuset(cpuset);
    }

    fn populate_mounts(&self, descriptor: &mut ContainerDescriptor, root: &Value) {
        let mounts = match root.get("Mounts").and_then(Value::as_array) {
            Some(m) => m,
            None => return,
        };

        for mount in mounts {
            descriptor.mounts.push(Mount {
                source: mount.get("Source").and_then(Value::as_str).unwrap_or("").to_string(),
                destination: mount.get("Destination").and_then(Value::as_str).unwrap_or("").to_string(),
                mode: mount.get("Mode").and_then(Value::as_str).unwrap_or("").to_string(),
                rw: mount.get("RW").and_then(Value::as_bool).unwrap_or(true),
                propagation: mount.get("Propagation").and_then(Value::as_str).unwrap_or("").to_string(),
            });
        }
    }

    fn populate_probes(&self, descriptor: &mut ContainerDescriptor, root: &Value) {
        if let Some(probe) = self.pod_spec_probe(&descriptor.labels) {
            descriptor.health_probes.push(probe);
            return;
        }

        let healthcheck = match root.pointer("/Config/Healthcheck") {
            Some(hc) => hc,
            None => return,
        };
        if let Some(probe) = healthcheck_probe(healthcheck) {
            descriptor.health_probes.push(probe);
        }
    }

    fn pod_spec_probe(&self, labels: &HashMap<String, String>) -> Option<HealthProbe> {
        let raw = labels.get(POD_LAST_APPLIED_LABEL)?;
        let parsed: Value = match serde_json::from_str(raw) {
            Ok(v) => v,
            Err(e) => {
                let err = ResolveError::Parse(format!("last-applied-configuration label: {}", e));
                warn!(error = %err, "failed to parse last-applied-configuration label");
                return None;
            }
        };
        let container = match parsed.pointer("/spec/containers/0") {
            Some(c) => c,
            None => {
                let err = ResolveError::Absent("spec.containers[0]".to_string());
                warn!(error = %err, "last-applied-configuration label missing containers[0]");
                return None;
            }
        };

        if let Some(command) = container.pointer("/livenessProbe/exec/command").and_then(Value::as_array) {
            return exec_probe(ProbeKind::Liveness, command);
        }
        if let Some(command) = container.pointer("/readinessProbe/exec/command").and_then(Value::as_array) {
            return exec_probe(ProbeKind::Readiness, command);
        }
        None
    }
}

fn exec_probe(kind: ProbeKind, command: &[Value]) -> Option<HealthProbe> {
    let args: Vec<String> = command.iter().filter_map(Value::as_str).map(normalize_arg).collect();
    let (exe, args) = args.split_first()?;
    Some(HealthProbe { kind, exe: exe.clone(), args: args.to_vec() })
}

fn healthcheck_probe(healthcheck: &Value) -> Option<HealthProbe> {
    let test = healthcheck.get("Test").and_then(Value::as_array)?;
    let test: Vec<&str> = test.iter().filter_map(Value::as_str).collect();

    match test.as_slice() {
        ["NONE"] => None,
        ["CMD", exe, rest @ ..] => Some(HealthProbe {
            kind: ProbeKind::Healthcheck,
            exe: normalize_arg(exe),
            args: rest.iter().map(|a| normalize_arg(a)).collect(),
        }),
        ["CMD-SHELL", script] => Some(HealthProbe {
            kind: ProbeKind::Healthcheck,
            exe: "/bin/sh".to_string(),
            args: vec!["-c".to_string(), script.to_string()],
        }),
        other => {
            warn!(?other, "unrecognised healthcheck Test form");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe_from_healthcheck(json: &str) -> Option<HealthProbe> {
        let v: Value = serde_json::from_str(json).unwrap();
        healthcheck_probe(&v)
    }

    #[test]
    fn cmd_shell_healthcheck() {
        let probe = probe_from_healthcheck(r#"{"Test": ["CMD-SHELL", "pgrep foo"]}"#).unwrap();
        assert_eq!(probe.kind, ProbeKind::Healthcheck);
        assert_eq!(probe.exe, "/bin/sh");
        assert_eq!(probe.args, vec!["-c".to_string(), "pgrep foo".to_string()]);
    }

    #[test]
    fn none_healthcheck_yields_no_probe() {
        assert!(probe_from_healthcheck(r#"{"Test": ["NONE"]}"#).is_none());
    }

    #[test]
    fn cmd_healthcheck_normalises_args() {
        let probe = probe_from_healthcheck(r#"{"Test": ["CMD", "/bin/check", "\"'x'\""]}"#).unwrap();
        assert_eq!(probe.exe, "/bin/check");
        assert_eq!(probe.args, vec!["x".to_string()]);
    }

    #[test]
    fn unrecognised_test_form_yields_no_probe() {
        assert!(probe_from_healthcheck(r#"{"Test": ["SHELL", "x"]}"#).is_none());
    }

    #[test]
    fn pod_spec_liveness_precedes_healthcheck() {
        let config = ResolverConfig::default();
        let resolver = RuntimeResolver::new(&config);
        let mut labels = HashMap::new();
        labels.insert(
            POD_LAST_APPLIED_LABEL.to_string(),
            r#"{"spec":{"containers":[{"livenessProbe":{"exec":{"command":["sh","-c","exit 0"]}}}]}}"#.to_string(),
        );
        let probe = resolver.pod_spec_probe(&labels).unwrap();
        assert_eq!(probe.kind, ProbeKind::Liveness);
        assert_eq!(probe.exe, "sh");
        assert_eq!(probe.args, vec!["-c".to_string(), "exit 0".to_string()]);
    }

    #[test]
    fn name_stripping_and_pod_sandbox_detection() {
        let config = ResolverConfig::default();
        let resolver = RuntimeResolver::new(&config);
        let mut descriptor = ContainerDescriptor::stub("abc", "");
        let root: Value = serde_json::json!({"Name": "/k8s_POD_bar"});
        resolver.populate_identity(&mut descriptor, &root);
        assert_eq!(descriptor.name, "k8s_POD_bar");
        assert!(descriptor.is_pod_sandbox);
    }

    #[test]
    fn image_tag_defaults_to_latest() {
        let config = ResolverConfig::default();
        let resolver = RuntimeResolver::new(&config);
        let mut descriptor = ContainerDescriptor::stub("abc", "");
        let root: Value = serde_json::json!({
            "Image": "sha256:deadbeef",
            "Config": {"Image": "myrepo/app"},
        });
        resolver.set_query_image_info(false);
        resolver.populate_image(&mut descriptor, &root);
        assert_eq!(descriptor.image_tag, "latest");
        assert_eq!(descriptor.image_repo, "myrepo/app");
    }

    #[test]
    fn image_is_id_with_image_info_disabled_still_splits_the_reference() {
        let config = ResolverConfig::default();
        let resolver = RuntimeResolver::new(&config);
        let mut descriptor = ContainerDescriptor::stub("abc", "");
        let root: Value = serde_json::json!({
            "Image": "sha256:abc123",
            "Config": {"Image": "abc123"},
        });
        resolver.set_query_image_info(false);
        resolver.populate_image(&mut descriptor, &root);
        assert_eq!(descriptor.image_repo, "abc123");
        assert_eq!(descriptor.image_tag, "latest");
    }

    #[test]
    fn cpu_shares_and_period_ignore_nonpositive_values() {
        let config = ResolverConfig::default();
        let resolver = RuntimeResolver::new(&config);
        let mut descriptor = ContainerDescriptor::stub("abc", "");
        descriptor.cpu_shares = 512;
        descriptor.cpu_period = 100_000;
        let root: Value = serde_json::json!({
            "HostConfig": {"CpuShares": 0, "CpuPeriod": -1, "Memory": 100, "MemorySwap": 200, "CpuQuota": 50000},
        });
        resolver.populate_resources(&mut descriptor, &root);
        assert_eq!(descriptor.cpu_shares, 512);
        assert_eq!(descriptor.cpu_period, 100_000);
        assert_eq!(descriptor.memory_limit, 100);
    }

    #[test]
    fn tcp_only_ports_are_ingested() {
        let config = ResolverConfig::default();
        let resolver = RuntimeResolver::new(&config);
        let mut descriptor = ContainerDescriptor::stub("abc", "");
        let root: Value = serde_json::json!({
            "NetworkSettings": {
                "Ports": {
                    "80/tcp": [{"HostIp": "127.0.0.1", "HostPort": "8080"}],
                    "53/udp": [{"HostIp": "127.0.0.1", "HostPort": "5353"}],
                }
            }
        });
        resolver.populate_ports(&mut descriptor, &root);
        assert_eq!(descriptor.port_mappings.len(), 1);
        assert_eq!(descriptor.port_mappings[0].container_port, 80);
        assert_eq!(descriptor.port_mappings[0].host_port, 8080);
    }

    mod fake_runtime {
        use std::io::{Read, Write};
        use std::os::unix::net::UnixListener;

        /// Spin up a one-shot-per-request fake Engine API server, handing
        /// each request's path to `handler` for a canned response body.
        /// Exercises the resolver end to end without a real container
        /// runtime.
        pub fn serve<F>(socket_path: &std::path::Path, mut handler: F)
        where
            F: FnMut(&str) -> (u16, String) + Send + 'static,
        {
            let listener = UnixListener::bind(socket_path).unwrap();
            std::thread::spawn(move || {
                for stream in listener.incoming() {
                    let mut stream = match stream {
                        Ok(s) => s,
                        Err(_) => return,
                    };
                    let mut buf = [0u8; 4096];
                    let n = match stream.read(&mut buf) {
                        Ok(n) => n,
                        Err(_) => return,
                    };
                    let request = String::from_utf8_lossy(&buf[..n]);
                    let path = request
                        .lines()
                        .next()
                        .and_then(|line| line.split_whitespace().nth(1))
                        .unwrap_or("/")
                        .to_string();

                    let (status, body) = handler(&path);
                    let status_text = if status == 200 { "OK" } else if status == 400 { "Bad Request" } else { "Error" };
                    let response = format!(
                        "HTTP/1.1 {} {}\r\nContent-Length: {}\r\n\r\n{}",
                        status,
                        status_text,
                        body.len(),
                        body
                    );
                    let _ = stream.write_all(response.as_bytes());
                }
            });
        }
    }

    #[test]
    fn network_mode_container_chaining_inherits_ip() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("fake.sock");

        let container_a = serde_json::json!({
            "Name": "/a",
            "Image": "sha256:aaa",
            "Config": {"Image": "app:latest"},
            "NetworkSettings": {"IPAddress": ""},
            "HostConfig": {"NetworkMode": "container:bbb"},
        })
        .to_string();
        let container_b = serde_json::json!({
            "Name": "/b",
            "Image": "sha256:bbb",
            "Config": {"Image": "app:latest"},
            "NetworkSettings": {"IPAddress": "10.0.0.5"},
            "HostConfig": {},
        })
        .to_string();

        fake_runtime::serve(&socket_path, move |path| {
            if path.contains("/containers/aaa/json") {
                (200, container_a.clone())
            } else if path.contains("/containers/bbb/json") {
                (200, container_b.clone())
            } else {
                (404, String::new())
            }
        });

        let mut config = ResolverConfig::default();
        config.docker_socket_path = socket_path.to_string_lossy().to_string();
        config.query_image_info = false;
        let resolver = RuntimeResolver::new(&config);

        let outcome = resolver.resolve("aaa");
        assert!(outcome.success);
        let descriptor = outcome.descriptor.unwrap();
        assert_eq!(descriptor.container_ip, u32::from(Ipv4Addr::new(10, 0, 0, 5)));
    }

    #[test]
    fn api_version_fallback_is_sticky_after_first_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let socket_path = dir.path().join("fake.sock");

        let body = serde_json::json!({
            "Name": "/c",
            "Image": "sha256:ccc",
            "Config": {"Image": "app:latest"},
            "NetworkSettings": {"IPAddress": "10.0.0.9"},
            "HostConfig": {},
        })
        .to_string();

        fake_runtime::serve(&socket_path, move |path| {
            if path.starts_with("/v1.24/") {
                (400, String::new())
            } else if path.contains("/containers/ccc/json") {
                (200, body.clone())
            } else {
                (404, String::new())
            }
        });

        let mut config = ResolverConfig::default();
        config.docker_socket_path = socket_path.to_string_lossy().to_string();
        config.query_image_info = false;
        let resolver = RuntimeResolver::new(&config);

        let outcome = resolver.resolve("ccc");
        assert!(outcome.success);
        assert_eq!(*resolver.api_version.lock(), "");

        let outcome2 = resolver.resolve("ccc");
        assert!(outcome2.success);
    }
}

//! The container descriptor value type (component C).

use std::collections::HashMap;

use serde::Serialize;

/// Sentinel written into image fields before async resolution completes.
pub const STUB_SENTINEL: &str = "incomplete";

/// Runtime variant that produced a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContainerType {
    Docker,
    Containerd,
}

impl Default for ContainerType {
    fn default() -> Self {
        ContainerType::Docker
    }
}

/// A single host->container port binding, restricted to `/tcp` (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortMapping {
    pub host_ip: u32,
    pub host_port: u16,
    pub container_port: u16,
}

/// A bind mount or volume attached to the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mount {
    pub source: String,
    pub destination: String,
    pub mode: String,
    pub rw: bool,
    pub propagation: String,
}

/// The kind of health probe extracted from the runtime or pod-spec JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProbeKind {
    Healthcheck,
    Liveness,
    Readiness,
}

/// A command that can be used to assess container liveness/readiness.
/// This core only extracts probes; it never executes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthProbe {
    pub kind: ProbeKind,
    pub exe: String,
    pub args: Vec<String>,
}

/// Mapping-shaped record describing a container's identity and resource
/// configuration (§3). Stub fields carry [`STUB_SENTINEL`] until a
/// successful async resolution overwrites them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerDescriptor {
    pub container_type: ContainerType,
    pub id: String,
    pub name: String,
    pub is_pod_sandbox: bool,

    pub image: String,
    pub image_id: String,
    pub image_repo: String,
    pub image_tag: String,
    pub image_digest: String,

    pub labels: HashMap<String, String>,
    pub env: Vec<String>,
    pub port_mappings: Vec<PortMapping>,
    pub mounts: Vec<Mount>,
    pub health_probes: Vec<HealthProbe>,

    pub memory_limit: i64,
    pub swap_limit: i64,
    pub cpu_shares: i64,
    pub cpu_quota: i64,
    pub cpu_period: i64,
    pub cpuset_cpu_count: u32,

    pub container_ip: u32,
    pub privileged: Option<bool>,

    pub metadata_complete: bool,
}

impl ContainerDescriptor {
    /// Build the stub descriptor inserted by `resolve` on first sighting of
    /// `id` (§6, boundary scenario 1): only identity is known; every image
    /// field carries the stub sentinel and `metadata_complete` is false.
    pub fn stub(id: impl Into<String>, name: impl Into<String>) -> Self {
        let name = name.into();
        let is_pod_sandbox = name.starts_with("k8s_POD");
        Self {
            container_type: ContainerType::Docker,
            id: id.into(),
            name,
            is_pod_sandbox,
            image: STUB_SENTINEL.to_string(),
            image_id: STUB_SENTINEL.to_string(),
            image_repo: STUB_SENTINEL.to_string(),
            image_tag: STUB_SENTINEL.to_string(),
            image_digest: STUB_SENTINEL.to_string(),
            labels: HashMap::new(),
            env: Vec::new(),
            port_mappings: Vec::new(),
            mounts: Vec::new(),
            health_probes: Vec::new(),
            memory_limit: 0,
            swap_limit: 0,
            cpu_shares: 0,
            cpu_quota: 0,
            cpu_period: 0,
            cpuset_cpu_count: 0,
            container_ip: 0,
            privileged: None,
            metadata_complete: false,
        }
    }

    pub fn is_stub(&self) -> bool {
        !self.metadata_complete
    }
}

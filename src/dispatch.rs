//! Resolve/dispatch glue (component F): the entry point the event pipeline
//! calls when it observes a process event, wiring the two async caches to
//! the (external, out-of-scope) container manager.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::cache::AsyncSource;
use crate::cgroup::{self, CgroupKey, CgroupOutcome, CgroupReader};
use crate::config::ResolverConfig;
use crate::model::ContainerDescriptor;
use crate::runtime::{ResolveOutcome, RuntimeResolver};

/// Minimal process/thread identity as seen by the event pipeline. Detecting
/// that a thread belongs to a container (cgroup-path parsing down to a
/// container id) happens upstream of this core; by the time a `ThreadInfo`
/// reaches `resolve`, `container_id` is already populated if applicable.
#[derive(Debug, Clone, Default)]
pub struct ThreadInfo {
    pub container_id: Option<String>,
    pub name_hint: Option<String>,
}

/// The external in-memory container manager this core publishes to. The
/// manager owns descriptor storage and the "new container" fan-out; it is
/// expected to serialise `get_container`/`add_container`/`notify_new_container`
/// internally, since all three may be called from the worker thread.
pub trait ContainerManager: Send + Sync {
    fn get_container(&self, id: &str) -> Option<ContainerDescriptor>;
    fn add_container(&self, descriptor: ContainerDescriptor, thread_info: &ThreadInfo);
    fn notify_new_container(&self, descriptor: ContainerDescriptor);
}

/// Ties the runtime resolver and cgroup reader to their respective async
/// caches, and exposes the inbound interface (§6) the event pipeline calls.
pub struct MetadataResolver<M: ContainerManager + 'static> {
    manager: Arc<M>,
    runtime_resolver: Arc<RuntimeResolver>,
    runtime_cache: AsyncSource<String, ResolveOutcome>,
    cgroup_cache: AsyncSource<CgroupKey, CgroupOutcome>,
}

impl<M: ContainerManager + 'static> MetadataResolver<M> {
    pub fn new(config: &ResolverConfig, manager: Arc<M>) -> Self {
        let runtime_resolver = Arc::new(RuntimeResolver::new(config));
        let cgroup_reader = Arc::new(CgroupReader::new(config));

        let ttl = Duration::from_millis(config.ttl_ms);
        let max_wait = Duration::from_millis(config.max_wait_ms);

        let resolver_for_cache = runtime_resolver.clone();
        let runtime_cache = AsyncSource::new(ttl, max_wait, move |id: &String| resolver_for_cache.resolve(id));

        let reader_for_cache = cgroup_reader.clone();
        let cgroup_cache = AsyncSource::new(ttl, max_wait, move |key: &CgroupKey| reader_for_cache.read(key));

        Self { manager, runtime_resolver, runtime_cache, cgroup_cache }
    }

    /// Process-wide toggle controlling the image-info sub-fetch (§4.D.5 /
    /// §6 `set_query_image_info`).
    pub fn set_query_image_info(&self, enabled: bool) {
        self.runtime_resolver.set_query_image_info(enabled);
    }

    /// Detect that `thread_info` belongs to a container; ensure the manager
    /// has at least a stub descriptor; if `query_os` is true and the
    /// existing descriptor is incomplete, enqueue an async lookup. Returns
    /// `true` iff, at return, the manager's descriptor for the container is
    /// complete.
    pub fn resolve(&self, thread_info: &ThreadInfo, query_os: bool) -> bool {
        let id = match &thread_info.container_id {
            Some(id) => id.clone(),
            None => return false,
        };

        let mut complete = match self.manager.get_container(&id) {
            Some(existing) => existing.metadata_complete,
            None => {
                let name = thread_info.name_hint.clone().unwrap_or_default();
                self.manager.add_container(ContainerDescriptor::stub(&id, name), thread_info);
                false
            }
        };

        if !complete && query_os {
            let manager = self.manager.clone();
            let callback_id = id.clone();
            let callback_thread_info = thread_info.clone();
            let immediate = self.runtime_cache.lookup(id.clone(), move |outcome| {
                apply_resolve_outcome(manager.as_ref(), &callback_id, &callback_thread_info, outcome);
            });

            if let Some(outcome) = immediate {
                complete = outcome.success;
                apply_resolve_outcome(self.manager.as_ref(), &id, thread_info, outcome);
            }
        }

        complete
    }

    /// Enqueue a delayed cgroup resource-limit read for `key` (component E).
    /// Not part of the inbound interface enumerated in §6, which covers only
    /// the runtime-metadata path; this mirrors it for the cgroup reader's
    /// own async cache, called by whichever collaborator owns the
    /// cgroup-path-from-pid lookup once it has a `CgroupKey` in hand.
    pub fn request_resource_limits(&self, key: CgroupKey) {
        let manager = self.manager.clone();
        let callback_id = key.container_id.clone();
        self.cgroup_cache.lookup(key, move |outcome| {
            apply_cgroup_outcome(manager.as_ref(), &callback_id, &outcome);
        });
    }
}

fn apply_resolve_outcome<M: ContainerManager>(
    manager: &M,
    id: &str,
    thread_info: &ThreadInfo,
    outcome: ResolveOutcome,
) {
    if !outcome.success {
        debug!(id, "runtime resolution unsuccessful, stub left in place");
        return;
    }
    let Some(descriptor) = outcome.descriptor else { return };
    if manager.get_container(id).is_none() {
        debug!(id, "descriptor vanished from manager before resolution completed, dropping result");
        return;
    }
    manager.add_container(descriptor.clone(), thread_info);
    manager.notify_new_container(descriptor);
}

fn apply_cgroup_outcome<M: ContainerManager>(manager: &M, id: &str, outcome: &CgroupOutcome) {
    let Some(mut descriptor) = manager.get_container(id) else {
        debug!(id, "descriptor no longer present, dropping cgroup result");
        return;
    };
    cgroup::apply_to_descriptor(&mut descriptor, outcome);
    manager.add_container(descriptor, &ThreadInfo { container_id: Some(id.to_string()), name_hint: None });
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeManager {
        containers: Mutex<HashMap<String, ContainerDescriptor>>,
        notifications: Mutex<Vec<String>>,
    }

    impl ContainerManager for FakeManager {
        fn get_container(&self, id: &str) -> Option<ContainerDescriptor> {
            self.containers.lock().get(id).cloned()
        }
        fn add_container(&self, descriptor: ContainerDescriptor, _thread_info: &ThreadInfo) {
            self.containers.lock().insert(descriptor.id.clone(), descriptor);
        }
        fn notify_new_container(&self, descriptor: ContainerDescriptor) {
            self.notifications.lock().push(descriptor.id);
        }
    }

    #[test]
    fn resolve_without_query_os_inserts_stub_and_returns_false() {
        let manager = Arc::new(FakeManager::default());
        let config = ResolverConfig::default();
        let dispatcher = MetadataResolver::new(&config, manager.clone());

        let thread_info = ThreadInfo { container_id: Some("deadbeef".into()), name_hint: None };
        let result = dispatcher.resolve(&thread_info, false);

        assert!(!result);
        let stored = manager.get_container("deadbeef").unwrap();
        assert!(!stored.metadata_complete);
        assert_eq!(stored.image, crate::model::STUB_SENTINEL);
    }

    #[test]
    fn resolve_with_no_container_id_returns_false_without_touching_manager() {
        let manager = Arc::new(FakeManager::default());
        let config = ResolverConfig::default();
        let dispatcher = MetadataResolver::new(&config, manager.clone());

        let thread_info = ThreadInfo { container_id: None, name_hint: None };
        assert!(!dispatcher.resolve(&thread_info, true));
        assert!(manager.get_container("anything").is_none());
    }

    #[test]
    fn resolve_is_idempotent_once_descriptor_is_already_complete() {
        let manager = Arc::new(FakeManager::default());
        let mut descriptor = ContainerDescriptor::stub("abc", "app");
        descriptor.metadata_complete = true;
        manager.add_container(descriptor, &ThreadInfo::default());

        let config = ResolverConfig::default();
        let dispatcher = MetadataResolver::new(&config, manager.clone());
        let thread_info = ThreadInfo { container_id: Some("abc".into()), name_hint: None };

        assert!(dispatcher.resolve(&thread_info, true));
        assert!(dispatcher.resolve(&thread_info, true));
    }
}

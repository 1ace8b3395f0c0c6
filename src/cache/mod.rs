//! The generic asynchronous lookup cache (component A).
//!
//! A worker-thread-backed, deduplicating, TTL-bounded, callback-delivering
//! cache: `lookup` never blocks the event path longer than `max_wait`
//! (producers pass `max_wait = 0` to never block at all), and at most one
//! worker invocation of the resolve function runs per key at a time.
//!
//! Grounded on this codebase's `BackgroundThread` pattern (a condvar-gated
//! worker loop with an idempotent `stop`), generalised from a single
//! start/stop signal to a key queue with per-key callback fan-out.

use std::collections::{HashMap, HashSet, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info};

type Callback<V> = Box<dyn FnOnce(V) + Send>;

struct State<K, V> {
    queue: VecDeque<K>,
    pending: HashSet<K>,
    ready: HashMap<K, (V, Instant)>,
    callbacks: HashMap<K, Vec<Callback<V>>>,
    stopped: bool,
}

impl<K: Eq + Hash, V> State<K, V> {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            pending: HashSet::new(),
            ready: HashMap::new(),
            callbacks: HashMap::new(),
            stopped: false,
        }
    }
}

struct Shared<K, V> {
    state: Mutex<State<K, V>>,
    cond: Condvar,
    ttl: Duration,
    max_wait: Duration,
}

/// A deduplicating, TTL-bounded, worker-backed lookup cache.
///
/// `K` is the lookup key (hashable, cloneable, the only thing ever sent
/// across the producer/worker boundary besides the resolved value). `V` is
/// the resolved value; it must implement [`Default`] so `stop()` has a
/// synthesised failure value to hand to callbacks still waiting when the
/// source is torn down.
pub struct AsyncSource<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Default + 'static,
{
    shared: Arc<Shared<K, V>>,
    worker: Option<JoinHandle<()>>,
}

impl<K, V> AsyncSource<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Default + 'static,
{
    /// Start a new source. `resolve` runs on the single worker thread once
    /// per distinct pending key; its return value is installed via
    /// `store_value` and delivered to every callback registered for that
    /// key.
    pub fn new<F>(ttl: Duration, max_wait: Duration, resolve: F) -> Self
    where
        F: Fn(&K) -> V + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::new()),
            cond: Condvar::new(),
            ttl,
            max_wait,
        });

        let worker_shared = shared.clone();
        let worker = std::thread::spawn(move || Self::worker_loop(worker_shared, resolve));

        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Look up `key`. If a fresh completed value is already cached, it is
    /// returned synchronously via the return value. Otherwise `callback` is
    /// registered against `key`, a worker enqueue happens if one is not
    /// already in flight, and `None` is returned. Never blocks longer than
    /// `max_wait`; with `max_wait == 0`
    /// this never blocks at all and a fresh lookup never returns `Some`.
    pub fn lookup<C>(&self, key: K, callback: C) -> Option<V>
    where
        C: FnOnce(V) + Send + 'static,
    {
        let deadline = Instant::now() + self.shared.max_wait;
        let mut guard = self.shared.state.lock();

        loop {
            if let Some((value, stored_at)) = guard.ready.get(&key) {
                if stored_at.elapsed() <= self.shared.ttl {
                    return Some(value.clone());
                }
                guard.ready.remove(&key);
            }

            if self.shared.max_wait.is_zero() || Instant::now() >= deadline {
                break;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            let timed_out = self.shared.cond.wait_for(&mut guard, remaining).timed_out();
            if timed_out {
                break;
            }
        }

        guard.callbacks.entry(key.clone()).or_default().push(Box::new(callback));
        if guard.pending.insert(key.clone()) {
            guard.queue.push_back(key);
            drop(guard);
            self.shared.cond.notify_all();
        }
        None
    }

    /// Block the worker thread until a key is available or the source has
    /// been stopped. Returns `None` on stop.
    fn dequeue_next_key(shared: &Shared<K, V>) -> Option<K> {
        let mut guard = shared.state.lock();
        loop {
            if let Some(key) = guard.queue.pop_front() {
                return Some(key);
            }
            if guard.stopped {
                return None;
            }
            shared.cond.wait(&mut guard);
        }
    }

    /// Install `value` for `key`, timestamp it for TTL, and invoke every
    /// callback registered for `key` outside the lock.
    fn store_value(shared: &Shared<K, V>, key: K, value: V) {
        let callbacks = {
            let mut guard = shared.state.lock();
            guard.pending.remove(&key);
            guard.ready.insert(key.clone(), (value.clone(), Instant::now()));
            guard.callbacks.remove(&key).unwrap_or_default()
        };
        shared.cond.notify_all();
        for cb in callbacks {
            cb(value.clone());
        }
    }

    fn worker_loop<F>(shared: Arc<Shared<K, V>>, resolve: F)
    where
        F: Fn(&K) -> V + Send + Sync + 'static,
    {
        info!("async source worker thread starting");
        while let Some(key) = Self::dequeue_next_key(&shared) {
            debug!("async source worker resolving a key");
            let value = resolve(&key);
            Self::store_value(&shared, key, value);
        }
        info!("async source worker thread stopping");
    }

    /// Idempotent. Wakes the worker, drains pending callbacks with a
    /// synthesised failure (`V::default()`), and joins the worker thread.
    pub fn stop(&mut self) {
        let pending_callbacks: Vec<Callback<V>> = {
            let mut guard = self.shared.state.lock();
            if guard.stopped {
                return;
            }
            guard.stopped = true;
            let mut drained = Vec::new();
            for (_, cbs) in guard.callbacks.drain() {
                drained.extend(cbs);
            }
            drained
        };
        self.shared.cond.notify_all();

        for cb in pending_callbacks {
            cb(V::default());
        }

        if let Some(handle) = self.worker.take() {
            let _ = handle.join();
        }
    }
}

impl<K, V> Drop for AsyncSource<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Default + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

//! Lock-protected state shared between the cache handle and its worker.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};

use crate::constants::CACHE_EVICTION_BUFFER;

use super::queue::RequestQueue;
use super::{Listener, SharedImage};

/// A decoded image and the recency stamp of its last access.
struct CacheEntry {
    image: SharedImage,
    last_access: u64,
}

/// Everything the foreground and the worker both touch.
pub(super) struct CacheState {
    entries: HashMap<PathBuf, CacheEntry>,
    /// Paths requested but not yet published
    in_flight: HashSet<PathBuf>,
    /// Callbacks waiting on each in-flight path, in registration order
    listeners: HashMap<PathBuf, Vec<Listener>>,
    queue: RequestQueue,
    /// Global recency counter
    counter: u64,
    /// Bumped by `clear` so the worker can drop results for older requests
    generation: u64,
    capacity: usize,
}

impl CacheState {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            in_flight: HashSet::new(),
            listeners: HashMap::new(),
            queue: RequestQueue::default(),
            counter: 0,
            generation: 0,
            capacity,
        }
    }

    fn tick(&mut self) -> u64 {
        let stamp = self.counter;
        self.counter += 1;
        stamp
    }

    /// Look up a resident image and mark it most recently used.
    pub fn touch(&mut self, path: &Path) -> Option<SharedImage> {
        let stamp = self.tick();
        let entry = self.entries.get_mut(path)?;
        entry.last_access = stamp;
        Some(entry.image.clone())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn is_in_flight(&self, path: &Path) -> bool {
        self.in_flight.contains(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Queue entries not yet taken by the worker.
    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn add_listener(&mut self, path: &Path, listener: Listener) {
        self.listeners
            .entry(path.to_path_buf())
            .or_default()
            .push(listener);
    }

    /// Mark a path in flight and queue it for the worker.
    pub fn schedule(&mut self, path: PathBuf, priority: u32) {
        self.in_flight.insert(path.clone());
        self.queue.push(path, priority);
    }

    /// Next queued path that is still wanted. Entries orphaned by `clear`
    /// are skipped.
    pub fn next_request(&mut self) -> Option<PathBuf> {
        while let Some(path) = self.queue.pop() {
            if self.in_flight.contains(&path) {
                return Some(path);
            }
        }
        None
    }

    /// Finish an in-flight path and hand back its listeners. Returns `None`
    /// when the request was dropped by `clear` in the meantime.
    pub fn complete(&mut self, path: &Path, generation: u64) -> Option<Vec<Listener>> {
        if generation != self.generation || !self.in_flight.remove(path) {
            return None;
        }
        Some(self.listeners.remove(path).unwrap_or_default())
    }

    /// Insert a freshly decoded image and evict if over capacity.
    pub fn insert(&mut self, path: PathBuf, image: SharedImage) {
        let last_access = self.tick();
        self.entries.insert(path, CacheEntry { image, last_access });

        if self.entries.len() > self.capacity {
            self.evict();
        }
    }

    /// Remove the least recently used entries until the cache is
    /// `CACHE_EVICTION_BUFFER` below capacity. The newest entry always stays.
    fn evict(&mut self) {
        let excess = (self.entries.len() - self.capacity + CACHE_EVICTION_BUFFER)
            .min(self.entries.len() - 1);

        let mut by_age: Vec<(u64, PathBuf)> = self
            .entries
            .iter()
            .map(|(path, entry)| (entry.last_access, path.clone()))
            .collect();
        by_age.sort_unstable();

        for (_, path) in by_age.into_iter().take(excess) {
            self.entries.remove(&path);
        }

        log::debug!(
            "Image cache evicted {} entries, {} remain",
            excess,
            self.entries.len()
        );
    }

    /// Drop everything, returning listeners that will now never be served.
    pub fn clear(&mut self) -> Vec<(PathBuf, Vec<Listener>)> {
        self.entries.clear();
        self.in_flight.clear();
        self.queue.clear();
        self.generation += 1;
        self.listeners.drain().collect()
    }

    /// Take every pending listener (used on shutdown).
    pub fn take_listeners(&mut self) -> Vec<(PathBuf, Vec<Listener>)> {
        self.in_flight.clear();
        self.queue.clear();
        self.listeners.drain().collect()
    }
}

/// State plus the synchronization around it.
pub(super) struct Shared {
    state: Mutex<CacheState>,
    pub wake: Condvar,
    running: AtomicBool,
}

impl Shared {
    pub fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::new(capacity)),
            wake: Condvar::new(),
            running: AtomicBool::new(true),
        }
    }

    /// Lock the state. The state is consistent after every critical
    /// section, so a poisoned lock is taken over as is.
    pub fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
        self.wake.notify_all();
    }
}

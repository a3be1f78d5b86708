//! Asynchronous, bounded cache of decoded images.
//!
//! [`AsyncImageCache`] serves decoded images to a foreground loop that must
//! never block. A hit is returned synchronously. A miss queues the path for
//! a single background worker (lower priority values first, FIFO within a
//! priority) and returns `None`; every callback registered for the path is
//! invoked once the decode completes, on the worker thread. Concurrent
//! requests for the same path share one decode.
//!
//! Callbacks run off the foreground thread. Hosts that keep single-threaded
//! state should forward the notification to their own loop (see
//! [`crate::display::DisplayOrchestrator::poll_ready`]).

mod decode;
mod queue;
mod state;
mod worker;

use std::path::Path;
use std::sync::Arc;
use std::thread::JoinHandle;

use image::DynamicImage;

pub use decode::{Decode, DecodeError, DecodeFailure, FileDecoder};

use crate::constants::PRIORITY_PRELOAD_DEFAULT;
use state::Shared;

/// A decoded image shared between the cache and its consumers.
pub type SharedImage = Arc<DynamicImage>;

/// What a listener receives: the image or the reason it is unavailable.
pub type LoadResult = Result<SharedImage, DecodeFailure>;

type Listener = Box<dyn FnOnce(&Path, LoadResult) + Send + 'static>;

/// Image cache with one background decode worker.
pub struct AsyncImageCache {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl AsyncImageCache {
    /// Create a cache holding up to `capacity` images, decoding from disk.
    pub fn new(capacity: usize) -> Result<Self, DecodeError> {
        Self::with_decoder(capacity, FileDecoder)
    }

    /// Create a cache with a custom decoder.
    pub fn with_decoder(capacity: usize, decoder: impl Decode) -> Result<Self, DecodeError> {
        let shared = Arc::new(Shared::new(capacity));
        let worker = worker::spawn(shared.clone(), Arc::new(decoder))?;
        log::debug!("Image cache created with capacity {}", capacity);

        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Request the image at `path`.
    ///
    /// Returns the image immediately when resident; `callback` is then also
    /// invoked, synchronously, before this returns. Otherwise returns `None`
    /// and `callback` fires later from the worker thread with the decoded
    /// image or the failure. A path already being decoded only gains a
    /// listener.
    pub fn request<F>(&self, path: &Path, priority: u32, callback: F) -> Option<SharedImage>
    where
        F: FnOnce(&Path, LoadResult) + Send + 'static,
    {
        let mut state = self.shared.lock();

        if let Some(image) = state.touch(path) {
            drop(state);
            log::trace!("Image cache hit: {:?}", path);
            callback(path, Ok(image.clone()));
            return Some(image);
        }

        if !self.shared.is_running() {
            drop(state);
            callback(path, Err(Arc::new(DecodeError::WorkerStopped)));
            return None;
        }

        state.add_listener(path, Box::new(callback));
        if state.is_in_flight(path) {
            log::trace!("Image cache: joined in-flight load of {:?}", path);
        } else {
            log::trace!("Image cache miss: {:?} (priority {})", path, priority);
            state.schedule(path.to_path_buf(), priority);
            self.shared.wake.notify_one();
        }
        None
    }

    /// Queue background loads for paths that are neither resident nor in
    /// flight. No callbacks are registered. Returns how many were queued.
    pub fn preload<P: AsRef<Path>>(&self, paths: &[P], priority: u32) -> usize {
        if !self.shared.is_running() {
            return 0;
        }

        let mut state = self.shared.lock();
        let mut queued = 0;
        for path in paths {
            let path = path.as_ref();
            if state.contains(path) || state.is_in_flight(path) {
                continue;
            }
            state.schedule(path.to_path_buf(), priority);
            queued += 1;
        }
        drop(state);

        if queued > 0 {
            log::debug!("Preloading {} images (priority {})", queued, priority);
            self.shared.wake.notify_one();
        }
        queued
    }

    /// [`preload`](Self::preload) at the default background priority.
    pub fn preload_default<P: AsRef<Path>>(&self, paths: &[P]) -> usize {
        self.preload(paths, PRIORITY_PRELOAD_DEFAULT)
    }

    /// Resident image for `path`, marking it recently used. Never schedules
    /// a load.
    pub fn get_cached(&self, path: &Path) -> Option<SharedImage> {
        self.shared.lock().touch(path)
    }

    /// Whether `path` is resident.
    pub fn contains(&self, path: &Path) -> bool {
        self.shared.lock().contains(path)
    }

    /// Whether `path` is queued or being decoded.
    pub fn is_loading(&self, path: &Path) -> bool {
        self.shared.lock().is_in_flight(path)
    }

    /// Number of resident images.
    pub fn len(&self) -> usize {
        self.shared.lock().len()
    }

    /// Whether no images are resident.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of paths queued or being decoded.
    pub fn pending_count(&self) -> usize {
        self.shared.lock().in_flight_count()
    }

    /// Drop every resident image, queued request and listener. A decode
    /// that is already running finishes but its result is discarded.
    /// Dropped listeners are never called.
    pub fn clear(&self) {
        let dropped = self.shared.lock().clear();
        log::debug!(
            "Image cache cleared ({} paths had waiting listeners)",
            dropped.len()
        );
    }

    /// Stop the worker after its current decode and wait for it to exit.
    /// Listeners still waiting receive [`DecodeError::WorkerStopped`].
    /// Calling this more than once is harmless.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };

        log::debug!("Shutting down image cache decoder thread");
        self.shared.stop();
        if let Err(e) = handle.join() {
            log::warn!("Image cache decoder thread panicked: {:?}", e);
        }

        let orphaned = self.shared.lock().take_listeners();
        let failure: LoadResult = Err(Arc::new(DecodeError::WorkerStopped));
        for (path, listeners) in orphaned {
            worker::notify(&path, listeners, &failure);
        }
    }
}

impl Drop for AsyncImageCache {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for AsyncImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        f.debug_struct("AsyncImageCache")
            .field("len", &state.len())
            .field("in_flight", &state.in_flight_count())
            .field("queued", &state.queued_count())
            .field("running", &self.shared.is_running())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::sync::{Barrier, Mutex};
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(5);

    /// Produces a 2x2 image per path and counts decodes. Paths containing
    /// "bad" fail.
    #[derive(Default)]
    struct CountingDecoder {
        calls: Arc<Mutex<HashMap<PathBuf, usize>>>,
    }

    impl Decode for CountingDecoder {
        fn decode(&self, path: &Path) -> Result<DynamicImage, DecodeError> {
            *self
                .calls
                .lock()
                .unwrap()
                .entry(path.to_path_buf())
                .or_default() += 1;
            if path.to_string_lossy().contains("bad") {
                return Err(DecodeError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "missing",
                )));
            }
            Ok(DynamicImage::new_rgb8(2, 2))
        }
    }

    /// Blocks each decode until the test releases it.
    struct GatedDecoder {
        gate: Arc<Barrier>,
        decodes: Arc<AtomicUsize>,
    }

    impl Decode for GatedDecoder {
        fn decode(&self, _path: &Path) -> Result<DynamicImage, DecodeError> {
            self.gate.wait();
            self.decodes.fetch_add(1, Ordering::SeqCst);
            Ok(DynamicImage::new_rgb8(1, 1))
        }
    }

    fn send(tx: mpsc::Sender<PathBuf>) -> impl FnOnce(&Path, LoadResult) + Send + 'static {
        move |path: &Path, _: LoadResult| tx.send(path.to_path_buf()).unwrap()
    }

    fn wait_until(cache: &AsyncImageCache, path: &Path) {
        let start = std::time::Instant::now();
        while !cache.contains(path) {
            assert!(start.elapsed() < TIMEOUT, "timed out waiting for {:?}", path);
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = AsyncImageCache::with_decoder(10, CountingDecoder::default()).unwrap();
        let path = Path::new("a.jpg");
        let (tx, rx) = mpsc::channel();

        assert!(cache.request(path, 0, move |p, r| {
            tx.send((p.to_path_buf(), r.is_ok())).unwrap();
        })
        .is_none());

        let (delivered, ok) = rx.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(delivered, path);
        assert!(ok);
        assert!(!cache.is_loading(path));

        let (tx, rx) = mpsc::channel();
        let hit = cache.request(path, 0, move |_, r| tx.send(r.is_ok()).unwrap());
        assert!(hit.is_some());
        // Synchronous hits call back before returning
        assert!(rx.try_recv().unwrap());
    }

    #[test]
    fn test_concurrent_requests_share_one_decode() {
        let gate = Arc::new(Barrier::new(2));
        let decodes = Arc::new(AtomicUsize::new(0));
        let cache = AsyncImageCache::with_decoder(
            10,
            GatedDecoder {
                gate: gate.clone(),
                decodes: decodes.clone(),
            },
        )
        .unwrap();

        let path = Path::new("shared.jpg");
        let (tx, rx) = mpsc::channel();
        let tx2 = tx.clone();
        assert!(cache.request(path, 0, move |_, r| tx.send(r.unwrap()).unwrap()).is_none());
        assert!(cache.request(path, 0, move |_, r| tx2.send(r.unwrap()).unwrap()).is_none());
        assert_eq!(cache.pending_count(), 1);

        gate.wait();
        let first = rx.recv_timeout(TIMEOUT).unwrap();
        let second = rx.recv_timeout(TIMEOUT).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(decodes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failure_reaches_every_listener() {
        let decoder = CountingDecoder::default();
        let calls = decoder.calls.clone();
        let cache = AsyncImageCache::with_decoder(10, decoder).unwrap();
        let path = Path::new("bad.jpg");

        let (tx, rx) = mpsc::channel();
        for _ in 0..2 {
            let tx = tx.clone();
            cache.request(path, 0, move |_, r| tx.send(r.is_err()).unwrap());
        }
        assert!(rx.recv_timeout(TIMEOUT).unwrap());
        assert!(rx.recv_timeout(TIMEOUT).unwrap());
        assert!(!cache.contains(path));
        assert!(!cache.is_loading(path));

        // The worker keeps going after a failure
        let (tx, rx) = mpsc::channel();
        cache.request(Path::new("good.jpg"), 0, move |_, r| tx.send(r.is_ok()).unwrap());
        assert!(rx.recv_timeout(TIMEOUT).unwrap());
        assert_eq!(calls.lock().unwrap()[Path::new("bad.jpg")], 1);
    }

    #[test]
    fn test_preload_skips_resident_and_in_flight() {
        let decoder = CountingDecoder::default();
        let calls = decoder.calls.clone();
        let cache = AsyncImageCache::with_decoder(10, decoder).unwrap();

        assert_eq!(cache.preload(&["1.jpg", "2.jpg"], 5), 2);
        wait_until(&cache, Path::new("1.jpg"));
        wait_until(&cache, Path::new("2.jpg"));

        assert_eq!(cache.preload(&["1.jpg", "2.jpg", "3.jpg"], 5), 1);
        wait_until(&cache, Path::new("3.jpg"));

        let calls = calls.lock().unwrap();
        assert!(calls.values().all(|&n| n == 1));
        assert_eq!(calls.len(), 3);
    }

    #[test]
    fn test_priority_order() {
        let gate = Arc::new(Barrier::new(2));
        let cache = AsyncImageCache::with_decoder(
            10,
            GatedDecoder {
                gate: gate.clone(),
                decodes: Arc::new(AtomicUsize::new(0)),
            },
        )
        .unwrap();

        let (tx, rx) = mpsc::channel();

        // The worker picks up "blocker" and waits on the gate while the rest queue
        cache.request(Path::new("blocker.jpg"), 0, send(tx.clone()));
        while cache.shared.lock().queued_count() > 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
        cache.request(Path::new("background.jpg"), 10, send(tx.clone()));
        cache.request(Path::new("preload.jpg"), 5, send(tx.clone()));
        cache.request(Path::new("visible.jpg"), 0, send(tx));

        let mut order = Vec::new();
        for _ in 0..4 {
            gate.wait();
            order.push(rx.recv_timeout(TIMEOUT).unwrap());
        }
        assert_eq!(
            order,
            ["blocker.jpg", "visible.jpg", "preload.jpg", "background.jpg"].map(PathBuf::from)
        );
    }

    #[test]
    fn test_clear_and_get_cached() {
        let cache = AsyncImageCache::with_decoder(10, CountingDecoder::default()).unwrap();
        cache.preload_default(&["x.jpg"]);
        wait_until(&cache, Path::new("x.jpg"));

        assert!(cache.get_cached(Path::new("x.jpg")).is_some());
        assert!(cache.get_cached(Path::new("y.jpg")).is_none());
        assert!(!cache.is_loading(Path::new("y.jpg")));

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.pending_count(), 0);
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let mut cache = AsyncImageCache::with_decoder(10, CountingDecoder::default()).unwrap();
        cache.shutdown();
        cache.shutdown();

        let (tx, rx) = mpsc::channel();
        assert!(cache.request(Path::new("late.jpg"), 0, move |_, r| {
            tx.send(matches!(r, Err(ref e) if matches!(**e, DecodeError::WorkerStopped)))
                .unwrap();
        })
        .is_none());
        assert!(rx.try_recv().unwrap());
        assert_eq!(cache.preload(&["late.jpg"], 0), 0);
    }
}

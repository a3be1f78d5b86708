//! The single background decode thread.

use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::constants::WORKER_IDLE_SLEEP_MS;

use super::decode::{Decode, DecodeError};
use super::state::Shared;
use super::{Listener, LoadResult};

/// Spawn the decode worker.
pub(super) fn spawn(
    shared: Arc<Shared>,
    decoder: Arc<dyn Decode>,
) -> Result<JoinHandle<()>, DecodeError> {
    thread::Builder::new()
        .name("image-cache-decoder".to_string())
        .spawn(move || {
            log::info!("Image cache decoder thread started");
            run(&shared, decoder.as_ref());
            log::info!("Image cache decoder thread exiting");
        })
        .map_err(DecodeError::Spawn)
}

/// Pop the most urgent request, decode it without holding the lock, then
/// publish. Sleeps on the condition variable while the queue is empty.
fn run(shared: &Shared, decoder: &dyn Decode) {
    let idle = Duration::from_millis(WORKER_IDLE_SLEEP_MS);

    while shared.is_running() {
        let (path, generation) = {
            let mut state = shared.lock();
            match state.next_request() {
                Some(path) => (path, state.generation()),
                None => {
                    drop(shared.wake.wait_timeout(state, idle));
                    continue;
                }
            }
        };

        log::debug!("Decoding {:?}", path);
        let decoded = decoder.decode(&path);

        let result: LoadResult = match decoded {
            Ok(image) => Ok(Arc::new(image)),
            Err(e) => {
                log::warn!("Failed to decode {:?}: {}", path, e);
                Err(Arc::new(e))
            }
        };

        let listeners = {
            let mut state = shared.lock();
            let Some(listeners) = state.complete(&path, generation) else {
                log::debug!("Discarding decode of {:?}: cache was cleared", path);
                continue;
            };
            if let Ok(image) = &result {
                state.insert(path.clone(), image.clone());
            }
            listeners
        };

        notify(&path, listeners, &result);
    }
}

/// Invoke listeners in registration order, outside the lock.
pub(super) fn notify(path: &Path, listeners: Vec<Listener>, result: &LoadResult) {
    for listener in listeners {
        listener(path, result.clone());
    }
}

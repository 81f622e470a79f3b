//! Deferred destruction of backend objects.
//!
//! GPU commands issued during a frame may still be in flight when the caller
//! releases the resource they reference. Releasing a handle therefore only
//! retires the slot; the backend object is parked here and destroyed at a
//! frame boundary once it can no longer be referenced.
//!
//! ```text
//! frame N      release(h)            -> pending   = [obj]
//! present N    destroy(retiring)     -> obj still alive
//!              retiring <- pending   -> retiring  = [obj]
//! present N+1  destroy(retiring)     -> obj destroyed
//! ```
//!
//! [`ReleaseQueue`] is the only device state that may be touched from a
//! thread other than the render thread: it carries release *requests* that
//! the device applies on its next `present()`.

use crate::backend::handle::ResourceId;
use parking_lot::Mutex;
use std::sync::Arc;

struct Frames<T> {
    pending: Vec<T>,
    retiring: Vec<T>,
}

/// Two-frame free list for backend objects
pub struct DeferredReclaimer<T> {
    frames: Mutex<Frames<T>>,
}

impl<T> DeferredReclaimer<T> {
    pub fn new() -> Self {
        Self {
            frames: Mutex::new(Frames {
                pending: Vec::new(),
                retiring: Vec::new(),
            }),
        }
    }

    /// Park an object released during the current frame.
    pub fn defer(&self, object: T) {
        self.frames.lock().pending.push(object);
    }

    /// Frame boundary: hand back everything released during the previous
    /// frame for destruction, then age the current frame's objects.
    #[must_use = "expired objects must be destroyed by the caller"]
    pub fn advance_frame(&self) -> Vec<T> {
        let mut frames = self.frames.lock();
        let pending = std::mem::take(&mut frames.pending);
        std::mem::replace(&mut frames.retiring, pending)
    }

    /// Everything still parked, regardless of age. Used on device teardown.
    #[must_use = "flushed objects must be destroyed by the caller"]
    pub fn flush_all(&self) -> Vec<T> {
        let mut frames = self.frames.lock();
        let mut all = std::mem::take(&mut frames.retiring);
        all.append(&mut frames.pending);
        all
    }

    pub fn pending_count(&self) -> usize {
        let frames = self.frames.lock();
        frames.pending.len() + frames.retiring.len()
    }
}

impl<T> Default for DeferredReclaimer<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe queue of release requests for a device.
///
/// Cloning shares the queue. The device drains it on the render thread.
#[derive(Clone, Default)]
pub struct ReleaseQueue {
    requests: Arc<Mutex<Vec<ResourceId>>>,
}

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, id: impl Into<ResourceId>) {
        self.requests.lock().push(id.into());
    }

    pub fn take_all(&self) -> Vec<ResourceId> {
        std::mem::take(&mut *self.requests.lock())
    }

    pub fn len(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ReleaseQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseQueue")
            .field("pending", &self.len())
            .finish()
    }
}

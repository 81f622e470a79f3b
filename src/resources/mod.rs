//! Owned resource wrappers
//!
//! The device API is handle based; these types tie a handle to its device so
//! that dropping the wrapper releases the GPU object. Every wrapper holds a
//! [`ResourceLink`], which keeps only a weak reference to the device: a
//! wrapper that outlives its device frees nothing.

mod buffer;
mod sampler;
mod shader;
mod texture;
mod uniform_buffer;
mod vertex_array;

pub use buffer::*;
pub use sampler::*;
pub use shader::*;
pub use texture::*;
pub use uniform_buffer::*;
pub use vertex_array::*;

use crate::backend::deferred::ReleaseQueue;
use crate::backend::handle::{ResourceId, ResourceKind};
use crate::backend::traits::{DeviceRef, GraphicsDevice, GraphicsError, GraphicsResult};
use std::cell::{RefCell, RefMut};
use std::rc::{Rc, Weak};

/// Back-reference from a resource wrapper to the device that owns its handle
pub struct ResourceLink {
    device: Weak<RefCell<dyn GraphicsDevice>>,
    queue: ReleaseQueue,
    id: ResourceId,
    freed: bool,
}

/// Borrow `device` mutably, failing instead of panicking while it is in use
pub(crate) fn borrow_device(device: &DeviceRef) -> GraphicsResult<RefMut<'_, dyn GraphicsDevice + 'static>> {
    device
        .try_borrow_mut()
        .map_err(|_| GraphicsError::InvalidParameter("device is already in use".into()))
}

impl ResourceLink {
    /// Create a resource with `create` and link the returned handle to `device`.
    pub fn create<H>(
        device: &DeviceRef,
        create: impl FnOnce(&mut dyn GraphicsDevice) -> GraphicsResult<H>,
    ) -> GraphicsResult<(H, Self)>
    where
        H: Into<ResourceId> + Copy,
    {
        let mut guard = borrow_device(device)?;
        let handle = create(&mut *guard)?;
        let queue = guard.release_queue();
        drop(guard);
        Ok((
            handle,
            Self {
                device: Rc::downgrade(device),
                queue,
                id: handle.into(),
                freed: false,
            },
        ))
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    pub fn kind(&self) -> ResourceKind {
        self.id.kind()
    }

    pub fn is_freed(&self) -> bool {
        self.freed
    }

    /// The owning device, if it is still alive
    pub fn device(&self) -> Option<DeviceRef> {
        self.device.upgrade()
    }

    /// Run `f` against the owning device.
    pub fn with_device<R>(
        &self,
        f: impl FnOnce(&mut dyn GraphicsDevice) -> GraphicsResult<R>,
    ) -> GraphicsResult<R> {
        if self.freed {
            return Err(GraphicsError::InvalidParameter(format!("{} has been freed", self.kind())));
        }
        let device = self
            .device
            .upgrade()
            .ok_or_else(|| GraphicsError::InvalidParameter("device has been destroyed".into()))?;
        let mut device = borrow_device(&device)?;
        f(&mut *device)
    }

    /// Release the handle. Calling this more than once does nothing.
    ///
    /// If the device is busy (for example the wrapper is dropped from inside
    /// a device call) the release is queued and applied on the next present.
    pub fn free(&mut self) {
        if self.freed {
            return;
        }
        self.freed = true;

        let Some(device) = self.device.upgrade() else {
            log::trace!("{} outlived its device", self.kind());
            return;
        };
        match device.try_borrow_mut() {
            Ok(mut device) => {
                if let Err(e) = device.release(self.id) {
                    log::warn!("Failed to release {}: {}", self.kind(), e);
                }
            }
            Err(_) => self.queue.push(self.id),
        };
    }
}

impl Drop for ResourceLink {
    fn drop(&mut self) {
        self.free();
    }
}

impl std::fmt::Debug for ResourceLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceLink")
            .field("id", &self.id)
            .field("freed", &self.freed)
            .finish()
    }
}

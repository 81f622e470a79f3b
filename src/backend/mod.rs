//! Backend abstraction layer
//!
//! Provides the handle model, slot tables, layouts and the device trait that
//! the OpenGL and Direct3D 11 backends implement.

pub mod context;
pub mod deferred;
pub mod directx;
pub mod handle;
pub mod layout;
pub mod opengl;
pub mod slot_table;
pub mod traits;
pub mod types;

pub use context::*;
pub use deferred::*;
pub use handle::*;
pub use layout::*;
pub use traits::*;
pub use types::*;

/// A warning that is logged at most once per device
#[derive(Debug, Default)]
pub(crate) struct WarnOnce {
    fired: bool,
}

impl WarnOnce {
    pub fn warn(&mut self, message: impl FnOnce() -> String) {
        if !self.fired {
            self.fired = true;
            log::warn!("{}", message());
        }
    }
}

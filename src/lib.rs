//! Graphics device layer for a 2D engine
//!
//! One handle-based device API with two backends:
//! - **OpenGL / OpenGL ES** through `glow` (desktop, mobile, web-class GL)
//! - **Direct3D 11** through the `windows` crate (Windows only)
//!
//! # Features
//! - Generation-checked handles over fixed-capacity slot tables
//! - Two-frame deferred destruction of backend objects on every backend
//! - A thread-safe release queue for dropping resources off the render thread
//! - Vertex and uniform layouts shared between GLSL attributes and HLSL semantics
//! - Owned resource wrappers that release their handle when dropped
//!
//! ```no_run
//! use engine2d_graphics::backend::*;
//! use engine2d_graphics::window::{Window, WinitWindow};
//!
//! # fn main() -> GraphicsResult<()> {
//! let window = WinitWindow::new("demo", 800, 600)?;
//! let desc = GraphicsDeviceDesc::new(ContextDescriptor::platform_default().resolve());
//! let device = create_graphics_device(&desc, &window)?;
//! device.borrow_mut().clear(Color::BLACK);
//! device.borrow_mut().present()?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod resources;
pub mod window;

pub use backend::{
    create_graphics_device, ContextDescriptor, ContextType, DeviceRef, GraphicsDevice, GraphicsDeviceDesc,
    GraphicsError, GraphicsResult,
};
pub use window::Window;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

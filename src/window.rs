//! Window collaborator interface and a winit implementation
//!
//! The device layer only needs a few things from a window: its size, a native
//! handle for swap-chain creation, and, for OpenGL, a current context that can
//! load entry points and swap buffers.

use raw_window_handle::{HandleError, WindowHandle};
use std::ffi::{c_void, CStr};
use std::rc::Rc;

/// An OpenGL(ES) context made current by the window layer
pub trait GlSurface {
    /// Resolve a GL entry point
    fn get_proc_address(&self, symbol: &CStr) -> *const c_void;

    fn swap_buffers(&self);
}

/// What the graphics device consumes from a window
pub trait Window {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Native handle used to create a swap chain
    fn handle(&self) -> Result<WindowHandle<'_>, HandleError>;

    fn poll_events(&mut self);

    fn should_close(&self) -> bool;

    /// The GL context bound to this window, if it created one
    fn gl_surface(&self) -> Option<Rc<dyn GlSurface>> {
        None
    }
}

#[cfg(any(windows, target_os = "macos", target_os = "linux"))]
pub use self::desktop::WinitWindow;

#[cfg(any(windows, target_os = "macos", target_os = "linux"))]
mod desktop {
    use super::Window;
    use crate::backend::{GraphicsError, GraphicsResult};
    use raw_window_handle::{HandleError, HasWindowHandle, WindowHandle};
    use std::time::Duration;
    use winit::{
        dpi::PhysicalSize,
        event::{Event, WindowEvent},
        event_loop::EventLoop,
        platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
        window::{Window as RawWindow, WindowBuilder},
    };

    /// Desktop window driven by polling instead of a callback loop
    pub struct WinitWindow {
        event_loop: EventLoop<()>,
        window: RawWindow,
        width: u32,
        height: u32,
        resized: bool,
        close_requested: bool,
    }

    impl WinitWindow {
        pub fn new(title: &str, width: u32, height: u32) -> GraphicsResult<Self> {
            let event_loop =
                EventLoop::new().map_err(|e| GraphicsError::InitializationFailed(e.to_string()))?;
            let window = WindowBuilder::new()
                .with_title(title)
                .with_inner_size(PhysicalSize::new(width, height))
                .build(&event_loop)
                .map_err(|e| GraphicsError::InitializationFailed(e.to_string()))?;
            let size = window.inner_size();

            Ok(Self {
                event_loop,
                window,
                width: size.width,
                height: size.height,
                resized: false,
                close_requested: false,
            })
        }

        /// New size if the window was resized since the last call
        pub fn take_resize(&mut self) -> Option<(u32, u32)> {
            std::mem::take(&mut self.resized).then_some((self.width, self.height))
        }

        pub fn raw(&self) -> &RawWindow {
            &self.window
        }
    }

    impl Window for WinitWindow {
        fn width(&self) -> u32 {
            self.width
        }

        fn height(&self) -> u32 {
            self.height
        }

        fn handle(&self) -> Result<WindowHandle<'_>, HandleError> {
            self.window.window_handle()
        }

        fn poll_events(&mut self) {
            let Self {
                event_loop,
                width,
                height,
                resized,
                close_requested,
                ..
            } = self;

            let status = event_loop.pump_events(Some(Duration::ZERO), |event, _| {
                if let Event::WindowEvent { event, .. } = event {
                    match event {
                        WindowEvent::Resized(size) if size.width > 0 && size.height > 0 => {
                            *width = size.width;
                            *height = size.height;
                            *resized = true;
                        }
                        WindowEvent::CloseRequested => *close_requested = true,
                        _ => {}
                    }
                }
            });

            if let PumpStatus::Exit(code) = status {
                log::debug!("Event loop exited with code {}", code);
                *close_requested = true;
            }
        }

        fn should_close(&self) -> bool {
            self.close_requested
        }
    }
}

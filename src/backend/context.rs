//! Context descriptors, device configuration and backend dispatch

use crate::backend::directx;
use crate::backend::opengl::{GlowApi, OpenGlDevice};
use crate::backend::traits::{DeviceRef, GraphicsError, GraphicsResult};
use crate::window::Window;
use std::cell::RefCell;
use std::rc::Rc;

/// Graphics API family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextType {
    OpenGL,
    OpenGLES,
    DirectX,
    Vulkan,
    Metal,
}

/// Result of [`ContextDescriptor::verify`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextStatus {
    Ok,
    /// Exists, but older than what the device layer needs
    Outdated,
    /// No such version of this API
    InvalidVersion,
    /// Not compiled in or not available on this platform
    NotEnabledOrSupported,
    /// Valid API, but there is no device implementation for it
    NotImplemented,
}

/// Which API and version the window should create a context for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextDescriptor {
    pub ty: ContextType,
    pub major_version: u32,
    pub minor_version: u32,
}

impl ContextDescriptor {
    pub const fn new(ty: ContextType, major_version: u32, minor_version: u32) -> Self {
        Self {
            ty,
            major_version,
            minor_version,
        }
    }

    /// The context used when a requested one can't be honoured
    pub fn platform_default() -> Self {
        if cfg!(any(target_os = "android", target_os = "ios", target_arch = "wasm32")) {
            Self::new(ContextType::OpenGLES, 3, 0)
        } else {
            Self::new(ContextType::OpenGL, 3, 3)
        }
    }

    pub fn verify(&self) -> ContextStatus {
        let version = (self.major_version, self.minor_version);
        match self.ty {
            ContextType::OpenGL => {
                let valid = matches!(version, (1, 0..=5) | (2, 0..=1) | (3, 0..=3) | (4, 0..=6));
                if !valid {
                    ContextStatus::InvalidVersion
                } else if version < (3, 3) {
                    ContextStatus::Outdated
                } else {
                    ContextStatus::Ok
                }
            }
            ContextType::OpenGLES => {
                let valid = matches!(version, (1, 0..=1) | (2, 0) | (3, 0..=2));
                if !valid {
                    ContextStatus::InvalidVersion
                } else if version < (3, 0) {
                    ContextStatus::Outdated
                } else {
                    ContextStatus::Ok
                }
            }
            ContextType::DirectX => match version {
                (9, 0..=3) | (10, 0..=1) => ContextStatus::Outdated,
                (11, 0..=1) if directx::AVAILABLE => ContextStatus::Ok,
                (11, 0..=1) => ContextStatus::NotEnabledOrSupported,
                (12, 0..=2) => ContextStatus::NotImplemented,
                _ => ContextStatus::InvalidVersion,
            },
            ContextType::Vulkan => match version {
                (1, 0..=3) => ContextStatus::NotImplemented,
                _ => ContextStatus::InvalidVersion,
            },
            ContextType::Metal => match version {
                (1..=3, _) => ContextStatus::NotImplemented,
                _ => ContextStatus::InvalidVersion,
            },
        }
    }

    /// Verify, falling back to [`ContextDescriptor::platform_default`] with a
    /// warning when the request can't be used.
    pub fn resolve(self) -> Self {
        match self.verify() {
            ContextStatus::Ok => self,
            status => {
                let fallback = Self::platform_default();
                log::warn!(
                    "Context {:?} {}.{} unusable ({:?}), falling back to {:?} {}.{}",
                    self.ty,
                    self.major_version,
                    self.minor_version,
                    status,
                    fallback.ty,
                    fallback.major_version,
                    fallback.minor_version
                );
                fallback
            }
        }
    }

    pub fn is_gl(&self) -> bool {
        matches!(self.ty, ContextType::OpenGL | ContextType::OpenGLES)
    }
}

impl Default for ContextDescriptor {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// Slot table capacities, fixed for the lifetime of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    pub max_buffers: usize,
    pub max_sampler_states: usize,
    pub max_shaders: usize,
    pub max_pipeline_states: usize,
    pub max_textures: usize,
    pub max_vertex_arrays: usize,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_buffers: 1024,
            max_sampler_states: 64,
            max_shaders: 128,
            max_pipeline_states: 64,
            max_textures: 256,
            max_vertex_arrays: 256,
        }
    }
}

impl DeviceLimits {
    pub fn validate(&self) -> GraphicsResult<()> {
        let limits = [
            ("max_buffers", self.max_buffers),
            ("max_sampler_states", self.max_sampler_states),
            ("max_shaders", self.max_shaders),
            ("max_pipeline_states", self.max_pipeline_states),
            ("max_textures", self.max_textures),
            ("max_vertex_arrays", self.max_vertex_arrays),
        ];
        for (name, value) in limits {
            if value == 0 || value > u16::MAX as usize {
                return Err(GraphicsError::InvalidParameter(format!(
                    "{name} must be in 1..={}, got {value}",
                    u16::MAX
                )));
            }
        }
        Ok(())
    }
}

/// Configuration for creating a graphics device
#[derive(Debug, Clone, Default)]
pub struct GraphicsDeviceDesc {
    pub context: ContextDescriptor,
    pub limits: DeviceLimits,
    pub vsync: bool,
}

impl GraphicsDeviceDesc {
    pub fn new(context: ContextDescriptor) -> Self {
        Self {
            context,
            limits: DeviceLimits::default(),
            vsync: true,
        }
    }

    pub(crate) fn check(&self) -> GraphicsResult<()> {
        self.limits.validate()?;
        match self.context.verify() {
            ContextStatus::Ok => Ok(()),
            status => {
                log::error!("Cannot create a {:?} device: {:?}", self.context.ty, status);
                Err(GraphicsError::UnsupportedContext {
                    ty: self.context.ty,
                    status,
                })
            }
        }
    }
}

/// Create the device for `desc.context` on `window`.
pub fn create_graphics_device(desc: &GraphicsDeviceDesc, window: &dyn Window) -> GraphicsResult<DeviceRef> {
    desc.check()?;

    match desc.context.ty {
        ContextType::OpenGL | ContextType::OpenGLES => {
            let surface = window.gl_surface().ok_or_else(|| {
                GraphicsError::InitializationFailed("window has no OpenGL surface".into())
            })?;
            let gl = GlowApi::from_surface(surface);
            let device = OpenGlDevice::new(gl, desc, window.width(), window.height())?;
            Ok(Rc::new(RefCell::new(device)))
        }
        ContextType::DirectX => directx::create_native_device(desc, window),
        ty => Err(GraphicsError::UnsupportedContext {
            ty,
            status: ContextStatus::NotImplemented,
        }),
    }
}

//! Core device abstraction
//!
//! [`GraphicsDevice`] is the interface every backend implements. Callers only
//! ever hold handles; all backend objects stay inside the device.

use crate::backend::context::{ContextStatus, ContextType};
use crate::backend::deferred::ReleaseQueue;
use crate::backend::handle::*;
use crate::backend::types::*;
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

/// Graphics device error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphicsError {
    #[error("Failed to initialize graphics device: {0}")]
    InitializationFailed(String),
    #[error("Context {ty:?} cannot be created: {status:?}")]
    UnsupportedContext { ty: ContextType, status: ContextStatus },
    #[error("Too many {kind} resources (capacity {capacity})")]
    CapacityExceeded { kind: ResourceKind, capacity: usize },
    #[error("Stale {kind} handle (index {index}, generation {generation})")]
    StaleHandle {
        kind: ResourceKind,
        index: u16,
        generation: u16,
    },
    #[error("Failed to create {kind}: {reason}")]
    ResourceCreation { kind: ResourceKind, reason: String },
    #[error("Failed to compile {stage} shader: {log}")]
    ShaderCompilation { stage: ShaderStage, log: String },
    #[error("Failed to link pipeline: {0}")]
    PipelineLink(String),
    #[error("Static resources cannot be written after creation")]
    StaticBufferWrite,
    #[error("Write of {requested} bytes exceeds capacity of {capacity} bytes")]
    BufferOverflow { capacity: usize, requested: usize },
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

pub type GraphicsResult<T> = Result<T, GraphicsError>;

/// Shared, render-thread-only reference to a device
pub type DeviceRef = Rc<RefCell<dyn GraphicsDevice>>;

/// Backend-agnostic graphics device.
///
/// All methods must be called from the thread that owns the device, except
/// that [`ReleaseQueue`]s obtained from [`GraphicsDevice::release_queue`] may
/// be used from anywhere.
///
/// Binding order for a draw: vertex array, textures/samplers, pipeline, draw.
pub trait GraphicsDevice {
    /// Which API this device drives
    fn context_type(&self) -> ContextType;

    /// Current backbuffer size
    fn size(&self) -> (u32, u32);

    // Buffers

    fn create_buffer(&mut self, desc: &BufferDesc) -> GraphicsResult<BufferHandle>;

    /// Overwrite the start of a dynamic buffer
    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> GraphicsResult<()>;

    fn release_buffer(&mut self, buffer: BufferHandle) -> GraphicsResult<()>;

    // Sampler states

    fn create_sampler_state(&mut self, desc: &SamplerDesc) -> GraphicsResult<SamplerStateHandle>;

    /// Re-upload the sampler parameters
    fn update_sampler_state(&mut self, sampler: SamplerStateHandle, desc: &SamplerDesc) -> GraphicsResult<()>;

    fn release_sampler_state(&mut self, sampler: SamplerStateHandle) -> GraphicsResult<()>;

    // Shaders and pipelines

    fn create_shader(&mut self, stage: ShaderStage, source: &str) -> GraphicsResult<ShaderHandle>;

    fn release_shader(&mut self, shader: ShaderHandle) -> GraphicsResult<()>;

    fn create_pipeline_state(&mut self, desc: &PipelineStateDesc) -> GraphicsResult<PipelineStateHandle>;

    fn release_pipeline_state(&mut self, pipeline: PipelineStateHandle) -> GraphicsResult<()>;

    // Textures

    fn create_texture_2d(&mut self, desc: &Texture2DDesc) -> GraphicsResult<Texture2DHandle>;

    /// Replace the level 0 image of a non-static texture
    fn update_texture_2d(&mut self, texture: Texture2DHandle, data: &[u8]) -> GraphicsResult<()>;

    fn release_texture_2d(&mut self, texture: Texture2DHandle) -> GraphicsResult<()>;

    // Vertex arrays

    fn create_vertex_array(&mut self, desc: &VertexArrayDesc) -> GraphicsResult<VertexArrayHandle>;

    fn release_vertex_array(&mut self, vertex_array: VertexArrayHandle) -> GraphicsResult<()>;

    // Binding and drawing

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle) -> GraphicsResult<()>;

    fn bind_texture(&mut self, unit: u32, texture: Texture2DHandle) -> GraphicsResult<()>;

    fn bind_sampler_state(&mut self, unit: u32, sampler: SamplerStateHandle) -> GraphicsResult<()>;

    fn bind_pipeline_state(&mut self, pipeline: PipelineStateHandle) -> GraphicsResult<()>;

    fn bind_uniform_buffer(&mut self, slot: u32, buffer: BufferHandle) -> GraphicsResult<()>;

    fn draw_primitives(&mut self, ty: PrimitiveType, start: u32, count: u32) -> GraphicsResult<()>;

    fn draw_indexed_primitives(&mut self, ty: PrimitiveType, start: u32, count: u32) -> GraphicsResult<()>;

    fn clear(&mut self, color: Color);

    /// Swap buffers and reclaim resources released two frames ago
    fn present(&mut self) -> GraphicsResult<()>;

    /// Window was resized; update backbuffer and viewport
    fn on_resize(&mut self, width: u32, height: u32) -> GraphicsResult<()>;

    /// Queue through which other threads request releases
    fn release_queue(&self) -> ReleaseQueue;

    /// Release any kind of resource
    fn release(&mut self, id: ResourceId) -> GraphicsResult<()> {
        match id {
            ResourceId::Buffer(h) => self.release_buffer(h),
            ResourceId::SamplerState(h) => self.release_sampler_state(h),
            ResourceId::Shader(h) => self.release_shader(h),
            ResourceId::PipelineState(h) => self.release_pipeline_state(h),
            ResourceId::Texture2D(h) => self.release_texture_2d(h),
            ResourceId::VertexArray(h) => self.release_vertex_array(h),
        }
    }
}

/// Checks shared by every backend's `write_buffer`
pub(crate) fn check_buffer_write(usage: Usage, capacity: usize, requested: usize) -> GraphicsResult<()> {
    if usage == Usage::Static {
        log::error!("attempted to write a static resource");
        return Err(GraphicsError::StaticBufferWrite);
    }
    if requested > capacity {
        log::error!("write of {} bytes into {} byte resource", requested, capacity);
        return Err(GraphicsError::BufferOverflow { capacity, requested });
    }
    Ok(())
}

/// Checks shared by every backend's `create_buffer`
pub(crate) fn check_buffer_desc(desc: &BufferDesc) -> GraphicsResult<()> {
    if desc.size == 0 {
        return Err(GraphicsError::InvalidParameter("buffer size must be non-zero".into()));
    }
    match desc.initial_data {
        Some(data) if data.len() > desc.size => Err(GraphicsError::BufferOverflow {
            capacity: desc.size,
            requested: data.len(),
        }),
        None if desc.usage == Usage::Static => Err(GraphicsError::InvalidParameter(
            "static buffers need initial data".into(),
        )),
        _ => Ok(()),
    }
}

/// Checks shared by every backend's `create_texture_2d` / `update_texture_2d`
pub(crate) fn check_texture_data(desc: &Texture2DDesc, data: Option<&[u8]>) -> GraphicsResult<()> {
    if desc.width == 0 || desc.height == 0 {
        return Err(GraphicsError::InvalidParameter("texture dimensions must be non-zero".into()));
    }
    match data {
        Some(data) if data.len() != desc.byte_size() => Err(GraphicsError::InvalidParameter(format!(
            "texture data is {} bytes, expected {}",
            data.len(),
            desc.byte_size()
        ))),
        None if desc.usage == Usage::Static => Err(GraphicsError::InvalidParameter(
            "static textures need initial data".into(),
        )),
        _ => Ok(()),
    }
}

//! Shader stages and linked shader programs

use super::ResourceLink;
use crate::backend::handle::{PipelineStateHandle, ShaderHandle};
use crate::backend::layout::VertexLayout;
use crate::backend::traits::{DeviceRef, GraphicsResult};
use crate::backend::types::{PipelineStateDesc, ShaderStage};

/// One compiled shader stage
#[derive(Debug)]
pub struct Shader {
    link: ResourceLink,
    handle: ShaderHandle,
    stage: ShaderStage,
}

impl Shader {
    pub fn new(device: &DeviceRef, stage: ShaderStage, source: &str) -> GraphicsResult<Self> {
        let (handle, link) = ResourceLink::create(device, |d| d.create_shader(stage, source))?;
        Ok(Self {
            link,
            handle,
            stage,
        })
    }

    pub fn handle(&self) -> ShaderHandle {
        self.handle
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    pub fn free(&mut self) {
        self.link.free();
    }
}

/// Vertex and fragment stage linked into a pipeline state.
///
/// The stages may be freed once the program exists.
#[derive(Debug)]
pub struct ShaderProgram {
    link: ResourceLink,
    handle: PipelineStateHandle,
    vertex_layout: VertexLayout,
}

impl ShaderProgram {
    pub fn new(device: &DeviceRef, desc: &PipelineStateDesc) -> GraphicsResult<Self> {
        let (handle, link) = ResourceLink::create(device, |d| d.create_pipeline_state(desc))?;
        Ok(Self {
            link,
            handle,
            vertex_layout: desc.vertex_layout.clone(),
        })
    }

    /// Compile both stages and link them with no uniform blocks or samplers
    pub fn from_sources(
        device: &DeviceRef,
        vertex_source: &str,
        fragment_source: &str,
        vertex_layout: VertexLayout,
    ) -> GraphicsResult<Self> {
        let vertex = Shader::new(device, ShaderStage::Vertex, vertex_source)?;
        let fragment = Shader::new(device, ShaderStage::Fragment, fragment_source)?;
        Self::new(
            device,
            &PipelineStateDesc::new(vertex.handle(), fragment.handle(), vertex_layout),
        )
    }

    pub fn handle(&self) -> PipelineStateHandle {
        self.handle
    }

    pub fn vertex_layout(&self) -> &VertexLayout {
        &self.vertex_layout
    }

    pub fn bind(&self) -> GraphicsResult<()> {
        self.link.with_device(|device| device.bind_pipeline_state(self.handle))
    }

    pub fn free(&mut self) {
        self.link.free();
    }
}

//! The Direct3D 11 device, context and swap-chain calls the device uses
//!
//! Descriptors carry raw D3D11 / DXGI values so they can be built and checked
//! on any platform. Backend objects are associated types; dropping one
//! releases its COM reference.

use super::conversion::{DxgiFormat, InputElementDesc};
use crate::backend::types::ShaderStage;

/// `D3D11_BUFFER_DESC`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct D3dBufferDesc {
    pub byte_width: u32,
    pub usage: u32,
    pub bind_flags: u32,
    pub cpu_access_flags: u32,
}

/// `D3D11_SAMPLER_DESC`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct D3dSamplerDesc {
    pub filter: u32,
    pub address_u: u32,
    pub address_v: u32,
    pub address_w: u32,
    pub max_anisotropy: u32,
    pub comparison_func: u32,
    pub border_color: [f32; 4],
    pub min_lod: f32,
    pub max_lod: f32,
}

/// `D3D11_TEXTURE2D_DESC` (single sample, array size 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct D3dTextureDesc {
    pub width: u32,
    pub height: u32,
    pub mip_levels: u32,
    pub format: DxgiFormat,
    pub usage: u32,
    pub bind_flags: u32,
    pub misc_flags: u32,
}

/// Initial contents of mip level 0
#[derive(Debug, Clone, Copy)]
pub struct SubresourceData<'a> {
    pub data: &'a [u8],
    pub row_pitch: u32,
}

pub trait D3d11Api {
    type Buffer;
    type SamplerState;
    type VertexShader: Clone;
    type PixelShader: Clone;
    type InputLayout;
    /// Texture plus its shader resource view
    type Texture;
    type RenderTargetView;

    /// Feature level the device was created with, as (major, minor)
    fn feature_level(&self) -> (u32, u32);

    // Resources

    fn create_buffer(&mut self, desc: &D3dBufferDesc, initial: Option<&[u8]>) -> Result<Self::Buffer, String>;

    /// Map with `WRITE_DISCARD` and copy `data` to the start of the buffer
    fn write_buffer(&mut self, buffer: &Self::Buffer, data: &[u8]) -> Result<(), String>;

    fn create_sampler_state(&mut self, desc: &D3dSamplerDesc) -> Result<Self::SamplerState, String>;

    /// Compile HLSL (`main` entry point) to bytecode
    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<Vec<u8>, String>;

    fn create_vertex_shader(&mut self, bytecode: &[u8]) -> Result<Self::VertexShader, String>;

    fn create_pixel_shader(&mut self, bytecode: &[u8]) -> Result<Self::PixelShader, String>;

    fn create_input_layout(
        &mut self,
        elements: &[InputElementDesc],
        vertex_bytecode: &[u8],
    ) -> Result<Self::InputLayout, String>;

    fn create_texture_2d(
        &mut self,
        desc: &D3dTextureDesc,
        initial: Option<SubresourceData>,
    ) -> Result<Self::Texture, String>;

    /// `UpdateSubresource` on mip level 0
    fn update_texture_2d(&mut self, texture: &Self::Texture, data: SubresourceData);

    fn generate_mips(&mut self, texture: &Self::Texture);

    // Pipeline state

    fn set_vertex_buffer(&mut self, buffer: Option<&Self::Buffer>, stride: u32);

    fn set_index_buffer(&mut self, buffer: Option<&Self::Buffer>, format: DxgiFormat);

    fn set_input_layout(&mut self, layout: Option<&Self::InputLayout>);

    fn set_primitive_topology(&mut self, topology: u32);

    fn set_shaders(&mut self, vertex: Option<&Self::VertexShader>, pixel: Option<&Self::PixelShader>);

    /// Bind to both the vertex and pixel stage
    fn set_constant_buffer(&mut self, slot: u32, buffer: Option<&Self::Buffer>);

    fn set_texture(&mut self, slot: u32, texture: Option<&Self::Texture>);

    fn set_sampler(&mut self, slot: u32, sampler: Option<&Self::SamplerState>);

    fn draw(&mut self, vertex_count: u32, start_vertex: u32);

    fn draw_indexed(&mut self, index_count: u32, start_index: u32);

    // Swap chain

    fn create_backbuffer_view(&mut self) -> Result<Self::RenderTargetView, String>;

    fn set_render_target(&mut self, view: Option<&Self::RenderTargetView>);

    fn clear_render_target(&mut self, view: &Self::RenderTargetView, color: [f32; 4]);

    fn set_viewport(&mut self, width: f32, height: f32);

    /// `ResizeBuffers`; fails if any backbuffer view is still alive
    fn resize_buffers(&mut self, width: u32, height: u32) -> Result<(), String>;

    fn present(&mut self, sync_interval: u32) -> Result<(), String>;
}

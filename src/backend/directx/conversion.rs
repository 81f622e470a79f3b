//! Translation from device types to D3D11 / DXGI values

use super::api::{D3dBufferDesc, D3dSamplerDesc, D3dTextureDesc};
use crate::backend::layout::{split_semantic, ElementType, VertexLayout};
use crate::backend::traits::{GraphicsError, GraphicsResult};
use crate::backend::types::*;

pub const USAGE_DEFAULT: u32 = 0;
pub const USAGE_IMMUTABLE: u32 = 1;
pub const USAGE_DYNAMIC: u32 = 2;

pub const BIND_VERTEX_BUFFER: u32 = 0x1;
pub const BIND_INDEX_BUFFER: u32 = 0x2;
pub const BIND_CONSTANT_BUFFER: u32 = 0x4;
pub const BIND_SHADER_RESOURCE: u32 = 0x8;
pub const BIND_RENDER_TARGET: u32 = 0x20;

pub const CPU_ACCESS_WRITE: u32 = 0x10000;
pub const RESOURCE_MISC_GENERATE_MIPS: u32 = 0x1;

pub const MAX_ANISOTROPY: u32 = 16;

/// `DXGI_FORMAT` values the device produces
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DxgiFormat {
    R32G32B32A32Float = 2,
    R32G32B32A32Uint = 3,
    R32G32B32A32Sint = 4,
    R32G32B32Float = 6,
    R32G32B32Uint = 7,
    R32G32B32Sint = 8,
    R32G32Float = 16,
    R32G32Uint = 17,
    R32G32Sint = 18,
    R8G8B8A8Unorm = 28,
    R8G8B8A8Snorm = 31,
    R32Float = 41,
    R32Uint = 42,
    R32Sint = 43,
    R16Uint = 57,
    R8Unorm = 61,
}

/// `D3D11_INPUT_ELEMENT_DESC` for per-vertex data in slot 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputElementDesc {
    pub semantic_name: String,
    pub semantic_index: u32,
    pub format: DxgiFormat,
    pub aligned_byte_offset: u32,
}

/// Vertex element format; `count` must be 1..=4
pub fn convert_element_format(ty: ElementType, count: u32, normalized: bool) -> GraphicsResult<DxgiFormat> {
    use DxgiFormat::*;
    let format = match (ty, count, normalized) {
        (ElementType::UnsignedInt, 1, true) => R8G8B8A8Unorm,
        (ElementType::Int, 1, true) => R8G8B8A8Snorm,
        (ElementType::Float, 1, _) => R32Float,
        (ElementType::Float, 2, _) => R32G32Float,
        (ElementType::Float, 3, _) => R32G32B32Float,
        (ElementType::Float, 4, _) => R32G32B32A32Float,
        (ElementType::Int, 1, false) => R32Sint,
        (ElementType::Int, 2, false) => R32G32Sint,
        (ElementType::Int, 3, false) => R32G32B32Sint,
        (ElementType::Int, 4, false) => R32G32B32A32Sint,
        (ElementType::UnsignedInt, 1, false) => R32Uint,
        (ElementType::UnsignedInt, 2, false) => R32G32Uint,
        (ElementType::UnsignedInt, 3, false) => R32G32B32Uint,
        (ElementType::UnsignedInt, 4, false) => R32G32B32A32Uint,
        _ => {
            return Err(GraphicsError::InvalidLayout(format!(
                "no DXGI format for {:?}x{}{}",
                ty,
                count,
                if normalized { " (normalized)" } else { "" }
            )))
        }
    };
    Ok(format)
}

/// Input layout for a vertex layout. Offsets accumulate element sizes; a
/// matrix takes four `float4` rows with consecutive semantic indices.
pub fn input_elements(layout: &VertexLayout) -> GraphicsResult<Vec<InputElementDesc>> {
    layout.validate()?;
    let mut elements = Vec::with_capacity(layout.elements().len());
    for (element, offset) in layout.elements().iter().zip(layout.offsets()) {
        let (semantic, index) = split_semantic(&element.name);
        if element.ty == ElementType::Matrix {
            for row in 0..4 * element.count {
                elements.push(InputElementDesc {
                    semantic_name: semantic.to_string(),
                    semantic_index: index + row,
                    format: DxgiFormat::R32G32B32A32Float,
                    aligned_byte_offset: offset + row * 16,
                });
            }
        } else {
            elements.push(InputElementDesc {
                semantic_name: semantic.to_string(),
                semantic_index: index,
                format: convert_element_format(element.ty, element.count, element.normalized)?,
                aligned_byte_offset: offset,
            });
        }
    }
    Ok(elements)
}

fn convert_usage(usage: Usage) -> (u32, u32) {
    match usage {
        Usage::Static => (USAGE_IMMUTABLE, 0),
        Usage::Dynamic | Usage::Stream => (USAGE_DYNAMIC, CPU_ACCESS_WRITE),
    }
}

pub fn buffer_desc(size: usize, usage: Usage, ty: BufferType) -> D3dBufferDesc {
    let (usage, cpu_access_flags) = convert_usage(usage);
    let (bind_flags, byte_width) = match ty {
        BufferType::Vertex => (BIND_VERTEX_BUFFER, size),
        BufferType::Index => (BIND_INDEX_BUFFER, size),
        // Constant buffers must be a multiple of 16 bytes
        BufferType::Uniform => (BIND_CONSTANT_BUFFER, (size + 15) & !15),
    };
    D3dBufferDesc {
        byte_width: byte_width as u32,
        usage,
        bind_flags,
        cpu_access_flags,
    }
}

/// D3D11 has no 24-bit format, so RGB8 is stored as RGBA8
pub fn convert_texture_format(format: TextureFormat) -> DxgiFormat {
    match format {
        TextureFormat::Rgba8 | TextureFormat::Rgb8 => DxgiFormat::R8G8B8A8Unorm,
        TextureFormat::R8 => DxgiFormat::R8Unorm,
    }
}

/// Texel data in the layout of [`convert_texture_format`], with its row pitch
pub fn texture_upload(format: TextureFormat, width: u32, data: &[u8]) -> (std::borrow::Cow<'_, [u8]>, u32) {
    match format {
        TextureFormat::Rgb8 => {
            let expanded = data
                .chunks_exact(3)
                .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 0xFF])
                .collect::<Vec<_>>();
            (expanded.into(), width * 4)
        }
        _ => (data.into(), width * format.bytes_per_pixel() as u32),
    }
}

pub fn texture_desc(width: u32, height: u32, format: TextureFormat, usage: Usage, mip_levels: u32) -> D3dTextureDesc {
    let mipmapped = mip_levels > 1;
    // Immutable textures can't be written, which mip generation needs
    let usage = if usage == Usage::Static && !mipmapped {
        USAGE_IMMUTABLE
    } else {
        USAGE_DEFAULT
    };
    D3dTextureDesc {
        width,
        height,
        mip_levels,
        format: convert_texture_format(format),
        usage,
        bind_flags: if mipmapped {
            BIND_SHADER_RESOURCE | BIND_RENDER_TARGET
        } else {
            BIND_SHADER_RESOURCE
        },
        misc_flags: if mipmapped { RESOURCE_MISC_GENERATE_MIPS } else { 0 },
    }
}

fn convert_filter(filter: Filter, comparison: bool) -> u32 {
    let base = match filter {
        Filter::Point => 0x00,     // MIN_MAG_MIP_POINT
        Filter::Bilinear => 0x14,  // MIN_MAG_LINEAR_MIP_POINT
        Filter::Trilinear => 0x15, // MIN_MAG_MIP_LINEAR
        Filter::Anisotropic => 0x55,
    };
    if comparison {
        base | 0x80
    } else {
        base
    }
}

fn convert_address_mode(wrap: WrapMode) -> u32 {
    match wrap {
        WrapMode::Repeat => 1,
        WrapMode::MirroredRepeat => 2,
        WrapMode::ClampToEdge => 3,
        WrapMode::ClampToBorder => 4,
    }
}

fn convert_compare_function(func: CompareFunction) -> u32 {
    match func {
        CompareFunction::Never => 1,
        CompareFunction::Less => 2,
        CompareFunction::Equal => 3,
        CompareFunction::LessEqual => 4,
        CompareFunction::Greater => 5,
        CompareFunction::NotEqual => 6,
        CompareFunction::GreaterEqual => 7,
        CompareFunction::Always => 8,
    }
}

pub fn sampler_desc(desc: &SamplerDesc) -> D3dSamplerDesc {
    D3dSamplerDesc {
        filter: convert_filter(desc.filter, desc.compare.is_some()),
        address_u: convert_address_mode(desc.wrap_u),
        address_v: convert_address_mode(desc.wrap_v),
        address_w: convert_address_mode(desc.wrap_w),
        max_anisotropy: if desc.filter == Filter::Anisotropic {
            desc.max_anisotropy.clamp(1, MAX_ANISOTROPY)
        } else {
            1
        },
        comparison_func: desc.compare.map_or(1, convert_compare_function),
        border_color: desc.border_color.to_array(),
        min_lod: desc.min_lod,
        max_lod: desc.max_lod,
    }
}

/// `D3D11_PRIMITIVE_TOPOLOGY`
pub fn convert_primitive_type(ty: PrimitiveType) -> u32 {
    match ty {
        PrimitiveType::LineList => 2,
        PrimitiveType::LineStrip => 3,
        PrimitiveType::TriangleList => 4,
        PrimitiveType::TriangleStrip => 5,
    }
}

pub fn convert_index_format(format: IndexFormat) -> DxgiFormat {
    match format {
        IndexFormat::U16 => DxgiFormat::R16Uint,
        IndexFormat::U32 => DxgiFormat::R32Uint,
    }
}

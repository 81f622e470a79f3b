//! Translation from device types to GL enums, and capability detection

use super::api::{GlApi, GlVersion};
use crate::backend::layout::ElementType;
use crate::backend::types::*;

/// `GL_TEXTURE_MAX_ANISOTROPY` (core 4.6, EXT/ARB extension value)
pub const TEXTURE_MAX_ANISOTROPY: u32 = 0x84FE;
/// `GL_MAX_TEXTURE_MAX_ANISOTROPY`
pub const MAX_TEXTURE_MAX_ANISOTROPY: u32 = 0x84FF;

/// Texture units the device tracks
pub const MAX_TEXTURE_UNITS: u32 = 8;

const BORDER_CLAMP_EXTENSIONS: [&str; 4] = [
    "GL_ARB_texture_border_clamp",
    "GL_EXT_texture_border_clamp",
    "GL_OES_texture_border_clamp",
    "GL_NV_texture_border_clamp",
];

const ANISOTROPY_EXTENSIONS: [&str; 2] = [
    "GL_EXT_texture_filter_anisotropic",
    "GL_ARB_texture_filter_anisotropic",
];

/// Optional features queried once at device creation
#[derive(Debug, Clone, PartialEq)]
pub struct GlCapabilities {
    pub version: GlVersion,
    pub renderer: String,
    pub border_clamp: bool,
    pub anisotropic_filtering: bool,
    pub max_anisotropy: f32,
    pub texture_units: u32,
}

impl GlCapabilities {
    pub fn query(gl: &impl GlApi) -> Self {
        let version = gl.version();
        let extensions = gl.extensions();
        let has_any = |names: &[&str]| extensions.iter().any(|ext| names.contains(&ext.as_str()));

        // Core on desktop GL and on GLES 3.2
        let border_clamp = !version.embedded || version.at_least(3, 2) || has_any(&BORDER_CLAMP_EXTENSIONS);

        let anisotropic_filtering = (!version.embedded && version.at_least(4, 6)) || has_any(&ANISOTROPY_EXTENSIONS);
        let max_anisotropy = if anisotropic_filtering {
            gl.get_float(MAX_TEXTURE_MAX_ANISOTROPY).max(1.0)
        } else {
            1.0
        };

        let texture_units = (gl.get_integer(glow::MAX_COMBINED_TEXTURE_IMAGE_UNITS).max(1) as u32).min(MAX_TEXTURE_UNITS);

        Self {
            version,
            renderer: gl.get_string(glow::RENDERER),
            border_clamp,
            anisotropic_filtering,
            max_anisotropy,
            texture_units,
        }
    }
}

pub fn convert_usage(usage: Usage) -> u32 {
    match usage {
        Usage::Static => glow::STATIC_DRAW,
        Usage::Dynamic => glow::DYNAMIC_DRAW,
        Usage::Stream => glow::STREAM_DRAW,
    }
}

pub fn convert_shader_stage(stage: ShaderStage) -> u32 {
    match stage {
        ShaderStage::Vertex => glow::VERTEX_SHADER,
        ShaderStage::Fragment => glow::FRAGMENT_SHADER,
    }
}

pub fn convert_primitive_type(ty: PrimitiveType) -> u32 {
    match ty {
        PrimitiveType::TriangleList => glow::TRIANGLES,
        PrimitiveType::TriangleStrip => glow::TRIANGLE_STRIP,
        PrimitiveType::LineList => glow::LINES,
        PrimitiveType::LineStrip => glow::LINE_STRIP,
    }
}

pub fn convert_index_format(format: IndexFormat) -> u32 {
    match format {
        IndexFormat::U16 => glow::UNSIGNED_SHORT,
        IndexFormat::U32 => glow::UNSIGNED_INT,
    }
}

/// (internal format, format, type)
pub fn convert_texture_format(format: TextureFormat) -> (i32, u32, u32) {
    match format {
        TextureFormat::Rgba8 => (glow::RGBA8 as i32, glow::RGBA, glow::UNSIGNED_BYTE),
        TextureFormat::Rgb8 => (glow::RGB8 as i32, glow::RGB, glow::UNSIGNED_BYTE),
        TextureFormat::R8 => (glow::R8 as i32, glow::RED, glow::UNSIGNED_BYTE),
    }
}

/// Wrap mode enum, or `None` when border clamp was requested but the driver
/// lacks it.
pub fn convert_wrap_mode(wrap: WrapMode, border_clamp: bool) -> Option<u32> {
    match wrap {
        WrapMode::Repeat => Some(glow::REPEAT),
        WrapMode::MirroredRepeat => Some(glow::MIRRORED_REPEAT),
        WrapMode::ClampToEdge => Some(glow::CLAMP_TO_EDGE),
        WrapMode::ClampToBorder if border_clamp => Some(glow::CLAMP_TO_BORDER),
        WrapMode::ClampToBorder => None,
    }
}

pub fn convert_compare_function(func: CompareFunction) -> u32 {
    match func {
        CompareFunction::Never => glow::NEVER,
        CompareFunction::Less => glow::LESS,
        CompareFunction::Equal => glow::EQUAL,
        CompareFunction::LessEqual => glow::LEQUAL,
        CompareFunction::Greater => glow::GREATER,
        CompareFunction::NotEqual => glow::NOTEQUAL,
        CompareFunction::GreaterEqual => glow::GEQUAL,
        CompareFunction::Always => glow::ALWAYS,
    }
}

/// Min and mag filter for a sampler sampling a texture with `mip_count` levels.
///
/// Mipmapped min filters are only used when the texture actually has mips;
/// otherwise the texture would be incomplete and sample black.
pub fn derive_filters(filter: Filter, mip_count: u32) -> (u32, u32) {
    let has_mips = mip_count > 1;
    match filter {
        Filter::Point if has_mips => (glow::NEAREST_MIPMAP_NEAREST, glow::NEAREST),
        Filter::Point => (glow::NEAREST, glow::NEAREST),
        Filter::Bilinear if has_mips => (glow::LINEAR_MIPMAP_NEAREST, glow::LINEAR),
        Filter::Bilinear => (glow::LINEAR, glow::LINEAR),
        Filter::Trilinear | Filter::Anisotropic if has_mips => (glow::LINEAR_MIPMAP_LINEAR, glow::LINEAR),
        Filter::Trilinear | Filter::Anisotropic => (glow::LINEAR, glow::LINEAR),
    }
}

/// Scalar type used in `glVertexAttrib*Pointer`
pub fn convert_element_type(ty: ElementType) -> u32 {
    match ty {
        ElementType::Int => glow::INT,
        ElementType::UnsignedInt => glow::UNSIGNED_INT,
        ElementType::Float | ElementType::Matrix => glow::FLOAT,
    }
}

/// Shape of a shader input type reported by `glGetActiveAttrib`
pub fn attribute_shape(gl_type: u32) -> Option<(ElementType, u32)> {
    let shape = match gl_type {
        glow::FLOAT => (ElementType::Float, 1),
        glow::FLOAT_VEC2 => (ElementType::Float, 2),
        glow::FLOAT_VEC3 => (ElementType::Float, 3),
        glow::FLOAT_VEC4 => (ElementType::Float, 4),
        glow::INT => (ElementType::Int, 1),
        glow::INT_VEC2 => (ElementType::Int, 2),
        glow::INT_VEC3 => (ElementType::Int, 3),
        glow::INT_VEC4 => (ElementType::Int, 4),
        glow::UNSIGNED_INT => (ElementType::UnsignedInt, 1),
        glow::UNSIGNED_INT_VEC2 => (ElementType::UnsignedInt, 2),
        glow::UNSIGNED_INT_VEC3 => (ElementType::UnsignedInt, 3),
        glow::UNSIGNED_INT_VEC4 => (ElementType::UnsignedInt, 4),
        glow::FLOAT_MAT4 => (ElementType::Matrix, 1),
        _ => return None,
    };
    Some(shape)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_follow_mip_count() {
        assert_eq!(derive_filters(Filter::Trilinear, 1), (glow::LINEAR, glow::LINEAR));
        assert_eq!(derive_filters(Filter::Trilinear, 9), (glow::LINEAR_MIPMAP_LINEAR, glow::LINEAR));
        assert_eq!(derive_filters(Filter::Point, 4), (glow::NEAREST_MIPMAP_NEAREST, glow::NEAREST));
        assert_eq!(derive_filters(Filter::Bilinear, 2).0, glow::LINEAR_MIPMAP_NEAREST);
        assert_eq!(derive_filters(Filter::Anisotropic, 1).0, glow::LINEAR);
    }

    #[test]
    fn test_border_fallback() {
        assert_eq!(convert_wrap_mode(WrapMode::ClampToBorder, true), Some(glow::CLAMP_TO_BORDER));
        assert_eq!(convert_wrap_mode(WrapMode::ClampToBorder, false), None);
        assert_eq!(convert_wrap_mode(WrapMode::Repeat, false), Some(glow::REPEAT));
    }

    #[test]
    fn test_attribute_shapes() {
        assert_eq!(attribute_shape(glow::FLOAT_VEC3), Some((ElementType::Float, 3)));
        assert_eq!(attribute_shape(glow::UNSIGNED_INT), Some((ElementType::UnsignedInt, 1)));
        assert_eq!(attribute_shape(glow::FLOAT_MAT4), Some((ElementType::Matrix, 1)));
        assert_eq!(attribute_shape(glow::FLOAT_MAT3), None);
    }

    #[test]
    fn test_texture_formats() {
        assert_eq!(convert_texture_format(TextureFormat::R8).1, glow::RED);
        assert_eq!(convert_texture_format(TextureFormat::Rgba8).0, glow::RGBA8 as i32);
    }
}

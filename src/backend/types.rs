//! Common types shared between backends

use crate::backend::handle::{BufferHandle, ShaderHandle};
use crate::backend::layout::VertexLayout;

/// RGBA clear / border color
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<glam::Vec4> for Color {
    fn from(v: glam::Vec4) -> Self {
        Self::rgba(v.x, v.y, v.z, v.w)
    }
}

/// How often the contents of a buffer or texture change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Usage {
    /// Written once at creation, immutable afterwards
    #[default]
    Static,
    /// Rewritten occasionally
    Dynamic,
    /// Rewritten every frame
    Stream,
}

/// What a buffer is bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferType {
    Vertex,
    Index,
    Uniform,
}

/// Buffer descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct BufferDesc<'a> {
    pub label: Option<&'a str>,
    /// Size in bytes
    pub size: usize,
    pub usage: Usage,
    pub ty: BufferType,
    pub initial_data: Option<&'a [u8]>,
}

impl<'a> BufferDesc<'a> {
    pub fn new(size: usize, usage: Usage, ty: BufferType) -> Self {
        Self {
            label: None,
            size,
            usage,
            ty,
            initial_data: None,
        }
    }

    pub fn with_data(mut self, data: &'a [u8]) -> Self {
        self.initial_data = Some(data);
        self
    }

    pub fn with_label(mut self, label: &'a str) -> Self {
        self.label = Some(label);
        self
    }
}

/// Index element width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexFormat {
    #[default]
    U16,
    U32,
}

impl IndexFormat {
    pub fn size(&self) -> u32 {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Pipeline (linked shader program) descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineStateDesc {
    pub vertex_shader: ShaderHandle,
    pub fragment_shader: ShaderHandle,
    /// Layout of the vertex data this pipeline consumes
    pub vertex_layout: VertexLayout,
    /// Uniform block name -> binding slot
    pub uniform_blocks: Vec<(String, u32)>,
    /// Sampler uniform name -> texture unit
    pub texture_units: Vec<(String, u32)>,
}

impl PipelineStateDesc {
    pub fn new(vertex_shader: ShaderHandle, fragment_shader: ShaderHandle, vertex_layout: VertexLayout) -> Self {
        Self {
            vertex_shader,
            fragment_shader,
            vertex_layout,
            uniform_blocks: Vec::new(),
            texture_units: Vec::new(),
        }
    }

    pub fn with_uniform_block(mut self, name: impl Into<String>, slot: u32) -> Self {
        self.uniform_blocks.push((name.into(), slot));
        self
    }

    pub fn with_texture_unit(mut self, name: impl Into<String>, unit: u32) -> Self {
        self.texture_units.push((name.into(), unit));
        self
    }
}

/// Primitive topology for draw calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    TriangleList,
    TriangleStrip,
    LineList,
    LineStrip,
}

/// Sampler filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    Point,
    #[default]
    Bilinear,
    Trilinear,
    Anisotropic,
}

/// Sampler wrap mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    Repeat,
    MirroredRepeat,
    #[default]
    ClampToEdge,
    /// Optional on GL ES; degrades to `ClampToEdge` when unsupported
    ClampToBorder,
}

/// Compare function for comparison samplers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Sampler descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerDesc {
    pub filter: Filter,
    /// Only used with `Filter::Anisotropic`, clamped to what the device supports
    pub max_anisotropy: u32,
    pub wrap_u: WrapMode,
    pub wrap_v: WrapMode,
    pub wrap_w: WrapMode,
    pub border_color: Color,
    pub compare: Option<CompareFunction>,
    pub min_lod: f32,
    pub max_lod: f32,
}

impl Default for SamplerDesc {
    fn default() -> Self {
        Self {
            filter: Filter::Bilinear,
            max_anisotropy: 1,
            wrap_u: WrapMode::ClampToEdge,
            wrap_v: WrapMode::ClampToEdge,
            wrap_w: WrapMode::ClampToEdge,
            border_color: Color::TRANSPARENT,
            compare: None,
            min_lod: 0.0,
            max_lod: 1000.0,
        }
    }
}

impl SamplerDesc {
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_wrap(mut self, wrap: WrapMode) -> Self {
        self.wrap_u = wrap;
        self.wrap_v = wrap;
        self.wrap_w = wrap;
        self
    }

    pub fn wraps(&self) -> [WrapMode; 3] {
        [self.wrap_u, self.wrap_v, self.wrap_w]
    }
}

/// Texel format of a 2D texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextureFormat {
    #[default]
    Rgba8,
    Rgb8,
    R8,
}

impl TextureFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::Rgb8 => 3,
            TextureFormat::R8 => 1,
        }
    }
}

/// 2D texture descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Texture2DDesc<'a> {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub usage: Usage,
    pub generate_mipmaps: bool,
    pub data: Option<&'a [u8]>,
}

impl<'a> Texture2DDesc<'a> {
    pub fn new(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            usage: Usage::Static,
            generate_mipmaps: false,
            data: None,
        }
    }

    pub fn with_data(mut self, data: &'a [u8]) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_mipmaps(mut self) -> Self {
        self.generate_mipmaps = true;
        self
    }

    /// Size in bytes of the level 0 image
    pub fn byte_size(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }

    /// Number of mip levels the texture ends up with
    pub fn mip_count(&self) -> u32 {
        if self.generate_mipmaps {
            32 - self.width.max(self.height).max(1).leading_zeros()
        } else {
            1
        }
    }
}

/// Vertex array descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct VertexArrayDesc {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: Option<BufferHandle>,
    pub index_format: IndexFormat,
    pub layout: VertexLayout,
}

impl VertexArrayDesc {
    pub fn new(vertex_buffer: BufferHandle, layout: VertexLayout) -> Self {
        Self {
            vertex_buffer,
            index_buffer: None,
            index_format: IndexFormat::U16,
            layout,
        }
    }

    pub fn with_index_buffer(mut self, buffer: BufferHandle, format: IndexFormat) -> Self {
        self.index_buffer = Some(buffer);
        self.index_format = format;
        self
    }
}

//! The OpenGL entry points the device uses
//!
//! Object names are plain `u32`s (never 0). Enum arguments are the raw GL
//! constants from `glow`. Everything here maps one-to-one onto a GL call, the
//! device decides *when* to call them.

/// GL object name
pub type GlName = u32;

/// Context version reported by the driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlVersion {
    pub major: u32,
    pub minor: u32,
    /// OpenGL ES rather than desktop OpenGL
    pub embedded: bool,
}

impl GlVersion {
    pub fn at_least(&self, major: u32, minor: u32) -> bool {
        (self.major, self.minor) >= (major, minor)
    }
}

/// One vertex input reported by `glGetActiveAttrib`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAttribute {
    pub name: String,
    /// Array size
    pub size: i32,
    /// `GL_FLOAT_VEC3`, `GL_INT`, ...
    pub gl_type: u32,
}

pub trait GlApi {
    // Queries

    fn version(&self) -> GlVersion;

    fn extensions(&self) -> Vec<String>;

    fn get_integer(&self, parameter: u32) -> i32;

    fn get_float(&self, parameter: u32) -> f32;

    fn get_string(&self, parameter: u32) -> String;

    // Buffers

    fn create_buffer(&mut self) -> Result<GlName, String>;

    fn bind_buffer(&mut self, target: u32, buffer: Option<GlName>);

    /// Allocate (or orphan) storage without data
    fn buffer_data_size(&mut self, target: u32, size: usize, usage: u32);

    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32);

    fn buffer_sub_data(&mut self, target: u32, offset: usize, data: &[u8]);

    fn bind_buffer_base(&mut self, target: u32, index: u32, buffer: Option<GlName>);

    fn delete_buffer(&mut self, buffer: GlName);

    // Shaders and programs

    fn create_shader(&mut self, shader_type: u32) -> Result<GlName, String>;

    /// Set the source and compile; returns the compile status
    fn compile_shader(&mut self, shader: GlName, source: &str) -> bool;

    fn shader_info_log(&self, shader: GlName) -> String;

    fn delete_shader(&mut self, shader: GlName);

    fn create_program(&mut self) -> Result<GlName, String>;

    fn attach_shader(&mut self, program: GlName, shader: GlName);

    fn detach_shader(&mut self, program: GlName, shader: GlName);

    /// Link; returns the link status
    fn link_program(&mut self, program: GlName) -> bool;

    fn program_info_log(&self, program: GlName) -> String;

    fn active_attributes(&self, program: GlName) -> Vec<ActiveAttribute>;

    fn attrib_location(&self, program: GlName, name: &str) -> Option<u32>;

    fn uniform_block_index(&self, program: GlName, name: &str) -> Option<u32>;

    fn uniform_block_binding(&mut self, program: GlName, block_index: u32, binding: u32);

    /// `glUniform1i` on a named uniform of the program currently in use.
    /// Returns false when the uniform doesn't exist.
    fn uniform_1_i32(&mut self, program: GlName, name: &str, value: i32) -> bool;

    fn use_program(&mut self, program: Option<GlName>);

    fn delete_program(&mut self, program: GlName);

    // Vertex arrays

    fn create_vertex_array(&mut self) -> Result<GlName, String>;

    fn bind_vertex_array(&mut self, vertex_array: Option<GlName>);

    fn delete_vertex_array(&mut self, vertex_array: GlName);

    fn enable_vertex_attrib_array(&mut self, index: u32);

    fn disable_vertex_attrib_array(&mut self, index: u32);

    fn vertex_attrib_pointer_f32(
        &mut self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    );

    fn vertex_attrib_pointer_i32(&mut self, index: u32, size: i32, data_type: u32, stride: i32, offset: i32);

    // Textures

    fn create_texture(&mut self) -> Result<GlName, String>;

    /// Select texture unit `unit` (0-based, not `GL_TEXTURE0 + unit`)
    fn active_texture(&mut self, unit: u32);

    fn bind_texture(&mut self, target: u32, texture: Option<GlName>);

    #[allow(clippy::too_many_arguments)]
    fn tex_image_2d(
        &mut self,
        target: u32,
        level: i32,
        internal_format: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: Option<&[u8]>,
    );

    #[allow(clippy::too_many_arguments)]
    fn tex_sub_image_2d(
        &mut self,
        target: u32,
        level: i32,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        format: u32,
        ty: u32,
        pixels: &[u8],
    );

    fn tex_parameter_i32(&mut self, target: u32, parameter: u32, value: i32);

    fn generate_mipmap(&mut self, target: u32);

    fn pixel_store_i32(&mut self, parameter: u32, value: i32);

    fn delete_texture(&mut self, texture: GlName);

    // Samplers

    fn create_sampler(&mut self) -> Result<GlName, String>;

    fn bind_sampler(&mut self, unit: u32, sampler: Option<GlName>);

    fn sampler_parameter_i32(&mut self, sampler: GlName, parameter: u32, value: i32);

    fn sampler_parameter_f32(&mut self, sampler: GlName, parameter: u32, value: f32);

    fn sampler_parameter_f32_slice(&mut self, sampler: GlName, parameter: u32, values: &[f32]);

    fn delete_sampler(&mut self, sampler: GlName);

    // Frame

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32);

    fn clear(&mut self, mask: u32);

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32);

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32);

    fn draw_elements(&mut self, mode: u32, count: i32, element_type: u32, offset: i32);

    fn swap_buffers(&mut self);
}

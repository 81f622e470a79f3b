//! [`GlApi`] over a `glow` context

use super::api::{ActiveAttribute, GlApi, GlName, GlVersion};
use crate::window::GlSurface;
use glow::HasContext;
use std::num::NonZeroU32;
use std::rc::Rc;

/// Live OpenGL(ES) context loaded from a window's surface.
///
/// The surface's context must be current on the calling thread for as long as
/// this value is used.
pub struct GlowApi {
    gl: glow::Context,
    surface: Rc<dyn GlSurface>,
}

impl GlowApi {
    pub fn from_surface(surface: Rc<dyn GlSurface>) -> Self {
        // SAFETY: the window layer made the context current before handing
        // out the surface, and the loader only resolves entry points.
        let gl = unsafe { glow::Context::from_loader_function_cstr(|symbol| surface.get_proc_address(symbol)) };
        Self { gl, surface }
    }

    pub fn context(&self) -> &glow::Context {
        &self.gl
    }
}

fn name(object: GlName) -> Option<NonZeroU32> {
    NonZeroU32::new(object)
}

fn buffer(object: GlName) -> Option<glow::NativeBuffer> {
    name(object).map(glow::NativeBuffer)
}

fn shader(object: GlName) -> Option<glow::NativeShader> {
    name(object).map(glow::NativeShader)
}

fn program(object: GlName) -> Option<glow::NativeProgram> {
    name(object).map(glow::NativeProgram)
}

fn vertex_array(object: GlName) -> Option<glow::NativeVertexArray> {
    name(object).map(glow::NativeVertexArray)
}

fn texture(object: GlName) -> Option<glow::NativeTexture> {
    name(object).map(glow::NativeTexture)
}

fn sampler(object: GlName) -> Option<glow::NativeSampler> {
    name(object).map(glow::NativeSampler)
}

// SAFETY (all blocks below): every call is a plain GL entry point on the
// current context. Names are only ever ones this context created.
impl GlApi for GlowApi {
    fn version(&self) -> GlVersion {
        let version = self.gl.version();
        GlVersion {
            major: version.major,
            minor: version.minor,
            embedded: version.is_embedded,
        }
    }

    fn extensions(&self) -> Vec<String> {
        self.gl.supported_extensions().iter().cloned().collect()
    }

    fn get_integer(&self, parameter: u32) -> i32 {
        unsafe { self.gl.get_parameter_i32(parameter) }
    }

    fn get_float(&self, parameter: u32) -> f32 {
        unsafe { self.gl.get_parameter_f32(parameter) }
    }

    fn get_string(&self, parameter: u32) -> String {
        unsafe { self.gl.get_parameter_string(parameter) }
    }

    fn create_buffer(&mut self) -> Result<GlName, String> {
        unsafe { self.gl.create_buffer() }.map(|b| b.0.get())
    }

    fn bind_buffer(&mut self, target: u32, object: Option<GlName>) {
        unsafe { self.gl.bind_buffer(target, object.and_then(buffer)) }
    }

    fn buffer_data_size(&mut self, target: u32, size: usize, usage: u32) {
        unsafe { self.gl.buffer_data_size(target, size as i32, usage) }
    }

    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        unsafe { self.gl.buffer_data_u8_slice(target, data, usage) }
    }

    fn buffer_sub_data(&mut self, target: u32, offset: usize, data: &[u8]) {
        unsafe { self.gl.buffer_sub_data_u8_slice(target, offset as i32, data) }
    }

    fn bind_buffer_base(&mut self, target: u32, index: u32, object: Option<GlName>) {
        unsafe { self.gl.bind_buffer_base(target, index, object.and_then(buffer)) }
    }

    fn delete_buffer(&mut self, object: GlName) {
        if let Some(b) = buffer(object) {
            unsafe { self.gl.delete_buffer(b) }
        }
    }

    fn create_shader(&mut self, shader_type: u32) -> Result<GlName, String> {
        unsafe { self.gl.create_shader(shader_type) }.map(|s| s.0.get())
    }

    fn compile_shader(&mut self, object: GlName, source: &str) -> bool {
        let Some(s) = shader(object) else {
            return false;
        };
        unsafe {
            self.gl.shader_source(s, source);
            self.gl.compile_shader(s);
            self.gl.get_shader_compile_status(s)
        }
    }

    fn shader_info_log(&self, object: GlName) -> String {
        shader(object)
            .map(|s| unsafe { self.gl.get_shader_info_log(s) })
            .unwrap_or_default()
    }

    fn delete_shader(&mut self, object: GlName) {
        if let Some(s) = shader(object) {
            unsafe { self.gl.delete_shader(s) }
        }
    }

    fn create_program(&mut self) -> Result<GlName, String> {
        unsafe { self.gl.create_program() }.map(|p| p.0.get())
    }

    fn attach_shader(&mut self, prog: GlName, object: GlName) {
        if let (Some(p), Some(s)) = (program(prog), shader(object)) {
            unsafe { self.gl.attach_shader(p, s) }
        }
    }

    fn detach_shader(&mut self, prog: GlName, object: GlName) {
        if let (Some(p), Some(s)) = (program(prog), shader(object)) {
            unsafe { self.gl.detach_shader(p, s) }
        }
    }

    fn link_program(&mut self, prog: GlName) -> bool {
        let Some(p) = program(prog) else {
            return false;
        };
        unsafe {
            self.gl.link_program(p);
            self.gl.get_program_link_status(p)
        }
    }

    fn program_info_log(&self, prog: GlName) -> String {
        program(prog)
            .map(|p| unsafe { self.gl.get_program_info_log(p) })
            .unwrap_or_default()
    }

    fn active_attributes(&self, prog: GlName) -> Vec<ActiveAttribute> {
        let Some(p) = program(prog) else {
            return Vec::new();
        };
        unsafe {
            let count = self.gl.get_active_attributes(p);
            (0..count)
                .filter_map(|index| self.gl.get_active_attribute(p, index))
                .map(|attribute| ActiveAttribute {
                    name: attribute.name,
                    size: attribute.size,
                    gl_type: attribute.atype,
                })
                .collect()
        }
    }

    fn attrib_location(&self, prog: GlName, attribute: &str) -> Option<u32> {
        program(prog).and_then(|p| unsafe { self.gl.get_attrib_location(p, attribute) })
    }

    fn uniform_block_index(&self, prog: GlName, block: &str) -> Option<u32> {
        program(prog).and_then(|p| unsafe { self.gl.get_uniform_block_index(p, block) })
    }

    fn uniform_block_binding(&mut self, prog: GlName, block_index: u32, binding: u32) {
        if let Some(p) = program(prog) {
            unsafe { self.gl.uniform_block_binding(p, block_index, binding) }
        }
    }

    fn uniform_1_i32(&mut self, prog: GlName, uniform: &str, value: i32) -> bool {
        let Some(p) = program(prog) else {
            return false;
        };
        unsafe {
            match self.gl.get_uniform_location(p, uniform) {
                Some(location) => {
                    self.gl.uniform_1_i32(Some(&location), value);
                    true
                }
                None => false,
            }
        }
    }

    fn use_program(&mut self, prog: Option<GlName>) {
        unsafe { self.gl.use_program(prog.and_then(program)) }
    }

    fn delete_program(&mut self, prog: GlName) {
        if let Some(p) = program(prog) {
            unsafe { self.gl.delete_program(p) }
        }
    }

    fn create_vertex_array(&mut self) -> Result<GlName, String> {
        unsafe { self.gl.create_vertex_array() }.map(|v| v.0.get())
    }

    fn bind_vertex_array(&mut self, object: Option<GlName>) {
        unsafe { self.gl.bind_vertex_array(object.and_then(vertex_array)) }
    }

    fn delete_vertex_array(&mut self, object: GlName) {
        if let Some(v) = vertex_array(object) {
            unsafe { self.gl.delete_vertex_array(v) }
        }
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        unsafe { self.gl.enable_vertex_attrib_array(index) }
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        unsafe { self.gl.disable_vertex_attrib_array(index) }
    }

    fn vertex_attrib_pointer_f32(
        &mut self,
        index: u32,
        size: i32,
        data_type: u32,
        normalized: bool,
        stride: i32,
        offset: i32,
    ) {
        unsafe {
            self.gl
                .vertex_attrib_pointer_f32(index, size, data_type, normalized, stride, offset)
        }
    }

    fn vertex_attrib_pointer_i32(&mut self, index: u32, size: i32, data_type: u32, stride: i32, offset: i32) {
        unsafe { self.gl.vertex_attrib_pointer_i32(index, size, data_type, stride, offset) }
    }

    fn create_texture(&mut self) -> Result<GlName, String> {
        unsafe { self.gl.create_texture() }.map(|t| t.0.get())
    }

    fn active_texture(&mut self, unit: u32) {
        unsafe { self.gl.active_texture(glow::TEXTURE0 + unit) }
    }

    fn bind_texture(&mut self, target: u32, object: Option<GlName>) {
        unsafe { self.gl.bind_texture(target, object.and_then(texture)) }
    }

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
    ) {
        unsafe {
            self.gl
                .tex_image_2d(target, level, internal_format, width, height, 0, format, ty, pixels)
        }
    }

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
    ) {
        unsafe {
            self.gl.tex_sub_image_2d(
                target,
                level,
                x,
                y,
                width,
                height,
                format,
                ty,
                glow::PixelUnpackData::Slice(pixels),
            )
        }
    }

    fn tex_parameter_i32(&mut self, target: u32, parameter: u32, value: i32) {
        unsafe { self.gl.tex_parameter_i32(target, parameter, value) }
    }

    fn generate_mipmap(&mut self, target: u32) {
        unsafe { self.gl.generate_mipmap(target) }
    }

    fn pixel_store_i32(&mut self, parameter: u32, value: i32) {
        unsafe { self.gl.pixel_store_i32(parameter, value) }
    }

    fn delete_texture(&mut self, object: GlName) {
        if let Some(t) = texture(object) {
            unsafe { self.gl.delete_texture(t) }
        }
    }

    fn create_sampler(&mut self) -> Result<GlName, String> {
        unsafe { self.gl.create_sampler() }.map(|s| s.0.get())
    }

    fn bind_sampler(&mut self, unit: u32, object: Option<GlName>) {
        unsafe { self.gl.bind_sampler(unit, object.and_then(sampler)) }
    }

    fn sampler_parameter_i32(&mut self, object: GlName, parameter: u32, value: i32) {
        if let Some(s) = sampler(object) {
            unsafe { self.gl.sampler_parameter_i32(s, parameter, value) }
        }
    }

    fn sampler_parameter_f32(&mut self, object: GlName, parameter: u32, value: f32) {
        if let Some(s) = sampler(object) {
            unsafe { self.gl.sampler_parameter_f32(s, parameter, value) }
        }
    }

    fn sampler_parameter_f32_slice(&mut self, object: GlName, parameter: u32, values: &[f32]) {
        if let Some(s) = sampler(object) {
            unsafe { self.gl.sampler_parameter_f32_slice(s, parameter, values) }
        }
    }

    fn delete_sampler(&mut self, object: GlName) {
        if let Some(s) = sampler(object) {
            unsafe { self.gl.delete_sampler(s) }
        }
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        unsafe { self.gl.clear_color(r, g, b, a) }
    }

    fn clear(&mut self, mask: u32) {
        unsafe { self.gl.clear(mask) }
    }

    fn viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { self.gl.viewport(x, y, width, height) }
    }

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        unsafe { self.gl.draw_arrays(mode, first, count) }
    }

    fn draw_elements(&mut self, mode: u32, count: i32, element_type: u32, offset: i32) {
        unsafe { self.gl.draw_elements(mode, count, element_type, offset) }
    }

    fn swap_buffers(&mut self) {
        self.surface.swap_buffers();
    }
}

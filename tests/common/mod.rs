//! Common utilities for device integration tests.
//!
//! The devices are generic over their driver API, so these tests run them on
//! recording fakes instead of a GPU: every call is logged and object lifetimes
//! are tracked so tests can assert *when* the device deletes things.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use engine2d_graphics::backend::directx::{
    D3d11Api, D3dBufferDesc, D3dSamplerDesc, D3dTextureDesc, DxgiFormat, InputElementDesc, SubresourceData,
};
use engine2d_graphics::backend::opengl::{ActiveAttribute, GlApi, GlName, GlVersion};
use engine2d_graphics::backend::*;
use engine2d_graphics::window::Window;

/// Route `log` output to the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn gl_desc() -> GraphicsDeviceDesc {
    GraphicsDeviceDesc::new(ContextDescriptor::new(ContextType::OpenGL, 3, 3))
}

pub fn gles_desc() -> GraphicsDeviceDesc {
    GraphicsDeviceDesc::new(ContextDescriptor::new(ContextType::OpenGLES, 3, 0))
}

pub fn dx_desc() -> GraphicsDeviceDesc {
    GraphicsDeviceDesc::new(ContextDescriptor::new(ContextType::DirectX, 11, 0))
}

// ============================================================================
// Recording OpenGL
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    BindBuffer { target: u32, buffer: Option<GlName> },
    BufferData { target: u32, len: usize, usage: u32 },
    BufferDataSize { target: u32, size: usize, usage: u32 },
    BufferSubData { target: u32, offset: usize, len: usize },
    BindBufferBase { target: u32, index: u32, buffer: Option<GlName> },
    UseProgram(Option<GlName>),
    UniformBlockBinding { program: GlName, block: u32, binding: u32 },
    Uniform1i { name: String, value: i32 },
    BindVertexArray(Option<GlName>),
    EnableAttrib(u32),
    DisableAttrib(u32),
    AttribPointerF32 { index: u32, size: i32, ty: u32, normalized: bool, stride: i32, offset: i32 },
    AttribPointerI32 { index: u32, size: i32, ty: u32, stride: i32, offset: i32 },
    ActiveTexture(u32),
    BindTexture(Option<GlName>),
    TexImage { level: i32, width: i32, height: i32, has_data: bool },
    TexSubImage { width: i32, height: i32, len: usize },
    TexParameter { parameter: u32, value: i32 },
    GenerateMipmap,
    BindSampler { unit: u32, sampler: Option<GlName> },
    SamplerI32 { sampler: GlName, parameter: u32, value: i32 },
    SamplerF32 { sampler: GlName, parameter: u32, value: f32 },
    SamplerF32Slice { sampler: GlName, parameter: u32 },
    ClearColor([f32; 4]),
    Clear(u32),
    Viewport { width: i32, height: i32 },
    DrawArrays { mode: u32, first: i32, count: i32 },
    DrawElements { mode: u32, count: i32, ty: u32, offset: i32 },
    SwapBuffers,
    Delete { kind: &'static str, name: GlName },
}

/// Shared view into a [`RecordingGl`] that stays usable after the device
/// takes ownership of it.
#[derive(Debug, Default)]
pub struct GlProbe {
    pub calls: Vec<GlCall>,
    pub live: HashSet<GlName>,
    pub deleted: Vec<GlName>,
    pub double_deletes: usize,
}

impl GlProbe {
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn count(&self, matches: impl Fn(&GlCall) -> bool) -> usize {
        self.calls.iter().filter(|c| matches(c)).count()
    }

    pub fn is_live(&self, name: GlName) -> bool {
        self.live.contains(&name)
    }

    /// Last value written to `parameter` of `sampler`
    pub fn sampler_param(&self, sampler: GlName, parameter: u32) -> Option<i32> {
        self.calls.iter().rev().find_map(|c| match c {
            GlCall::SamplerI32 {
                sampler: s,
                parameter: p,
                value,
            } if *s == sampler && *p == parameter => Some(*value),
            _ => None,
        })
    }

    pub fn sampler_param_f32(&self, sampler: GlName, parameter: u32) -> Option<f32> {
        self.calls.iter().rev().find_map(|c| match c {
            GlCall::SamplerF32 {
                sampler: s,
                parameter: p,
                value,
            } if *s == sampler && *p == parameter => Some(*value),
            _ => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct GlConfig {
    pub version: GlVersion,
    pub extensions: Vec<String>,
    pub texture_units: i32,
    pub max_anisotropy: f32,
    pub fail_link: bool,
}

impl GlConfig {
    pub fn desktop() -> Self {
        Self {
            version: GlVersion {
                major: 3,
                minor: 3,
                embedded: false,
            },
            extensions: Vec::new(),
            texture_units: 16,
            max_anisotropy: 16.0,
            fail_link: false,
        }
    }

    pub fn gles3() -> Self {
        Self {
            version: GlVersion {
                major: 3,
                minor: 0,
                embedded: true,
            },
            ..Self::desktop()
        }
    }

    pub fn with_extension(mut self, name: &str) -> Self {
        self.extensions.push(name.to_string());
        self
    }
}

struct FakeShader {
    shader_type: u32,
    source: String,
}

struct FakeProgram {
    attached: Vec<GlName>,
    /// Vertex inputs with their locations, filled at link time
    attributes: Vec<(ActiveAttribute, u32)>,
    sources: Vec<String>,
}

/// In-memory [`GlApi`] that records every call
pub struct RecordingGl {
    config: GlConfig,
    probe: Rc<RefCell<GlProbe>>,
    next_name: GlName,
    shaders: HashMap<GlName, FakeShader>,
    programs: HashMap<GlName, FakeProgram>,
}

impl RecordingGl {
    pub fn new(config: GlConfig) -> (Self, Rc<RefCell<GlProbe>>) {
        let probe = Rc::new(RefCell::new(GlProbe::default()));
        let gl = Self {
            config,
            probe: probe.clone(),
            next_name: 1,
            shaders: HashMap::new(),
            programs: HashMap::new(),
        };
        (gl, probe)
    }

    fn record(&self, call: GlCall) {
        self.probe.borrow_mut().calls.push(call);
    }

    fn create(&mut self) -> GlName {
        let name = self.next_name;
        self.next_name += 1;
        self.probe.borrow_mut().live.insert(name);
        name
    }

    fn delete(&mut self, kind: &'static str, name: GlName) {
        let mut probe = self.probe.borrow_mut();
        if !probe.live.remove(&name) {
            probe.double_deletes += 1;
        }
        probe.deleted.push(name);
        probe.calls.push(GlCall::Delete { kind, name });
    }
}

/// GL type enum of a GLSL type name
fn glsl_type(name: &str) -> Option<u32> {
    let ty = match name {
        "float" => glow::FLOAT,
        "vec2" => glow::FLOAT_VEC2,
        "vec3" => glow::FLOAT_VEC3,
        "vec4" => glow::FLOAT_VEC4,
        "int" => glow::INT,
        "ivec2" => glow::INT_VEC2,
        "ivec3" => glow::INT_VEC3,
        "ivec4" => glow::INT_VEC4,
        "uint" => glow::UNSIGNED_INT,
        "uvec2" => glow::UNSIGNED_INT_VEC2,
        "uvec3" => glow::UNSIGNED_INT_VEC3,
        "uvec4" => glow::UNSIGNED_INT_VEC4,
        "mat4" => glow::FLOAT_MAT4,
        _ => return None,
    };
    Some(ty)
}

/// `in vec2 a_position;` / `attribute vec4 color;` declarations of a vertex shader
fn parse_inputs(source: &str) -> Vec<ActiveAttribute> {
    source
        .split(';')
        .filter_map(|statement| {
            let tokens: Vec<&str> = statement.split_whitespace().collect();
            let at = tokens.iter().position(|t| *t == "in" || *t == "attribute")?;
            let gl_type = glsl_type(tokens.get(at + 1)?)?;
            let name = tokens.get(at + 2)?;
            Some(ActiveAttribute {
                name: name.to_string(),
                size: 1,
                gl_type,
            })
        })
        .collect()
}

impl GlApi for RecordingGl {
    fn version(&self) -> GlVersion {
        self.config.version
    }

    fn extensions(&self) -> Vec<String> {
        self.config.extensions.clone()
    }

    fn get_integer(&self, parameter: u32) -> i32 {
        match parameter {
            glow::MAX_COMBINED_TEXTURE_IMAGE_UNITS => self.config.texture_units,
            _ => 0,
        }
    }

    fn get_float(&self, _parameter: u32) -> f32 {
        self.config.max_anisotropy
    }

    fn get_string(&self, _parameter: u32) -> String {
        "Recording GL".to_string()
    }

    fn create_buffer(&mut self) -> Result<GlName, String> {
        Ok(self.create())
    }

    fn bind_buffer(&mut self, target: u32, buffer: Option<GlName>) {
        self.record(GlCall::BindBuffer { target, buffer });
    }

    fn buffer_data_size(&mut self, target: u32, size: usize, usage: u32) {
        self.record(GlCall::BufferDataSize { target, size, usage });
    }

    fn buffer_data(&mut self, target: u32, data: &[u8], usage: u32) {
        self.record(GlCall::BufferData {
            target,
            len: data.len(),
            usage,
        });
    }

    fn buffer_sub_data(&mut self, target: u32, offset: usize, data: &[u8]) {
        self.record(GlCall::BufferSubData {
            target,
            offset,
            len: data.len(),
        });
    }

    fn bind_buffer_base(&mut self, target: u32, index: u32, buffer: Option<GlName>) {
        self.record(GlCall::BindBufferBase { target, index, buffer });
    }

    fn delete_buffer(&mut self, buffer: GlName) {
        self.delete("buffer", buffer);
    }

    fn create_shader(&mut self, shader_type: u32) -> Result<GlName, String> {
        let name = self.create();
        self.shaders.insert(
            name,
            FakeShader {
                shader_type,
                source: String::new(),
            },
        );
        Ok(name)
    }

    fn compile_shader(&mut self, shader: GlName, source: &str) -> bool {
        if let Some(record) = self.shaders.get_mut(&shader) {
            record.source = source.to_string();
        }
        !source.contains("#error")
    }

    fn shader_info_log(&self, _shader: GlName) -> String {
        "0:1: error: #error directive".to_string()
    }

    fn delete_shader(&mut self, shader: GlName) {
        self.delete("shader", shader);
    }

    fn create_program(&mut self) -> Result<GlName, String> {
        let name = self.create();
        self.programs.insert(
            name,
            FakeProgram {
                attached: Vec::new(),
                attributes: Vec::new(),
                sources: Vec::new(),
            },
        );
        Ok(name)
    }

    fn attach_shader(&mut self, program: GlName, shader: GlName) {
        if let Some(record) = self.programs.get_mut(&program) {
            record.attached.push(shader);
        }
    }

    fn detach_shader(&mut self, program: GlName, shader: GlName) {
        if let Some(record) = self.programs.get_mut(&program) {
            record.attached.retain(|s| *s != shader);
        }
    }

    fn link_program(&mut self, program: GlName) -> bool {
        if self.config.fail_link {
            return false;
        }
        let Some(record) = self.programs.get_mut(&program) else {
            return false;
        };
        let mut location = 0;
        for shader in &record.attached {
            let Some(shader) = self.shaders.get(shader) else {
                continue;
            };
            record.sources.push(shader.source.clone());
            if shader.shader_type != glow::VERTEX_SHADER {
                continue;
            }
            for attribute in parse_inputs(&shader.source) {
                let slots = if attribute.gl_type == glow::FLOAT_MAT4 { 4 } else { 1 };
                record.attributes.push((attribute, location));
                location += slots;
            }
        }
        true
    }

    fn program_info_log(&self, _program: GlName) -> String {
        "link failed".to_string()
    }

    fn active_attributes(&self, program: GlName) -> Vec<ActiveAttribute> {
        self.programs
            .get(&program)
            .map(|p| p.attributes.iter().map(|(a, _)| a.clone()).collect())
            .unwrap_or_default()
    }

    fn attrib_location(&self, program: GlName, name: &str) -> Option<u32> {
        self.programs
            .get(&program)?
            .attributes
            .iter()
            .find(|(a, _)| a.name == name)
            .map(|(_, location)| *location)
    }

    fn uniform_block_index(&self, program: GlName, name: &str) -> Option<u32> {
        let sources = &self.programs.get(&program)?.sources;
        sources
            .iter()
            .any(|s| s.contains(&format!("uniform {name}")))
            .then_some(0)
    }

    fn uniform_block_binding(&mut self, program: GlName, block_index: u32, binding: u32) {
        self.record(GlCall::UniformBlockBinding {
            program,
            block: block_index,
            binding,
        });
    }

    fn uniform_1_i32(&mut self, program: GlName, name: &str, value: i32) -> bool {
        let found = self
            .programs
            .get(&program)
            .is_some_and(|p| p.sources.iter().any(|s| s.contains(&format!("sampler2D {name}"))));
        if found {
            self.record(GlCall::Uniform1i {
                name: name.to_string(),
                value,
            });
        }
        found
    }

    fn use_program(&mut self, program: Option<GlName>) {
        self.record(GlCall::UseProgram(program));
    }

    fn delete_program(&mut self, program: GlName) {
        self.programs.remove(&program);
        self.delete("program", program);
    }

    fn create_vertex_array(&mut self) -> Result<GlName, String> {
        Ok(self.create())
    }

    fn bind_vertex_array(&mut self, vertex_array: Option<GlName>) {
        self.record(GlCall::BindVertexArray(vertex_array));
    }

    fn delete_vertex_array(&mut self, vertex_array: GlName) {
        self.delete("vertex array", vertex_array);
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.record(GlCall::EnableAttrib(index));
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        self.record(GlCall::DisableAttrib(index));
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
        self.record(GlCall::AttribPointerF32 {
            index,
            size,
            ty: data_type,
            normalized,
            stride,
            offset,
        });
    }

    fn vertex_attrib_pointer_i32(&mut self, index: u32, size: i32, data_type: u32, stride: i32, offset: i32) {
        self.record(GlCall::AttribPointerI32 {
            index,
            size,
            ty: data_type,
            stride,
            offset,
        });
    }

    fn create_texture(&mut self) -> Result<GlName, String> {
        Ok(self.create())
    }

    fn active_texture(&mut self, unit: u32) {
        self.record(GlCall::ActiveTexture(unit));
    }

    fn bind_texture(&mut self, _target: u32, texture: Option<GlName>) {
        self.record(GlCall::BindTexture(texture));
    }

    fn tex_image_2d(
        &mut self,
        _target: u32,
        level: i32,
        _internal_format: i32,
        width: i32,
        height: i32,
        _format: u32,
        _ty: u32,
        pixels: Option<&[u8]>,
    ) {
        self.record(GlCall::TexImage {
            level,
            width,
            height,
            has_data: pixels.is_some(),
        });
    }

    fn tex_sub_image_2d(
        &mut self,
        _target: u32,
        _level: i32,
        _x: i32,
        _y: i32,
        width: i32,
        height: i32,
        _format: u32,
        _ty: u32,
        pixels: &[u8],
    ) {
        self.record(GlCall::TexSubImage {
            width,
            height,
            len: pixels.len(),
        });
    }

    fn tex_parameter_i32(&mut self, _target: u32, parameter: u32, value: i32) {
        self.record(GlCall::TexParameter { parameter, value });
    }

    fn generate_mipmap(&mut self, _target: u32) {
        self.record(GlCall::GenerateMipmap);
    }

    fn pixel_store_i32(&mut self, _parameter: u32, _value: i32) {}

    fn delete_texture(&mut self, texture: GlName) {
        self.delete("texture", texture);
    }

    fn create_sampler(&mut self) -> Result<GlName, String> {
        Ok(self.create())
    }

    fn bind_sampler(&mut self, unit: u32, sampler: Option<GlName>) {
        self.record(GlCall::BindSampler { unit, sampler });
    }

    fn sampler_parameter_i32(&mut self, sampler: GlName, parameter: u32, value: i32) {
        self.record(GlCall::SamplerI32 {
            sampler,
            parameter,
            value,
        });
    }

    fn sampler_parameter_f32(&mut self, sampler: GlName, parameter: u32, value: f32) {
        self.record(GlCall::SamplerF32 {
            sampler,
            parameter,
            value,
        });
    }

    fn sampler_parameter_f32_slice(&mut self, sampler: GlName, parameter: u32, _values: &[f32]) {
        self.record(GlCall::SamplerF32Slice { sampler, parameter });
    }

    fn delete_sampler(&mut self, sampler: GlName) {
        self.delete("sampler", sampler);
    }

    fn clear_color(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.record(GlCall::ClearColor([r, g, b, a]));
    }

    fn clear(&mut self, mask: u32) {
        self.record(GlCall::Clear(mask));
    }

    fn viewport(&mut self, _x: i32, _y: i32, width: i32, height: i32) {
        self.record(GlCall::Viewport { width, height });
    }

    fn draw_arrays(&mut self, mode: u32, first: i32, count: i32) {
        self.record(GlCall::DrawArrays { mode, first, count });
    }

    fn draw_elements(&mut self, mode: u32, count: i32, element_type: u32, offset: i32) {
        self.record(GlCall::DrawElements {
            mode,
            count,
            ty: element_type,
            offset,
        });
    }

    fn swap_buffers(&mut self) {
        self.record(GlCall::SwapBuffers);
    }
}

// ============================================================================
// Recording Direct3D 11
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum DxCall {
    CreateBuffer { id: u32, desc: D3dBufferDesc, initial_len: Option<usize> },
    WriteBuffer { id: u32, len: usize },
    CreateSampler { id: u32, desc: D3dSamplerDesc },
    CreateInputLayout { id: u32, elements: Vec<InputElementDesc> },
    CreateTexture { id: u32, desc: D3dTextureDesc, initial_len: Option<usize> },
    UpdateTexture { id: u32, len: usize, row_pitch: u32 },
    GenerateMips(u32),
    SetVertexBuffer { id: Option<u32>, stride: u32 },
    SetIndexBuffer { id: Option<u32>, format: DxgiFormat },
    SetInputLayout(Option<u32>),
    SetTopology(u32),
    SetShaders(Option<u32>, Option<u32>),
    SetConstantBuffer { slot: u32, id: Option<u32> },
    SetTexture { slot: u32, id: Option<u32> },
    SetSampler { slot: u32, id: Option<u32> },
    Draw { count: u32, start: u32 },
    DrawIndexed { count: u32, start: u32 },
    CreateBackbufferView(u32),
    SetRenderTarget(Option<u32>),
    ClearRenderTarget { id: u32, color: [f32; 4] },
    SetViewport { width: f32, height: f32 },
    ResizeBuffers { width: u32, height: u32 },
    Present(u32),
    Release { kind: &'static str, id: u32 },
}

#[derive(Debug, Default)]
pub struct DxProbe {
    pub calls: Vec<DxCall>,
    pub live: HashSet<u32>,
    pub released: Vec<u32>,
    /// Backbuffer views currently alive
    pub live_views: usize,
}

impl DxProbe {
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn count(&self, matches: impl Fn(&DxCall) -> bool) -> usize {
        self.calls.iter().filter(|c| matches(c)).count()
    }

    pub fn is_live(&self, id: u32) -> bool {
        self.live.contains(&id)
    }
}

/// A fake COM object; dropping the last reference records a release
#[derive(Debug)]
pub struct DxObject {
    pub id: u32,
    kind: &'static str,
    probe: Rc<RefCell<DxProbe>>,
}

impl Drop for DxObject {
    fn drop(&mut self) {
        let mut probe = self.probe.borrow_mut();
        probe.live.remove(&self.id);
        probe.released.push(self.id);
        if self.kind == "view" {
            probe.live_views -= 1;
        }
        probe.calls.push(DxCall::Release {
            kind: self.kind,
            id: self.id,
        });
    }
}

pub type DxRef = Rc<DxObject>;

fn id_of(object: Option<&DxRef>) -> Option<u32> {
    object.map(|o| o.id)
}

/// In-memory [`D3d11Api`] that records every call.
///
/// Shader "bytecode" is the HLSL source, and input layouts only link when
/// every semantic name appears in it.
pub struct RecordingD3d11 {
    probe: Rc<RefCell<DxProbe>>,
    next_id: u32,
}

impl RecordingD3d11 {
    pub fn new() -> (Self, Rc<RefCell<DxProbe>>) {
        let probe = Rc::new(RefCell::new(DxProbe::default()));
        (
            Self {
                probe: probe.clone(),
                next_id: 1,
            },
            probe,
        )
    }

    fn object(&mut self, kind: &'static str) -> DxRef {
        let id = self.next_id;
        self.next_id += 1;
        let mut probe = self.probe.borrow_mut();
        probe.live.insert(id);
        if kind == "view" {
            probe.live_views += 1;
        }
        Rc::new(DxObject {
            id,
            kind,
            probe: self.probe.clone(),
        })
    }

    fn record(&self, call: DxCall) {
        self.probe.borrow_mut().calls.push(call);
    }
}

impl D3d11Api for RecordingD3d11 {
    type Buffer = DxRef;
    type SamplerState = DxRef;
    type VertexShader = DxRef;
    type PixelShader = DxRef;
    type InputLayout = DxRef;
    type Texture = DxRef;
    type RenderTargetView = DxRef;

    fn feature_level(&self) -> (u32, u32) {
        (11, 0)
    }

    fn create_buffer(&mut self, desc: &D3dBufferDesc, initial: Option<&[u8]>) -> Result<DxRef, String> {
        let buffer = self.object("buffer");
        self.record(DxCall::CreateBuffer {
            id: buffer.id,
            desc: *desc,
            initial_len: initial.map(<[u8]>::len),
        });
        Ok(buffer)
    }

    fn write_buffer(&mut self, buffer: &DxRef, data: &[u8]) -> Result<(), String> {
        self.record(DxCall::WriteBuffer {
            id: buffer.id,
            len: data.len(),
        });
        Ok(())
    }

    fn create_sampler_state(&mut self, desc: &D3dSamplerDesc) -> Result<DxRef, String> {
        let sampler = self.object("sampler");
        self.record(DxCall::CreateSampler {
            id: sampler.id,
            desc: *desc,
        });
        Ok(sampler)
    }

    fn compile_shader(&mut self, _stage: ShaderStage, source: &str) -> Result<Vec<u8>, String> {
        if source.contains("#error") {
            Err("error X1000: #error directive".to_string())
        } else {
            Ok(source.as_bytes().to_vec())
        }
    }

    fn create_vertex_shader(&mut self, _bytecode: &[u8]) -> Result<DxRef, String> {
        Ok(self.object("vertex shader"))
    }

    fn create_pixel_shader(&mut self, _bytecode: &[u8]) -> Result<DxRef, String> {
        Ok(self.object("pixel shader"))
    }

    fn create_input_layout(&mut self, elements: &[InputElementDesc], vertex_bytecode: &[u8]) -> Result<DxRef, String> {
        let source = String::from_utf8_lossy(vertex_bytecode);
        if let Some(missing) = elements.iter().find(|e| !source.contains(e.semantic_name.as_str())) {
            return Err(format!("semantic {} not found in the vertex shader", missing.semantic_name));
        }
        let layout = self.object("input layout");
        self.record(DxCall::CreateInputLayout {
            id: layout.id,
            elements: elements.to_vec(),
        });
        Ok(layout)
    }

    fn create_texture_2d(&mut self, desc: &D3dTextureDesc, initial: Option<SubresourceData>) -> Result<DxRef, String> {
        let texture = self.object("texture");
        self.record(DxCall::CreateTexture {
            id: texture.id,
            desc: *desc,
            initial_len: initial.map(|i| i.data.len()),
        });
        Ok(texture)
    }

    fn update_texture_2d(&mut self, texture: &DxRef, data: SubresourceData) {
        self.record(DxCall::UpdateTexture {
            id: texture.id,
            len: data.data.len(),
            row_pitch: data.row_pitch,
        });
    }

    fn generate_mips(&mut self, texture: &DxRef) {
        self.record(DxCall::GenerateMips(texture.id));
    }

    fn set_vertex_buffer(&mut self, buffer: Option<&DxRef>, stride: u32) {
        self.record(DxCall::SetVertexBuffer {
            id: id_of(buffer),
            stride,
        });
    }

    fn set_index_buffer(&mut self, buffer: Option<&DxRef>, format: DxgiFormat) {
        self.record(DxCall::SetIndexBuffer {
            id: id_of(buffer),
            format,
        });
    }

    fn set_input_layout(&mut self, layout: Option<&DxRef>) {
        self.record(DxCall::SetInputLayout(id_of(layout)));
    }

    fn set_primitive_topology(&mut self, topology: u32) {
        self.record(DxCall::SetTopology(topology));
    }

    fn set_shaders(&mut self, vertex: Option<&DxRef>, pixel: Option<&DxRef>) {
        self.record(DxCall::SetShaders(id_of(vertex), id_of(pixel)));
    }

    fn set_constant_buffer(&mut self, slot: u32, buffer: Option<&DxRef>) {
        self.record(DxCall::SetConstantBuffer {
            slot,
            id: id_of(buffer),
        });
    }

    fn set_texture(&mut self, slot: u32, texture: Option<&DxRef>) {
        self.record(DxCall::SetTexture {
            slot,
            id: id_of(texture),
        });
    }

    fn set_sampler(&mut self, slot: u32, sampler: Option<&DxRef>) {
        self.record(DxCall::SetSampler {
            slot,
            id: id_of(sampler),
        });
    }

    fn draw(&mut self, vertex_count: u32, start_vertex: u32) {
        self.record(DxCall::Draw {
            count: vertex_count,
            start: start_vertex,
        });
    }

    fn draw_indexed(&mut self, index_count: u32, start_index: u32) {
        self.record(DxCall::DrawIndexed {
            count: index_count,
            start: start_index,
        });
    }

    fn create_backbuffer_view(&mut self) -> Result<DxRef, String> {
        let view = self.object("view");
        self.record(DxCall::CreateBackbufferView(view.id));
        Ok(view)
    }

    fn set_render_target(&mut self, view: Option<&DxRef>) {
        self.record(DxCall::SetRenderTarget(id_of(view)));
    }

    fn clear_render_target(&mut self, view: &DxRef, color: [f32; 4]) {
        self.record(DxCall::ClearRenderTarget { id: view.id, color });
    }

    fn set_viewport(&mut self, width: f32, height: f32) {
        self.record(DxCall::SetViewport { width, height });
    }

    fn resize_buffers(&mut self, width: u32, height: u32) -> Result<(), String> {
        self.record(DxCall::ResizeBuffers { width, height });
        if self.probe.borrow().live_views > 0 {
            return Err("DXGI_ERROR_INVALID_CALL: backbuffer still referenced".to_string());
        }
        Ok(())
    }

    fn present(&mut self, sync_interval: u32) -> Result<(), String> {
        self.record(DxCall::Present(sync_interval));
        Ok(())
    }
}

// ============================================================================
// Window
// ============================================================================

/// Window with a fixed size and no native handle or GL context
pub struct FakeWindow {
    pub width: u32,
    pub height: u32,
}

impl Window for FakeWindow {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn handle(&self) -> Result<raw_window_handle::WindowHandle<'_>, raw_window_handle::HandleError> {
        Err(raw_window_handle::HandleError::Unavailable)
    }

    fn poll_events(&mut self) {}

    fn should_close(&self) -> bool {
        false
    }
}

//! OpenGL / OpenGL ES 3 backend
//!
//! GL is a global bound-state machine. The device keeps an explicit copy of
//! what is bound (vertex array, program, texture and sampler per unit) so it
//! can skip redundant binds and restore state after scratch binds.
//!
//! Two pieces of GL state depend on *combinations* of bindings and are
//! resolved lazily:
//!
//! - vertex attribute pointers depend on the program's attribute locations, so
//!   a vertex array remembers which pipeline it was last configured for and is
//!   reconfigured at draw time when that changes;
//! - sampler min filters depend on whether the texture on the same unit has
//!   mips, so they are re-derived whenever either side of the unit changes.

mod api;
mod conversion;
mod glow_api;

pub use api::{ActiveAttribute, GlApi, GlName, GlVersion};
pub use conversion::{GlCapabilities, MAX_TEXTURE_UNITS};
pub use glow_api::GlowApi;

use crate::backend::context::{ContextDescriptor, ContextType, GraphicsDeviceDesc};
use crate::backend::deferred::{DeferredReclaimer, ReleaseQueue};
use crate::backend::handle::*;
use crate::backend::layout::{ElementType, VertexLayout};
use crate::backend::slot_table::SlotTable;
use crate::backend::traits::*;
use crate::backend::types::*;
use crate::backend::WarnOnce;
use conversion::*;

/// A GL object waiting for deferred deletion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlObject {
    Buffer(GlName),
    Shader(GlName),
    Program(GlName),
    Texture(GlName),
    Sampler(GlName),
    VertexArray(GlName),
}

struct GlBuffer {
    name: GlName,
    size: usize,
    usage: Usage,
    ty: BufferType,
}

struct GlSampler {
    name: GlName,
    desc: SamplerDesc,
}

struct GlShader {
    name: GlName,
    stage: ShaderStage,
}

/// Vertex input of a linked program
struct ProgramAttribute {
    name: String,
    location: u32,
    shape: Option<(ElementType, u32)>,
}

struct GlProgram {
    name: GlName,
    attributes: Vec<ProgramAttribute>,
}

struct GlTexture {
    name: GlName,
    width: u32,
    height: u32,
    format: TextureFormat,
    usage: Usage,
    mip_count: u32,
}

struct GlVertexArray {
    name: GlName,
    vertex_buffer: BufferHandle,
    index_buffer: Option<BufferHandle>,
    index_format: IndexFormat,
    layout: VertexLayout,
    /// Attribute locations currently enabled on this VAO
    enabled: Vec<u32>,
    /// Pipeline the attribute pointers were last set up for
    configured_for: Option<PipelineStateHandle>,
    /// Pipeline whose layout mismatch was already reported
    rejected_for: Option<PipelineStateHandle>,
}

#[derive(Default)]
struct BoundState {
    vertex_array: Option<VertexArrayHandle>,
    pipeline: Option<PipelineStateHandle>,
    textures: [Option<Texture2DHandle>; MAX_TEXTURE_UNITS as usize],
    samplers: [Option<SamplerStateHandle>; MAX_TEXTURE_UNITS as usize],
    active_unit: u32,
}

/// OpenGL(ES) implementation of [`GraphicsDevice`] over any [`GlApi`]
pub struct OpenGlDevice<A: GlApi> {
    gl: A,
    context: ContextDescriptor,
    caps: GlCapabilities,

    buffers: SlotTable<BufferHandle, GlBuffer>,
    samplers: SlotTable<SamplerStateHandle, GlSampler>,
    shaders: SlotTable<ShaderHandle, GlShader>,
    programs: SlotTable<PipelineStateHandle, GlProgram>,
    textures: SlotTable<Texture2DHandle, GlTexture>,
    vertex_arrays: SlotTable<VertexArrayHandle, GlVertexArray>,

    bound: BoundState,
    reclaimer: DeferredReclaimer<GlObject>,
    release_queue: ReleaseQueue,

    border_warning: WarnOnce,
    anisotropy_warning: WarnOnce,

    width: u32,
    height: u32,
    frame: u64,
}

impl<A: GlApi> OpenGlDevice<A> {
    /// Wrap a GL context that is current on this thread.
    pub fn new(mut gl: A, desc: &GraphicsDeviceDesc, width: u32, height: u32) -> GraphicsResult<Self> {
        desc.check()?;
        if !desc.context.is_gl() {
            return Err(GraphicsError::InvalidParameter(format!(
                "{:?} context requested from the OpenGL backend",
                desc.context.ty
            )));
        }

        let caps = GlCapabilities::query(&gl);
        let requested = (desc.context.major_version, desc.context.minor_version);
        if !caps.version.at_least(requested.0, requested.1) {
            log::warn!(
                "Requested {:?} {}.{} but the driver reports {}.{}",
                desc.context.ty,
                requested.0,
                requested.1,
                caps.version.major,
                caps.version.minor
            );
        }
        log::info!(
            "OpenGL{} {}.{} device on '{}': border clamp {}, anisotropy {} (max {}), {} texture units, vsync {}",
            if caps.version.embedded { " ES" } else { "" },
            caps.version.major,
            caps.version.minor,
            caps.renderer,
            caps.border_clamp,
            caps.anisotropic_filtering,
            caps.max_anisotropy,
            caps.texture_units,
            desc.vsync
        );

        gl.pixel_store_i32(glow::UNPACK_ALIGNMENT, 1);
        gl.viewport(0, 0, width as i32, height as i32);

        let limits = desc.limits;
        Ok(Self {
            gl,
            context: desc.context,
            caps,
            buffers: SlotTable::new(limits.max_buffers),
            samplers: SlotTable::new(limits.max_sampler_states),
            shaders: SlotTable::new(limits.max_shaders),
            programs: SlotTable::new(limits.max_pipeline_states),
            textures: SlotTable::new(limits.max_textures),
            vertex_arrays: SlotTable::new(limits.max_vertex_arrays),
            bound: BoundState::default(),
            reclaimer: DeferredReclaimer::new(),
            release_queue: ReleaseQueue::new(),
            border_warning: WarnOnce::default(),
            anisotropy_warning: WarnOnce::default(),
            width,
            height,
            frame: 0,
        })
    }

    pub fn api(&self) -> &A {
        &self.gl
    }

    pub fn capabilities(&self) -> &GlCapabilities {
        &self.caps
    }

    /// Objects released but not yet deleted
    pub fn pending_destruction(&self) -> usize {
        self.reclaimer.pending_count()
    }

    /// Live handles of one kind
    pub fn live_resources(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Buffer => self.buffers.len(),
            ResourceKind::SamplerState => self.samplers.len(),
            ResourceKind::Shader => self.shaders.len(),
            ResourceKind::PipelineState => self.programs.len(),
            ResourceKind::Texture2D => self.textures.len(),
            ResourceKind::VertexArray => self.vertex_arrays.len(),
        }
    }

    /// Number of completed `present()` calls
    pub fn frame_index(&self) -> u64 {
        self.frame
    }

    fn destroy(&mut self, object: GlObject) {
        log::trace!("Deleting {:?}", object);
        match object {
            GlObject::Buffer(name) => self.gl.delete_buffer(name),
            GlObject::Shader(name) => self.gl.delete_shader(name),
            GlObject::Program(name) => self.gl.delete_program(name),
            GlObject::Texture(name) => self.gl.delete_texture(name),
            GlObject::Sampler(name) => self.gl.delete_sampler(name),
            GlObject::VertexArray(name) => self.gl.delete_vertex_array(name),
        }
    }

    fn check_unit(&self, unit: u32) -> GraphicsResult<usize> {
        if unit < self.caps.texture_units {
            Ok(unit as usize)
        } else {
            Err(GraphicsError::InvalidParameter(format!(
                "texture unit {} out of range (0..{})",
                unit, self.caps.texture_units
            )))
        }
    }

    fn select_unit(&mut self, unit: u32) {
        if self.bound.active_unit != unit {
            self.gl.active_texture(unit);
            self.bound.active_unit = unit;
        }
    }

    /// Bind `name` on unit 0 for an upload, then restore that unit's binding.
    fn with_scratch_texture(&mut self, name: GlName, upload: impl FnOnce(&mut A)) {
        self.select_unit(0);
        self.gl.bind_texture(glow::TEXTURE_2D, Some(name));
        upload(&mut self.gl);
        let restore = self.bound.textures[0]
            .and_then(|t| self.textures.resolve(t).ok())
            .map(|t| t.name);
        self.gl.bind_texture(glow::TEXTURE_2D, restore);
    }

    /// Re-derive the filter of the sampler on `unit` for the texture on `unit`.
    ///
    /// The filter lives on the GL sampler object, which every unit it is bound
    /// to shares. With one sampler on two units the most recent refresh wins
    /// for both; `TEXTURE_MAX_LEVEL` keeps either texture complete, so the
    /// cost is a mip filter that may be missing or unused on one of them.
    fn refresh_sampler_filter(&mut self, unit: usize) {
        let Some(handle) = self.bound.samplers[unit] else {
            return;
        };
        let mip_count = self.bound.textures[unit]
            .and_then(|t| self.textures.resolve(t).ok())
            .map_or(1, |t| t.mip_count);

        let Self {
            gl,
            caps,
            samplers,
            anisotropy_warning,
            ..
        } = self;
        if let Ok(sampler) = samplers.resolve(handle) {
            upload_sampler_filter(gl, caps, anisotropy_warning, sampler.name, &sampler.desc, mip_count);
        }
    }

    /// Point the bound vertex array's attributes at the bound program's
    /// inputs if they were last set up for a different program.
    fn sync_vertex_attributes(&mut self) {
        let (Some(vao_handle), Some(pipeline)) = (self.bound.vertex_array, self.bound.pipeline) else {
            return;
        };
        let Self {
            gl,
            buffers,
            programs,
            vertex_arrays,
            ..
        } = self;
        let (Ok(vao), Ok(program)) = (vertex_arrays.resolve_mut(vao_handle), programs.resolve(pipeline)) else {
            return;
        };
        if vao.configured_for == Some(pipeline) || vao.rejected_for == Some(pipeline) {
            return;
        }

        if let Err(reason) = match_layout(&program.attributes, &vao.layout) {
            log::warn!(
                "Vertex array {:?} does not match pipeline {:?}: {}. Keeping previous attribute setup",
                vao_handle,
                pipeline,
                reason
            );
            vao.rejected_for = Some(pipeline);
            return;
        }
        let Ok(vertex_buffer) = buffers.resolve(vao.vertex_buffer) else {
            log::warn!("Vertex array {:?} references a released vertex buffer", vao_handle);
            vao.rejected_for = Some(pipeline);
            return;
        };

        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vertex_buffer.name));
        for location in vao.enabled.drain(..) {
            gl.disable_vertex_attrib_array(location);
        }

        let stride = vao.layout.stride() as i32;
        for (element, offset) in vao.layout.elements().iter().zip(vao.layout.offsets()) {
            // Elements the shader doesn't read are left disabled
            let Some(attribute) = program.attributes.iter().find(|a| a.name == element.name) else {
                continue;
            };
            let offset = offset as i32;
            let data_type = convert_element_type(element.ty);
            match element.ty {
                ElementType::Matrix => {
                    for column in 0..4 {
                        let location = attribute.location + column;
                        gl.enable_vertex_attrib_array(location);
                        gl.vertex_attrib_pointer_f32(location, 4, data_type, false, stride, offset + column as i32 * 16);
                        vao.enabled.push(location);
                    }
                }
                ElementType::Float => {
                    gl.enable_vertex_attrib_array(attribute.location);
                    gl.vertex_attrib_pointer_f32(attribute.location, element.count as i32, data_type, false, stride, offset);
                    vao.enabled.push(attribute.location);
                }
                ElementType::Int | ElementType::UnsignedInt => {
                    gl.enable_vertex_attrib_array(attribute.location);
                    if element.is_packed_normalized() {
                        let channel = if element.ty == ElementType::Int {
                            glow::BYTE
                        } else {
                            glow::UNSIGNED_BYTE
                        };
                        gl.vertex_attrib_pointer_f32(attribute.location, 4, channel, true, stride, offset);
                    } else {
                        gl.vertex_attrib_pointer_i32(attribute.location, element.count as i32, data_type, stride, offset);
                    }
                    vao.enabled.push(attribute.location);
                }
            }
        }

        vao.configured_for = Some(pipeline);
        vao.rejected_for = None;
        log::trace!("Configured vertex array {:?} for pipeline {:?}", vao_handle, pipeline);
    }

    fn check_draw(&self) -> GraphicsResult<()> {
        if self.bound.vertex_array.is_none() {
            return Err(GraphicsError::InvalidParameter("draw without a bound vertex array".into()));
        }
        if self.bound.pipeline.is_none() {
            return Err(GraphicsError::InvalidParameter("draw without a bound pipeline".into()));
        }
        Ok(())
    }
}

/// Every program input must be fed by a layout element of the same shape.
fn match_layout(attributes: &[ProgramAttribute], layout: &VertexLayout) -> Result<(), String> {
    for attribute in attributes {
        let element = layout
            .find(&attribute.name)
            .ok_or_else(|| format!("shader input '{}' is missing from the layout", attribute.name))?;
        let Some((ty, count)) = attribute.shape else {
            return Err(format!("shader input '{}' has an unsupported type", attribute.name));
        };
        let (element_ty, element_count) = element.shader_shape();
        if (element_ty, element_count) != (ty, count) {
            return Err(format!(
                "'{}' is {:?}x{} in the shader but {:?}x{} in the layout",
                attribute.name, ty, count, element_ty, element_count
            ));
        }
    }
    Ok(())
}

/// Wrap modes, border color, comparison and LOD range
fn upload_sampler_params<A: GlApi>(
    gl: &mut A,
    caps: &GlCapabilities,
    border_warning: &mut WarnOnce,
    sampler: GlName,
    desc: &SamplerDesc,
) {
    let params = [glow::TEXTURE_WRAP_S, glow::TEXTURE_WRAP_T, glow::TEXTURE_WRAP_R];
    for (param, wrap) in params.into_iter().zip(desc.wraps()) {
        let mode = convert_wrap_mode(wrap, caps.border_clamp).unwrap_or_else(|| {
            border_warning.warn(|| "Border clamp is not supported by this driver, using clamp-to-edge".to_string());
            glow::CLAMP_TO_EDGE
        });
        gl.sampler_parameter_i32(sampler, param, mode as i32);
    }
    if caps.border_clamp {
        gl.sampler_parameter_f32_slice(sampler, glow::TEXTURE_BORDER_COLOR, &desc.border_color.to_array());
    }

    match desc.compare {
        Some(func) => {
            gl.sampler_parameter_i32(sampler, glow::TEXTURE_COMPARE_MODE, glow::COMPARE_REF_TO_TEXTURE as i32);
            gl.sampler_parameter_i32(sampler, glow::TEXTURE_COMPARE_FUNC, convert_compare_function(func) as i32);
        }
        None => gl.sampler_parameter_i32(sampler, glow::TEXTURE_COMPARE_MODE, glow::NONE as i32),
    }

    gl.sampler_parameter_f32(sampler, glow::TEXTURE_MIN_LOD, desc.min_lod);
    gl.sampler_parameter_f32(sampler, glow::TEXTURE_MAX_LOD, desc.max_lod);
}

/// Min/mag filter and anisotropy for a texture with `mip_count` levels
fn upload_sampler_filter<A: GlApi>(
    gl: &mut A,
    caps: &GlCapabilities,
    anisotropy_warning: &mut WarnOnce,
    sampler: GlName,
    desc: &SamplerDesc,
    mip_count: u32,
) {
    let (min, mag) = derive_filters(desc.filter, mip_count);
    gl.sampler_parameter_i32(sampler, glow::TEXTURE_MIN_FILTER, min as i32);
    gl.sampler_parameter_i32(sampler, glow::TEXTURE_MAG_FILTER, mag as i32);

    let anisotropic = desc.filter == Filter::Anisotropic;
    if anisotropic && !caps.anisotropic_filtering {
        anisotropy_warning.warn(|| "Anisotropic filtering is not supported by this driver, using trilinear".to_string());
    }
    if caps.anisotropic_filtering {
        let level = if anisotropic {
            (desc.max_anisotropy as f32).clamp(1.0, caps.max_anisotropy)
        } else {
            1.0
        };
        gl.sampler_parameter_f32(sampler, TEXTURE_MAX_ANISOTROPY, level);
    }
}

/// Draw arguments are signed on the GL side
fn draw_param(what: &str, value: Option<u32>) -> GraphicsResult<i32> {
    value
        .and_then(|v| i32::try_from(v).ok())
        .ok_or_else(|| GraphicsError::InvalidParameter(format!("{} out of range", what)))
}

fn creation_error(kind: ResourceKind, reason: String) -> GraphicsError {
    log::error!("Failed to create {}: {}", kind, reason);
    GraphicsError::ResourceCreation { kind, reason }
}

impl<A: GlApi> GraphicsDevice for OpenGlDevice<A> {
    fn context_type(&self) -> ContextType {
        self.context.ty
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> GraphicsResult<BufferHandle> {
        check_buffer_desc(desc)?;
        let name = self
            .gl
            .create_buffer()
            .map_err(|reason| creation_error(ResourceKind::Buffer, reason))?;

        // The copy-write target leaves the bound VAO's element buffer alone
        let usage = convert_usage(desc.usage);
        self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, Some(name));
        match desc.initial_data {
            Some(data) if data.len() == desc.size => self.gl.buffer_data(glow::COPY_WRITE_BUFFER, data, usage),
            Some(data) => {
                self.gl.buffer_data_size(glow::COPY_WRITE_BUFFER, desc.size, usage);
                self.gl.buffer_sub_data(glow::COPY_WRITE_BUFFER, 0, data);
            }
            None => self.gl.buffer_data_size(glow::COPY_WRITE_BUFFER, desc.size, usage),
        }
        self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, None);

        let record = GlBuffer {
            name,
            size: desc.size,
            usage: desc.usage,
            ty: desc.ty,
        };
        let handle = self.buffers.allocate(record).inspect_err(|_| self.gl.delete_buffer(name))?;
        log::trace!(
            "Created {:?} buffer {:?} ({} bytes, {:?}){}",
            desc.ty,
            handle,
            desc.size,
            desc.usage,
            desc.label.map(|l| format!(" '{l}'")).unwrap_or_default()
        );
        Ok(handle)
    }

    fn write_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> GraphicsResult<()> {
        let record = self.buffers.resolve(buffer)?;
        check_buffer_write(record.usage, record.size, data.len())?;

        self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, Some(record.name));
        if record.usage == Usage::Stream {
            // Orphan so the driver doesn't stall on the previous contents
            self.gl
                .buffer_data_size(glow::COPY_WRITE_BUFFER, record.size, convert_usage(record.usage));
        }
        self.gl.buffer_sub_data(glow::COPY_WRITE_BUFFER, 0, data);
        self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, None);
        Ok(())
    }

    fn release_buffer(&mut self, buffer: BufferHandle) -> GraphicsResult<()> {
        let record = self.buffers.release(buffer)?;
        self.reclaimer.defer(GlObject::Buffer(record.name));
        log::trace!("Released buffer {:?}", buffer);
        Ok(())
    }

    fn create_sampler_state(&mut self, desc: &SamplerDesc) -> GraphicsResult<SamplerStateHandle> {
        let name = self
            .gl
            .create_sampler()
            .map_err(|reason| creation_error(ResourceKind::SamplerState, reason))?;
        upload_sampler_params(&mut self.gl, &self.caps, &mut self.border_warning, name, desc);
        upload_sampler_filter(&mut self.gl, &self.caps, &mut self.anisotropy_warning, name, desc, 1);

        let record = GlSampler {
            name,
            desc: desc.clone(),
        };
        let handle = self.samplers.allocate(record).inspect_err(|_| self.gl.delete_sampler(name))?;
        log::trace!("Created sampler state {:?} ({:?})", handle, desc.filter);
        Ok(handle)
    }

    fn update_sampler_state(&mut self, sampler: SamplerStateHandle, desc: &SamplerDesc) -> GraphicsResult<()> {
        let record = self.samplers.resolve_mut(sampler)?;
        record.desc = desc.clone();
        let name = record.name;
        upload_sampler_params(&mut self.gl, &self.caps, &mut self.border_warning, name, desc);
        upload_sampler_filter(&mut self.gl, &self.caps, &mut self.anisotropy_warning, name, desc, 1);

        for unit in 0..self.caps.texture_units as usize {
            if self.bound.samplers[unit] == Some(sampler) {
                self.refresh_sampler_filter(unit);
            }
        }
        Ok(())
    }

    fn release_sampler_state(&mut self, sampler: SamplerStateHandle) -> GraphicsResult<()> {
        let record = self.samplers.release(sampler)?;
        for bound in self.bound.samplers.iter_mut().filter(|s| **s == Some(sampler)) {
            *bound = None;
        }
        self.reclaimer.defer(GlObject::Sampler(record.name));
        log::trace!("Released sampler state {:?}", sampler);
        Ok(())
    }

    fn create_shader(&mut self, stage: ShaderStage, source: &str) -> GraphicsResult<ShaderHandle> {
        let name = self
            .gl
            .create_shader(convert_shader_stage(stage))
            .map_err(|reason| creation_error(ResourceKind::Shader, reason))?;

        if !self.gl.compile_shader(name, source) {
            let log = self.gl.shader_info_log(name);
            self.gl.delete_shader(name);
            log::error!("Failed to compile {} shader: {}", stage, log);
            return Err(GraphicsError::ShaderCompilation { stage, log });
        }

        let handle = self
            .shaders
            .allocate(GlShader { name, stage })
            .inspect_err(|_| self.gl.delete_shader(name))?;
        log::debug!("Compiled {} shader {:?}", stage, handle);
        Ok(handle)
    }

    fn release_shader(&mut self, shader: ShaderHandle) -> GraphicsResult<()> {
        let record = self.shaders.release(shader)?;
        self.reclaimer.defer(GlObject::Shader(record.name));
        log::trace!("Released shader {:?}", shader);
        Ok(())
    }

    fn create_pipeline_state(&mut self, desc: &PipelineStateDesc) -> GraphicsResult<PipelineStateHandle> {
        desc.vertex_layout.validate()?;
        let vertex = self.shaders.resolve(desc.vertex_shader)?;
        let fragment = self.shaders.resolve(desc.fragment_shader)?;
        if vertex.stage != ShaderStage::Vertex || fragment.stage != ShaderStage::Fragment {
            return Err(GraphicsError::InvalidParameter(format!(
                "pipeline needs a vertex and a fragment shader, got {} and {}",
                vertex.stage, fragment.stage
            )));
        }
        let (vertex, fragment) = (vertex.name, fragment.name);

        let program = self
            .gl
            .create_program()
            .map_err(|reason| creation_error(ResourceKind::PipelineState, reason))?;
        self.gl.attach_shader(program, vertex);
        self.gl.attach_shader(program, fragment);
        let linked = self.gl.link_program(program);
        self.gl.detach_shader(program, vertex);
        self.gl.detach_shader(program, fragment);

        if !linked {
            let log = self.gl.program_info_log(program);
            self.gl.delete_program(program);
            log::error!("Failed to link pipeline: {}", log);
            return Err(GraphicsError::PipelineLink(log));
        }

        let attributes = self
            .gl
            .active_attributes(program)
            .into_iter()
            .filter(|a| !a.name.starts_with("gl_"))
            .filter_map(|a| {
                let location = self.gl.attrib_location(program, &a.name)?;
                Some(ProgramAttribute {
                    shape: attribute_shape(a.gl_type),
                    name: a.name,
                    location,
                })
            })
            .collect::<Vec<_>>();
        if let Err(reason) = match_layout(&attributes, &desc.vertex_layout) {
            log::warn!("Pipeline vertex layout does not match its shader: {}", reason);
        }

        for (block, slot) in &desc.uniform_blocks {
            match self.gl.uniform_block_index(program, block) {
                Some(index) => self.gl.uniform_block_binding(program, index, *slot),
                None => log::warn!("Uniform block '{}' not found in program", block),
            }
        }

        if !desc.texture_units.is_empty() {
            self.gl.use_program(Some(program));
            for (sampler, unit) in &desc.texture_units {
                if !self.gl.uniform_1_i32(program, sampler, *unit as i32) {
                    log::warn!("Sampler uniform '{}' not found in program", sampler);
                }
            }
            let restore = self
                .bound
                .pipeline
                .and_then(|p| self.programs.resolve(p).ok())
                .map(|p| p.name);
            self.gl.use_program(restore);
        }

        let attribute_count = attributes.len();
        let handle = self
            .programs
            .allocate(GlProgram {
                name: program,
                attributes,
            })
            .inspect_err(|_| self.gl.delete_program(program))?;
        log::debug!("Linked pipeline {:?} ({} vertex inputs)", handle, attribute_count);
        Ok(handle)
    }

    fn release_pipeline_state(&mut self, pipeline: PipelineStateHandle) -> GraphicsResult<()> {
        let record = self.programs.release(pipeline)?;
        if self.bound.pipeline == Some(pipeline) {
            self.bound.pipeline = None;
        }
        self.reclaimer.defer(GlObject::Program(record.name));
        log::trace!("Released pipeline {:?}", pipeline);
        Ok(())
    }

    fn create_texture_2d(&mut self, desc: &Texture2DDesc) -> GraphicsResult<Texture2DHandle> {
        check_texture_data(desc, desc.data)?;
        let name = self
            .gl
            .create_texture()
            .map_err(|reason| creation_error(ResourceKind::Texture2D, reason))?;

        let (internal, format, ty) = convert_texture_format(desc.format);
        let mip_count = desc.mip_count();
        let (width, height) = (desc.width as i32, desc.height as i32);
        let data = desc.data;
        self.with_scratch_texture(name, |gl| {
            gl.tex_image_2d(glow::TEXTURE_2D, 0, internal, width, height, format, ty, data);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAX_LEVEL, mip_count as i32 - 1);
            let (min, mag) = derive_filters(Filter::Bilinear, mip_count);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MIN_FILTER, min as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_MAG_FILTER, mag as i32);
            if mip_count > 1 && data.is_some() {
                gl.generate_mipmap(glow::TEXTURE_2D);
            }
        });

        let record = GlTexture {
            name,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            usage: desc.usage,
            mip_count,
        };
        let handle = self.textures.allocate(record).inspect_err(|_| self.gl.delete_texture(name))?;
        log::trace!(
            "Created texture {:?} ({}x{} {:?}, {} mips)",
            handle,
            desc.width,
            desc.height,
            desc.format,
            mip_count
        );
        Ok(handle)
    }

    fn update_texture_2d(&mut self, texture: Texture2DHandle, data: &[u8]) -> GraphicsResult<()> {
        let record = self.textures.resolve(texture)?;
        let expected = record.width as usize * record.height as usize * record.format.bytes_per_pixel();
        check_buffer_write(record.usage, expected, data.len())?;
        if data.len() != expected {
            return Err(GraphicsError::InvalidParameter(format!(
                "texture data is {} bytes, expected {}",
                data.len(),
                expected
            )));
        }

        let (_, format, ty) = convert_texture_format(record.format);
        let (name, width, height, mip_count) = (record.name, record.width as i32, record.height as i32, record.mip_count);
        self.with_scratch_texture(name, |gl| {
            gl.tex_sub_image_2d(glow::TEXTURE_2D, 0, 0, 0, width, height, format, ty, data);
            if mip_count > 1 {
                gl.generate_mipmap(glow::TEXTURE_2D);
            }
        });
        Ok(())
    }

    fn release_texture_2d(&mut self, texture: Texture2DHandle) -> GraphicsResult<()> {
        let record = self.textures.release(texture)?;
        for bound in self.bound.textures.iter_mut().filter(|t| **t == Some(texture)) {
            *bound = None;
        }
        self.reclaimer.defer(GlObject::Texture(record.name));
        log::trace!("Released texture {:?}", texture);
        Ok(())
    }

    fn create_vertex_array(&mut self, desc: &VertexArrayDesc) -> GraphicsResult<VertexArrayHandle> {
        desc.layout.validate()?;
        let vertex_buffer = self.buffers.resolve(desc.vertex_buffer)?;
        if vertex_buffer.ty != BufferType::Vertex {
            return Err(GraphicsError::InvalidParameter(format!(
                "{:?} buffer used as a vertex buffer",
                vertex_buffer.ty
            )));
        }
        let index_name = match desc.index_buffer {
            Some(handle) => {
                let index_buffer = self.buffers.resolve(handle)?;
                if index_buffer.ty != BufferType::Index {
                    return Err(GraphicsError::InvalidParameter(format!(
                        "{:?} buffer used as an index buffer",
                        index_buffer.ty
                    )));
                }
                Some(index_buffer.name)
            }
            None => None,
        };

        let name = self
            .gl
            .create_vertex_array()
            .map_err(|reason| creation_error(ResourceKind::VertexArray, reason))?;
        // The element buffer binding is VAO state
        self.gl.bind_vertex_array(Some(name));
        self.gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, index_name);
        let restore = self
            .bound
            .vertex_array
            .and_then(|v| self.vertex_arrays.resolve(v).ok())
            .map(|v| v.name);
        self.gl.bind_vertex_array(restore);

        let record = GlVertexArray {
            name,
            vertex_buffer: desc.vertex_buffer,
            index_buffer: desc.index_buffer,
            index_format: desc.index_format,
            layout: desc.layout.clone(),
            enabled: Vec::new(),
            configured_for: None,
            rejected_for: None,
        };
        let handle = self
            .vertex_arrays
            .allocate(record)
            .inspect_err(|_| self.gl.delete_vertex_array(name))?;
        log::trace!("Created vertex array {:?} (stride {})", handle, desc.layout.stride());
        Ok(handle)
    }

    fn release_vertex_array(&mut self, vertex_array: VertexArrayHandle) -> GraphicsResult<()> {
        let record = self.vertex_arrays.release(vertex_array)?;
        if self.bound.vertex_array == Some(vertex_array) {
            self.bound.vertex_array = None;
        }
        self.reclaimer.defer(GlObject::VertexArray(record.name));
        log::trace!("Released vertex array {:?}", vertex_array);
        Ok(())
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle) -> GraphicsResult<()> {
        let name = self.vertex_arrays.resolve(vertex_array)?.name;
        if self.bound.vertex_array != Some(vertex_array) {
            self.gl.bind_vertex_array(Some(name));
            self.bound.vertex_array = Some(vertex_array);
        }
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, texture: Texture2DHandle) -> GraphicsResult<()> {
        let slot = self.check_unit(unit)?;
        let name = self.textures.resolve(texture)?.name;
        if self.bound.textures[slot] == Some(texture) {
            return Ok(());
        }
        self.select_unit(unit);
        self.gl.bind_texture(glow::TEXTURE_2D, Some(name));
        self.bound.textures[slot] = Some(texture);
        self.refresh_sampler_filter(slot);
        Ok(())
    }

    // Binding one sampler to units whose textures differ in mip count shares
    // a single filter, see refresh_sampler_filter.
    fn bind_sampler_state(&mut self, unit: u32, sampler: SamplerStateHandle) -> GraphicsResult<()> {
        let slot = self.check_unit(unit)?;
        let name = self.samplers.resolve(sampler)?.name;
        self.gl.bind_sampler(unit, Some(name));
        self.bound.samplers[slot] = Some(sampler);
        self.refresh_sampler_filter(slot);
        Ok(())
    }

    fn bind_pipeline_state(&mut self, pipeline: PipelineStateHandle) -> GraphicsResult<()> {
        let name = self.programs.resolve(pipeline)?.name;
        if self.bound.pipeline != Some(pipeline) {
            self.gl.use_program(Some(name));
            self.bound.pipeline = Some(pipeline);
        }
        Ok(())
    }

    fn bind_uniform_buffer(&mut self, slot: u32, buffer: BufferHandle) -> GraphicsResult<()> {
        let record = self.buffers.resolve(buffer)?;
        if record.ty != BufferType::Uniform {
            return Err(GraphicsError::InvalidParameter(format!(
                "{:?} buffer bound as a uniform buffer",
                record.ty
            )));
        }
        self.gl.bind_buffer_base(glow::UNIFORM_BUFFER, slot, Some(record.name));
        Ok(())
    }

    fn draw_primitives(&mut self, ty: PrimitiveType, start: u32, count: u32) -> GraphicsResult<()> {
        self.check_draw()?;
        let first = draw_param("start vertex", Some(start))?;
        let count = draw_param("vertex count", Some(count))?;
        self.sync_vertex_attributes();
        self.gl.draw_arrays(convert_primitive_type(ty), first, count);
        Ok(())
    }

    fn draw_indexed_primitives(&mut self, ty: PrimitiveType, start: u32, count: u32) -> GraphicsResult<()> {
        self.check_draw()?;
        let vao = self
            .bound
            .vertex_array
            .and_then(|v| self.vertex_arrays.resolve(v).ok())
            .ok_or_else(|| GraphicsError::InvalidParameter("draw without a bound vertex array".into()))?;
        if vao.index_buffer.is_none() {
            return Err(GraphicsError::InvalidParameter(
                "indexed draw on a vertex array without an index buffer".into(),
            ));
        }
        let format = vao.index_format;
        let offset = draw_param("index offset", start.checked_mul(format.size()))?;
        let count = draw_param("index count", Some(count))?;

        self.sync_vertex_attributes();
        self.gl
            .draw_elements(convert_primitive_type(ty), count, convert_index_format(format), offset);
        Ok(())
    }

    fn clear(&mut self, color: Color) {
        self.gl.clear_color(color.r, color.g, color.b, color.a);
        self.gl.clear(glow::COLOR_BUFFER_BIT);
    }

    fn present(&mut self) -> GraphicsResult<()> {
        for id in self.release_queue.take_all() {
            if let Err(e) = self.release(id) {
                log::warn!("Queued release of {:?} failed: {}", id, e);
            }
        }

        let expired = self.reclaimer.advance_frame();
        if !expired.is_empty() {
            log::trace!("Frame {}: deleting {} objects", self.frame, expired.len());
        }
        for object in expired {
            self.destroy(object);
        }

        self.gl.swap_buffers();
        self.frame += 1;
        Ok(())
    }

    fn on_resize(&mut self, width: u32, height: u32) -> GraphicsResult<()> {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {}x{}", width, height);
            return Ok(());
        }
        self.width = width;
        self.height = height;
        self.gl.viewport(0, 0, width as i32, height as i32);
        log::debug!("Viewport resized to {}x{}", width, height);
        Ok(())
    }

    fn release_queue(&self) -> ReleaseQueue {
        self.release_queue.clone()
    }
}

impl<A: GlApi> Drop for OpenGlDevice<A> {
    fn drop(&mut self) {
        self.gl.bind_vertex_array(None);
        self.gl.use_program(None);

        let mut objects = self.reclaimer.flush_all();
        objects.extend(self.vertex_arrays.drain().into_iter().map(|v| GlObject::VertexArray(v.name)));
        objects.extend(self.programs.drain().into_iter().map(|p| GlObject::Program(p.name)));
        objects.extend(self.shaders.drain().into_iter().map(|s| GlObject::Shader(s.name)));
        objects.extend(self.textures.drain().into_iter().map(|t| GlObject::Texture(t.name)));
        objects.extend(self.samplers.drain().into_iter().map(|s| GlObject::Sampler(s.name)));
        objects.extend(self.buffers.drain().into_iter().map(|b| GlObject::Buffer(b.name)));

        let count = objects.len();
        for object in objects {
            self.destroy(object);
        }
        log::debug!("OpenGL device destroyed ({} objects deleted)", count);
    }
}

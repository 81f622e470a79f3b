//! Direct3D 11 backend
//!
//! D3D11 objects carry their own state, so unlike the GL device nothing has to
//! be re-established behind the caller's back: binding passes the object to
//! the immediate context. Releases still go through the same two-frame
//! reclamation as OpenGL; a released record is parked and its COM references
//! are dropped two presents later.

mod api;
mod conversion;
#[cfg(windows)]
mod windows_api;

pub use api::{D3d11Api, D3dBufferDesc, D3dSamplerDesc, D3dTextureDesc, SubresourceData};
pub use conversion::{input_elements, DxgiFormat, InputElementDesc};
#[cfg(windows)]
pub use windows_api::WindowsD3d11;

use crate::backend::context::{ContextDescriptor, ContextType, GraphicsDeviceDesc};
use crate::backend::deferred::{DeferredReclaimer, ReleaseQueue};
use crate::backend::handle::*;
use crate::backend::layout::VertexLayout;
use crate::backend::slot_table::SlotTable;
use crate::backend::traits::*;
use crate::backend::types::*;
use crate::window::Window;
use conversion::*;

/// Whether this build can create Direct3D 11 devices
pub const AVAILABLE: bool = cfg!(windows);

/// Texture and sampler slots the device tracks
pub const MAX_TEXTURE_SLOTS: u32 = 8;

struct DxBuffer<A: D3d11Api> {
    buffer: A::Buffer,
    size: usize,
    usage: Usage,
    ty: BufferType,
}

struct DxSampler<A: D3d11Api> {
    state: A::SamplerState,
}

enum DxShaderObject<A: D3d11Api> {
    Vertex(A::VertexShader),
    Pixel(A::PixelShader),
}

struct DxShader<A: D3d11Api> {
    object: DxShaderObject<A>,
    /// Kept for building input layouts
    bytecode: Vec<u8>,
}

struct DxPipeline<A: D3d11Api> {
    vertex_shader: A::VertexShader,
    pixel_shader: A::PixelShader,
    input_layout: A::InputLayout,
    layout: VertexLayout,
    constant_buffers: Vec<u32>,
}

struct DxTexture<A: D3d11Api> {
    texture: A::Texture,
    width: u32,
    height: u32,
    format: TextureFormat,
    usage: Usage,
    mip_count: u32,
}

/// Buffers and layout, resolved when bound
struct DxVertexArray {
    vertex_buffer: BufferHandle,
    index_buffer: Option<BufferHandle>,
    index_format: IndexFormat,
    layout: VertexLayout,
}

/// A released record; dropping it releases the COM objects it holds
enum DxRetired<A: D3d11Api> {
    Buffer(DxBuffer<A>),
    Sampler(DxSampler<A>),
    Shader(DxShader<A>),
    Pipeline(DxPipeline<A>),
    Texture(DxTexture<A>),
}

#[derive(Default)]
struct BoundState {
    vertex_array: Option<VertexArrayHandle>,
    pipeline: Option<PipelineStateHandle>,
    /// Pipeline whose input layout is set on the context
    input_layout: Option<PipelineStateHandle>,
    /// Vertex array / pipeline pair that passed the layout check
    checked: Option<(VertexArrayHandle, PipelineStateHandle)>,
    /// Vertex array / pipeline pair whose mismatch was already reported
    rejected: Option<(VertexArrayHandle, PipelineStateHandle)>,
    samplers: [Option<SamplerStateHandle>; MAX_TEXTURE_SLOTS as usize],
}

/// Direct3D 11 implementation of [`GraphicsDevice`] over any [`D3d11Api`]
pub struct DirectXDevice<A: D3d11Api> {
    api: A,
    context: ContextDescriptor,

    buffers: SlotTable<BufferHandle, DxBuffer<A>>,
    samplers: SlotTable<SamplerStateHandle, DxSampler<A>>,
    shaders: SlotTable<ShaderHandle, DxShader<A>>,
    pipelines: SlotTable<PipelineStateHandle, DxPipeline<A>>,
    textures: SlotTable<Texture2DHandle, DxTexture<A>>,
    vertex_arrays: SlotTable<VertexArrayHandle, DxVertexArray>,

    backbuffer: Option<A::RenderTargetView>,
    bound: BoundState,
    reclaimer: DeferredReclaimer<DxRetired<A>>,
    release_queue: ReleaseQueue,

    vsync: bool,
    width: u32,
    height: u32,
    frame: u64,
}

impl<A: D3d11Api> DirectXDevice<A> {
    pub fn new(mut api: A, desc: &GraphicsDeviceDesc, width: u32, height: u32) -> GraphicsResult<Self> {
        desc.limits.validate()?;
        let requested = (desc.context.major_version, desc.context.minor_version);
        if desc.context.ty != ContextType::DirectX || !matches!(requested, (11, 0..=1)) {
            return Err(GraphicsError::InvalidParameter(format!(
                "{:?} {}.{} context requested from the Direct3D 11 backend",
                desc.context.ty, requested.0, requested.1
            )));
        }

        let backbuffer = api.create_backbuffer_view().map_err(|e| {
            log::error!("Failed to create backbuffer view: {}", e);
            GraphicsError::InitializationFailed(e)
        })?;
        api.set_render_target(Some(&backbuffer));
        api.set_viewport(width as f32, height as f32);

        let (major, minor) = api.feature_level();
        log::info!(
            "Direct3D 11 device at feature level {}.{}, {}x{}, vsync {}",
            major,
            minor,
            width,
            height,
            desc.vsync
        );

        let limits = desc.limits;
        Ok(Self {
            api,
            context: desc.context,
            buffers: SlotTable::new(limits.max_buffers),
            samplers: SlotTable::new(limits.max_sampler_states),
            shaders: SlotTable::new(limits.max_shaders),
            pipelines: SlotTable::new(limits.max_pipeline_states),
            textures: SlotTable::new(limits.max_textures),
            vertex_arrays: SlotTable::new(limits.max_vertex_arrays),
            backbuffer: Some(backbuffer),
            bound: BoundState::default(),
            reclaimer: DeferredReclaimer::new(),
            release_queue: ReleaseQueue::new(),
            vsync: desc.vsync,
            width,
            height,
            frame: 0,
        })
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Records released but not yet dropped
    pub fn pending_destruction(&self) -> usize {
        self.reclaimer.pending_count()
    }

    /// Live handles of one kind
    pub fn live_resources(&self, kind: ResourceKind) -> usize {
        match kind {
            ResourceKind::Buffer => self.buffers.len(),
            ResourceKind::SamplerState => self.samplers.len(),
            ResourceKind::Shader => self.shaders.len(),
            ResourceKind::PipelineState => self.pipelines.len(),
            ResourceKind::Texture2D => self.textures.len(),
            ResourceKind::VertexArray => self.vertex_arrays.len(),
        }
    }

    pub fn frame_index(&self) -> u64 {
        self.frame
    }

    fn check_slot(&self, slot: u32) -> GraphicsResult<()> {
        if slot < MAX_TEXTURE_SLOTS {
            Ok(())
        } else {
            Err(GraphicsError::InvalidParameter(format!(
                "texture slot {} out of range (0..{})",
                slot, MAX_TEXTURE_SLOTS
            )))
        }
    }

    /// Set the bound pipeline's input layout if the bound vertex array
    /// provides what it expects.
    fn sync_input_layout(&mut self) {
        let (Some(vertex_array), Some(pipeline)) = (self.bound.vertex_array, self.bound.pipeline) else {
            return;
        };
        let pair = Some((vertex_array, pipeline));
        if self.bound.checked == pair || self.bound.rejected == pair {
            return;
        }
        let (Ok(vao), Ok(record)) = (self.vertex_arrays.resolve(vertex_array), self.pipelines.resolve(pipeline)) else {
            return;
        };

        if let Err(reason) = match_layout(&record.layout, &vao.layout) {
            log::warn!(
                "Vertex array {:?} does not match pipeline {:?}: {}. Keeping previous input layout",
                vertex_array,
                pipeline,
                reason
            );
            self.bound.rejected = pair;
            return;
        }
        if self.bound.input_layout != Some(pipeline) {
            self.api.set_input_layout(Some(&record.input_layout));
            self.bound.input_layout = Some(pipeline);
        }
        self.bound.checked = pair;
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

/// The input layout was built with the pipeline's offsets, so every element
/// the pipeline reads must sit at the same offset with the same shape in the
/// vertex array's layout, and the strides must agree.
fn match_layout(expected: &VertexLayout, provided: &VertexLayout) -> Result<(), String> {
    if expected.stride() != provided.stride() {
        return Err(format!(
            "stride is {} in the pipeline but {} in the vertex array",
            expected.stride(),
            provided.stride()
        ));
    }
    let provided_offsets = provided.offsets();
    for (element, offset) in expected.elements().iter().zip(expected.offsets()) {
        let found = provided
            .elements()
            .iter()
            .zip(&provided_offsets)
            .find(|(e, _)| e.name == element.name);
        match found {
            Some((e, o)) if e.shader_shape() == element.shader_shape() && *o == offset => {}
            Some(_) => return Err(format!("element '{}' differs", element.name)),
            None => return Err(format!("element '{}' is missing", element.name)),
        }
    }
    Ok(())
}

fn creation_error(kind: ResourceKind, reason: String) -> GraphicsError {
    log::error!("Failed to create {}: {}", kind, reason);
    GraphicsError::ResourceCreation { kind, reason }
}

impl<A: D3d11Api> GraphicsDevice for DirectXDevice<A> {
    fn context_type(&self) -> ContextType {
        self.context.ty
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> GraphicsResult<BufferHandle> {
        check_buffer_desc(desc)?;
        let d3d_desc = buffer_desc(desc.size, desc.usage, desc.ty);

        // Initial data must cover the whole (possibly rounded up) buffer
        let initial = desc.initial_data.map(|data| {
            let mut padded = data.to_vec();
            padded.resize(d3d_desc.byte_width as usize, 0);
            padded
        });
        let buffer = self
            .api
            .create_buffer(&d3d_desc, initial.as_deref())
            .map_err(|reason| creation_error(ResourceKind::Buffer, reason))?;

        let handle = self.buffers.allocate(DxBuffer {
            buffer,
            size: desc.size,
            usage: desc.usage,
            ty: desc.ty,
        })?;
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
        self.api.write_buffer(&record.buffer, data).map_err(|e| {
            log::error!("Failed to map buffer {:?}: {}", buffer, e);
            GraphicsError::Backend(e)
        })
    }

    fn release_buffer(&mut self, buffer: BufferHandle) -> GraphicsResult<()> {
        let record = self.buffers.release(buffer)?;
        self.reclaimer.defer(DxRetired::Buffer(record));
        log::trace!("Released buffer {:?}", buffer);
        Ok(())
    }

    fn create_sampler_state(&mut self, desc: &SamplerDesc) -> GraphicsResult<SamplerStateHandle> {
        let state = self
            .api
            .create_sampler_state(&sampler_desc(desc))
            .map_err(|reason| creation_error(ResourceKind::SamplerState, reason))?;
        let handle = self.samplers.allocate(DxSampler { state })?;
        log::trace!("Created sampler state {:?} ({:?})", handle, desc.filter);
        Ok(handle)
    }

    fn update_sampler_state(&mut self, sampler: SamplerStateHandle, desc: &SamplerDesc) -> GraphicsResult<()> {
        self.samplers.resolve(sampler)?;
        // Sampler objects are immutable; swap in a new one
        let state = self
            .api
            .create_sampler_state(&sampler_desc(desc))
            .map_err(|reason| creation_error(ResourceKind::SamplerState, reason))?;
        let record = self.samplers.resolve_mut(sampler)?;
        let old = std::mem::replace(record, DxSampler { state });
        self.reclaimer.defer(DxRetired::Sampler(old));

        // Slots holding the old object must pick up the new one
        let record = self.samplers.resolve(sampler)?;
        for (slot, bound) in self.bound.samplers.iter().enumerate() {
            if *bound == Some(sampler) {
                self.api.set_sampler(slot as u32, Some(&record.state));
            }
        }
        Ok(())
    }

    fn release_sampler_state(&mut self, sampler: SamplerStateHandle) -> GraphicsResult<()> {
        let record = self.samplers.release(sampler)?;
        self.reclaimer.defer(DxRetired::Sampler(record));
        for bound in self.bound.samplers.iter_mut().filter(|b| **b == Some(sampler)) {
            *bound = None;
        }
        log::trace!("Released sampler state {:?}", sampler);
        Ok(())
    }

    fn create_shader(&mut self, stage: ShaderStage, source: &str) -> GraphicsResult<ShaderHandle> {
        let bytecode = self.api.compile_shader(stage, source).map_err(|log| {
            log::error!("Failed to compile {} shader: {}", stage, log);
            GraphicsError::ShaderCompilation { stage, log }
        })?;

        let object = match stage {
            ShaderStage::Vertex => self.api.create_vertex_shader(&bytecode).map(DxShaderObject::Vertex),
            ShaderStage::Fragment => self.api.create_pixel_shader(&bytecode).map(DxShaderObject::Pixel),
        }
        .map_err(|reason| creation_error(ResourceKind::Shader, reason))?;

        let handle = self.shaders.allocate(DxShader { object, bytecode })?;
        log::debug!("Compiled {} shader {:?}", stage, handle);
        Ok(handle)
    }

    fn release_shader(&mut self, shader: ShaderHandle) -> GraphicsResult<()> {
        let record = self.shaders.release(shader)?;
        self.reclaimer.defer(DxRetired::Shader(record));
        log::trace!("Released shader {:?}", shader);
        Ok(())
    }

    fn create_pipeline_state(&mut self, desc: &PipelineStateDesc) -> GraphicsResult<PipelineStateHandle> {
        let elements = input_elements(&desc.vertex_layout)?;
        let vertex = self.shaders.resolve(desc.vertex_shader)?;
        let pixel = self.shaders.resolve(desc.fragment_shader)?;
        let (DxShaderObject::Vertex(vertex_shader), DxShaderObject::Pixel(pixel_shader)) = (&vertex.object, &pixel.object)
        else {
            return Err(GraphicsError::InvalidParameter(
                "pipeline needs a vertex and a fragment shader".into(),
            ));
        };

        let input_layout = self
            .api
            .create_input_layout(&elements, &vertex.bytecode)
            .map_err(|log| {
                log::error!("Failed to create input layout: {}", log);
                GraphicsError::PipelineLink(log)
            })?;

        let record = DxPipeline {
            vertex_shader: vertex_shader.clone(),
            pixel_shader: pixel_shader.clone(),
            input_layout,
            layout: desc.vertex_layout.clone(),
            constant_buffers: desc.uniform_blocks.iter().map(|(_, slot)| *slot).collect(),
        };
        let handle = self.pipelines.allocate(record)?;
        log::debug!("Created pipeline {:?} ({} input elements)", handle, elements.len());
        Ok(handle)
    }

    fn release_pipeline_state(&mut self, pipeline: PipelineStateHandle) -> GraphicsResult<()> {
        let record = self.pipelines.release(pipeline)?;
        if self.bound.pipeline == Some(pipeline) {
            self.bound.pipeline = None;
        }
        if self.bound.input_layout == Some(pipeline) {
            self.bound.input_layout = None;
        }
        self.reclaimer.defer(DxRetired::Pipeline(record));
        log::trace!("Released pipeline {:?}", pipeline);
        Ok(())
    }

    fn create_texture_2d(&mut self, desc: &Texture2DDesc) -> GraphicsResult<Texture2DHandle> {
        check_texture_data(desc, desc.data)?;
        let mip_count = desc.mip_count();
        let d3d_desc = texture_desc(desc.width, desc.height, desc.format, desc.usage, mip_count);
        let upload = desc.data.map(|data| texture_upload(desc.format, desc.width, data));

        // Mipmapped textures are filled after creation, then mips generated
        let initial = match &upload {
            Some((data, row_pitch)) if mip_count == 1 => Some(SubresourceData {
                data,
                row_pitch: *row_pitch,
            }),
            _ => None,
        };
        let texture = self
            .api
            .create_texture_2d(&d3d_desc, initial)
            .map_err(|reason| creation_error(ResourceKind::Texture2D, reason))?;
        if let (Some((data, row_pitch)), true) = (&upload, mip_count > 1) {
            self.api.update_texture_2d(
                &texture,
                SubresourceData {
                    data,
                    row_pitch: *row_pitch,
                },
            );
            self.api.generate_mips(&texture);
        }

        let handle = self.textures.allocate(DxTexture {
            texture,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            usage: desc.usage,
            mip_count,
        })?;
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

        let (data, row_pitch) = texture_upload(record.format, record.width, data);
        self.api
            .update_texture_2d(&record.texture, SubresourceData { data: &data, row_pitch });
        if record.mip_count > 1 {
            self.api.generate_mips(&record.texture);
        }
        Ok(())
    }

    fn release_texture_2d(&mut self, texture: Texture2DHandle) -> GraphicsResult<()> {
        let record = self.textures.release(texture)?;
        self.reclaimer.defer(DxRetired::Texture(record));
        log::trace!("Released texture {:?}", texture);
        Ok(())
    }

    fn create_vertex_array(&mut self, desc: &VertexArrayDesc) -> GraphicsResult<VertexArrayHandle> {
        input_elements(&desc.layout)?;
        if self.buffers.resolve(desc.vertex_buffer)?.ty != BufferType::Vertex {
            return Err(GraphicsError::InvalidParameter("vertex array needs a vertex buffer".into()));
        }
        if let Some(index_buffer) = desc.index_buffer {
            if self.buffers.resolve(index_buffer)?.ty != BufferType::Index {
                return Err(GraphicsError::InvalidParameter("index buffer is not an index buffer".into()));
            }
        }

        let handle = self.vertex_arrays.allocate(DxVertexArray {
            vertex_buffer: desc.vertex_buffer,
            index_buffer: desc.index_buffer,
            index_format: desc.index_format,
            layout: desc.layout.clone(),
        })?;
        log::trace!("Created vertex array {:?} (stride {})", handle, desc.layout.stride());
        Ok(handle)
    }

    fn release_vertex_array(&mut self, vertex_array: VertexArrayHandle) -> GraphicsResult<()> {
        self.vertex_arrays.release(vertex_array)?;
        if self.bound.vertex_array == Some(vertex_array) {
            self.bound.vertex_array = None;
        }
        log::trace!("Released vertex array {:?}", vertex_array);
        Ok(())
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle) -> GraphicsResult<()> {
        let record = self.vertex_arrays.resolve(vertex_array)?;
        let vertex_buffer = self.buffers.resolve(record.vertex_buffer)?;
        let index_buffer = record.index_buffer.map(|b| self.buffers.resolve(b)).transpose()?;

        self.api
            .set_vertex_buffer(Some(&vertex_buffer.buffer), record.layout.stride());
        self.api.set_index_buffer(
            index_buffer.map(|b| &b.buffer),
            convert_index_format(record.index_format),
        );
        self.bound.vertex_array = Some(vertex_array);
        Ok(())
    }

    fn bind_texture(&mut self, unit: u32, texture: Texture2DHandle) -> GraphicsResult<()> {
        self.check_slot(unit)?;
        let record = self.textures.resolve(texture)?;
        self.api.set_texture(unit, Some(&record.texture));
        Ok(())
    }

    fn bind_sampler_state(&mut self, unit: u32, sampler: SamplerStateHandle) -> GraphicsResult<()> {
        self.check_slot(unit)?;
        let record = self.samplers.resolve(sampler)?;
        self.api.set_sampler(unit, Some(&record.state));
        self.bound.samplers[unit as usize] = Some(sampler);
        Ok(())
    }

    fn bind_pipeline_state(&mut self, pipeline: PipelineStateHandle) -> GraphicsResult<()> {
        let record = self.pipelines.resolve(pipeline)?;
        if self.bound.pipeline != Some(pipeline) {
            self.api
                .set_shaders(Some(&record.vertex_shader), Some(&record.pixel_shader));
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
        if let Some(pipeline) = self.bound.pipeline.and_then(|p| self.pipelines.resolve(p).ok()) {
            if !pipeline.constant_buffers.is_empty() && !pipeline.constant_buffers.contains(&slot) {
                log::debug!("Constant buffer slot {} is not declared by the bound pipeline", slot);
            }
        }
        self.api.set_constant_buffer(slot, Some(&record.buffer));
        Ok(())
    }

    fn draw_primitives(&mut self, ty: PrimitiveType, start: u32, count: u32) -> GraphicsResult<()> {
        self.check_draw()?;
        self.sync_input_layout();
        self.api.set_primitive_topology(convert_primitive_type(ty));
        self.api.draw(count, start);
        Ok(())
    }

    fn draw_indexed_primitives(&mut self, ty: PrimitiveType, start: u32, count: u32) -> GraphicsResult<()> {
        self.check_draw()?;
        let has_indices = self
            .bound
            .vertex_array
            .and_then(|v| self.vertex_arrays.resolve(v).ok())
            .is_some_and(|v| v.index_buffer.is_some());
        if !has_indices {
            return Err(GraphicsError::InvalidParameter(
                "indexed draw on a vertex array without an index buffer".into(),
            ));
        }
        self.sync_input_layout();
        self.api.set_primitive_topology(convert_primitive_type(ty));
        self.api.draw_indexed(count, start);
        Ok(())
    }

    fn clear(&mut self, color: Color) {
        if let Some(view) = &self.backbuffer {
            self.api.clear_render_target(view, color.to_array());
        }
    }

    fn present(&mut self) -> GraphicsResult<()> {
        for id in self.release_queue.take_all() {
            if let Err(e) = self.release(id) {
                log::warn!("Queued release of {:?} failed: {}", id, e);
            }
        }

        let expired = self.reclaimer.advance_frame();
        if !expired.is_empty() {
            log::trace!("Frame {}: releasing {} objects", self.frame, expired.len());
        }
        drop(expired);

        self.api.present(u32::from(self.vsync)).map_err(|e| {
            log::error!("Present failed: {}", e);
            GraphicsError::Backend(e)
        })?;
        self.frame += 1;
        Ok(())
    }

    fn on_resize(&mut self, width: u32, height: u32) -> GraphicsResult<()> {
        if width == 0 || height == 0 {
            log::debug!("Ignoring resize to {}x{}", width, height);
            return Ok(());
        }

        // Views must be unbound and released before the swap chain resizes
        self.api.set_render_target(None);
        drop(self.backbuffer.take());
        self.api.resize_buffers(width, height).map_err(|e| {
            log::error!("ResizeBuffers failed: {}", e);
            GraphicsError::Backend(e)
        })?;

        let view = self.api.create_backbuffer_view().map_err(|e| {
            log::error!("Failed to recreate backbuffer view: {}", e);
            GraphicsError::Backend(e)
        })?;
        self.api.set_render_target(Some(&view));
        self.backbuffer = Some(view);
        self.api.set_viewport(width as f32, height as f32);

        self.width = width;
        self.height = height;
        log::debug!("Swap chain resized to {}x{}", width, height);
        Ok(())
    }

    fn release_queue(&self) -> ReleaseQueue {
        self.release_queue.clone()
    }
}

impl<A: D3d11Api> Drop for DirectXDevice<A> {
    fn drop(&mut self) {
        self.api.set_render_target(None);
        self.api.set_shaders(None, None);
        self.api.set_input_layout(None);

        let parked = self.reclaimer.flush_all().len();
        let live = self.pipelines.drain().len()
            + self.shaders.drain().len()
            + self.textures.drain().len()
            + self.samplers.drain().len()
            + self.buffers.drain().len();
        self.vertex_arrays.drain();
        self.backbuffer = None;
        log::debug!("Direct3D 11 device destroyed ({} objects released)", parked + live);
    }
}

/// Create a device for the window's Win32 handle
#[cfg(windows)]
pub fn create_native_device(desc: &GraphicsDeviceDesc, window: &dyn Window) -> GraphicsResult<DeviceRef> {
    use raw_window_handle::RawWindowHandle;
    use std::cell::RefCell;
    use std::rc::Rc;

    let handle = window
        .handle()
        .map_err(|e| GraphicsError::InitializationFailed(e.to_string()))?;
    let hwnd = match handle.as_raw() {
        RawWindowHandle::Win32(win32) => win32.hwnd.get(),
        other => {
            return Err(GraphicsError::InitializationFailed(format!(
                "Direct3D 11 needs a Win32 window, got {:?}",
                other
            )))
        }
    };

    let api = WindowsD3d11::new(hwnd, window.width(), window.height(), desc.context.minor_version)?;
    let device = DirectXDevice::new(api, desc, window.width(), window.height())?;
    Ok(Rc::new(RefCell::new(device)))
}

#[cfg(not(windows))]
pub fn create_native_device(desc: &GraphicsDeviceDesc, _window: &dyn Window) -> GraphicsResult<DeviceRef> {
    log::error!("Direct3D 11 is only available on Windows");
    Err(GraphicsError::UnsupportedContext {
        ty: desc.context.ty,
        status: crate::backend::context::ContextStatus::NotEnabledOrSupported,
    })
}

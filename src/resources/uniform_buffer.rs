//! Uniform data with a CPU staging copy

use super::Buffer;
use crate::backend::handle::BufferHandle;
use crate::backend::layout::{ElementType, Packing, UniformLayout};
use crate::backend::traits::{DeviceRef, GraphicsError, GraphicsResult};
use crate::backend::types::{BufferDesc, BufferType, Usage};
use glam::{Mat4, Vec2, Vec3, Vec4};

/// Uniform buffer whose elements are set by name and sent with [`upload`].
///
/// Offsets follow the packing rule of the device the buffer was created on,
/// so the same [`UniformLayout`] works on every backend.
///
/// [`upload`]: UniformBuffer::upload
#[derive(Debug)]
pub struct UniformBuffer {
    buffer: Buffer,
    layout: UniformLayout,
    packing: Packing,
    offsets: Vec<u32>,
    staging: Vec<u8>,
    dirty: bool,
}

impl UniformBuffer {
    pub fn new(device: &DeviceRef, layout: UniformLayout) -> GraphicsResult<Self> {
        layout.validate()?;
        let packing = Packing::for_context(super::borrow_device(device)?.context_type());
        let size = layout.size(packing) as usize;
        let staging = vec![0u8; size];
        let buffer = Buffer::new(
            device,
            &BufferDesc::new(size, Usage::Dynamic, BufferType::Uniform).with_data(&staging),
        )?;
        log::debug!("Uniform buffer of {} bytes ({:?})", size, packing);

        Ok(Self {
            buffer,
            offsets: layout.offsets(packing),
            layout,
            packing,
            staging,
            dirty: false,
        })
    }

    pub fn handle(&self) -> BufferHandle {
        self.buffer.handle()
    }

    pub fn layout(&self) -> &UniformLayout {
        &self.layout
    }

    pub fn packing(&self) -> Packing {
        self.packing
    }

    /// Staged bytes, as they will be uploaded
    pub fn data(&self) -> &[u8] {
        &self.staging
    }

    /// Whether there are staged changes not yet uploaded
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn stage(&mut self, name: &str, ty: ElementType, count: u32, bytes: &[u8]) -> GraphicsResult<()> {
        let (index, element) = self
            .layout
            .find(name)
            .ok_or_else(|| GraphicsError::InvalidParameter(format!("no uniform named '{name}'")))?;
        let shape_matches = match ty {
            ElementType::Matrix => element.ty == ElementType::Matrix,
            _ => element.ty == ty && element.count == count,
        };
        if !shape_matches {
            return Err(GraphicsError::InvalidParameter(format!(
                "uniform '{}' is {:?}x{}, not {:?}x{}",
                name, element.ty, element.count, ty, count
            )));
        }
        if bytes.len() > element.size() as usize {
            return Err(GraphicsError::BufferOverflow {
                capacity: element.size() as usize,
                requested: bytes.len(),
            });
        }

        let offset = self.offsets[index] as usize;
        self.staging[offset..offset + bytes.len()].copy_from_slice(bytes);
        self.dirty = true;
        Ok(())
    }

    pub fn set_int(&mut self, name: &str, value: i32) -> GraphicsResult<()> {
        self.stage(name, ElementType::Int, 1, bytemuck::bytes_of(&value))
    }

    pub fn set_uint(&mut self, name: &str, value: u32) -> GraphicsResult<()> {
        self.stage(name, ElementType::UnsignedInt, 1, bytemuck::bytes_of(&value))
    }

    pub fn set_float(&mut self, name: &str, value: f32) -> GraphicsResult<()> {
        self.stage(name, ElementType::Float, 1, bytemuck::bytes_of(&value))
    }

    pub fn set_vec2(&mut self, name: &str, value: Vec2) -> GraphicsResult<()> {
        self.stage(name, ElementType::Float, 2, bytemuck::bytes_of(&value.to_array()))
    }

    pub fn set_vec3(&mut self, name: &str, value: Vec3) -> GraphicsResult<()> {
        self.stage(name, ElementType::Float, 3, bytemuck::bytes_of(&value.to_array()))
    }

    pub fn set_vec4(&mut self, name: &str, value: Vec4) -> GraphicsResult<()> {
        self.stage(name, ElementType::Float, 4, bytemuck::bytes_of(&value.to_array()))
    }

    /// Column-major; sets the first matrix of a matrix array
    pub fn set_mat4(&mut self, name: &str, value: Mat4) -> GraphicsResult<()> {
        self.stage(name, ElementType::Matrix, 1, bytemuck::bytes_of(&value.to_cols_array()))
    }

    /// Raw bytes for an element of any type, from its start
    pub fn set_bytes(&mut self, name: &str, bytes: &[u8]) -> GraphicsResult<()> {
        let (ty, count) = self
            .layout
            .find(name)
            .map(|(_, e)| (e.ty, e.count))
            .ok_or_else(|| GraphicsError::InvalidParameter(format!("no uniform named '{name}'")))?;
        self.stage(name, ty, count, bytes)
    }

    /// Send staged changes to the GPU
    pub fn upload(&mut self) -> GraphicsResult<()> {
        if self.dirty {
            self.buffer.write(&self.staging)?;
            self.dirty = false;
        }
        Ok(())
    }

    pub fn bind(&self, slot: u32) -> GraphicsResult<()> {
        self.buffer.bind_uniform(slot)
    }

    pub fn free(&mut self) {
        self.buffer.free();
    }
}

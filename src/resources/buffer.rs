//! Vertex, index and uniform buffers

use super::ResourceLink;
use crate::backend::handle::BufferHandle;
use crate::backend::traits::{DeviceRef, GraphicsResult};
use crate::backend::types::{BufferDesc, BufferType, Usage};

/// A GPU buffer released when dropped
#[derive(Debug)]
pub struct Buffer {
    link: ResourceLink,
    handle: BufferHandle,
    size: usize,
    usage: Usage,
    ty: BufferType,
}

impl Buffer {
    pub fn new(device: &DeviceRef, desc: &BufferDesc) -> GraphicsResult<Self> {
        let (handle, link) = ResourceLink::create(device, |d| d.create_buffer(desc))?;
        Ok(Self {
            link,
            handle,
            size: desc.size,
            usage: desc.usage,
            ty: desc.ty,
        })
    }

    /// Static vertex buffer holding `vertices`
    pub fn vertices<T: bytemuck::Pod>(device: &DeviceRef, vertices: &[T]) -> GraphicsResult<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        Self::new(
            device,
            &BufferDesc::new(bytes.len(), Usage::Static, BufferType::Vertex).with_data(bytes),
        )
    }

    /// Static 16-bit index buffer
    pub fn indices(device: &DeviceRef, indices: &[u16]) -> GraphicsResult<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(indices);
        Self::new(
            device,
            &BufferDesc::new(bytes.len(), Usage::Static, BufferType::Index).with_data(bytes),
        )
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn usage(&self) -> Usage {
        self.usage
    }

    pub fn buffer_type(&self) -> BufferType {
        self.ty
    }

    /// Overwrite the start of a dynamic or stream buffer
    pub fn write(&self, data: &[u8]) -> GraphicsResult<()> {
        self.link.with_device(|device| device.write_buffer(self.handle, data))
    }

    pub fn write_pod<T: bytemuck::Pod>(&self, data: &[T]) -> GraphicsResult<()> {
        self.write(bytemuck::cast_slice(data))
    }

    pub fn bind_uniform(&self, slot: u32) -> GraphicsResult<()> {
        self.link.with_device(|device| device.bind_uniform_buffer(slot, self.handle))
    }

    pub fn free(&mut self) {
        self.link.free();
    }
}

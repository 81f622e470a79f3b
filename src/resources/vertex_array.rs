//! Vertex arrays

use super::{Buffer, ResourceLink};
use crate::backend::handle::VertexArrayHandle;
use crate::backend::layout::VertexLayout;
use crate::backend::traits::{DeviceRef, GraphicsResult};
use crate::backend::types::{IndexFormat, PrimitiveType, VertexArrayDesc};

/// Vertex buffer, optional index buffer and the layout of the vertex data.
///
/// The buffers must stay alive for as long as the vertex array is drawn.
#[derive(Debug)]
pub struct VertexArray {
    link: ResourceLink,
    handle: VertexArrayHandle,
    layout: VertexLayout,
    indexed: bool,
}

impl VertexArray {
    pub fn new(
        device: &DeviceRef,
        vertices: &Buffer,
        indices: Option<(&Buffer, IndexFormat)>,
        layout: VertexLayout,
    ) -> GraphicsResult<Self> {
        let mut desc = VertexArrayDesc::new(vertices.handle(), layout);
        if let Some((buffer, format)) = indices {
            desc = desc.with_index_buffer(buffer.handle(), format);
        }
        let (handle, link) = ResourceLink::create(device, |d| d.create_vertex_array(&desc))?;
        Ok(Self {
            link,
            handle,
            layout: desc.layout,
            indexed: indices.is_some(),
        })
    }

    pub fn handle(&self) -> VertexArrayHandle {
        self.handle
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed
    }

    pub fn bind(&self) -> GraphicsResult<()> {
        self.link.with_device(|device| device.bind_vertex_array(self.handle))
    }

    /// Bind and draw `count` vertices (or indices, if indexed) from `start`.
    /// A pipeline must already be bound.
    pub fn draw(&self, ty: PrimitiveType, start: u32, count: u32) -> GraphicsResult<()> {
        let indexed = self.indexed;
        self.link.with_device(|device| {
            device.bind_vertex_array(self.handle)?;
            if indexed {
                device.draw_indexed_primitives(ty, start, count)
            } else {
                device.draw_primitives(ty, start, count)
            }
        })
    }

    pub fn free(&mut self) {
        self.link.free();
    }
}

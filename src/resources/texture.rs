//! 2D textures and CPU-side pixel data

use super::ResourceLink;
use crate::backend::handle::Texture2DHandle;
use crate::backend::traits::{DeviceRef, GraphicsError, GraphicsResult};
use crate::backend::types::{Texture2DDesc, TextureFormat, Usage};

/// Pixel data ready for upload
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
}

impl TextureData {
    pub fn new(width: u32, height: u32, format: TextureFormat, data: Vec<u8>) -> GraphicsResult<Self> {
        let expected = width as usize * height as usize * format.bytes_per_pixel();
        if data.len() != expected {
            return Err(GraphicsError::InvalidParameter(format!(
                "{width}x{height} {format:?} image needs {expected} bytes, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// 1x1 RGBA image
    pub fn solid_color(color: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8,
            data: color.to_vec(),
        }
    }

    pub fn white() -> Self {
        Self::solid_color([255, 255, 255, 255])
    }

    /// RGBA checkerboard with 8x8 pixel cells
    pub fn checkerboard(size: u32, color1: [u8; 4], color2: [u8; 4]) -> Self {
        let mut data = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let color = if ((x / 8) + (y / 8)) % 2 == 0 { color1 } else { color2 };
                data.extend_from_slice(&color);
            }
        }
        Self {
            width: size,
            height: size,
            format: TextureFormat::Rgba8,
            data,
        }
    }

    pub fn desc(&self) -> Texture2DDesc<'_> {
        Texture2DDesc::new(self.width, self.height, self.format).with_data(&self.data)
    }
}

#[derive(Debug)]
pub struct Texture2D {
    link: ResourceLink,
    handle: Texture2DHandle,
    width: u32,
    height: u32,
    format: TextureFormat,
    usage: Usage,
    mip_count: u32,
}

impl Texture2D {
    pub fn new(device: &DeviceRef, desc: &Texture2DDesc) -> GraphicsResult<Self> {
        let (handle, link) = ResourceLink::create(device, |d| d.create_texture_2d(desc))?;
        Ok(Self {
            link,
            handle,
            width: desc.width,
            height: desc.height,
            format: desc.format,
            usage: desc.usage,
            mip_count: desc.mip_count(),
        })
    }

    /// Static texture from `data`, with a full mip chain if `mipmaps`
    pub fn from_data(device: &DeviceRef, data: &TextureData, mipmaps: bool) -> GraphicsResult<Self> {
        let desc = data.desc();
        let desc = if mipmaps { desc.with_mipmaps() } else { desc };
        Self::new(device, &desc)
    }

    pub fn handle(&self) -> Texture2DHandle {
        self.handle
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }

    pub fn mip_count(&self) -> u32 {
        self.mip_count
    }

    /// Replace the full level 0 image of a non-static texture
    pub fn update(&self, data: &[u8]) -> GraphicsResult<()> {
        if self.usage == Usage::Static {
            return Err(GraphicsError::StaticBufferWrite);
        }
        self.link
            .with_device(|device| device.update_texture_2d(self.handle, data))
    }

    pub fn bind(&self, unit: u32) -> GraphicsResult<()> {
        self.link.with_device(|device| device.bind_texture(unit, self.handle))
    }

    pub fn free(&mut self) {
        self.link.free();
    }
}

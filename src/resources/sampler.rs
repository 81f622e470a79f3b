//! Sampler states

use super::ResourceLink;
use crate::backend::handle::SamplerStateHandle;
use crate::backend::traits::{DeviceRef, GraphicsResult};
use crate::backend::types::SamplerDesc;

#[derive(Debug)]
pub struct SamplerState {
    link: ResourceLink,
    handle: SamplerStateHandle,
    desc: SamplerDesc,
}

impl SamplerState {
    pub fn new(device: &DeviceRef, desc: SamplerDesc) -> GraphicsResult<Self> {
        let (handle, link) = ResourceLink::create(device, |d| d.create_sampler_state(&desc))?;
        Ok(Self {
            link,
            handle,
            desc,
        })
    }

    pub fn handle(&self) -> SamplerStateHandle {
        self.handle
    }

    pub fn desc(&self) -> &SamplerDesc {
        &self.desc
    }

    /// Replace the sampler parameters, keeping the handle
    pub fn update(&mut self, desc: SamplerDesc) -> GraphicsResult<()> {
        self.link
            .with_device(|device| device.update_sampler_state(self.handle, &desc))?;
        self.desc = desc;
        Ok(())
    }

    pub fn bind(&self, unit: u32) -> GraphicsResult<()> {
        self.link.with_device(|device| device.bind_sampler_state(unit, self.handle))
    }

    pub fn free(&mut self) {
        self.link.free();
    }
}

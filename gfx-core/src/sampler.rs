//! Sampler resource (spec.md §3: "native sampler"). No cache, no
//! back-references — the simplest resource in the system.

use std::rc::{Rc, Weak};

use ash::vk;
use types::{AddressMode, CompareFunction, FilterMode};

use crate::device::Device;
use crate::error::GfxResult;
use crate::handle::Handle;

pub struct SamplerDescriptor {
    pub label: Option<String>,
    pub address_mode_u: AddressMode,
    pub address_mode_v: AddressMode,
    pub address_mode_w: AddressMode,
    pub mag_filter: FilterMode,
    pub min_filter: FilterMode,
    pub mipmap_filter: FilterMode,
    pub lod_min_clamp: f32,
    pub lod_max_clamp: f32,
    pub compare: Option<CompareFunction>,
    pub anisotropy_clamp: u16,
}

pub struct Sampler {
    raw: vk::Sampler,
    device: Weak<Device>,
}

impl Sampler {
    pub(crate) fn new(device: &Rc<Device>, desc: &SamplerDescriptor) -> GfxResult<Handle<Self>> {
        let mut create_info = vk::SamplerCreateInfo::default()
            .mag_filter(hal::conv::map_filter_mode(desc.mag_filter))
            .min_filter(hal::conv::map_filter_mode(desc.min_filter))
            .mipmap_mode(hal::conv::map_mipmap_mode(desc.mipmap_filter))
            .address_mode_u(hal::conv::map_address_mode(desc.address_mode_u))
            .address_mode_v(hal::conv::map_address_mode(desc.address_mode_v))
            .address_mode_w(hal::conv::map_address_mode(desc.address_mode_w))
            .min_lod(desc.lod_min_clamp)
            .max_lod(desc.lod_max_clamp)
            .anisotropy_enable(desc.anisotropy_clamp > 1)
            .max_anisotropy(desc.anisotropy_clamp as f32);
        if let Some(compare) = desc.compare {
            create_info = create_info.compare_enable(true).compare_op(hal::conv::map_compare_function(compare));
        }

        let raw = unsafe { device.raw().create_sampler(&create_info, None) }
            .map_err(|e| crate::error::GfxError::from(hal::HalError::from(e)))?;

        Ok(Handle::new(Self { raw, device: Rc::downgrade(device) }))
    }

    pub fn raw(&self) -> vk::Sampler {
        self.raw
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        let Some(device) = self.device.upgrade() else { return };
        unsafe { device.raw().destroy_sampler(self.raw, None) };
    }
}

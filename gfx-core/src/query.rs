//! QuerySet resource (spec.md §3): "native query pool + type".

use std::rc::{Rc, Weak};

use ash::vk;
use types::QueryType;

use crate::device::Device;
use crate::error::GfxResult;
use crate::handle::Handle;

pub struct QuerySet {
    raw: vk::QueryPool,
    ty: QueryType,
    count: u32,
    device: Weak<Device>,
}

impl QuerySet {
    pub(crate) fn new(device: &Rc<Device>, ty: QueryType, count: u32) -> GfxResult<Handle<Self>> {
        let query_type = match ty {
            QueryType::Occlusion => vk::QueryType::OCCLUSION,
            QueryType::Timestamp => vk::QueryType::TIMESTAMP,
        };
        let create_info = vk::QueryPoolCreateInfo::default().query_type(query_type).query_count(count);
        let raw = unsafe { device.raw().create_query_pool(&create_info, None) }
            .map_err(|e| crate::error::GfxError::from(hal::HalError::from(e)))?;
        Ok(Handle::new(Self { raw, ty, count, device: Rc::downgrade(device) }))
    }

    pub fn raw(&self) -> vk::QueryPool {
        self.raw
    }

    pub fn ty(&self) -> QueryType {
        self.ty
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

impl Drop for QuerySet {
    fn drop(&mut self) {
        let Some(device) = self.device.upgrade() else { return };
        unsafe { device.raw().destroy_query_pool(self.raw, None) };
    }
}

//! Physical-device handle returned by [`crate::instance::Instance::request_adapter`].
//! Thin wrapper over [`hal::Adapter`] that also keeps the owning
//! instance alive, since creating a device needs both the instance's
//! `ash::Instance` and `ash::Entry`.

use std::rc::Rc;

use crate::device::Device;
use crate::error::GfxResult;

pub struct Adapter {
    instance: Rc<hal::Instance>,
    raw: hal::Adapter,
}

impl Adapter {
    pub(crate) fn new(instance: Rc<hal::Instance>, raw: hal::Adapter) -> Self {
        Self { instance, raw }
    }

    pub fn name(&self) -> String {
        self.raw.name()
    }

    /// Creates the logical device (spec.md §6 `request_device`). Like
    /// `request_adapter`, this is synchronous here — see
    /// [`crate::instance::Instance::request_adapter`] for why.
    pub fn request_device(&self) -> GfxResult<Rc<Device>> {
        Device::new(&self.instance, &self.raw)
    }
}

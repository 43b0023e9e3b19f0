//! Physical-device wrapper. Caches queue-family indices and memory
//! properties once at enumeration time (spec.md §3: "Adapter — wraps a
//! physical device; caches queue-family indices...and memory
//! properties").

use ash::vk;

use crate::device::Device;
use crate::HalResult;

#[derive(Debug, Clone, Copy, Default)]
pub struct QueueFamilies {
    pub graphics: Option<u32>,
    pub compute: Option<u32>,
    pub transfer: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilies {
    /// The spec only asks for up to three native queues (graphics,
    /// compute, present), possibly aliased (spec.md §3 Queue entity).
    /// We always resolve a single combined queue family when one
    /// supports graphics+compute+transfer, which is the common case on
    /// desktop GPUs, falling back to separate families otherwise.
    fn resolve(properties: &[vk::QueueFamilyProperties]) -> Self {
        let mut families = Self::default();
        for (index, props) in properties.iter().enumerate() {
            let index = index as u32;
            let flags = props.queue_flags;
            if families.graphics.is_none() && flags.contains(vk::QueueFlags::GRAPHICS) {
                families.graphics = Some(index);
            }
            if families.compute.is_none() && flags.contains(vk::QueueFlags::COMPUTE) {
                families.compute = Some(index);
            }
            if families.transfer.is_none() && flags.contains(vk::QueueFlags::TRANSFER) {
                families.transfer = Some(index);
            }
        }
        // present is resolved against a concrete surface later, defaults to graphics
        families.present = families.graphics;
        families
    }
}

pub struct Adapter {
    pub(crate) raw: vk::PhysicalDevice,
    pub(crate) queue_families: QueueFamilies,
    pub(crate) memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub(crate) properties: vk::PhysicalDeviceProperties,
}

impl Adapter {
    pub(crate) fn new(instance: &ash::Instance, raw: vk::PhysicalDevice) -> Self {
        let queue_family_properties =
            unsafe { instance.get_physical_device_queue_family_properties(raw) };
        let memory_properties = unsafe { instance.get_physical_device_memory_properties(raw) };
        let properties = unsafe { instance.get_physical_device_properties(raw) };
        Self {
            raw,
            queue_families: QueueFamilies::resolve(&queue_family_properties),
            memory_properties,
            properties,
        }
    }

    pub fn name(&self) -> String {
        let raw = &self.properties.device_name;
        let bytes: Vec<u8> = raw.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    pub fn queue_families(&self) -> QueueFamilies {
        self.queue_families
    }

    /// Creates the logical device and its single combined queue.
    /// Failure here is one of the fatal errors of spec.md §7.
    pub fn request_device(
        &self,
        instance: &ash::Instance,
        entry: &ash::Entry,
    ) -> HalResult<Device> {
        Device::new(instance, entry, self)
    }
}

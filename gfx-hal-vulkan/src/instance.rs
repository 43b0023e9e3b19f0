//! Instance creation, validation-layer selection, and the debug
//! messenger. Grounded on `wgpu-hal::vulkan::{InstanceShared, Instance,
//! DebugUtils, DebugUtilsMessengerUserData}`.

use std::ffi::{c_void, CStr, CString};

use ash::vk;

use crate::{adapter::Adapter, HalError, HalResult};

struct DebugUtils {
    extension: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

pub struct Instance {
    pub(crate) entry: ash::Entry,
    pub(crate) raw: ash::Instance,
    debug_utils: Option<DebugUtils>,
}

unsafe extern "system" fn debug_utils_messenger_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    let message = unsafe { CStr::from_ptr((*callback_data).p_message) }.to_string_lossy();
    let level = if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::Level::Error
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::Level::Warn
    } else {
        log::Level::Info
    };
    log::log!(level, "[{:?}] {}", message_type, message);
    vk::FALSE
}

impl Instance {
    /// Creates the native instance. Returns `Err` only for a loader
    /// init failure or unsupported required extension; per spec.md §7
    /// this is one of the fatal errors that trap in debug builds at the
    /// `gfx-core` boundary and return null in release builds.
    ///
    /// `requested_layers` comes from a
    /// `types::InstanceLayerSelection` chained struct (spec.md §6): a
    /// layer name is only enabled if the runtime reports it available.
    pub fn new(app_name: &str, requested_layers: &[String], enable_debug: bool) -> HalResult<Self> {
        let entry = unsafe { ash::Entry::load() }.map_err(|e| {
            log::error!("failed to load Vulkan loader: {e}");
            HalError::Allocation("loader init failure".into())
        })?;

        let available_layers = unsafe { entry.enumerate_instance_layer_properties() }
            .map_err(HalError::from)?;
        let mut enabled_layers = Vec::new();
        let mut layer_cstrings = Vec::new();
        for requested in requested_layers {
            let available = available_layers.iter().any(|l| {
                let name = unsafe { CStr::from_ptr(l.layer_name.as_ptr()) };
                name.to_string_lossy() == *requested
            });
            if available {
                layer_cstrings.push(CString::new(requested.as_str()).unwrap());
            } else {
                log::warn!("requested instance layer {requested} not available, skipping");
            }
        }
        for c in &layer_cstrings {
            enabled_layers.push(c.as_ptr());
        }

        let mut extensions: Vec<&CStr> = vec![ash::khr::surface::NAME];
        #[cfg(target_os = "linux")]
        {
            extensions.push(ash::khr::xlib_surface::NAME);
            extensions.push(ash::khr::wayland_surface::NAME);
        }
        #[cfg(target_os = "windows")]
        extensions.push(ash::khr::win32_surface::NAME);
        if enable_debug {
            extensions.push(ash::ext::debug_utils::NAME);
        }
        let extension_ptrs: Vec<_> = extensions.iter().map(|e| e.as_ptr()).collect();

        let app_name_c = CString::new(app_name).unwrap();
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name_c)
            .api_version(vk::API_VERSION_1_2);

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&enabled_layers)
            .enabled_extension_names(&extension_ptrs);

        let raw = unsafe { entry.create_instance(&create_info, None) }.map_err(|e| {
            log::error!("vkCreateInstance failed: {e:?}");
            HalError::from(e)
        })?;

        let debug_utils = if enable_debug {
            let extension = ash::ext::debug_utils::Instance::new(&entry, &raw);
            let messenger_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                .message_severity(
                    vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
                        | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
                )
                .message_type(
                    vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                )
                .pfn_user_callback(Some(debug_utils_messenger_callback));
            let messenger =
                unsafe { extension.create_debug_utils_messenger(&messenger_info, None) }
                    .map_err(HalError::from)?;
            Some(DebugUtils { extension, messenger })
        } else {
            None
        };

        Ok(Self { entry, raw, debug_utils })
    }

    pub fn raw(&self) -> &ash::Instance {
        &self.raw
    }

    pub fn entry(&self) -> &ash::Entry {
        &self.entry
    }

    pub fn enumerate_adapters(&self) -> HalResult<Vec<Adapter>> {
        let physical_devices =
            unsafe { self.raw.enumerate_physical_devices() }.map_err(HalError::from)?;
        Ok(physical_devices
            .into_iter()
            .map(|raw| Adapter::new(&self.raw, raw))
            .collect())
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            if let Some(debug_utils) = self.debug_utils.take() {
                debug_utils
                    .extension
                    .destroy_debug_utils_messenger(debug_utils.messenger, None);
            }
            self.raw.destroy_instance(None);
        }
    }
}

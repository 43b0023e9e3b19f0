//! Window surface and swapchain. Grounded on
//! `wgpu-hal::vulkan::{Surface, Swapchain}` and surface.rs's
//! `configure`/`unconfigure`/`acquire_texture` shape; simplified to a
//! single in-flight swapchain state behind a `parking_lot::RwLock`
//! since, unlike the teacher, reconfiguration here always happens from
//! the single thread that owns the device (spec.md §5).

use ash::vk;
use parking_lot::RwLock;
use types::{SurfaceCapabilities, SurfaceConfiguration, SurfaceSource};

use crate::conv;
use crate::device::Device;
use crate::instance::Instance;
use crate::{HalError, HalResult};

struct SwapchainState {
    raw: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    surface_semaphores: Vec<vk::Semaphore>,
    next_surface_index: usize,
    config: SurfaceConfiguration,
}

pub struct Surface {
    raw: vk::SurfaceKHR,
    surface_fn: ash::khr::surface::Instance,
    swapchain_fn: Option<ash::khr::swapchain::Device>,
    swapchain: RwLock<Option<SwapchainState>>,
}

pub struct AcquiredImage {
    pub index: u32,
    pub image: vk::Image,
    pub image_view: vk::ImageView,
    pub suboptimal: bool,
    /// Signalled once the image is actually available; the caller's
    /// next submit against this image must wait on it.
    pub wait_semaphore: vk::Semaphore,
}

impl Surface {
    /// Creates the native surface from a [`SurfaceSource`]. Only Xlib,
    /// Wayland and Win32 are wired up to their native
    /// `vkCreate*SurfaceKHR` calls; the other variants are reserved for
    /// platforms this backend does not build on.
    pub fn new(instance: &Instance, source: &SurfaceSource) -> HalResult<Self> {
        let surface_fn = ash::khr::surface::Instance::new(&instance.entry, &instance.raw);
        let raw = unsafe {
            match source {
                #[cfg(target_os = "linux")]
                SurfaceSource::Xlib { display, window } => {
                    let xlib_fn =
                        ash::khr::xlib_surface::Instance::new(&instance.entry, &instance.raw);
                    let create_info = vk::XlibSurfaceCreateInfoKHR::default()
                        .dpy(*display as *mut vk::Display)
                        .window(*window as vk::Window);
                    xlib_fn.create_xlib_surface(&create_info, None)
                }
                #[cfg(target_os = "linux")]
                SurfaceSource::Wayland { display, surface } => {
                    let wayland_fn =
                        ash::khr::wayland_surface::Instance::new(&instance.entry, &instance.raw);
                    let create_info = vk::WaylandSurfaceCreateInfoKHR::default()
                        .display(*display)
                        .surface(*surface);
                    wayland_fn.create_wayland_surface(&create_info, None)
                }
                #[cfg(target_os = "windows")]
                SurfaceSource::Win32 { hinstance, hwnd } => {
                    let win32_fn =
                        ash::khr::win32_surface::Instance::new(&instance.entry, &instance.raw);
                    let create_info = vk::Win32SurfaceCreateInfoKHR::default()
                        .hinstance(*hinstance)
                        .hwnd(*hwnd);
                    win32_fn.create_win32_surface(&create_info, None)
                }
                _ => return Err(HalError::Allocation("unsupported surface source on this platform".into())),
            }
        }
        .map_err(HalError::from)?;

        Ok(Self { raw, surface_fn, swapchain_fn: None, swapchain: RwLock::new(None) })
    }

    pub fn capabilities(&self, adapter_raw: vk::PhysicalDevice) -> HalResult<SurfaceCapabilities> {
        let caps = unsafe {
            self.surface_fn
                .get_physical_device_surface_capabilities(adapter_raw, self.raw)
        }
        .map_err(HalError::from)?;
        Ok(SurfaceCapabilities {
            min_image_count: caps.min_image_count,
            max_image_count: caps.max_image_count,
            current_width: caps.current_extent.width,
            current_height: caps.current_extent.height,
            min_width: caps.min_image_extent.width,
            min_height: caps.min_image_extent.height,
            max_width: caps.max_image_extent.width,
            max_height: caps.max_image_extent.height,
        })
    }

    /// (Re)creates the swapchain. Any previously acquired images must
    /// not be referenced after this call; the caller (gfx-core) is
    /// required to have waited for their work to finish first, per
    /// spec.md §4.8.
    pub fn configure(
        &mut self,
        instance: &ash::Instance,
        device: &Device,
        config: &SurfaceConfiguration,
    ) -> HalResult<()> {
        let swapchain_fn = self
            .swapchain_fn
            .get_or_insert_with(|| ash::khr::swapchain::Device::new(instance, device.raw()));

        let old_swapchain = self.swapchain.write().take();
        let old_raw = old_swapchain.as_ref().map(|s| s.raw).unwrap_or(vk::SwapchainKHR::null());
        if let Some(old) = &old_swapchain {
            let _ = unsafe { device.raw().device_wait_idle() };
            for semaphore in &old.surface_semaphores {
                unsafe { device.raw().destroy_semaphore(*semaphore, None) };
            }
            for view in &old.image_views {
                unsafe { device.raw().destroy_image_view(*view, None) };
            }
        }

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.raw)
            .min_image_count(config.image_count)
            .image_format(conv::map_texture_format(config.format))
            .image_color_space(vk::ColorSpaceKHR::SRGB_NONLINEAR)
            .image_extent(vk::Extent2D { width: config.width, height: config.height })
            .image_array_layers(1)
            .image_usage(conv::map_texture_usage(config.usage))
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(vk::SurfaceTransformFlagsKHR::IDENTITY)
            .composite_alpha(conv::map_composite_alpha(config.alpha_mode))
            .present_mode(conv::map_present_mode(config.present_mode))
            .clipped(true)
            .old_swapchain(old_raw);

        let raw = unsafe { swapchain_fn.create_swapchain(&create_info, None) }
            .map_err(HalError::from)?;

        if old_raw != vk::SwapchainKHR::null() {
            unsafe { swapchain_fn.destroy_swapchain(old_raw, None) };
        }

        let images = unsafe { swapchain_fn.get_swapchain_images(raw) }.map_err(HalError::from)?;
        let format = conv::map_texture_format(config.format);
        let mut image_views = Vec::with_capacity(images.len());
        let mut surface_semaphores = Vec::with_capacity(images.len());
        for image in &images {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(*image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            let view = unsafe { device.raw().create_image_view(&view_info, None) }
                .map_err(HalError::from)?;
            image_views.push(view);
            let semaphore =
                unsafe { device.raw().create_semaphore(&vk::SemaphoreCreateInfo::default(), None) }
                    .map_err(HalError::from)?;
            surface_semaphores.push(semaphore);
        }

        *self.swapchain.write() = Some(SwapchainState {
            raw,
            images,
            image_views,
            surface_semaphores,
            next_surface_index: 0,
            config: config.clone(),
        });
        Ok(())
    }

    pub fn unconfigure(&mut self, device: &Device) {
        if let Some(state) = self.swapchain.write().take() {
            let _ = unsafe { device.raw().device_wait_idle() };
            for semaphore in &state.surface_semaphores {
                unsafe { device.raw().destroy_semaphore(*semaphore, None) };
            }
            for view in &state.image_views {
                unsafe { device.raw().destroy_image_view(*view, None) };
            }
            if let Some(swapchain_fn) = &self.swapchain_fn {
                unsafe { swapchain_fn.destroy_swapchain(state.raw, None) };
            }
        }
    }

    /// Acquires the next swapchain image, blocking up to `timeout_ns`.
    pub fn acquire_texture(&self, timeout_ns: u64) -> HalResult<Option<AcquiredImage>> {
        let swapchain_fn = self
            .swapchain_fn
            .as_ref()
            .ok_or_else(|| HalError::Allocation("surface not configured".into()))?;
        let mut guard = self.swapchain.write();
        let state = guard
            .as_mut()
            .ok_or_else(|| HalError::Allocation("surface not configured".into()))?;

        let wait_semaphore = state.surface_semaphores[state.next_surface_index];
        let result = unsafe {
            swapchain_fn.acquire_next_image(state.raw, timeout_ns, wait_semaphore, vk::Fence::null())
        };
        let (index, suboptimal) = match result {
            Ok(pair) => pair,
            Err(vk::Result::TIMEOUT) => return Ok(None),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => return Err(HalError::SurfaceOutdated),
            Err(vk::Result::ERROR_SURFACE_LOST_KHR) => return Err(HalError::SurfaceLost),
            Err(other) => return Err(HalError::from(other)),
        };
        state.next_surface_index = (state.next_surface_index + 1) % state.surface_semaphores.len();

        Ok(Some(AcquiredImage {
            index,
            image: state.images[index as usize],
            image_view: state.image_views[index as usize],
            suboptimal,
            wait_semaphore,
        }))
    }

    pub fn raw_swapchain(&self) -> Option<vk::SwapchainKHR> {
        self.swapchain.read().as_ref().map(|s| s.raw)
    }

    pub fn config(&self) -> Option<SurfaceConfiguration> {
        self.swapchain.read().as_ref().map(|s| s.config.clone())
    }

    pub unsafe fn destroy(&mut self, device: &Device) {
        self.unconfigure(device);
        self.surface_fn.destroy_surface(self.raw, None);
    }
}

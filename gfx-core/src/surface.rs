//! Core-layer swapchain wrapper (spec.md §4.8). `configure` clamps the
//! requested size into the device's reported bounds and records every
//! swapchain image as a `Texture` so the rest of the system never has
//! to special-case a presentable image.

use std::cell::RefCell;
use std::rc::Rc;

use types::{Extent3d, SurfaceConfiguration, SurfaceSource};

use crate::device::Device;
use crate::error::{GfxError, GfxResult};
use crate::handle::Handle;
use crate::texture::{Texture, TextureView, TextureViewDescriptor};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceStatus {
    Optimal,
    Suboptimal,
    Timeout,
    Outdated,
    Lost,
}

pub struct SurfaceTexture {
    pub texture: Handle<Texture>,
    pub status: SurfaceStatus,
}

pub struct Surface {
    raw: RefCell<hal::Surface>,
    device: Rc<Device>,
    /// Swapchain images seen so far, recorded as non-owning `Texture`s
    /// (spec.md §4.8: "records every image as a Texture"). Lazily
    /// populated on first acquire since the hal layer returns one image
    /// at a time.
    images: RefCell<Vec<Handle<Texture>>>,
    current_index: RefCell<Option<u32>>,
    /// Semaphore the most recent acquire signalled; the next submit
    /// against the acquired image must wait on it (spec.md §4.7 step 3).
    acquire_semaphore: RefCell<Option<ash::vk::Semaphore>>,
}

impl Surface {
    pub(crate) fn new(device: &Rc<Device>, source: &SurfaceSource) -> GfxResult<Self> {
        let raw = hal::Surface::new(device.hal_instance(), source).map_err(GfxError::from)?;
        Ok(Self {
            raw: RefCell::new(raw),
            device: device.clone(),
            images: RefCell::new(Vec::new()),
            current_index: RefCell::new(None),
            acquire_semaphore: RefCell::new(None),
        })
    }

    /// Clamps `config`'s size to the device's reported bounds, picks
    /// `image_count = clamp(min+1, min, max)` (spec.md §4.8).
    pub fn configure(&self, config: &SurfaceConfiguration) -> GfxResult<()> {
        let caps = self.raw.borrow().capabilities(self.device.physical_device()).map_err(GfxError::from)?;
        let mut clamped = config.clone();
        clamped.width = clamped.width.clamp(caps.min_width.max(1), caps.max_width.max(caps.min_width.max(1)));
        clamped.height = clamped.height.clamp(caps.min_height.max(1), caps.max_height.max(caps.min_height.max(1)));
        let desired = caps.min_image_count + 1;
        let max = if caps.max_image_count == 0 { desired } else { caps.max_image_count };
        clamped.image_count = desired.clamp(caps.min_image_count, max);

        self.device.wait_idle()?;
        self.raw.borrow_mut().configure(self.device.instance_raw(), &self.device, &clamped).map_err(GfxError::from)?;
        self.images.borrow_mut().clear();
        Ok(())
    }

    pub fn unconfigure(&self) {
        self.raw.borrow_mut().unconfigure(&self.device);
        self.images.borrow_mut().clear();
    }

    /// Acquires the next image using the current frame's
    /// acquire-semaphore; reports *optimal/suboptimal/timeout/outdated/
    /// lost* from the acquisition result (spec.md §4.8).
    pub fn get_current_texture(&self) -> GfxResult<SurfaceTexture> {
        match self.raw.borrow().acquire_texture(u64::MAX) {
            Ok(Some(acquired)) => {
                let config = self.raw.borrow().config();
                let format = config.as_ref().map(|c| c.format).unwrap_or_default();
                let size = config
                    .map(|c| Extent3d { width: c.width, height: c.height, depth_or_array_layers: 1 })
                    .unwrap_or(Extent3d { width: 1, height: 1, depth_or_array_layers: 1 });
                let texture = Texture::from_swapchain_image(&self.device, acquired.image, format, size);
                *self.current_index.borrow_mut() = Some(acquired.index);
                *self.acquire_semaphore.borrow_mut() = Some(acquired.wait_semaphore);
                self.images.borrow_mut().push(texture.clone());
                Ok(SurfaceTexture {
                    texture,
                    status: if acquired.suboptimal { SurfaceStatus::Suboptimal } else { SurfaceStatus::Optimal },
                })
            }
            Ok(None) => Err(GfxError::Internal("swapchain acquire timed out".into())),
            Err(hal::HalError::SurfaceOutdated) => {
                Err(GfxError::Validation("swapchain out of date, reconfigure required".into()))
            }
            Err(hal::HalError::SurfaceLost) => Err(GfxError::Lost),
            Err(e) => Err(GfxError::from(e)),
        }
    }

    pub fn current_view(&self, texture: &Handle<Texture>) -> GfxResult<Handle<TextureView>> {
        Texture::create_view(
            texture,
            TextureViewDescriptor {
                format: texture.borrow().format,
                dimension: types::TextureViewDimension::D2,
                range: types::SubresourceRange::default(),
            },
        )
    }

    pub fn raw_swapchain(&self) -> Option<ash::vk::SwapchainKHR> {
        self.raw.borrow().raw_swapchain()
    }

    pub fn current_index(&self) -> Option<u32> {
        *self.current_index.borrow()
    }

    /// Takes the wait semaphore the most recent acquire signalled,
    /// so a single acquire is consumed by exactly one submit.
    pub(crate) fn take_acquire_semaphore(&self) -> Option<ash::vk::Semaphore> {
        self.acquire_semaphore.borrow_mut().take()
    }
}

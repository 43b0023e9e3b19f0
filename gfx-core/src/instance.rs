//! Root entity (spec.md §3): "owns the native instance handle, debug
//! messenger, and a process-wide map `FutureId → FutureRecord`." The
//! native instance handle and debug messenger live in
//! [`hal::Instance`]; this module adds the future registry on top and
//! is the entry point for adapter/device creation.

use std::rc::Rc;

use crate::adapter::Adapter;
use crate::error::{GfxError, GfxResult};
use crate::future::FutureRegistry;

pub struct Instance {
    raw: Rc<hal::Instance>,
    futures: FutureRegistry,
}

impl Instance {
    /// Creates the native instance (spec.md §6 `create_instance`).
    /// `requested_layers` mirrors `types::InstanceLayerSelection`'s
    /// chained-struct layer list.
    pub fn new(app_name: &str, requested_layers: &[String], enable_debug: bool) -> GfxResult<Self> {
        let raw = hal::Instance::new(app_name, requested_layers, enable_debug).map_err(GfxError::from)?;
        Ok(Self { raw: Rc::new(raw), futures: FutureRegistry::new() })
    }

    pub fn futures(&self) -> &FutureRegistry {
        &self.futures
    }

    /// Enumerates adapters (spec.md §6 `request_adapter`). Command
    /// recording has no suspension points (spec.md §5), so — unlike
    /// WebGPU's `Promise<Adapter>` — this resolves synchronously; the
    /// future registry exists for the genuinely async surface (buffer
    /// mapping, `wait_any`), not this call.
    pub fn request_adapter(&self) -> GfxResult<Vec<Adapter>> {
        let adapters = self.raw.enumerate_adapters().map_err(GfxError::from)?;
        Ok(adapters.into_iter().map(|raw| Adapter::new(self.raw.clone(), raw)).collect())
    }
}

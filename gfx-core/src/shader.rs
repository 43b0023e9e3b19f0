//! ShaderModule resource (spec.md §3): "either a single compiled module
//! usable for all entry points, or a set of per-stage modules addressed
//! by stage-enum". Shader front-ends (SPIR-V compilation, WGSL
//! translation, reflection) are out of scope (spec.md §1) — callers hand
//! us already-compiled SPIR-V words.

use std::collections::HashMap;
use std::rc::{Rc, Weak};

use ash::vk;
use types::ShaderStages;

use crate::device::Device;
use crate::error::GfxResult;
use crate::handle::Handle;

/// A single stage's compiled module plus the entry point to invoke.
pub struct StageModule {
    pub raw: vk::ShaderModule,
    pub entry_point: String,
}

enum Modules {
    /// One `VkShaderModule` shared across every stage that uses it.
    Shared { raw: vk::ShaderModule, entry_point: String },
    /// A distinct module per stage, compiled separately.
    PerStage(HashMap<ShaderStages, StageModule>),
}

pub struct ShaderModule {
    modules: Modules,
    /// Retained verbatim so later reflection or debugging can re-derive
    /// anything not captured above (spec.md §3: "retains a copy of its
    /// source bytes").
    source: Vec<u32>,
    device: Weak<Device>,
}

impl ShaderModule {
    /// Builds a single module usable for every entry point named in
    /// `entry_point` across all of `stages`.
    pub(crate) fn new_shared(
        device: &Rc<Device>,
        source: Vec<u32>,
        entry_point: impl Into<String>,
    ) -> GfxResult<Handle<Self>> {
        let raw = Self::compile(device, &source)?;
        Ok(Handle::new(Self {
            modules: Modules::Shared { raw, entry_point: entry_point.into() },
            source,
            device: Rc::downgrade(device),
        }))
    }

    /// Builds one module per `(stage, source, entry_point)` triple.
    pub(crate) fn new_per_stage(
        device: &Rc<Device>,
        stages: Vec<(ShaderStages, Vec<u32>, String)>,
    ) -> GfxResult<Handle<Self>> {
        let mut combined = Vec::new();
        let mut modules = HashMap::with_capacity(stages.len());
        for (stage, source, entry_point) in stages {
            let raw = Self::compile(device, &source)?;
            combined.extend_from_slice(&source);
            modules.insert(stage, StageModule { raw, entry_point });
        }
        Ok(Handle::new(Self { modules: Modules::PerStage(modules), source: combined, device: Rc::downgrade(device) }))
    }

    fn compile(device: &Rc<Device>, words: &[u32]) -> GfxResult<vk::ShaderModule> {
        let create_info = vk::ShaderModuleCreateInfo::default().code(words);
        unsafe { device.raw().create_shader_module(&create_info, None) }
            .map_err(|e| crate::error::GfxError::from(hal::HalError::from(e)))
    }

    /// Resolves the module and entry point to bind for `stage`.
    pub fn stage(&self, stage: ShaderStages) -> Option<(vk::ShaderModule, &str)> {
        match &self.modules {
            Modules::Shared { raw, entry_point } => Some((*raw, entry_point.as_str())),
            Modules::PerStage(map) => map.get(&stage).map(|m| (m.raw, m.entry_point.as_str())),
        }
    }

    pub fn source(&self) -> &[u32] {
        &self.source
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        let Some(device) = self.device.upgrade() else { return };
        match &self.modules {
            Modules::Shared { raw, .. } => unsafe { device.raw().destroy_shader_module(*raw, None) },
            Modules::PerStage(map) => {
                for module in map.values() {
                    unsafe { device.raw().destroy_shader_module(module.raw, None) };
                }
            }
        }
    }
}

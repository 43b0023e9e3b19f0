//! RenderBundle (spec.md §3, §4.4): a frozen, replayable command list
//! recorded with no attachment information, only a fingerprint of the
//! colour/depth-stencil formats and sample count it's compatible with.

use ash::vk;
use types::TextureFormat;

use crate::commands::RenderCommand;

/// Compatibility fingerprint a bundle is recorded against and must
/// match the render pass it's later executed inside (spec.md §4.4).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderBundleFingerprint {
    pub color_formats: Vec<TextureFormat>,
    pub depth_stencil_format: Option<TextureFormat>,
    pub sample_count: u32,
}

/// A cached secondary command buffer recorded for one dynamic-state
/// fingerprint (spec.md §4.4 option ii: "materializes a secondary
/// command buffer keyed by the current (viewport, scissor) state").
struct ReplayBuffer {
    viewport_bits: [u32; 4],
    scissor: (i32, i32, u32, u32),
    raw: vk::CommandBuffer,
}

pub struct RenderBundle {
    pub(crate) fingerprint: RenderBundleFingerprint,
    pub(crate) commands: Vec<RenderCommand>,
    replay_cache: Vec<ReplayBuffer>,
}

impl RenderBundle {
    pub(crate) fn new(fingerprint: RenderBundleFingerprint, commands: Vec<RenderCommand>) -> Self {
        Self { fingerprint, commands, replay_cache: Vec::new() }
    }

    pub fn fingerprint(&self) -> &RenderBundleFingerprint {
        &self.fingerprint
    }

    pub fn commands(&self) -> &[RenderCommand] {
        &self.commands
    }

    /// Returns a cached secondary buffer already recorded for this
    /// exact (viewport, scissor) pair, if one exists — a cache hit lets
    /// the caller skip re-recording the bundle's command list entirely.
    pub(crate) fn cached_replay(
        &self,
        viewport_bits: [u32; 4],
        scissor: (i32, i32, u32, u32),
    ) -> Option<vk::CommandBuffer> {
        self.replay_cache
            .iter()
            .find(|entry| entry.viewport_bits == viewport_bits && entry.scissor == scissor)
            .map(|entry| entry.raw)
    }

    pub(crate) fn cache_replay(
        &mut self,
        viewport_bits: [u32; 4],
        scissor: (i32, i32, u32, u32),
        raw: vk::CommandBuffer,
    ) {
        self.replay_cache.push(ReplayBuffer { viewport_bits, scissor, raw });
    }
}

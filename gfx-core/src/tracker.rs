//! Resource-usage tracker (spec.md §4.5): maps a resource to its
//! first and most-recently-seen access across an encoder or command
//! buffer's lifetime, and on each subsequent sighting hands back the
//! barrier needed to make the previous access visible to the new one.
//!
//! A single `track_and_emit_*` call serves two purposes at once: during
//! encoding it is the intra-buffer barrier the recording code inserts
//! immediately, and its `initial`/`last` snapshots are exactly the
//! inputs the submit-time barrier synthesizer (`crate::barrier`) needs
//! to stitch separate command buffers together (spec.md §4.7).

use std::any::Any;
use std::rc::Rc;

use rustc_hash::FxHashSet;
use types::{AccessFlags, PipelineStages, SubresourceRange, TextureLayout};

use crate::handle::Handle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSnapshot {
    pub stage: PipelineStages,
    pub access: AccessFlags,
}

impl Default for BufferSnapshot {
    fn default() -> Self {
        Self { stage: PipelineStages::empty(), access: AccessFlags::empty() }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BufferUsageRecord {
    pub initial: BufferSnapshot,
    pub last: BufferSnapshot,
    pub ever_written: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSnapshot {
    pub stage: PipelineStages,
    pub access: AccessFlags,
    pub layout: TextureLayout,
    pub subresource: SubresourceRange,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageUsageRecord {
    pub initial: TextureSnapshot,
    pub last: TextureSnapshot,
}

#[derive(Debug, Clone, Copy)]
pub struct BufferBarrier {
    pub src_stage: PipelineStages,
    pub dst_stage: PipelineStages,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
}

#[derive(Debug, Clone, Copy)]
pub struct ImageBarrier {
    pub src_stage: PipelineStages,
    pub dst_stage: PipelineStages,
    pub src_access: AccessFlags,
    pub dst_access: AccessFlags,
    pub old_layout: TextureLayout,
    pub new_layout: TextureLayout,
    pub subresource: SubresourceRange,
}

/// Retains a strong reference to some `Handle<T>` without the tracker
/// needing to know `T`. Backs the "sets for views, bind-groups,
/// bind-group-layouts, samplers, pipelines, render bundles, and query
/// sets — membership alone carries the refcount" requirement of
/// spec.md §4.5 with one implementation instead of seven identical
/// ones; handle identity (spec.md §9) is the hash key throughout.
#[derive(Clone)]
pub struct TrackedHandle {
    id: usize,
    _retain: Rc<dyn Any>,
}

impl TrackedHandle {
    pub fn new<T: 'static>(handle: &Handle<T>) -> Self {
        Self { id: handle.id(), _retain: Rc::new(handle.clone()) }
    }
}

impl PartialEq for TrackedHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl Eq for TrackedHandle {}
impl std::hash::Hash for TrackedHandle {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

#[derive(Default)]
pub struct ResourceTracker<Buf, Tex> {
    buffers: rustc_hash::FxHashMap<Handle<Buf>, BufferUsageRecord>,
    textures: rustc_hash::FxHashMap<Handle<Tex>, ImageUsageRecord>,
    /// Views, bind groups, bind-group layouts, samplers, pipelines,
    /// render bundles, query sets — anything for which mere
    /// encoder-lifetime membership is the entire tracking contract.
    referenced: FxHashSet<TrackedHandle>,
}

impl<Buf, Tex> ResourceTracker<Buf, Tex> {
    pub fn new() -> Self {
        Self {
            buffers: rustc_hash::FxHashMap::default(),
            textures: rustc_hash::FxHashMap::default(),
            referenced: FxHashSet::default(),
        }
    }

    /// On first sighting, inserts with `initial == last` and returns no
    /// barrier. On a subsequent sighting, returns the barrier from the
    /// resource's last access to `snap`, then advances `last`.
    pub fn track_and_emit_buffer(
        &mut self,
        handle: &Handle<Buf>,
        snap: BufferSnapshot,
    ) -> Option<BufferBarrier> {
        match self.buffers.get_mut(handle) {
            None => {
                self.buffers.insert(
                    handle.clone(),
                    BufferUsageRecord { initial: snap, last: snap, ever_written: snap.access.is_write() },
                );
                None
            }
            Some(record) => {
                let barrier = BufferBarrier {
                    src_stage: record.last.stage,
                    dst_stage: snap.stage,
                    src_access: record.last.access,
                    dst_access: snap.access,
                };
                record.last = snap;
                record.ever_written |= snap.access.is_write();
                Some(barrier)
            }
        }
    }

    pub fn track_and_emit_texture(
        &mut self,
        handle: &Handle<Tex>,
        snap: TextureSnapshot,
    ) -> Option<ImageBarrier> {
        match self.textures.get_mut(handle) {
            None => {
                self.textures.insert(handle.clone(), ImageUsageRecord { initial: snap, last: snap });
                None
            }
            Some(record) => {
                let barrier = ImageBarrier {
                    src_stage: record.last.stage,
                    dst_stage: snap.stage,
                    src_access: record.last.access,
                    dst_access: snap.access,
                    old_layout: record.last.layout,
                    new_layout: snap.layout,
                    subresource: snap.subresource,
                };
                record.last = snap;
                Some(barrier)
            }
        }
    }

    pub fn track_ref<T: 'static>(&mut self, handle: &Handle<T>) {
        self.referenced.insert(TrackedHandle::new(handle));
    }

    pub fn buffer_record(&self, handle: &Handle<Buf>) -> Option<&BufferUsageRecord> {
        self.buffers.get(handle)
    }

    pub fn texture_record(&self, handle: &Handle<Tex>) -> Option<&ImageUsageRecord> {
        self.textures.get(handle)
    }

    pub fn buffers(&self) -> impl Iterator<Item = (&Handle<Buf>, &BufferUsageRecord)> {
        self.buffers.iter()
    }

    pub fn textures(&self) -> impl Iterator<Item = (&Handle<Tex>, &ImageUsageRecord)> {
        self.textures.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty() && self.textures.is_empty() && self.referenced.is_empty()
    }

    /// Releases every retained reference. Called once a command buffer
    /// has fully executed (its submit fence fired), per spec.md §4.1:
    /// "those refs are dropped only in the on-wait-complete callback of
    /// the submit fence."
    pub fn clear(&mut self) {
        self.buffers.clear();
        self.textures.clear();
        self.referenced.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DummyBuffer;
    struct DummyTexture;

    fn snap(access: AccessFlags) -> BufferSnapshot {
        BufferSnapshot { stage: PipelineStages::TRANSFER, access }
    }

    #[test]
    fn first_sighting_yields_no_barrier_and_seeds_initial_and_last() {
        let mut tracker: ResourceTracker<DummyBuffer, DummyTexture> = ResourceTracker::new();
        let buf = Handle::new(DummyBuffer);
        let barrier = tracker.track_and_emit_buffer(&buf, snap(AccessFlags::TRANSFER_WRITE));
        assert!(barrier.is_none());
        let record = tracker.buffer_record(&buf).unwrap();
        assert_eq!(record.initial, record.last);
        assert!(record.ever_written);
    }

    #[test]
    fn second_sighting_emits_barrier_from_last_to_new_and_advances_last() {
        let mut tracker: ResourceTracker<DummyBuffer, DummyTexture> = ResourceTracker::new();
        let buf = Handle::new(DummyBuffer);
        tracker.track_and_emit_buffer(&buf, snap(AccessFlags::TRANSFER_WRITE));
        let barrier = tracker
            .track_and_emit_buffer(&buf, snap(AccessFlags::SHADER_READ))
            .expect("second sighting must emit a barrier");
        assert_eq!(barrier.src_access, AccessFlags::TRANSFER_WRITE);
        assert_eq!(barrier.dst_access, AccessFlags::SHADER_READ);
        let record = tracker.buffer_record(&buf).unwrap();
        assert_eq!(record.last.access, AccessFlags::SHADER_READ);
        assert_ne!(record.initial.access, record.last.access);
    }

    #[test]
    fn texture_barrier_carries_the_layout_transition() {
        let mut tracker: ResourceTracker<DummyBuffer, DummyTexture> = ResourceTracker::new();
        let tex = Handle::new(DummyTexture);
        let first = TextureSnapshot {
            stage: PipelineStages::TRANSFER,
            access: AccessFlags::TRANSFER_WRITE,
            layout: TextureLayout::TransferDstOptimal,
            subresource: SubresourceRange::default(),
        };
        let second = TextureSnapshot {
            stage: PipelineStages::FRAGMENT_SHADER,
            access: AccessFlags::SHADER_READ,
            layout: TextureLayout::ShaderReadOnlyOptimal,
            subresource: SubresourceRange::default(),
        };
        tracker.track_and_emit_texture(&tex, first);
        let barrier = tracker.track_and_emit_texture(&tex, second).unwrap();
        assert_eq!(barrier.old_layout, TextureLayout::TransferDstOptimal);
        assert_eq!(barrier.new_layout, TextureLayout::ShaderReadOnlyOptimal);
    }

    #[test]
    fn track_ref_retains_the_handle_until_clear() {
        let mut tracker: ResourceTracker<DummyBuffer, DummyTexture> = ResourceTracker::new();
        let sampler = Handle::new(42u32);
        tracker.track_ref(&sampler);
        assert_eq!(sampler.strong_count(), 2);
        tracker.clear();
        assert_eq!(sampler.strong_count(), 1);
    }
}

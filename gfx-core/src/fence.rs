//! Fence cache (spec.md §4.3). Reuses native fences across frames and
//! is the universal mechanism for deferred resource release: every
//! queue submission registers a callback on its fence that drops the
//! refs held by that submission's command buffers (spec.md §4.1, §4.7).

use std::cell::RefCell;
use std::rc::Rc;

use hal::fence::{FenceValue, RawFence};

use crate::error::GfxResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FenceState {
    Reset,
    InUse,
    Finished,
}

type Callback = Box<dyn FnOnce()>;

struct FenceEntry {
    value: FenceValue,
    state: FenceState,
    callbacks: Vec<Callback>,
}

/// A handle into the [`FenceCache`]'s slab. Cheap to copy; the cache
/// itself owns the actual state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FenceId(usize);

pub struct FenceCache {
    raw: RefCell<RawFence>,
    entries: RefCell<Vec<Option<FenceEntry>>>,
    free: RefCell<Vec<usize>>,
}

impl FenceCache {
    pub fn new(supports_timeline: bool, device: &ash::Device) -> GfxResult<Self> {
        let raw = if supports_timeline {
            RawFence::new_timeline(device)?
        } else {
            RawFence::new_fence_pool()
        };
        Ok(Self {
            raw: RefCell::new(raw),
            entries: RefCell::new(Vec::new()),
            free: RefCell::new(Vec::new()),
        })
    }

    /// Hands out a fence in `Reset` state (spec.md §4.3: "newly created
    /// or reused").
    pub fn get_fence(&self, device: &ash::Device) -> GfxResult<FenceId> {
        let value = self.raw.borrow_mut().acquire(device)?;
        let entry = FenceEntry { value, state: FenceState::Reset, callbacks: Vec::new() };
        let mut entries = self.entries.borrow_mut();
        if let Some(index) = self.free.borrow_mut().pop() {
            entries[index] = Some(entry);
            Ok(FenceId(index))
        } else {
            entries.push(Some(entry));
            Ok(FenceId(entries.len() - 1))
        }
    }

    /// Returns a fence for reuse. It must already be `Finished`; the
    /// caller (per-frame cache, spec.md §4.6) is responsible for having
    /// waited and fired callbacks first.
    pub fn put_fence(&self, id: FenceId) {
        let mut entries = self.entries.borrow_mut();
        if let Some(entry) = entries[id.0].take() {
            self.raw.borrow_mut().release(&entry.value);
        }
        self.free.borrow_mut().push(id.0);
    }

    pub fn raw_value(&self, id: FenceId) -> FenceValue {
        self.entries.borrow()[id.0].as_ref().unwrap().value
    }

    pub fn state(&self, id: FenceId) -> FenceState {
        self.entries.borrow()[id.0].as_ref().unwrap().state
    }

    pub fn mark_in_use(&self, id: FenceId) {
        self.entries.borrow_mut()[id.0].as_mut().unwrap().state = FenceState::InUse;
    }

    /// Registers a callback invoked exactly once, the first time this
    /// fence is observed `Finished` by `wait` or `wait_many` (spec.md
    /// §4.3, §8 property 5). Callbacks fire in insertion order.
    pub fn on_wait_complete(&self, id: FenceId, callback: impl FnOnce() + 'static) {
        self.entries.borrow_mut()[id.0]
            .as_mut()
            .unwrap()
            .callbacks
            .push(Box::new(callback));
    }

    /// Blocks until `id` is signaled (or `timeout_ns` elapses); on
    /// success transitions to `Finished` and fires every registered
    /// callback in insertion order, exactly once.
    pub fn wait(&self, device: &ash::Device, id: FenceId, timeout_ns: u64) -> GfxResult<bool> {
        let already_finished = self.state(id) == FenceState::Finished;
        if already_finished {
            return Ok(true);
        }
        let value = self.raw_value(id);
        let signaled = self.raw.borrow().wait(device, &value, timeout_ns)?;
        if signaled {
            self.finish(id);
        }
        Ok(signaled)
    }

    /// Waits on every fence in `ids` whose state is `InUse` (spec.md
    /// §4.3's `wait_many`), firing callbacks for each as it completes.
    pub fn wait_many(
        &self,
        device: &ash::Device,
        ids: &[FenceId],
        timeout_ns: u64,
    ) -> GfxResult<bool> {
        let mut all_done = true;
        for &id in ids {
            if self.state(id) == FenceState::Reset {
                continue;
            }
            if !self.wait(device, id, timeout_ns)? {
                all_done = false;
            }
        }
        Ok(all_done)
    }

    pub fn is_signaled(&self, device: &ash::Device, id: FenceId) -> GfxResult<bool> {
        if self.state(id) == FenceState::Finished {
            return Ok(true);
        }
        let value = self.raw_value(id);
        let signaled = self.raw.borrow().is_signaled(device, &value)?;
        if signaled {
            self.finish(id);
        }
        Ok(signaled)
    }

    fn finish(&self, id: FenceId) {
        let callbacks = {
            let mut entries = self.entries.borrow_mut();
            let entry = entries[id.0].as_mut().unwrap();
            entry.state = FenceState::Finished;
            std::mem::take(&mut entry.callbacks)
        };
        for callback in callbacks {
            callback();
        }
    }

    pub unsafe fn destroy(&self, device: &ash::Device) {
        self.raw.borrow().destroy(device);
    }
}

/// Convenience Rc-wrapped alias: the fence cache is shared between the
/// device, the queue submit engine, and every per-frame slot.
pub type SharedFenceCache = Rc<FenceCache>;

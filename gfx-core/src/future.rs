//! Process-wide future map owned by [`crate::instance::Instance`]
//! (spec.md §3: "a process-wide map `FutureId → FutureRecord`").
//!
//! Every GPU-visible operation in this backend is synchronous by the
//! time it returns (spec.md §5: "no suspension points for command
//! recording... blocking only occurs at explicit wait points"), so a
//! `Future` here is always *ready* the moment it is registered; what it
//! defers is the *callback invocation*, not the underlying work. This
//! matches request-style WebGPU entry points (`request_adapter`,
//! `request_device`, `buffer_map_async`) which hand back a future the
//! caller must resolve through `wait_any` even though, on this backend,
//! the outcome was already decided synchronously.

use rustc_hash::FxHashMap;

use types::WaitStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FutureId(u64);

struct FutureRecord {
    run: Box<dyn FnOnce()>,
    free: Box<dyn FnOnce()>,
}

#[derive(Default)]
pub struct FutureRegistry {
    next_id: std::cell::Cell<u64>,
    pending: std::cell::RefCell<FxHashMap<u64, FutureRecord>>,
}

impl FutureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolved operation's callback pair. Never reuses an
    /// id within this registry's lifetime (spec.md §3 Invariant 6):
    /// the counter only increments.
    pub fn register(
        &self,
        run: impl FnOnce() + 'static,
        free: impl FnOnce() + 'static,
    ) -> FutureId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.pending
            .borrow_mut()
            .insert(id, FutureRecord { run: Box::new(run), free: Box::new(free) });
        FutureId(id)
    }

    /// Invokes `run` then `free`, exactly once, for the first of
    /// `ids` still pending. Returns `TimedOut` if none of `ids` are
    /// present (already resolved by an earlier `wait_any`, or
    /// unknown) — there is nothing to time out on in practice since
    /// every future here is ready at registration, but the status
    /// vocabulary is kept for API fidelity with spec.md §8.
    pub fn wait_any(&self, ids: &[FutureId], _timeout_ns: u64) -> WaitStatus {
        for id in ids {
            let record = self.pending.borrow_mut().remove(&id.0);
            if let Some(record) = record {
                (record.run)();
                (record.free)();
                return WaitStatus::Success;
            }
        }
        WaitStatus::TimedOut
    }

    pub fn pending_count(&self) -> usize {
        self.pending.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_any_fires_run_then_free_exactly_once() {
        let registry = FutureRegistry::new();
        let order = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let run_order = order.clone();
        let free_order = order.clone();
        let id = registry.register(
            move || run_order.borrow_mut().push("run"),
            move || free_order.borrow_mut().push("free"),
        );
        assert_eq!(registry.wait_any(&[id], 0), WaitStatus::Success);
        assert_eq!(*order.borrow(), vec!["run", "free"]);
        // a second wait on the same, now-resolved id finds nothing pending
        assert_eq!(registry.wait_any(&[id], 0), WaitStatus::TimedOut);
    }

    #[test]
    fn ids_are_never_reused() {
        let registry = FutureRegistry::new();
        let a = registry.register(|| {}, || {});
        registry.wait_any(&[a], 0);
        let b = registry.register(|| {}, || {});
        assert_ne!(a, b);
    }
}

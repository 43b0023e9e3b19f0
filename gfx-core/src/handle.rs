//! Handle and reference-count core (spec.md §4.1).
//!
//! The source models every GPU object as an opaque id backed by a
//! manual atomic refcount (see the teacher's `wgpu-core::registry`,
//! which is a generational arena built for cross-thread access). This
//! backend is single-threaded per device (spec.md §5), so a `Handle<T>`
//! is modeled directly as `Rc<RefCell<T>>`: Rust's own strong count
//! *is* the refcount spec.md §3 Invariant 1 describes, and `add_ref`/
//! `release` are thin, explicitly-named wrappers around `Clone`/`Drop`
//! so the public API surface (spec.md §6) keeps the C-style discipline
//! callers expect, while the bookkeeping itself is exactly what the
//! borrow checker already guarantees.
//!
//! Back-references that would otherwise cycle (TextureView → Texture →
//! view cache → TextureView, spec.md §9) use [`WeakHandle`].

use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

pub struct Handle<T>(Rc<RefCell<T>>);

impl<T> Handle<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    /// Increments the refcount and returns a new owning handle. Named
    /// to match the public API's `add_ref` entry point (spec.md §6),
    /// not Rust's `Clone` convention, even though it is one.
    pub fn add_ref(&self) -> Self {
        self.clone()
    }

    /// Decrements the refcount. If this was the last reference, `T`'s
    /// `Drop` impl performs the component-specific teardown described
    /// in spec.md §4.1 (return pooled natives, destroy the rest).
    pub fn release(self) {
        drop(self)
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    pub fn downgrade(&self) -> WeakHandle<T> {
        WeakHandle(Rc::downgrade(&self.0))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Identity for the "opaque handle as hash key" pattern (spec.md
    /// §9: "Hash maps with non-hashable keys... use handle identity").
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn strong_count(&self) -> usize {
        Rc::strong_count(&self.0)
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}
impl<T> Eq for Handle<T> {}

impl<T> std::hash::Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state);
    }
}

impl<T> std::fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handle({:#x})", self.id())
    }
}

pub struct WeakHandle<T>(Weak<RefCell<T>>);

impl<T> WeakHandle<T> {
    pub fn upgrade(&self) -> Option<Handle<T>> {
        self.0.upgrade().map(Handle)
    }
}

impl<T> Clone for WeakHandle<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

#![forbid(unsafe_code)]

//! Per-owner storage for view-models.
//!
//! [`ViewModelStore`] is a shared handle (`Rc<RefCell<..>>`) to a mapping from
//! [`ViewModelKey`] to a held instance. Cloning the handle does not copy the
//! mapping; all clones observe the same entries.
//!
//! # Invariants
//!
//! 1. At most one instance per key. `put` overwrites.
//! 2. Entries are only removed by [`clear`](ViewModelStore::clear) and by
//!    teardown draining the store.
//! 3. `clear` never calls [`ViewModel::release`]; releasing is the job of
//!    [`tear_down`](crate::tear_down).
//! 4. No internal borrow outlives a method call, so callers may freely
//!    re-enter the store from inside factories or `release` callbacks.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;

use crate::viewmodel::{ViewModel, ViewModelKey};

/// A stored instance, viewed both as a view-model and as `Any` so typed
/// lookups can downcast without reflection on the trait object.
#[derive(Clone)]
struct Entry {
    instance: Rc<dyn ViewModel>,
    any: Rc<dyn Any>,
}

/// Keyed store of view-models owned by a single scope.
#[derive(Clone, Default)]
pub struct ViewModelStore {
    entries: Rc<RefCell<AHashMap<ViewModelKey, Entry>>>,
}

impl ViewModelStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the instance held under `key`.
    #[must_use]
    pub fn get(&self, key: &ViewModelKey) -> Option<Rc<dyn ViewModel>> {
        self.entries
            .borrow()
            .get(key)
            .map(|entry| Rc::clone(&entry.instance))
    }

    /// Look up the instance under `key` as the concrete type `VM`.
    ///
    /// Returns `None` when the key is absent or holds a different type.
    #[must_use]
    pub fn get_as<VM: ViewModel>(&self, key: &ViewModelKey) -> Option<Rc<VM>> {
        self.get_any(key).and_then(|any| any.downcast::<VM>().ok())
    }

    pub(crate) fn get_any(&self, key: &ViewModelKey) -> Option<Rc<dyn Any>> {
        self.entries
            .borrow()
            .get(key)
            .map(|entry| Rc::clone(&entry.any))
    }

    /// Store `instance` under `key`, replacing any previous entry.
    ///
    /// A replaced instance is dropped without being released.
    pub fn put<VM: ViewModel>(&self, key: ViewModelKey, instance: Rc<VM>) {
        let entry = Entry {
            instance: Rc::clone(&instance) as Rc<dyn ViewModel>,
            any: instance as Rc<dyn Any>,
        };
        let replaced = self.entries.borrow_mut().insert(key, entry);
        // Drop the old entry outside the borrow; its destructor may touch us.
        drop(replaced);
    }

    /// Whether an instance is held under `key`.
    #[must_use]
    pub fn contains_key(&self, key: &ViewModelKey) -> bool {
        self.entries.borrow().contains_key(key)
    }

    /// Snapshot of the keys currently held.
    #[must_use]
    pub fn keys(&self) -> Vec<ViewModelKey> {
        self.entries.borrow().keys().copied().collect()
    }

    /// Snapshot of the instances currently held.
    #[must_use]
    pub fn values(&self) -> Vec<Rc<dyn ViewModel>> {
        self.entries
            .borrow()
            .values()
            .map(|entry| Rc::clone(&entry.instance))
            .collect()
    }

    /// Snapshot of `(key, instance)` pairs.
    #[must_use]
    pub fn entries(&self) -> Vec<(ViewModelKey, Rc<dyn ViewModel>)> {
        self.entries
            .borrow()
            .iter()
            .map(|(key, entry)| (*key, Rc::clone(&entry.instance)))
            .collect()
    }

    /// Number of held instances.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether the store holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Remove every entry. Does not call `release`.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.entries.borrow_mut());
        drop(drained);
    }

    /// Remove and return every entry in one step.
    ///
    /// The map is detached before the entries are collected, so nothing is
    /// borrowed once this returns.
    pub(crate) fn drain(&self) -> Vec<(ViewModelKey, Rc<dyn ViewModel>)> {
        let taken = std::mem::take(&mut *self.entries.borrow_mut());
        taken
            .into_iter()
            .map(|(key, entry)| (key, entry.instance))
            .collect()
    }

    /// Whether both handles refer to the same underlying store.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.entries, &other.entries)
    }
}

impl fmt::Debug for ViewModelStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.borrow();
        f.debug_struct("ViewModelStore")
            .field("len", &entries.len())
            .field("keys", &entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

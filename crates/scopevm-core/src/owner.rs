#![forbid(unsafe_code)]

//! Owners of view-model stores.
//!
//! A [`ViewModelStoreOwner`] yields the same [`ViewModelStore`] for its whole
//! lifetime. Host components usually do not implement the trait by hand:
//! they embed a [`StoreSlot`] and implement [`ViewModelScope`], which gives
//! them a lazily-materialized store through a blanket impl.

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use crate::store::ViewModelStore;

/// Shared, type-erased owner handle, as held by the ambient scope stack.
pub type OwnerRef = Rc<dyn ViewModelStoreOwner>;

/// Anything that owns exactly one [`ViewModelStore`].
pub trait ViewModelStoreOwner {
    /// The owner's store. Must return the same store (by identity) on every
    /// call; the first call may create it.
    fn view_model_store(&self) -> ViewModelStore;

    /// The store, if it has already been created.
    ///
    /// Teardown uses this to skip owners that never requested a view-model.
    /// The default reports the store as always present.
    fn materialized_store(&self) -> Option<ViewModelStore> {
        Some(self.view_model_store())
    }
}

impl ViewModelStoreOwner for ViewModelStore {
    fn view_model_store(&self) -> ViewModelStore {
        self.clone()
    }
}

/// Lazily-created store attached to a host component.
#[derive(Default)]
pub struct StoreSlot {
    store: OnceCell<ViewModelStore>,
}

impl StoreSlot {
    /// An empty slot; the store is created on first access.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            store: OnceCell::new(),
        }
    }

    /// The store, creating it on first call.
    pub fn get_or_init(&self) -> ViewModelStore {
        self.store.get_or_init(ViewModelStore::new).clone()
    }

    /// The store if it has been created.
    #[must_use]
    pub fn get(&self) -> Option<ViewModelStore> {
        self.store.get().cloned()
    }

    /// Whether the store has been created.
    #[must_use]
    pub fn is_materialized(&self) -> bool {
        self.store.get().is_some()
    }
}

impl fmt::Debug for StoreSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.store.get() {
            Some(store) => f.debug_tuple("StoreSlot").field(store).finish(),
            None => f.write_str("StoreSlot(<empty>)"),
        }
    }
}

/// A host component that carries a [`StoreSlot`].
///
/// Implementing this is enough to become a [`ViewModelStoreOwner`].
pub trait ViewModelScope {
    /// The slot attached to this component.
    fn store_slot(&self) -> &StoreSlot;
}

impl ViewModelScope for StoreSlot {
    fn store_slot(&self) -> &StoreSlot {
        self
    }
}

impl<T: ViewModelScope> ViewModelStoreOwner for T {
    fn view_model_store(&self) -> ViewModelStore {
        self.store_slot().get_or_init()
    }

    fn materialized_store(&self) -> Option<ViewModelStore> {
        self.store_slot().get()
    }
}

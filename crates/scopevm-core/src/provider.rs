#![forbid(unsafe_code)]

//! Resolve-or-create access to an owner's view-models.
//!
//! # Invariants
//!
//! 1. At most one instance per (owner, kind) is live at a time.
//! 2. A cached instance wins over the factory: once `VM` is in the store,
//!    `get::<VM>()` returns it without calling any factory.
//! 3. Factory failures propagate unchanged and leave the store untouched.
//! 4. No store borrow is held while the factory runs, so factories may
//!    resolve other view-models from the same owner.

use std::rc::Rc;

use crate::error::ViewModelError;
use crate::factory::{DefaultFactory, ViewModelFactory};
use crate::owner::ViewModelStoreOwner;
use crate::store::ViewModelStore;
use crate::viewmodel::{ViewModel, ViewModelKey};

/// Provides view-models for one owner, creating them through `F` on a miss.
#[derive(Debug, Clone)]
pub struct ViewModelProvider<F = DefaultFactory> {
    store: ViewModelStore,
    factory: F,
}

impl ViewModelProvider<DefaultFactory> {
    /// Provider over `owner`'s store using [`DefaultFactory`].
    #[must_use]
    pub fn new<O: ViewModelStoreOwner + ?Sized>(owner: &O) -> Self {
        Self::with_factory(owner, DefaultFactory)
    }
}

impl<F> ViewModelProvider<F> {
    /// Provider over `owner`'s store using `factory` for misses.
    ///
    /// Materializes the owner's store if it does not exist yet.
    pub fn with_factory<O: ViewModelStoreOwner + ?Sized>(owner: &O, factory: F) -> Self {
        Self {
            store: owner.view_model_store(),
            factory,
        }
    }

    /// The store this provider reads and writes.
    #[must_use]
    pub fn store(&self) -> &ViewModelStore {
        &self.store
    }

    /// Return the cached `VM` or create, store and return a new one.
    ///
    /// # Errors
    ///
    /// - [`ViewModelError::Construction`] if the factory fails.
    /// - [`ViewModelError::KindMismatch`] if the store holds a foreign type
    ///   under `VM`'s key (only possible through a manual `put`).
    pub fn get<VM>(&self) -> Result<Rc<VM>, ViewModelError>
    where
        VM: ViewModel,
        F: ViewModelFactory<VM>,
    {
        let key = ViewModelKey::of::<VM>();
        if let Some(existing) = self.store.get_any(&key) {
            tracing::trace!(kind = key.type_name(), "view-model cache hit");
            return existing
                .downcast::<VM>()
                .map_err(|_| ViewModelError::KindMismatch { key });
        }

        tracing::trace!(kind = key.type_name(), "view-model cache miss");
        let instance = self
            .factory
            .create()
            .map_err(|source| ViewModelError::Construction {
                kind: key.type_name(),
                source,
            })?;
        let instance = Rc::new(instance);
        self.store.put(key, Rc::clone(&instance));
        tracing::debug!(
            kind = key.type_name(),
            held = self.store.len(),
            "view-model created"
        );
        Ok(instance)
    }
}

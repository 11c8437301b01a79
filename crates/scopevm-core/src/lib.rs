#![forbid(unsafe_code)]

//! Owner-scoped view-models for component-based UI hosts.
//!
//! This crate provides:
//! - [`ViewModelStore`]: the per-owner registry of view-model instances
//! - [`ViewModelProvider`]: resolve-or-create access through a [`ViewModelFactory`]
//! - [`ScopeContext`]: ambient "current owner" resolution with scoped activation
//! - [`tear_down`] and [`ViewModelPlugin`]: release of an owner's view-models
//!   right before the host destroys it
//!
//! # Architecture
//!
//! All handles are single-threaded (`Rc<RefCell<..>>`). An owner's store is
//! created lazily on first request and cleared at teardown. Each view-model
//! kind is keyed by its `TypeId`, so the store holds at most one instance
//! per kind per owner and repeated resolution returns the same `Rc`.
//!
//! # Example
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use scopevm_core::{BoxError, ScopeContext, StoreSlot, ViewModel, tear_down};
//!
//! #[derive(Default)]
//! struct Clock {
//!     ticking: Cell<bool>,
//! }
//!
//! impl ViewModel for Clock {
//!     fn release(&self) -> Result<(), BoxError> {
//!         self.ticking.set(false);
//!         Ok(())
//!     }
//! }
//!
//! let context = ScopeContext::new();
//! let component = Rc::new(StoreSlot::new());
//!
//! let clock = context.with_scope(component.clone(), || context.view_model::<Clock>(None))?;
//! clock.ticking.set(true);
//!
//! tear_down(&*component).expect("release never fails here");
//! assert!(!clock.ticking.get());
//! # Ok::<(), scopevm_core::ViewModelError>(())
//! ```

pub mod context;
pub mod error;
pub mod factory;
pub mod lifecycle;
pub mod owner;
pub mod plugin;
pub mod provider;
pub mod store;
pub mod viewmodel;

pub use context::{
    FnResolver, OwnerResolver, ResolvedOwner, ScopeContext, ScopeGuard, resolve_owner,
    resolve_view_model, view_model, view_model_with,
};
pub use error::{ReleaseFailure, TeardownError, ViewModelError};
pub use factory::{DefaultFactory, FnFactory, ViewModelFactory, factory_fn};
pub use lifecycle::{release_store, tear_down};
pub use owner::{OwnerRef, StoreSlot, ViewModelScope, ViewModelStoreOwner};
pub use plugin::{BeforeUnmountHook, HostApp, PluginOptions, SetupHook, ViewModelPlugin};
pub use provider::ViewModelProvider;
pub use store::ViewModelStore;
pub use viewmodel::{BoxError, ViewModel, ViewModelKey};

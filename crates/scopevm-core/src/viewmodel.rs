#![forbid(unsafe_code)]

//! The [`ViewModel`] contract and the [`ViewModelKey`] that identifies a
//! view-model kind inside a store.
//!
//! A view-model is a unit of state whose lifetime is bound to an owning
//! scope. It is created lazily on first request, shared by identity for as
//! long as the scope lives, and receives exactly one [`ViewModel::release`]
//! call when the scope is torn down.
//!
//! # Keys
//!
//! Keys compare by [`TypeId`], so two distinct types that happen to share a
//! printable name never collide. The type name is carried along purely for
//! diagnostics (`Display`, error messages, logs).

use core::fmt;
use core::hash::{Hash, Hasher};
use std::any::{Any, TypeId};

/// Error type returned by user callbacks (factories and `release`).
pub type BoxError = Box<dyn std::error::Error + 'static>;

/// State owned by a scope and released when that scope ends.
///
/// The default [`release`](Self::release) does nothing; override it to free
/// resources (subscriptions, timers, handles) the view-model holds.
///
/// `release` takes `&self` because the instance is shared by `Rc` with every
/// call site that resolved it. Use interior mutability for any state the
/// release step has to touch.
///
/// # Example
///
/// ```
/// use std::cell::Cell;
/// use scopevm_core::{BoxError, ViewModel};
///
/// #[derive(Default)]
/// struct Counter {
///     count: Cell<u32>,
/// }
///
/// impl ViewModel for Counter {
///     fn release(&self) -> Result<(), BoxError> {
///         self.count.set(0);
///         Ok(())
///     }
/// }
/// ```
pub trait ViewModel: Any {
    /// Called once when the owning scope is torn down.
    ///
    /// Returning an error does not prevent sibling view-models from being
    /// released; failures are collected into a
    /// [`TeardownError`](crate::TeardownError).
    fn release(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Identity of a view-model kind within a [`ViewModelStore`](crate::ViewModelStore).
#[derive(Clone, Copy)]
pub struct ViewModelKey {
    type_id: TypeId,
    type_name: &'static str,
}

impl ViewModelKey {
    /// Key for the view-model type `VM`.
    #[must_use]
    pub fn of<VM: ViewModel>() -> Self {
        Self {
            type_id: TypeId::of::<VM>(),
            type_name: std::any::type_name::<VM>(),
        }
    }

    /// The `TypeId` this key compares by.
    #[inline]
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Fully qualified type name, for diagnostics only.
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Type name without its module path (`app::vm::Counter` -> `Counter`).
    #[must_use]
    pub fn short_name(&self) -> &'static str {
        let base = self.type_name.split('<').next().unwrap_or(self.type_name);
        match base.rfind("::") {
            Some(idx) => &self.type_name[idx + 2..],
            None => self.type_name,
        }
    }

    /// Whether this key identifies the kind `VM`.
    #[inline]
    #[must_use]
    pub fn is<VM: ViewModel>(&self) -> bool {
        self.type_id == TypeId::of::<VM>()
    }
}

impl PartialEq for ViewModelKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ViewModelKey {}

impl Hash for ViewModelKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ViewModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ViewModelKey").field(&self.type_name).finish()
    }
}

impl fmt::Display for ViewModelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

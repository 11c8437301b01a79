#![forbid(unsafe_code)]

//! Construction strategies for view-models.
//!
//! A factory is parameterized by the kind it builds, so "can this factory
//! build `VM`?" is answered by the type checker rather than by a runtime
//! match on the requested kind. Construction can still fail at runtime
//! (missing input, rejected arguments); that failure propagates to the
//! caller as [`ViewModelError::Construction`](crate::ViewModelError::Construction).

use std::fmt;

use crate::viewmodel::{BoxError, ViewModel};

/// Builds new instances of `VM`.
pub trait ViewModelFactory<VM: ViewModel> {
    /// Build a fresh instance.
    fn create(&self) -> Result<VM, BoxError>;
}

impl<VM: ViewModel, F: ViewModelFactory<VM> + ?Sized> ViewModelFactory<VM> for &F {
    fn create(&self) -> Result<VM, BoxError> {
        (**self).create()
    }
}

/// Argument-less construction through [`Default`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DefaultFactory;

impl<VM: ViewModel + Default> ViewModelFactory<VM> for DefaultFactory {
    fn create(&self) -> Result<VM, BoxError> {
        Ok(VM::default())
    }
}

/// A factory backed by a closure.
#[derive(Clone)]
pub struct FnFactory<F> {
    build: F,
}

impl<F> FnFactory<F> {
    /// Wrap `build` as a factory.
    pub fn new(build: F) -> Self {
        Self { build }
    }
}

impl<VM, F> ViewModelFactory<VM> for FnFactory<F>
where
    VM: ViewModel,
    F: Fn() -> Result<VM, BoxError>,
{
    fn create(&self) -> Result<VM, BoxError> {
        (self.build)()
    }
}

impl<F> fmt::Debug for FnFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFactory").finish_non_exhaustive()
    }
}

/// Shorthand for [`FnFactory::new`].
pub fn factory_fn<VM, F>(build: F) -> FnFactory<F>
where
    VM: ViewModel,
    F: Fn() -> Result<VM, BoxError>,
{
    FnFactory::new(build)
}

#![forbid(unsafe_code)]

//! Ambient owner resolution.
//!
//! Call sites that do not pass an owner explicitly resolve "the component
//! currently being initialized" through an [`OwnerResolver`]. Two resolvers
//! are provided:
//!
//! - [`ScopeContext`]: an explicit activation stack. The host (via
//!   [`ViewModelPlugin`](crate::ViewModelPlugin)) pushes an owner before a
//!   component's setup runs and the returned [`ScopeGuard`] pops it on every
//!   exit path, panics included.
//! - [`FnResolver`]: delegates to the host framework's own notion of the
//!   current instance.
//!
//! # Invariants
//!
//! 1. Activations nest like a call stack: leaving an inner scope makes the
//!    outer scope current again.
//! 2. No borrow of the stack is held while user code runs, so setup code may
//!    activate nested scopes.
//! 3. Each thread has its own [`ScopeContext::global`] stack.
//! 4. [`ScopeContext::reset`] starts a new epoch. Guards from an earlier
//!    epoch pop nothing when dropped, so they cannot disturb activations
//!    made after the reset.

use std::cell::RefCell;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use crate::error::ViewModelError;
use crate::factory::{DefaultFactory, ViewModelFactory};
use crate::owner::{OwnerRef, ViewModelStoreOwner};
use crate::provider::ViewModelProvider;
use crate::viewmodel::ViewModel;

thread_local! {
    static GLOBAL_CONTEXT: ScopeContext = ScopeContext::new();
}

/// Resolves the currently active owner.
pub trait OwnerResolver {
    /// The active owner.
    ///
    /// # Errors
    ///
    /// [`ViewModelError::NoActiveScope`] when no owner is active.
    fn current_owner(&self) -> Result<OwnerRef, ViewModelError>;
}

#[derive(Default)]
struct ActivationStack {
    owners: Vec<OwnerRef>,
    epoch: u64,
}

/// Stack of active owners with scoped activation.
#[derive(Clone, Default)]
pub struct ScopeContext {
    stack: Rc<RefCell<ActivationStack>>,
}

impl ScopeContext {
    /// A context with no active scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The calling thread's shared context.
    #[must_use]
    pub fn global() -> Self {
        GLOBAL_CONTEXT.with(Clone::clone)
    }

    /// Make `owner` current until the returned guard is dropped.
    #[must_use = "dropping this guard deactivates the scope"]
    pub fn enter(&self, owner: OwnerRef) -> ScopeGuard {
        let (depth, epoch) = {
            let mut stack = self.stack.borrow_mut();
            stack.owners.push(Rc::clone(&owner));
            (stack.owners.len(), stack.epoch)
        };
        tracing::trace!(depth, "view-model scope entered");
        ScopeGuard {
            stack: Rc::clone(&self.stack),
            owner,
            epoch,
        }
    }

    /// Run `f` with `owner` as the current scope.
    ///
    /// The previous scope is restored when `f` returns or unwinds.
    pub fn with_scope<R>(&self, owner: OwnerRef, f: impl FnOnce() -> R) -> R {
        let _guard = self.enter(owner);
        f()
    }

    /// The innermost active owner, if any.
    #[must_use]
    pub fn current(&self) -> Option<OwnerRef> {
        self.stack.borrow().owners.last().cloned()
    }

    /// Whether any scope is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.stack.borrow().owners.is_empty()
    }

    /// Number of nested activations.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.borrow().owners.len()
    }

    /// Drop every activation. Intended for test setup.
    ///
    /// Guards created before the reset pop nothing when they are dropped
    /// later, even if new scopes were entered in the meantime.
    pub fn reset(&self) {
        let drained = {
            let mut stack = self.stack.borrow_mut();
            stack.epoch = stack.epoch.wrapping_add(1);
            std::mem::take(&mut stack.owners)
        };
        tracing::trace!(dropped = drained.len(), "view-model scopes reset");
        drop(drained);
    }

    /// Whether both handles share one stack.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.stack, &other.stack)
    }

    /// Resolve `VM` for `owner`, or for the active scope when `owner` is
    /// `None`, using [`DefaultFactory`].
    ///
    /// # Errors
    ///
    /// See [`resolve_view_model`].
    pub fn view_model<VM>(
        &self,
        owner: Option<&dyn ViewModelStoreOwner>,
    ) -> Result<Rc<VM>, ViewModelError>
    where
        VM: ViewModel + Default,
    {
        resolve_view_model(self, owner, DefaultFactory)
    }

    /// Like [`view_model`](Self::view_model) with an explicit factory.
    ///
    /// # Errors
    ///
    /// See [`resolve_view_model`].
    pub fn view_model_with<VM, F>(
        &self,
        owner: Option<&dyn ViewModelStoreOwner>,
        factory: F,
    ) -> Result<Rc<VM>, ViewModelError>
    where
        VM: ViewModel,
        F: ViewModelFactory<VM>,
    {
        resolve_view_model(self, owner, factory)
    }
}

impl OwnerResolver for ScopeContext {
    fn current_owner(&self) -> Result<OwnerRef, ViewModelError> {
        self.current().ok_or(ViewModelError::NoActiveScope)
    }
}

impl fmt::Debug for ScopeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeContext")
            .field("depth", &self.depth())
            .finish()
    }
}

/// RAII guard for one scope activation.
#[must_use = "dropping this guard deactivates the scope"]
pub struct ScopeGuard {
    stack: Rc<RefCell<ActivationStack>>,
    owner: OwnerRef,
    epoch: u64,
}

impl ScopeGuard {
    /// The owner this guard activated.
    #[must_use]
    pub fn owner(&self) -> &OwnerRef {
        &self.owner
    }
}

impl Drop for ScopeGuard {
    fn drop(&mut self) {
        let popped = {
            let mut stack = self.stack.borrow_mut();
            if stack.epoch != self.epoch {
                return;
            }
            stack.owners.pop()
        };
        if let Some(popped) = popped {
            debug_assert!(
                Rc::ptr_eq(&popped, &self.owner),
                "view-model scopes must be exited in LIFO order"
            );
        }
    }
}

impl fmt::Debug for ScopeGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeGuard").finish_non_exhaustive()
    }
}

/// Resolver that asks the host framework for its current instance.
pub struct FnResolver<F> {
    current: F,
}

impl<F> FnResolver<F>
where
    F: Fn() -> Option<OwnerRef>,
{
    /// Wrap the host's current-instance lookup.
    pub fn new(current: F) -> Self {
        Self { current }
    }
}

impl<F> OwnerResolver for FnResolver<F>
where
    F: Fn() -> Option<OwnerRef>,
{
    fn current_owner(&self) -> Result<OwnerRef, ViewModelError> {
        (self.current)().ok_or(ViewModelError::NoActiveScope)
    }
}

impl<F> fmt::Debug for FnResolver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnResolver").finish_non_exhaustive()
    }
}

/// An owner obtained from [`resolve_owner`].
pub enum ResolvedOwner<'a> {
    /// Passed in by the caller.
    Explicit(&'a dyn ViewModelStoreOwner),
    /// Taken from the active scope.
    Ambient(OwnerRef),
}

impl<'a> Deref for ResolvedOwner<'a> {
    type Target = dyn ViewModelStoreOwner + 'a;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Explicit(owner) => *owner,
            Self::Ambient(owner) => &**owner,
        }
    }
}

impl fmt::Debug for ResolvedOwner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(_) => f.write_str("ResolvedOwner::Explicit"),
            Self::Ambient(_) => f.write_str("ResolvedOwner::Ambient"),
        }
    }
}

/// Use `explicit` if given, otherwise ask `resolver` for the active owner.
///
/// # Errors
///
/// [`ViewModelError::NoActiveScope`] when `explicit` is `None` and nothing
/// is active.
pub fn resolve_owner<'a, R>(
    explicit: Option<&'a dyn ViewModelStoreOwner>,
    resolver: &R,
) -> Result<ResolvedOwner<'a>, ViewModelError>
where
    R: OwnerResolver + ?Sized,
{
    match explicit {
        Some(owner) => Ok(ResolvedOwner::Explicit(owner)),
        None => resolver.current_owner().map(ResolvedOwner::Ambient),
    }
}

/// Resolve the owner, materialize its store and return its `VM`, creating
/// it with `factory` on a miss.
///
/// # Errors
///
/// - [`ViewModelError::NoActiveScope`] if no owner is given or active; no
///   store is touched.
/// - Anything [`ViewModelProvider::get`] returns.
pub fn resolve_view_model<VM, F, R>(
    resolver: &R,
    owner: Option<&dyn ViewModelStoreOwner>,
    factory: F,
) -> Result<Rc<VM>, ViewModelError>
where
    VM: ViewModel,
    F: ViewModelFactory<VM>,
    R: OwnerResolver + ?Sized,
{
    let owner = resolve_owner(owner, resolver)?;
    ViewModelProvider::with_factory(&*owner, factory).get::<VM>()
}

/// Resolve `VM` through the calling thread's [`ScopeContext::global`].
///
/// This is the usual entry point from component setup code:
///
/// ```
/// use std::rc::Rc;
/// use scopevm_core::{view_model, ScopeContext, StoreSlot, ViewModel};
///
/// #[derive(Default)]
/// struct Counter;
/// impl ViewModel for Counter {}
///
/// let component: Rc<StoreSlot> = Rc::new(StoreSlot::new());
/// let counter = ScopeContext::global().with_scope(component.clone(), || {
///     view_model::<Counter>(None)
/// })?;
/// let again = view_model::<Counter>(Some(&*component))?;
/// assert!(Rc::ptr_eq(&counter, &again));
/// # Ok::<(), scopevm_core::ViewModelError>(())
/// ```
///
/// # Errors
///
/// See [`resolve_view_model`].
pub fn view_model<VM>(owner: Option<&dyn ViewModelStoreOwner>) -> Result<Rc<VM>, ViewModelError>
where
    VM: ViewModel + Default,
{
    ScopeContext::global().view_model(owner)
}

/// Like [`view_model`] with an explicit factory.
///
/// # Errors
///
/// See [`resolve_view_model`].
pub fn view_model_with<VM, F>(
    owner: Option<&dyn ViewModelStoreOwner>,
    factory: F,
) -> Result<Rc<VM>, ViewModelError>
where
    VM: ViewModel,
    F: ViewModelFactory<VM>,
{
    ScopeContext::global().view_model_with(owner, factory)
}

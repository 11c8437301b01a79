#![forbid(unsafe_code)]

//! In-memory host framework for exercising [`ViewModelPlugin`] end to end.
//!
//! [`TestApp`] implements [`HostApp`] the way a component framework would:
//! every [`mount`](TestApp::mount) runs the registered setup hooks around the
//! component's setup closure, and [`unmount`](TestApp::unmount) fires the
//! before-unmount hooks exactly once per component, parent first, then its
//! children.
//!
//! ```
//! use scopevm_core::{ScopeContext, ViewModel, ViewModelPlugin};
//! use scopevm_harness::TestApp;
//!
//! #[derive(Default)]
//! struct Greeting;
//! impl ViewModel for Greeting {}
//!
//! let context = ScopeContext::new();
//! let mut app = TestApp::new();
//! ViewModelPlugin::with_context(context.clone()).install(&mut app);
//!
//! let root = app.mount("root", |_| {
//!     context.view_model::<Greeting>(None).expect("setup runs inside a scope");
//! })?;
//! assert_eq!(root.held_view_models(), 1);
//!
//! app.unmount(&root)?;
//! assert_eq!(root.held_view_models(), 0);
//! # Ok::<(), scopevm_harness::HarnessError>(())
//! ```
//!
//! [`ViewModelPlugin`]: scopevm_core::ViewModelPlugin

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use scopevm_core::{
    BeforeUnmountHook, FnResolver, HostApp, OwnerRef, SetupHook, StoreSlot, TeardownError,
    ViewModelScope,
};

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by the test host.
#[derive(Debug)]
pub enum HarnessError {
    /// The component was already unmounted.
    AlreadyUnmounted {
        /// Component name.
        name: String,
    },
    /// A setup hook returned without running the component's setup.
    SetupNotRun {
        /// Component name.
        name: String,
    },
    /// A before-unmount hook failed.
    Teardown {
        /// Component name.
        name: String,
        /// The hook's error.
        source: TeardownError,
    },
}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyUnmounted { name } => {
                write!(f, "component `{name}` is already unmounted")
            }
            Self::SetupNotRun { name } => {
                write!(f, "setup hook skipped the setup of component `{name}`")
            }
            Self::Teardown { name, source } => {
                write!(f, "teardown of component `{name}` failed: {source}")
            }
        }
    }
}

impl std::error::Error for HarnessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Teardown { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ============================================================================
// Component
// ============================================================================

/// A mounted component instance.
pub struct TestComponent {
    name: String,
    slot: StoreSlot,
    unmounted: Cell<bool>,
    children: RefCell<Vec<Rc<TestComponent>>>,
}

impl TestComponent {
    fn new(name: String) -> Self {
        Self {
            name,
            slot: StoreSlot::new(),
            unmounted: Cell::new(false),
            children: RefCell::new(Vec::new()),
        }
    }

    /// Name given at mount.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether [`TestApp::unmount`] has run for this component.
    #[must_use]
    pub fn is_unmounted(&self) -> bool {
        self.unmounted.get()
    }

    /// Components mounted from inside this component's setup.
    #[must_use]
    pub fn children(&self) -> Vec<Rc<TestComponent>> {
        self.children.borrow().clone()
    }

    /// Number of view-models currently held; zero if no store exists yet.
    #[must_use]
    pub fn held_view_models(&self) -> usize {
        self.slot.get().map_or(0, |store| store.len())
    }

    /// Whether a view-model store was ever materialized.
    #[must_use]
    pub fn has_store(&self) -> bool {
        self.slot.is_materialized()
    }
}

impl ViewModelScope for TestComponent {
    fn store_slot(&self) -> &StoreSlot {
        &self.slot
    }
}

impl fmt::Debug for TestComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestComponent")
            .field("name", &self.name)
            .field("unmounted", &self.unmounted.get())
            .field("children", &self.children.borrow().len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// App
// ============================================================================

#[derive(Default)]
struct Hooks {
    setup: RefCell<Vec<SetupHook<TestComponent>>>,
    before_unmount: RefCell<Vec<BeforeUnmountHook<TestComponent>>>,
    initializing: RefCell<Vec<Rc<TestComponent>>>,
}

/// Pops the initializing stack on every exit from `mount`.
struct Initializing<'a> {
    stack: &'a RefCell<Vec<Rc<TestComponent>>>,
}

impl<'a> Initializing<'a> {
    fn push(stack: &'a RefCell<Vec<Rc<TestComponent>>>, component: Rc<TestComponent>) -> Self {
        stack.borrow_mut().push(component);
        Self { stack }
    }
}

impl Drop for Initializing<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

/// A minimal component host.
#[derive(Default)]
pub struct TestApp {
    hooks: Rc<Hooks>,
}

impl TestApp {
    /// App with no hooks registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a component and run `setup` wrapped in every setup hook.
    ///
    /// Calling `mount` from inside `setup` mounts a child of the component
    /// being set up.
    ///
    /// # Errors
    ///
    /// [`HarnessError::SetupNotRun`] if a hook returned without invoking the
    /// wrapped setup.
    pub fn mount<F>(
        &self,
        name: impl Into<String>,
        setup: F,
    ) -> Result<Rc<TestComponent>, HarnessError>
    where
        F: FnOnce(&Rc<TestComponent>),
    {
        let component = Rc::new(TestComponent::new(name.into()));
        if let Some(parent) = self.current_instance() {
            parent.children.borrow_mut().push(Rc::clone(&component));
        }

        let _initializing = Initializing::push(&self.hooks.initializing, Rc::clone(&component));
        let _span = tracing::debug_span!("mount", component = %component.name).entered();

        let mut setup = Some(setup);
        let mut run = || {
            if let Some(setup) = setup.take() {
                setup(&component);
            }
        };
        let hooks = self.hooks.setup.borrow();
        run_wrapped(&hooks, &component, &mut run);
        drop(hooks);

        if setup.is_some() {
            return Err(HarnessError::SetupNotRun {
                name: component.name.clone(),
            });
        }
        tracing::debug!("component mounted");
        Ok(component)
    }

    /// Fire the before-unmount hooks for `component`, then unmount its
    /// children in reverse mount order.
    ///
    /// Every hook and every child is processed even if one fails; the first
    /// failure is returned.
    ///
    /// # Errors
    ///
    /// - [`HarnessError::AlreadyUnmounted`] on a second call for the same
    ///   component. No hook runs.
    /// - [`HarnessError::Teardown`] if a hook failed.
    pub fn unmount(&self, component: &Rc<TestComponent>) -> Result<(), HarnessError> {
        if component.unmounted.replace(true) {
            return Err(HarnessError::AlreadyUnmounted {
                name: component.name.clone(),
            });
        }
        let _span = tracing::debug_span!("unmount", component = %component.name).entered();

        let mut first_error = None;
        for hook in self.hooks.before_unmount.borrow().iter() {
            if let Err(source) = hook(&**component) {
                tracing::warn!(error = %source, "before-unmount hook failed");
                first_error.get_or_insert(HarnessError::Teardown {
                    name: component.name.clone(),
                    source,
                });
            }
        }

        let children = component.children();
        for child in children.iter().rev() {
            if child.is_unmounted() {
                continue;
            }
            if let Err(err) = self.unmount(child) {
                first_error.get_or_insert(err);
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// The component whose setup is currently running, innermost first.
    #[must_use]
    pub fn current_instance(&self) -> Option<Rc<TestComponent>> {
        self.hooks.initializing.borrow().last().cloned()
    }

    /// Resolver backed by [`current_instance`](Self::current_instance), for
    /// plugins that skip scope activation.
    pub fn current_instance_resolver(&self) -> FnResolver<impl Fn() -> Option<OwnerRef> + use<>> {
        let hooks = Rc::clone(&self.hooks);
        FnResolver::new(move || {
            hooks
                .initializing
                .borrow()
                .last()
                .map(|component| Rc::clone(component) as OwnerRef)
        })
    }

    /// Number of registered setup hooks.
    #[must_use]
    pub fn setup_hook_count(&self) -> usize {
        self.hooks.setup.borrow().len()
    }

    /// Number of registered before-unmount hooks.
    #[must_use]
    pub fn before_unmount_hook_count(&self) -> usize {
        self.hooks.before_unmount.borrow().len()
    }
}

fn run_wrapped(
    hooks: &[SetupHook<TestComponent>],
    component: &Rc<TestComponent>,
    run: &mut dyn FnMut(),
) {
    match hooks.split_first() {
        None => run(),
        Some((hook, rest)) => hook(component, &mut || run_wrapped(rest, component, &mut *run)),
    }
}

impl HostApp for TestApp {
    type Component = TestComponent;

    fn on_setup(&mut self, hook: SetupHook<TestComponent>) {
        self.hooks.setup.borrow_mut().push(hook);
    }

    fn on_before_unmount(&mut self, hook: BeforeUnmountHook<TestComponent>) {
        self.hooks.before_unmount.borrow_mut().push(hook);
    }
}

impl fmt::Debug for TestApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestApp")
            .field("setup_hooks", &self.setup_hook_count())
            .field("before_unmount_hooks", &self.before_unmount_hook_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scopevm_core::{BoxError, ScopeContext, ViewModel, ViewModelPlugin, ViewModelProvider};

    #[derive(Default, Debug)]
    struct Counter {
        released: Cell<u32>,
    }
    impl ViewModel for Counter {
        fn release(&self) -> Result<(), BoxError> {
            self.released.set(self.released.get() + 1);
            Ok(())
        }
    }

    #[test]
    fn mount_without_hooks_runs_setup() {
        let app = TestApp::new();
        let ran = Cell::new(false);
        let component = app.mount("plain", |_| ran.set(true)).unwrap();
        assert!(ran.get());
        assert_eq!(component.name(), "plain");
        assert!(app.current_instance().is_none());
    }

    #[test]
    fn current_instance_tracks_nesting() {
        let app = TestApp::new();
        let parent = app
            .mount("parent", |me| {
                assert!(Rc::ptr_eq(&app.current_instance().unwrap(), me));
                app.mount("child", |child| {
                    assert!(Rc::ptr_eq(&app.current_instance().unwrap(), child));
                })
                .unwrap();
                assert!(Rc::ptr_eq(&app.current_instance().unwrap(), me));
            })
            .unwrap();
        assert_eq!(parent.children().len(), 1);
        assert_eq!(parent.children()[0].name(), "child");
    }

    #[test]
    fn skipping_hook_is_reported() {
        let mut app = TestApp::new();
        app.on_setup(Box::new(|_: &Rc<TestComponent>, _: &mut dyn FnMut()| {}));
        let err = app.mount("skipped", |_| {}).unwrap_err();
        assert!(matches!(err, HarnessError::SetupNotRun { ref name } if name == "skipped"));
    }

    #[test]
    fn second_unmount_is_rejected() {
        let mut app = TestApp::new();
        ViewModelPlugin::with_context(ScopeContext::new()).install(&mut app);
        let component = app.mount("once", |_| {}).unwrap();
        let vm = ViewModelProvider::new(&*component).get::<Counter>().unwrap();

        app.unmount(&component).unwrap();
        let err = app.unmount(&component).unwrap_err();
        assert!(matches!(err, HarnessError::AlreadyUnmounted { .. }));
        assert_eq!(vm.released.get(), 1);
    }

    #[test]
    fn debug_reports_hook_counts() {
        let mut app = TestApp::new();
        ViewModelPlugin::with_context(ScopeContext::new()).install(&mut app);
        let text = format!("{app:?}");
        assert!(text.contains("setup_hooks: 1"));
        assert!(text.contains("before_unmount_hooks: 1"));
    }
}

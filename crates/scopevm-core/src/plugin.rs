#![forbid(unsafe_code)]

//! Host framework integration.
//!
//! A host exposes two registration points through [`HostApp`]: a wrapper
//! around component setup and a pre-teardown notification.
//! [`ViewModelPlugin::install`] wires both for every component the host
//! creates:
//!
//! - setup runs inside a [`ScopeContext`] activation, so
//!   [`view_model`](crate::view_model) with no explicit owner resolves to the
//!   component being set up;
//! - before a component is destroyed its view-models are released through
//!   [`tear_down`].
//!
//! # Example
//!
//! ```ignore
//! let mut app = MyHost::new();
//! ViewModelPlugin::new().install(&mut app);
//! app.mount(root);
//! ```

use std::fmt;
use std::rc::Rc;

use crate::context::ScopeContext;
use crate::error::TeardownError;
use crate::lifecycle::tear_down;
use crate::owner::{OwnerRef, ViewModelStoreOwner};

/// Hook wrapped around a component's setup; it must call `run` exactly once.
pub type SetupHook<C> = Box<dyn Fn(&Rc<C>, &mut dyn FnMut())>;

/// Hook fired once right before a component is destroyed.
pub type BeforeUnmountHook<C> = Box<dyn Fn(&C) -> Result<(), TeardownError>>;

/// Registration points a host framework offers to plugins.
pub trait HostApp {
    /// The host's component instance type.
    type Component: ViewModelStoreOwner + 'static;

    /// Register a wrapper around every component's setup.
    fn on_setup(&mut self, hook: SetupHook<Self::Component>);

    /// Register a pre-teardown notification for every component.
    ///
    /// The host must call it at most once per component.
    fn on_before_unmount(&mut self, hook: BeforeUnmountHook<Self::Component>);
}

/// Plugin configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PluginOptions {
    /// Activate the component as the ambient scope while its setup runs.
    ///
    /// Turn this off when the host resolves the current component itself
    /// (see [`FnResolver`](crate::FnResolver)).
    pub activate_scope_on_setup: bool,

    /// Release the component's view-models before it is destroyed.
    pub release_on_unmount: bool,
}

impl Default for PluginOptions {
    fn default() -> Self {
        Self {
            activate_scope_on_setup: true,
            release_on_unmount: true,
        }
    }
}

impl PluginOptions {
    /// Set [`activate_scope_on_setup`](Self::activate_scope_on_setup).
    #[must_use]
    pub fn with_scope_activation(mut self, enabled: bool) -> Self {
        self.activate_scope_on_setup = enabled;
        self
    }

    /// Set [`release_on_unmount`](Self::release_on_unmount).
    #[must_use]
    pub fn with_release_on_unmount(mut self, enabled: bool) -> Self {
        self.release_on_unmount = enabled;
        self
    }
}

/// Installs view-model lifecycle handling into a host framework.
#[derive(Clone)]
pub struct ViewModelPlugin {
    context: ScopeContext,
    options: PluginOptions,
}

impl ViewModelPlugin {
    /// Plugin using the thread's global [`ScopeContext`] and default options.
    #[must_use]
    pub fn new() -> Self {
        Self::with_context(ScopeContext::global())
    }

    /// Plugin activating scopes on `context` instead of the global one.
    #[must_use]
    pub fn with_context(context: ScopeContext) -> Self {
        Self {
            context,
            options: PluginOptions::default(),
        }
    }

    /// Replace the options.
    #[must_use]
    pub fn with_options(mut self, options: PluginOptions) -> Self {
        self.options = options;
        self
    }

    /// The context setup hooks activate.
    #[must_use]
    pub fn context(&self) -> &ScopeContext {
        &self.context
    }

    /// Current options.
    #[must_use]
    pub fn options(&self) -> PluginOptions {
        self.options
    }

    /// Register this plugin's hooks with `app`.
    pub fn install<H: HostApp>(&self, app: &mut H) {
        if self.options.activate_scope_on_setup {
            app.on_setup(scope_activation_hook(self.context.clone()));
        }
        if self.options.release_on_unmount {
            app.on_before_unmount(release_hook());
        }
        tracing::debug!(options = ?self.options, "view-model plugin installed");
    }

    /// Release every view-model held by `owner`; the pre-teardown hook body.
    ///
    /// # Errors
    ///
    /// See [`tear_down`].
    pub fn tear_down<O>(owner: &O) -> Result<usize, TeardownError>
    where
        O: ViewModelStoreOwner + ?Sized,
    {
        tear_down(owner)
    }
}

fn scope_activation_hook<C>(context: ScopeContext) -> SetupHook<C>
where
    C: ViewModelStoreOwner + 'static,
{
    Box::new(move |component: &Rc<C>, run: &mut dyn FnMut()| {
        let owner: OwnerRef = Rc::clone(component) as OwnerRef;
        context.with_scope(owner, run);
    })
}

fn release_hook<C>() -> BeforeUnmountHook<C>
where
    C: ViewModelStoreOwner + 'static,
{
    Box::new(|component: &C| ViewModelPlugin::tear_down(component).map(|_| ()))
}

impl Default for ViewModelPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ViewModelPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewModelPlugin")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

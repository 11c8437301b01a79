#![forbid(unsafe_code)]

//! Integration tests: the view-model plugin driven by a component host.
//!
//! Run `RUST_LOG=debug cargo test -p scopevm-harness -- --nocapture` to see
//! the plugin's tracing output.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use scopevm_core::{
    BoxError, DefaultFactory, PluginOptions, ScopeContext, ViewModel, ViewModelError,
    ViewModelPlugin, factory_fn, resolve_view_model, view_model,
};
use scopevm_harness::{HarnessError, TestApp, TestComponent};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

fn app_with_plugin(context: &ScopeContext) -> TestApp {
    init_tracing();
    let mut app = TestApp::new();
    ViewModelPlugin::with_context(context.clone()).install(&mut app);
    app
}

#[derive(Default, Debug)]
struct Timer {
    running: Cell<bool>,
    released: Cell<u32>,
}

impl ViewModel for Timer {
    fn release(&self) -> Result<(), BoxError> {
        self.running.set(false);
        self.released.set(self.released.get() + 1);
        Ok(())
    }
}

#[derive(Default, Debug)]
struct Form {
    released: Cell<u32>,
}

impl ViewModel for Form {
    fn release(&self) -> Result<(), BoxError> {
        self.released.set(self.released.get() + 1);
        Ok(())
    }
}

#[derive(Default, Debug)]
struct Leaky;

impl ViewModel for Leaky {
    fn release(&self) -> Result<(), BoxError> {
        Err("subscription already dropped".into())
    }
}

// ============================================================================
// Setup
// ============================================================================

#[test]
fn setup_resolves_to_the_component_being_mounted() {
    let context = ScopeContext::new();
    let app = app_with_plugin(&context);

    let captured = RefCell::new(None);
    let component = app
        .mount("clock", |_| {
            let first = context.view_model::<Timer>(None).unwrap();
            let again = context.view_model::<Timer>(None).unwrap();
            assert!(Rc::ptr_eq(&first, &again));
            *captured.borrow_mut() = Some(first);
        })
        .unwrap();

    let timer = captured.into_inner().unwrap();
    let explicit = context.view_model::<Timer>(Some(&*component)).unwrap();
    assert!(Rc::ptr_eq(&timer, &explicit));
    assert!(!context.is_active());
}

#[test]
fn nested_mounts_bind_to_their_own_component() {
    let context = ScopeContext::new();
    let app = app_with_plugin(&context);

    let parent_form = RefCell::new(None);
    let child_form = RefCell::new(None);
    let parent = app
        .mount("page", |_| {
            let before = context.view_model::<Form>(None).unwrap();
            app.mount("dialog", |_| {
                *child_form.borrow_mut() = Some(context.view_model::<Form>(None).unwrap());
            })
            .unwrap();
            let after = context.view_model::<Form>(None).unwrap();
            assert!(Rc::ptr_eq(&before, &after));
            *parent_form.borrow_mut() = Some(after);
        })
        .unwrap();

    let parent_form = parent_form.into_inner().unwrap();
    let child_form = child_form.into_inner().unwrap();
    assert!(!Rc::ptr_eq(&parent_form, &child_form));
    assert_eq!(parent.children().len(), 1);
    assert_eq!(parent.children()[0].held_view_models(), 1);
}

#[test]
fn resolution_outside_setup_fails_without_side_effects() {
    let context = ScopeContext::new();
    let app = app_with_plugin(&context);
    let component = app.mount("idle", |_| {}).unwrap();

    let err = context.view_model::<Timer>(None).unwrap_err();
    assert!(matches!(err, ViewModelError::NoActiveScope));
    assert!(!component.has_store());
}

#[test]
fn setup_factory_with_arguments() {
    #[derive(Debug)]
    struct Titled {
        title: String,
    }
    impl ViewModel for Titled {}

    let context = ScopeContext::new();
    let app = app_with_plugin(&context);
    let title = RefCell::new(String::new());
    app.mount("titled", |_| {
        let vm = context
            .view_model_with(None, factory_fn(|| Ok(Titled { title: "Inbox".into() })))
            .unwrap();
        title.borrow_mut().clone_from(&vm.title);
    })
    .unwrap();
    assert_eq!(title.into_inner(), "Inbox");
}

#[test]
fn global_context_is_used_by_default() {
    init_tracing();
    let mut app = TestApp::new();
    ViewModelPlugin::new().install(&mut app);

    let component = app
        .mount("global", |_| {
            view_model::<Timer>(None).unwrap();
        })
        .unwrap();
    assert_eq!(component.held_view_models(), 1);
    assert!(!ScopeContext::global().is_active());
    app.unmount(&component).unwrap();
}

// ============================================================================
// Unmount
// ============================================================================

#[test]
fn view_models_live_until_unmount() {
    let context = ScopeContext::new();
    let app = app_with_plugin(&context);

    let timer = RefCell::new(None);
    let component = app
        .mount("ticker", |_| {
            let vm = context.view_model::<Timer>(None).unwrap();
            vm.running.set(true);
            *timer.borrow_mut() = Some(vm);
        })
        .unwrap();
    let timer = timer.into_inner().unwrap();

    assert!(timer.running.get());
    assert_eq!(timer.released.get(), 0);

    app.unmount(&component).unwrap();
    assert!(!timer.running.get());
    assert_eq!(timer.released.get(), 1);
    assert_eq!(component.held_view_models(), 0);
    assert!(component.is_unmounted());
}

#[test]
fn parent_and_children_each_release_once() {
    let context = ScopeContext::new();
    let app = app_with_plugin(&context);

    let forms = RefCell::new(Vec::new());
    let parent = app
        .mount("list", |_| {
            forms.borrow_mut().push(context.view_model::<Form>(None).unwrap());
            for name in ["row-1", "row-2", "row-3"] {
                app.mount(name, |_| {
                    forms.borrow_mut().push(context.view_model::<Form>(None).unwrap());
                })
                .unwrap();
            }
        })
        .unwrap();

    app.unmount(&parent).unwrap();
    let forms = forms.into_inner();
    assert_eq!(forms.len(), 4);
    for form in &forms {
        assert_eq!(form.released.get(), 1);
    }
    assert!(parent.children().iter().all(|child| child.is_unmounted()));
}

#[test]
fn child_unmounted_early_is_not_released_twice() {
    let context = ScopeContext::new();
    let app = app_with_plugin(&context);

    let child = RefCell::new(None);
    let form = RefCell::new(None);
    let parent = app
        .mount("panel", |_| {
            let mounted = app
                .mount("tab", |_| {
                    *form.borrow_mut() = Some(context.view_model::<Form>(None).unwrap());
                })
                .unwrap();
            *child.borrow_mut() = Some(mounted);
        })
        .unwrap();
    let child: Rc<TestComponent> = child.into_inner().unwrap();
    let form = form.into_inner().unwrap();

    app.unmount(&child).unwrap();
    app.unmount(&parent).unwrap();
    assert_eq!(form.released.get(), 1);
}

#[test]
fn second_unmount_is_rejected_without_rerelease() {
    let context = ScopeContext::new();
    let app = app_with_plugin(&context);

    let timer = RefCell::new(None);
    let component = app
        .mount("once", |_| {
            *timer.borrow_mut() = Some(context.view_model::<Timer>(None).unwrap());
        })
        .unwrap();

    app.unmount(&component).unwrap();
    let err = app.unmount(&component).unwrap_err();
    assert!(matches!(err, HarnessError::AlreadyUnmounted { ref name } if name == "once"));
    assert_eq!(timer.into_inner().unwrap().released.get(), 1);
}

#[test]
fn unmanaged_component_unmounts_cleanly() {
    let context = ScopeContext::new();
    let app = app_with_plugin(&context);
    let component = app.mount("static", |_| {}).unwrap();

    app.unmount(&component).unwrap();
    assert!(!component.has_store());
}

#[test]
fn release_failure_surfaces_after_releasing_siblings() {
    let context = ScopeContext::new();
    let app = app_with_plugin(&context);

    let timer = RefCell::new(None);
    let component = app
        .mount("flaky", |_| {
            context.view_model::<Leaky>(None).unwrap();
            *timer.borrow_mut() = Some(context.view_model::<Timer>(None).unwrap());
        })
        .unwrap();

    let err = app.unmount(&component).unwrap_err();
    let HarnessError::Teardown { name, source } = err else {
        panic!("expected a teardown failure");
    };
    assert_eq!(name, "flaky");
    assert_eq!(source.released(), 2);
    assert_eq!(source.failures().len(), 1);
    assert!(source.failures()[0].key.is::<Leaky>());
    assert_eq!(timer.into_inner().unwrap().released.get(), 1);
    assert_eq!(component.held_view_models(), 0);
}

#[test]
fn release_disabled_keeps_view_models() {
    init_tracing();
    let context = ScopeContext::new();
    let mut app = TestApp::new();
    ViewModelPlugin::with_context(context.clone())
        .with_options(PluginOptions::default().with_release_on_unmount(false))
        .install(&mut app);
    assert_eq!(app.before_unmount_hook_count(), 0);

    let component = app
        .mount("kept", |_| {
            context.view_model::<Form>(None).unwrap();
        })
        .unwrap();
    app.unmount(&component).unwrap();
    assert_eq!(component.held_view_models(), 1);

    ViewModelPlugin::tear_down(&*component).unwrap();
    assert_eq!(component.held_view_models(), 0);
}

// ============================================================================
// Delegated resolution
// ============================================================================

#[test]
fn host_resolver_replaces_scope_activation() {
    init_tracing();
    let context = ScopeContext::new();
    let mut app = TestApp::new();
    ViewModelPlugin::with_context(context.clone())
        .with_options(PluginOptions::default().with_scope_activation(false))
        .install(&mut app);
    assert_eq!(app.setup_hook_count(), 0);

    let resolver = app.current_instance_resolver();
    let form = RefCell::new(None);
    let component = app
        .mount("delegated", |_| {
            assert!(!context.is_active());
            let vm = resolve_view_model::<Form, _, _>(&resolver, None, DefaultFactory).unwrap();
            *form.borrow_mut() = Some(vm);
        })
        .unwrap();

    let form = form.into_inner().unwrap();
    assert_eq!(component.held_view_models(), 1);
    let err = resolve_view_model::<Form, _, _>(&resolver, None, DefaultFactory).unwrap_err();
    assert!(matches!(err, ViewModelError::NoActiveScope));

    app.unmount(&component).unwrap();
    assert_eq!(form.released.get(), 1);
}

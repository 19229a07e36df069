//! Dispatcher tests with a custom entity class.
//!
//! These tests do not touch the process-wide dispatcher.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use nixmx::{bindings, Dispatcher, Entity, HostValue, Options, Registry};

#[derive(Clone)]
struct Widget {
    size: Arc<Mutex<f64>>,
    grown: Arc<AtomicUsize>,
}

impl Widget {
    fn new(size: f64) -> Self {
        Self {
            size: Arc::new(Mutex::new(size)),
            grown: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn size(&self) -> f64 {
        *self.size.lock().unwrap()
    }

    fn grow(&self, by: f64) {
        *self.size.lock().unwrap() += by;
        self.grown.fetch_add(1, Ordering::SeqCst);
    }
}

impl Entity for Widget {
    const CLASS: &'static str = "Widget";

    fn updated_at(&self) -> nixmx::store::Result<i64> {
        Ok(1_700_000_000)
    }
}

nixmx::entity_to_host!(Widget);
nixmx::entity_from_arg!(Widget);

fn dispatcher(widget: Widget) -> Dispatcher {
    let mut registry = Registry::new();
    bindings::register_all(&mut registry).expect("store bindings should register");

    let template = widget.clone();
    registry
        .classdef::<Widget>("Widget")
        .add("create", move |_, output| output.set(0, template.clone()))
        .getter("size", |w: &Widget| Ok::<_, nixmx::Error>(w.size()))
        .setter("grow", |w: &Widget, by: f64| {
            w.grow(by);
            Ok::<_, nixmx::Error>(())
        })
        .finish()
        .expect("widget bindings should register");

    Dispatcher::new(registry, Options::default())
}

fn call(d: &Dispatcher, nlhs: usize, args: Vec<HostValue>) -> Vec<Option<HostValue>> {
    d.call(nlhs, &args).expect("call should succeed")
}

fn token(slots: Vec<Option<HostValue>>) -> HostValue {
    slots
        .into_iter()
        .next()
        .flatten()
        .expect("a handle should be returned")
}

#[test]
fn test_custom_entity_round_trip() {
    let d = dispatcher(Widget::new(2.0));
    let widget = token(call(&d, 1, vec![HostValue::string("Widget::create")]));
    assert!(widget.scalar_value::<u64>().is_some());

    call(
        &d,
        0,
        vec![
            HostValue::string("Widget::grow"),
            widget.clone(),
            HostValue::scalar(1.5f64),
        ],
    );

    let size = call(&d, 1, vec![HostValue::string("Widget::size"), widget.clone()]);
    assert_eq!(size, vec![Some(HostValue::scalar(3.5f64))]);

    let updated = call(&d, 1, vec![HostValue::string("Entity::updatedAt"), widget.clone()]);
    assert_eq!(updated, vec![Some(HostValue::scalar(1_700_000_000u64))]);

    call(&d, 0, vec![HostValue::string("Entity::destroy"), widget]);
}

#[test]
fn test_unknown_command() {
    let d = dispatcher(Widget::new(0.0));
    let err = d
        .call(1, &[HostValue::string("Widget::explode")])
        .unwrap_err();
    assert_eq!(err.identifier, "nix:arg:dispatch");
    assert!(err.message.contains("Widget::explode"), "{}", err.message);
}

#[test]
fn test_bad_arguments_have_no_side_effects() {
    let widget = Widget::new(1.0);
    let d = dispatcher(widget.clone());
    let handle = token(call(&d, 1, vec![HostValue::string("Widget::create")]));

    let err = d
        .call(
            0,
            &[
                HostValue::string("Widget::grow"),
                handle.clone(),
                HostValue::string("a lot"),
            ],
        )
        .unwrap_err();
    assert_eq!(err.identifier, "nix:arg:inval");
    assert!(err.message.starts_with("Widget::grow: "), "{}", err.message);
    assert_eq!(widget.grown.load(Ordering::SeqCst), 0);
    assert_eq!(widget.size(), 1.0);

    call(&d, 0, vec![HostValue::string("Entity::destroy"), handle]);
}

#[test]
fn test_destroyed_handle_is_empty() {
    let d = dispatcher(Widget::new(0.0));
    let handle = token(call(&d, 1, vec![HostValue::string("Widget::create")]));
    call(&d, 0, vec![HostValue::string("Entity::destroy"), handle.clone()]);

    let err = d
        .call(1, &[HostValue::string("Entity::updatedAt"), handle.clone()])
        .unwrap_err();
    assert_eq!(err.identifier, "nix:handle:empty");

    let err = d
        .call(0, &[HostValue::string("Entity::destroy"), handle])
        .unwrap_err();
    assert_eq!(err.identifier, "nix:handle:empty");
}

#[test]
fn test_handle_of_wrong_class() {
    let d = dispatcher(Widget::new(0.0));
    let handle = token(call(&d, 1, vec![HostValue::string("Widget::create")]));

    let err = d
        .call(1, &[HostValue::string("Block::describe"), handle.clone()])
        .unwrap_err();
    assert_eq!(err.identifier, "nix:handle:type");
    assert!(err.message.contains("Widget"), "{}", err.message);

    call(&d, 0, vec![HostValue::string("Entity::destroy"), handle]);
}

#[test]
fn test_duplicate_class_is_rejected() {
    let mut registry = Registry::new();
    bindings::register_all(&mut registry).unwrap();
    let err = bindings::register_all(&mut registry).unwrap_err();
    assert!(matches!(err, nixmx::Error::DuplicateCommand(_)));
}

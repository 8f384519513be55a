//! End-to-end propagation behavior over small trees: status and value
//! aggregation, interaction flags, async supersession, deferred
//! commits, and structural edits.

use std::cell::RefCell;
use std::rc::Rc;

use reform_model::{
    AsyncValidatorFn, ControlOptions, ControlRef, ControlStatus, FormArray, FormControl, FormError, FormGroup,
    FormState, Resolver, SetValueOptions, Task, UpdateOn, UpdateOptions, ValidationErrors,
    ValidatorFn, Value, async_validator, errors, validator,
};

fn required() -> ValidatorFn {
    validator(|c| c.value().is_null().then(|| errors! { "required" => true }))
}

fn min_int(min: i64) -> ValidatorFn {
    validator(move |c| match c.value() {
        Value::Int(n) if n < min => Some(errors! { "min" => min }),
        _ => None,
    })
}

type Resolvers = Rc<RefCell<Vec<Resolver<Option<ValidationErrors>>>>>;

/// An async validator whose resolution the test drives by hand.
fn manual_async() -> (AsyncValidatorFn, Resolvers) {
    let resolvers: Resolvers = Rc::default();
    let inner = Rc::clone(&resolvers);
    let f = async_validator(move |_| {
        let (task, resolver) = Task::pending();
        inner.borrow_mut().push(resolver);
        task
    });
    (f, resolvers)
}

fn recorded_values(control: &reform_model::ControlRef) -> (Rc<RefCell<Vec<Value>>>, reform_model::Subscription) {
    let seen: Rc<RefCell<Vec<Value>>> = Rc::default();
    let sink = Rc::clone(&seen);
    let sub = control
        .value_changes()
        .subscribe(move |v: &Value| sink.borrow_mut().push(v.clone()));
    (seen, sub)
}

fn recorded_statuses(
    control: &reform_model::ControlRef,
) -> (Rc<RefCell<Vec<ControlStatus>>>, reform_model::Subscription) {
    let seen: Rc<RefCell<Vec<ControlStatus>>> = Rc::default();
    let sink = Rc::clone(&seen);
    let sub = control
        .status_changes()
        .subscribe(move |s: &ControlStatus| sink.borrow_mut().push(*s));
    (seen, sub)
}

// ---------------------------------------------------------------------------
// Status aggregation
// ---------------------------------------------------------------------------

#[test]
fn control_starts_valid_without_validators() {
    let control = FormControl::new(1);
    assert_eq!(control.status(), ControlStatus::Valid);
    assert!(control.pristine());
    assert!(control.untouched());
    assert_eq!(control.value(), Value::Int(1));
}

#[test]
fn invalid_child_invalidates_group_and_recovers() {
    let a = FormControl::with_options(Value::Int(1), ControlOptions::new().validator(required()));
    let b = FormControl::new("x");
    let group = FormGroup::new([("a", a), ("b", b)]);
    assert!(group.valid());

    let a = group.get("a").unwrap();
    a.set_value(Value::Null, UpdateOptions::default()).unwrap();
    assert!(group.invalid(), "enabled invalid child must invalidate the group");
    assert!(
        group.errors().is_none(),
        "aggregate invalidity carries no local errors"
    );

    a.set_value(Value::Int(1), UpdateOptions::default()).unwrap();
    assert!(group.valid(), "group must recover once the child passes");
}

#[test]
fn group_own_validator_beats_child_validity() {
    let group = FormGroup::with_options(
        [("a", FormControl::new(1))],
        ControlOptions::new().validator(validator(|_| Some(errors! { "forbidden" => true }))),
    );
    assert!(group.invalid());
    assert_eq!(group.get_error("forbidden", None), Some(Value::Bool(true)));
}

#[test]
fn nested_invalidity_reaches_the_root() {
    let city = FormControl::with_options(Value::Str("Oslo".into()), ControlOptions::new().validator(required()));
    let address = FormGroup::new([("city", city)]);
    let form = FormGroup::new([("address", address)]);
    assert!(form.valid());

    form.get("address.city")
        .unwrap()
        .set_value(Value::Null, UpdateOptions::default())
        .unwrap();
    assert!(form.get("address").unwrap().invalid());
    assert!(form.invalid());
}

// ---------------------------------------------------------------------------
// Disabled aggregation and value exclusion
// ---------------------------------------------------------------------------

#[test]
fn group_disabled_iff_every_child_disabled() {
    let group = FormGroup::new([("a", FormControl::new(1)), ("b", FormControl::new(2))]);

    group.get("a").unwrap().disable(UpdateOptions::default());
    assert!(group.enabled(), "one enabled child keeps the group enabled");

    group.get("b").unwrap().disable(UpdateOptions::default());
    assert!(group.disabled(), "all children disabled disables the group");

    group.get("a").unwrap().enable(UpdateOptions::default());
    assert!(group.enabled());
}

#[test]
fn empty_group_disabled_only_explicitly() {
    let group = FormGroup::new(Vec::<(String, FormControl)>::new());
    assert!(group.enabled());

    group.disable(UpdateOptions::default());
    assert!(group.disabled());

    group.update_value_and_validity(UpdateOptions::default());
    assert!(group.disabled(), "revalidation must not resurrect an empty disabled group");

    group.enable(UpdateOptions::default());
    assert!(group.enabled());
}

#[test]
fn disabled_children_are_excluded_from_value_but_not_raw_value() {
    let group = FormGroup::new([("a", FormControl::new(1)), ("b", FormControl::new(2))]);
    group.get("b").unwrap().disable(UpdateOptions::default());

    assert_eq!(group.value(), Value::map([("a", 1)]));
    assert_eq!(group.raw_value(), Value::map([("a", 1), ("b", 2)]));
}

#[test]
fn fully_disabled_group_value_includes_everything() {
    let group = FormGroup::new([("a", FormControl::new(1)), ("b", FormControl::new(2))]);
    group.disable(UpdateOptions::default());
    assert_eq!(group.value(), Value::map([("a", 1), ("b", 2)]));
}

#[test]
fn disable_clears_errors_and_exempts_from_validation() {
    let control = FormControl::with_options(Value::Null, ControlOptions::new().validator(required()));
    assert!(control.invalid());

    control.disable(UpdateOptions::default());
    assert_eq!(control.status(), ControlStatus::Disabled);
    assert!(control.errors().is_none(), "disabling clears local errors");

    control.enable(UpdateOptions::default());
    assert!(control.invalid(), "enabling revalidates");
}

#[test]
fn disabling_the_only_invalid_child_restores_the_parent() {
    let a = FormControl::with_options(Value::Null, ControlOptions::new().validator(required()));
    let group = FormGroup::new([("a", a), ("b", FormControl::new(1))]);
    assert!(group.invalid());

    group.get("a").unwrap().disable(UpdateOptions::default());
    assert!(group.valid(), "disabled children do not count against the parent");
}

#[test]
fn disable_preserves_intentionally_dirty_parent() {
    let group = FormGroup::new([("a", FormControl::new(1)), ("b", FormControl::new(2))]);
    group.mark_as_dirty(UpdateOptions::default());

    group.get("a").unwrap().disable(UpdateOptions::default());
    assert!(
        group.dirty(),
        "disabling a child must not reset a directly-dirtied parent"
    );
}

#[test]
fn disable_recomputes_parent_dirtiness_from_children() {
    let group = FormGroup::new([("a", FormControl::new(1)), ("b", FormControl::new(2))]);
    let a = group.get("a").unwrap();
    a.mark_as_dirty(UpdateOptions::default());
    assert!(group.dirty());

    a.disable(UpdateOptions::default());
    assert!(
        group.pristine(),
        "with the only dirty child disabled the parent is pristine again"
    );
}

#[test]
fn disabled_change_callbacks_fire_with_the_new_state() {
    let control = FormControl::new(1);
    let seen: Rc<RefCell<Vec<bool>>> = Rc::default();
    let sink = Rc::clone(&seen);
    let callback: reform_model::DisabledChangeCallback = Rc::new(move |disabled| sink.borrow_mut().push(disabled));
    control.register_on_disabled_change(Rc::clone(&callback));

    control.disable(UpdateOptions::default());
    control.enable(UpdateOptions::default());
    assert_eq!(*seen.borrow(), vec![true, false]);

    control.unregister_on_disabled_change(&callback);
    control.disable(UpdateOptions::default());
    assert_eq!(seen.borrow().len(), 2, "unregistered callback stays silent");
}

#[test]
fn view_sync_callbacks_fire_on_committed_writes() {
    let control = FormControl::new(1);
    let seen: Rc<RefCell<Vec<(Value, bool)>>> = Rc::default();
    let sink = Rc::clone(&seen);
    let callback: reform_model::ViewChangeCallback = Rc::new(move |value, emit_view_to_model| {
        sink.borrow_mut().push((value.clone(), emit_view_to_model));
    });
    control.register_on_change(Rc::clone(&callback));

    control.set_value(2, SetValueOptions::default());
    control.set_value(
        3,
        SetValueOptions {
            emit_view_to_model: false,
            ..SetValueOptions::default()
        },
    );
    assert_eq!(
        *seen.borrow(),
        vec![(Value::Int(2), true), (Value::Int(3), false)],
        "each committed write reaches the view with its view-to-model flag"
    );

    // A write that originated in the view skips the model-to-view sync.
    control.set_value(
        4,
        SetValueOptions {
            emit_model_to_view: false,
            ..SetValueOptions::default()
        },
    );
    assert_eq!(seen.borrow().len(), 2);
    assert_eq!(control.value(), Value::Int(4));

    control.unregister_on_change(&callback);
    control.set_value(5, SetValueOptions::default());
    assert_eq!(seen.borrow().len(), 2, "unregistered callback stays silent");
}

// ---------------------------------------------------------------------------
// Strict and lenient writes
// ---------------------------------------------------------------------------

#[test]
fn strict_set_value_rejects_unknown_and_missing_keys() {
    let group = FormGroup::new([("a", FormControl::new(Value::Null))]);

    let err = group
        .set_value(Value::map([("b", 1)]), UpdateOptions::default())
        .unwrap_err();
    assert!(matches!(err, FormError::MissingControl { .. }), "unknown key: {err}");

    let err = group
        .set_value(Value::map(Vec::<(String, Value)>::new()), UpdateOptions::default())
        .unwrap_err();
    assert!(
        matches!(err, FormError::MissingControlValue { .. }),
        "missing entry: {err}"
    );
}

#[test]
fn strict_set_value_on_empty_collections_fails() {
    let group = FormGroup::new(Vec::<(String, FormControl)>::new());
    let err = group
        .set_value(Value::map(Vec::<(String, Value)>::new()), UpdateOptions::default())
        .unwrap_err();
    assert!(matches!(err, FormError::NoControls { .. }));

    let array = FormArray::new(Vec::<FormControl>::new());
    let err = array
        .set_value(Value::list(Vec::<Value>::new()), UpdateOptions::default())
        .unwrap_err();
    assert!(matches!(err, FormError::NoControls { .. }));
}

#[test]
fn strict_set_value_writes_every_child() {
    let group = FormGroup::new([("a", FormControl::new(1)), ("b", FormControl::new(2))]);
    group
        .set_value(Value::map([("a", 10), ("b", 20)]), UpdateOptions::default())
        .unwrap();
    assert_eq!(group.value(), Value::map([("a", 10), ("b", 20)]));
    assert!(group.dirty(), "the public value-setting path marks dirty");
}

#[test]
fn array_strict_set_value_checks_length() {
    let array = FormArray::new([FormControl::new(1), FormControl::new(2)]);

    let err = array
        .set_value(Value::list([1, 2, 3]), UpdateOptions::default())
        .unwrap_err();
    assert!(matches!(err, FormError::MissingControl { .. }), "too long: {err}");

    let err = array
        .set_value(Value::list([1]), UpdateOptions::default())
        .unwrap_err();
    assert!(matches!(err, FormError::MissingControlValue { .. }), "too short: {err}");

    array
        .set_value(Value::list([7, 8]), UpdateOptions::default())
        .unwrap();
    assert_eq!(array.value(), Value::list([7, 8]));
}

#[test]
fn patch_value_merges_without_complaint() {
    let group = FormGroup::new([("a", FormControl::new(1)), ("b", FormControl::new(2))]);
    group.patch_value(Value::map([("a", 9)]), UpdateOptions::default());
    assert_eq!(group.value(), Value::map([("a", 9), ("b", 2)]));

    // Unknown keys are ignored.
    group.patch_value(Value::map([("zzz", 1)]), UpdateOptions::default());
    assert_eq!(group.value(), Value::map([("a", 9), ("b", 2)]));
}

#[test]
fn patch_value_null_is_a_no_op() {
    let group = FormGroup::new([("a", FormControl::new(1))]);
    group.patch_value(Value::Null, UpdateOptions::default());
    assert_eq!(group.value(), Value::map([("a", 1)]));
    assert!(group.pristine(), "a whole-tree null patch changes nothing");
}

#[test]
fn nested_patch_reaches_inner_groups() {
    let address = FormGroup::new([("city", FormControl::new("Oslo")), ("zip", FormControl::new("0150"))]);
    let form = FormGroup::new([
        ("name", ControlRef::from(FormControl::new("Ada"))),
        ("address", address.into()),
    ]);

    form.patch_value(
        Value::map([("address", Value::map([("city", "Bergen")]))]),
        UpdateOptions::default(),
    );
    assert_eq!(
        form.value(),
        Value::map([
            ("name", Value::from("Ada")),
            ("address", Value::map([("city", "Bergen"), ("zip", "0150")])),
        ])
    );
}

#[test]
fn set_value_round_trip_is_stable() {
    let group = FormGroup::new([
        ("a", FormControl::with_options(Value::Int(5), ControlOptions::new().validator(min_int(3)))),
        ("b", FormControl::new("x")),
    ]);

    group.set_value(group.value(), UpdateOptions::default()).unwrap();
    let (value1, status1, dirty1) = (group.value(), group.status(), group.dirty());

    group.set_value(group.value(), UpdateOptions::default()).unwrap();
    assert_eq!(group.value(), value1);
    assert_eq!(group.status(), status1);
    assert_eq!(group.dirty(), dirty1);
}

// ---------------------------------------------------------------------------
// Interaction flags
// ---------------------------------------------------------------------------

#[test]
fn touched_bubbles_up_but_not_down() {
    let group = FormGroup::new([("a", FormControl::new(1))]);
    let a = group.get("a").unwrap();

    a.mark_as_touched(UpdateOptions::default());
    assert!(group.touched(), "child touch must bubble to the parent");

    let fresh = FormGroup::new([("b", FormControl::new(2))]);
    fresh.mark_as_touched(UpdateOptions::default());
    assert!(
        fresh.get("b").unwrap().untouched(),
        "touching the parent must not touch children"
    );
}

#[test]
fn mark_all_as_touched_pushes_down() {
    let inner = FormGroup::new([("x", FormControl::new(1))]);
    let form = FormGroup::new([
        ("inner", ControlRef::from(inner)),
        ("y", FormControl::new(2).into()),
    ]);

    form.mark_all_as_touched();
    assert!(form.touched());
    assert!(form.get("inner").unwrap().touched());
    assert!(form.get("inner.x").unwrap().touched());
    assert!(form.get("y").unwrap().touched());
}

#[test]
fn untouch_recomputes_ancestors_from_siblings() {
    let group = FormGroup::new([("a", FormControl::new(1)), ("b", FormControl::new(2))]);
    let a = group.get("a").unwrap();
    let b = group.get("b").unwrap();

    a.mark_as_touched(UpdateOptions::default());
    b.mark_as_touched(UpdateOptions::default());

    a.mark_as_untouched(UpdateOptions::default());
    assert!(group.touched(), "a still-touched sibling keeps the parent touched");

    b.mark_as_untouched(UpdateOptions::default());
    assert!(group.untouched());
}

#[test]
fn dirty_bubbles_and_pristine_recomputes() {
    let group = FormGroup::new([("a", FormControl::new(1))]);
    let a = group.get("a").unwrap();

    a.set_value(Value::Int(2), UpdateOptions::default()).unwrap();
    assert!(a.dirty(), "value writes dirty the control");
    assert!(group.dirty(), "dirtiness bubbles");

    group.mark_as_pristine(UpdateOptions::default());
    assert!(group.pristine());
    assert!(a.pristine(), "pristine pushes down");
}

#[test]
fn mark_as_pending_bubbles() {
    let group = FormGroup::new([("a", FormControl::new(1))]);
    group.get("a").unwrap().mark_as_pending(UpdateOptions::default());
    assert!(group.pending());
}

// ---------------------------------------------------------------------------
// Async validation
// ---------------------------------------------------------------------------

#[test]
fn async_validator_runs_at_construction() {
    let (av, resolvers) = manual_async();
    let control = FormControl::with_options(Value::Int(1), ControlOptions::new().async_validator(av));
    assert!(control.pending());
    assert_eq!(resolvers.borrow().len(), 1);

    resolvers.borrow_mut().pop().unwrap().resolve(None);
    assert!(control.valid());
}

#[test]
fn async_result_sets_errors() {
    let (av, resolvers) = manual_async();
    let control = FormControl::with_options(Value::Int(1), ControlOptions::new().async_validator(av));

    let resolver = resolvers.borrow_mut().pop().unwrap();
    resolver.resolve(Some(errors! { "taken" => true }));
    assert!(control.invalid());
    assert!(control.has_error("taken", None));
}

#[test]
fn superseded_async_result_is_discarded() {
    let (av, resolvers) = manual_async();
    let control = FormControl::with_options(Value::Null, ControlOptions::new().async_validator(av));

    control.set_value(1, SetValueOptions::default());
    control.set_value(2, SetValueOptions::default());
    assert_eq!(resolvers.borrow().len(), 3, "construction plus two writes");

    let mut pending = resolvers.borrow_mut().drain(..).collect::<Vec<_>>();
    let last = pending.pop().unwrap();
    // Older validations resolve late with errors; both were superseded.
    for resolver in pending {
        resolver.resolve(Some(errors! { "stale" => true }));
    }
    assert!(control.pending(), "superseded deliveries must not land");

    last.resolve(None);
    assert!(control.valid(), "only the newest validation decides");
    assert!(control.errors().is_none());
}

#[test]
fn sync_failure_skips_async_validation() {
    let (av, resolvers) = manual_async();
    let control = FormControl::with_options(
        Value::Null,
        ControlOptions::new().validator(required()).async_validator(av),
    );
    assert!(control.invalid(), "sync errors decide immediately");
    assert!(
        resolvers.borrow().is_empty(),
        "async validation only runs when sync validation passes"
    );
}

#[test]
fn pending_child_makes_group_pending() {
    let (av, resolvers) = manual_async();
    let a = FormControl::with_options(Value::Int(1), ControlOptions::new().async_validator(av));
    let group = FormGroup::new([("a", a)]);
    assert!(group.pending());

    resolvers.borrow_mut().pop().unwrap().resolve(None);
    assert!(group.valid(), "resolution propagates status to the parent");
}

// ---------------------------------------------------------------------------
// Manual errors
// ---------------------------------------------------------------------------

#[test]
fn set_errors_updates_status_up_the_tree() {
    let group = FormGroup::new([("a", FormControl::new(1))]);
    let a = group.get("a").unwrap();

    a.set_errors(Some(errors! { "server" => "rejected" }), true);
    assert!(a.invalid());
    assert!(group.invalid());
    assert_eq!(
        group.get_error("server", Some("a")),
        Some(Value::Str("rejected".into()))
    );

    a.set_errors(None, true);
    assert!(a.valid());
    assert!(group.valid());
}

#[test]
fn silent_error_injection_skips_status_streams() {
    let group = FormGroup::new([("a", FormControl::new(1))]);
    let a = group.get("a").unwrap();
    let (child_statuses, _s1) = recorded_statuses(&a);
    let (group_statuses, _s2) = recorded_statuses(&(&group).into());

    a.set_errors(Some(errors! { "server" => true }), false);
    assert!(a.invalid());
    assert!(group.invalid(), "the upward status pass runs regardless of the emit flag");
    assert!(child_statuses.borrow().is_empty());
    assert!(group_statuses.borrow().is_empty());
}

#[test]
fn revalidation_overwrites_manual_errors() {
    let control = FormControl::new(1);
    control.set_errors(Some(errors! { "server" => true }), true);
    assert!(control.invalid());

    control.update_value_and_validity(UpdateOptions::default());
    assert!(control.valid(), "the sync validator run replaces injected errors");
}

// ---------------------------------------------------------------------------
// Reset
// ---------------------------------------------------------------------------

#[test]
fn reset_restores_default_value_pristine_untouched() {
    let control = FormControl::new(7);
    control.set_value(99, SetValueOptions::default());
    control.mark_as_touched(UpdateOptions::default());

    control.reset(UpdateOptions::default());
    assert_eq!(control.value(), control.default_value());
    assert_eq!(control.value(), Value::Int(7));
    assert!(control.pristine());
    assert!(control.untouched());
}

#[test]
fn group_reset_with_explicit_values() {
    let group = FormGroup::new([("a", FormControl::new(1)), ("b", FormControl::new(2))]);
    group
        .set_value(Value::map([("a", 10), ("b", 20)]), UpdateOptions::default())
        .unwrap();

    group.reset_to(Value::map([("a", 5)]), UpdateOptions::default());
    assert_eq!(
        group.value(),
        Value::map([("a", Value::Int(5)), ("b", Value::Int(2))]),
        "entries absent from the reset value fall back to child defaults"
    );
    assert!(group.pristine());
}

#[test]
fn reset_to_boxed_state_disables() {
    let control = FormControl::new(1);
    control.reset_to(FormState::disabled(0), UpdateOptions::default());
    assert!(control.disabled());
    assert_eq!(control.value(), Value::Int(0));

    control.reset_to(Value::Int(3), UpdateOptions::default());
    assert!(
        control.disabled(),
        "a plain reset value leaves the disabled state alone"
    );
}

#[test]
fn reset_preserves_disabled_children() {
    let group = FormGroup::new([("a", FormControl::new(1)), ("b", FormControl::new(2))]);
    group.get("b").unwrap().disable(UpdateOptions::default());

    group.reset(UpdateOptions::default());
    assert!(group.get("b").unwrap().disabled());
    assert_eq!(group.value(), Value::map([("a", 1)]));
}

// ---------------------------------------------------------------------------
// Deferred commit
// ---------------------------------------------------------------------------

#[test]
fn blur_strategy_stages_writes_until_flushed() {
    let control = FormControl::with_options(
        Value::Int(0),
        ControlOptions::new().update_on(UpdateOn::Blur),
    );
    control.set_value(5, SetValueOptions::default());
    assert_eq!(control.value(), Value::Int(0), "the write is staged, not committed");
    assert!(control.pristine());

    let committed = control.sync_pending_controls();
    assert!(committed);
    assert_eq!(control.value(), Value::Int(5));
    assert!(control.dirty());
}

#[test]
fn flush_without_staged_write_reports_false() {
    let control = FormControl::with_options(
        Value::Int(0),
        ControlOptions::new().update_on(UpdateOn::Submit),
    );
    assert!(!control.sync_pending_controls());
}

#[test]
fn change_strategy_has_nothing_to_flush() {
    let control = FormControl::new(0);
    control.set_value(5, SetValueOptions::default());
    assert!(!control.sync_pending_controls());
    assert_eq!(control.value(), Value::Int(5));
}

#[test]
fn update_on_is_inherited_from_the_parent() {
    let group = FormGroup::with_options(
        [("a", FormControl::new(0))],
        ControlOptions::new().update_on(UpdateOn::Submit),
    );
    let a = group.get("a").unwrap();
    assert_eq!(a.update_on(), UpdateOn::Submit);

    a.set_value(Value::Int(9), UpdateOptions::default()).unwrap();
    assert_eq!(group.value(), Value::map([("a", 0)]), "staged under the inherited strategy");

    assert!(group.sync_pending_controls());
    assert_eq!(group.value(), Value::map([("a", 9)]));
}

#[test]
fn staged_touch_flushes_with_the_value() {
    let control = FormControl::with_options(
        Value::Int(0),
        ControlOptions::new().update_on(UpdateOn::Blur),
    );
    control.stage_touched();
    assert!(control.untouched());

    control.sync_pending_controls();
    assert!(control.touched());
}

// ---------------------------------------------------------------------------
// Structural edits
// ---------------------------------------------------------------------------

#[test]
fn add_and_remove_control_revalidate() {
    let group = FormGroup::new([("a", FormControl::new(1))]);
    let invalid = FormControl::with_options(Value::Null, ControlOptions::new().validator(required()));

    group.add_control("b", invalid, UpdateOptions::default()).unwrap();
    assert!(group.invalid());
    assert_eq!(group.value(), Value::map([("a", Value::Int(1)), ("b", Value::Null)]));

    group.remove_control("b", UpdateOptions::default());
    assert!(group.valid());
    assert_eq!(group.value(), Value::map([("a", 1)]));
}

#[test]
fn attaching_an_owned_control_elsewhere_fails() {
    let shared = FormControl::new(1);
    let first = FormGroup::new([("x", &shared)]);
    let second = FormGroup::new(Vec::<(String, FormControl)>::new());

    let err = second.add_control("y", &shared, UpdateOptions::default()).unwrap_err();
    assert!(matches!(err, FormError::AlreadyAttached));

    first.remove_control("x", UpdateOptions::default());
    second.add_control("y", &shared, UpdateOptions::default()).unwrap();
    assert!(
        reform_model::ControlRef::ptr_eq(&second.get("y").unwrap(), &shared.clone().into()),
        "a detached control can be re-attached"
    );
}

#[test]
fn set_control_replaces_and_detaches_the_old_child() {
    let old = FormControl::new(1);
    let group = FormGroup::new([("a", &old)]);

    group.set_control("a", FormControl::new(2), UpdateOptions::default()).unwrap();
    assert_eq!(group.value(), Value::map([("a", 2)]));
    assert!(old.parent().is_none(), "the replaced child is detached");
}

#[test]
fn contains_reports_only_enabled_children() {
    let group = FormGroup::new([("a", FormControl::new(1))]);
    assert!(group.contains("a"));
    assert!(!group.contains("missing"));

    group.get("a").unwrap().disable(UpdateOptions::default());
    assert!(!group.contains("a"));
}

#[test]
fn array_push_insert_remove() {
    let array = FormArray::new([FormControl::new(1)]);
    array.push(FormControl::new(3), UpdateOptions::default()).unwrap();
    array.insert(1, FormControl::new(2), UpdateOptions::default()).unwrap();
    assert_eq!(array.value(), Value::list([1, 2, 3]));
    assert_eq!(array.len(), 3);

    array.remove_at(1, UpdateOptions::default());
    assert_eq!(array.value(), Value::list([1, 3]));

    // Out of range: tolerated, no structural change.
    array.remove_at(99, UpdateOptions::default());
    assert_eq!(array.len(), 2);
}

#[test]
fn array_set_control_and_clear() {
    let array = FormArray::new([FormControl::new(1), FormControl::new(2)]);
    array.set_control(0, FormControl::new(9), UpdateOptions::default()).unwrap();
    assert_eq!(array.value(), Value::list([9, 2]));

    array.clear(UpdateOptions::default());
    assert!(array.is_empty());
    assert_eq!(array.value(), Value::list(Vec::<Value>::new()));
}

#[test]
fn array_disabled_exclusion() {
    let array = FormArray::new([FormControl::new(1), FormControl::new(2)]);
    array.at(0).unwrap().disable(UpdateOptions::default());
    assert_eq!(array.value(), Value::list([2]));
    assert_eq!(array.raw_value(), Value::list([1, 2]));
}

#[test]
fn structural_changes_bubble_to_the_root_listener() {
    let inner = FormArray::new([FormControl::new(1)]);
    let form = FormGroup::new([("items", &inner)]);

    let fired: Rc<RefCell<usize>> = Rc::default();
    let sink = Rc::clone(&fired);
    form.register_on_collection_change(Some(Rc::new(move || *sink.borrow_mut() += 1)));

    inner.push(FormControl::new(2), UpdateOptions::default()).unwrap();
    assert_eq!(*fired.borrow(), 1);

    inner.remove_at(0, UpdateOptions::default());
    assert_eq!(*fired.borrow(), 1, "removal revalidates without a structural notification");

    inner.set_control(0, FormControl::new(9), UpdateOptions::default()).unwrap();
    assert_eq!(*fired.borrow(), 2);
}

// ---------------------------------------------------------------------------
// Paths
// ---------------------------------------------------------------------------

#[test]
fn dot_paths_descend_groups_and_arrays() {
    let addresses = FormArray::new([FormGroup::new([("city", FormControl::new("Oslo"))])]);
    let form = FormGroup::new([("addresses", addresses)]);

    let city = form.get("addresses.0.city").unwrap();
    assert_eq!(city.value(), Value::Str("Oslo".into()));

    assert!(form.get("addresses.1.city").is_none());
    assert!(form.get("addresses.x").is_none());
    assert!(form.get("addresses.0.city.deeper").is_none());
    assert!(form.get("").is_none());
}

#[test]
fn path_error_queries() {
    let a = FormControl::with_options(Value::Null, ControlOptions::new().validator(required()));
    let form = FormGroup::new([("a", a)]);

    assert!(form.has_error("required", Some("a")));
    assert_eq!(form.get_error("required", Some("a")), Some(Value::Bool(true)));
    assert!(!form.has_error("required", None), "the group itself has no local errors");
    assert!(!form.has_error("required", Some("missing")));
}

#[test]
fn root_walks_to_the_top() {
    let leaf = FormControl::new(1);
    let inner = FormGroup::new([("leaf", &leaf)]);
    let form = FormGroup::new([("inner", inner)]);

    let found = form.get("inner.leaf").unwrap();
    assert!(reform_model::ControlRef::ptr_eq(&found.root(), &(&form).into()));
    assert!(leaf.parent().is_some());
}

// ---------------------------------------------------------------------------
// Streams
// ---------------------------------------------------------------------------

#[test]
fn value_and_status_streams_fire_child_before_parent() {
    let group = FormGroup::new([("a", FormControl::with_options(Value::Int(1), ControlOptions::new().validator(min_int(0)))) ]);
    let a = group.get("a").unwrap();

    let order: Rc<RefCell<Vec<&'static str>>> = Rc::default();
    let o1 = Rc::clone(&order);
    let o2 = Rc::clone(&order);
    let _sub_child = a.value_changes().subscribe(move |_| o1.borrow_mut().push("child"));
    let _sub_parent = group.value_changes().subscribe(move |_| o2.borrow_mut().push("parent"));

    a.set_value(Value::Int(5), UpdateOptions::default()).unwrap();
    assert_eq!(*order.borrow(), vec!["child", "parent"]);
}

#[test]
fn silent_writes_do_not_emit() {
    let control = FormControl::new(1);
    let (values, _sub) = recorded_values(&control);
    let (statuses, _sub2) = recorded_statuses(&control);

    control.set_value(2, SetValueOptions::from(UpdateOptions::silent()));
    assert!(values.borrow().is_empty());
    assert!(statuses.borrow().is_empty());
    assert_eq!(control.value(), Value::Int(2), "the write itself still lands");
}

#[test]
fn dropping_the_subscription_stops_delivery() {
    let control = FormControl::new(1);
    let (values, sub) = recorded_values(&control);

    control.set_value(2, SetValueOptions::default());
    assert_eq!(values.borrow().len(), 1);

    drop(sub);
    control.set_value(3, SetValueOptions::default());
    assert_eq!(values.borrow().len(), 1, "no delivery after unsubscribe");
}

#[test]
fn status_stream_reports_transitions() {
    let control = FormControl::with_options(Value::Int(1), ControlOptions::new().validator(required()));
    let (statuses, _sub) = recorded_statuses(&control);

    control.set_value(Value::Null, SetValueOptions::default());
    control.set_value(Value::Int(2), SetValueOptions::default());
    assert_eq!(
        *statuses.borrow(),
        vec![ControlStatus::Invalid, ControlStatus::Valid]
    );
}

// ---------------------------------------------------------------------------
// Validator list management
// ---------------------------------------------------------------------------

#[test]
fn validator_edits_take_effect_on_revalidation() {
    let control = FormControl::new(Value::Null);
    assert!(control.valid());

    let req = required();
    control.add_validators(vec![Rc::clone(&req)]);
    assert!(control.valid(), "editing the list does not revalidate by itself");

    control.update_value_and_validity(UpdateOptions::default());
    assert!(control.invalid());
    assert!(control.has_validator(&req));

    control.remove_validators(std::slice::from_ref(&req));
    control.update_value_and_validity(UpdateOptions::default());
    assert!(control.valid());
}

#[test]
fn clear_validators_removes_everything() {
    let control = FormControl::with_options(
        Value::Null,
        ControlOptions::new().validator(required()).validator(min_int(1)),
    );
    assert!(control.invalid());

    control.clear_validators();
    control.update_value_and_validity(UpdateOptions::default());
    assert!(control.valid());
}

#[test]
fn update_tree_validity_revalidates_every_node() {
    let a = FormControl::new(Value::Null);
    let group = FormGroup::new([("a", &a)]);
    a.add_validators(vec![required()]);
    assert!(group.valid(), "list edits alone change nothing");

    group.update_tree_validity(UpdateOptions::default());
    assert!(a.invalid(), "depth-first revalidation reaches the leaf");
    assert!(group.invalid());
}

#[test]
fn async_validator_list_edits() {
    let (av, resolvers) = manual_async();
    let control = FormControl::new(1);
    control.add_async_validators(vec![Rc::clone(&av)]);
    assert!(control.has_async_validator(&av));

    control.update_value_and_validity(UpdateOptions::default());
    assert!(control.pending());
    resolvers.borrow_mut().pop().unwrap().resolve(None);
    assert!(control.valid());

    control.clear_async_validators();
    control.update_value_and_validity(UpdateOptions::default());
    assert!(control.valid());
    assert!(resolvers.borrow().is_empty(), "cleared validators no longer run");
}

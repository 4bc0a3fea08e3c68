//! Focus traversal over a laid-out tree

use std::rc::Rc;

use trellis_scene::{builtin, FocusDirection, PropertyValue, VisualId};
use trellis_testing::prelude::*;

struct Fixture {
    rule: SceneTestRule,
    container: VisualId,
    a: VisualId,
    b: VisualId,
    c: VisualId,
}

/// Root -> container (vertical stack) -> [a, b, c]; a and b focusable.
fn fixture() -> Fixture {
    let mut rule = SceneTestRule::new(800.0, 600.0);
    let root = rule.window.root();
    let container = rule.add_child(root, Rc::new(VerticalStackPolicy)).unwrap();
    let a = rule
        .add_child(container, Rc::new(FixedSizePolicy::new(100.0, 20.0)))
        .unwrap();
    let b = rule
        .add_child(container, Rc::new(FixedSizePolicy::new(100.0, 20.0)))
        .unwrap();
    let c = rule
        .add_child(container, Rc::new(FixedSizePolicy::new(100.0, 20.0)))
        .unwrap();
    let keys = builtin::keys();
    for node in [a, b] {
        rule.window
            .set(node, keys.is_focusable, PropertyValue::Bool(true))
            .unwrap();
    }
    rule.pump_until_idle().unwrap();
    Fixture {
        rule,
        container,
        a,
        b,
        c,
    }
}

#[test]
fn descendants_come_first() {
    let f = fixture();
    assert_eq!(
        f.rule.window.next_focusable(f.container, FocusDirection::Next),
        Some(f.a)
    );
    assert_eq!(
        f.rule
            .window
            .next_focusable(f.container, FocusDirection::Previous),
        Some(f.b)
    );
}

#[test]
fn siblings_follow_in_order_skipping_unfocusable() {
    let f = fixture();
    assert_eq!(
        f.rule.window.next_focusable(f.a, FocusDirection::Next),
        Some(f.b)
    );
    // c is not focusable and the scope is not modal, so traversal escalates
    // past the container and runs out of candidates.
    assert_eq!(f.rule.window.next_focusable(f.b, FocusDirection::Next), None);
    assert_eq!(
        f.rule.window.next_focusable(f.b, FocusDirection::Previous),
        Some(f.a)
    );
}

#[test]
fn modal_scope_wraps_instead_of_escaping() {
    let mut f = fixture();
    f.rule
        .window
        .set(
            f.container,
            builtin::keys().is_modal_scope,
            PropertyValue::Bool(true),
        )
        .unwrap();

    assert_eq!(
        f.rule.window.next_focusable(f.b, FocusDirection::Next),
        Some(f.a)
    );
    assert_eq!(
        f.rule.window.next_focusable(f.a, FocusDirection::Previous),
        Some(f.b)
    );
    let _ = f.c;
}

#[test]
fn invisible_nodes_are_not_candidates() {
    let mut f = fixture();
    f.rule
        .window
        .set(f.b, builtin::keys().is_visible, PropertyValue::Bool(false))
        .unwrap();
    f.rule.pump_until_idle().unwrap();

    assert_eq!(f.rule.window.next_focusable(f.a, FocusDirection::Next), None);
    assert_eq!(
        f.rule.window.next_focusable(f.container, FocusDirection::Next),
        Some(f.a)
    );
}

#[test]
fn detached_nodes_are_not_candidates() {
    let mut f = fixture();
    f.rule.window.detach(f.b).unwrap();
    f.rule.pump_until_idle().unwrap();
    assert_eq!(f.rule.window.next_focusable(f.a, FocusDirection::Next), None);
}

#[test]
fn hit_testing_resolves_stacked_rows() {
    let mut f = fixture();
    assert_eq!(f.rule.hit(10.0, 10.0), Some(f.a));
    assert_eq!(f.rule.hit(10.0, 30.0), Some(f.b));
    assert_eq!(f.rule.hit(10.0, 50.0), Some(f.c));
    // Below the stack only the container and root remain.
    assert_eq!(f.rule.hit(10.0, 400.0), Some(f.container));
}

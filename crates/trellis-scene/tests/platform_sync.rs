//! Render-pass synchronization against a recording platform node

use std::rc::Rc;

use trellis_scene::{
    builtin, CompositionParts, HorizontalAlignment, PropertyValue, Rect, Size, Thickness,
    VerticalAlignment,
};
use trellis_testing::prelude::*;

fn near_aligned(rule: &mut SceneTestRule, node: trellis_scene::VisualId) {
    let keys = builtin::keys();
    rule.window
        .set(
            node,
            keys.h_align,
            PropertyValue::HAlign(HorizontalAlignment::Near),
        )
        .unwrap();
    rule.window
        .set(
            node,
            keys.v_align,
            PropertyValue::VAlign(VerticalAlignment::Near),
        )
        .unwrap();
}

#[test]
fn render_pushes_size_offset_and_visibility() {
    let mut rule = SceneTestRule::new(800.0, 600.0);
    let root = rule.window.root();
    let node = rule
        .add_child(root, Rc::new(FixedSizePolicy::new(40.0, 30.0)))
        .unwrap();
    near_aligned(&mut rule, node);

    let platform = Rc::new(RecordingPlatformNode::new());
    rule.window.bind_platform_node(node, platform.clone()).unwrap();
    rule.pump_until_idle().unwrap();

    assert_eq!(platform.last_size(), Some(Size::new(40.0, 30.0)));
    assert_eq!(platform.last_offset(), Some((0.0, 0.0)));
    assert_eq!(platform.last_visible(), Some(true));
}

#[test]
fn margin_offsets_the_platform_node() {
    let mut rule = SceneTestRule::new(800.0, 600.0);
    let root = rule.window.root();
    let node = rule
        .add_child(root, Rc::new(FixedSizePolicy::new(40.0, 30.0)))
        .unwrap();
    near_aligned(&mut rule, node);
    rule.window
        .set(
            node,
            builtin::keys().margin,
            PropertyValue::Thickness(Thickness::new(10.0, 5.0, 0.0, 0.0)),
        )
        .unwrap();

    let platform = Rc::new(RecordingPlatformNode::new());
    rule.window.bind_platform_node(node, platform.clone()).unwrap();
    rule.pump_until_idle().unwrap();

    assert_eq!(platform.last_offset(), Some((10.0, 5.0)));
    assert_eq!(platform.last_size(), Some(Size::new(40.0, 30.0)));
}

#[test]
fn hiding_a_node_pushes_visible_false() {
    let mut rule = SceneTestRule::new(800.0, 600.0);
    let root = rule.window.root();
    let node = rule
        .add_child(root, Rc::new(FixedSizePolicy::new(40.0, 30.0)))
        .unwrap();
    let platform = Rc::new(RecordingPlatformNode::new());
    rule.window.bind_platform_node(node, platform.clone()).unwrap();
    rule.pump_until_idle().unwrap();
    assert_eq!(platform.last_visible(), Some(true));

    rule.window
        .set(node, builtin::keys().is_visible, PropertyValue::Bool(false))
        .unwrap();
    rule.pump_until_idle().unwrap();
    assert_eq!(platform.last_visible(), Some(false));
    assert!(rule.window.visual(node).unwrap().render_rect().is_none());
}

#[test]
fn suspended_offset_is_not_pushed() {
    let mut rule = SceneTestRule::new(800.0, 600.0);
    let root = rule.window.root();
    let node = rule
        .add_child(root, Rc::new(FixedSizePolicy::new(40.0, 30.0)))
        .unwrap();
    let platform = Rc::new(RecordingPlatformNode::new());
    rule.window.bind_platform_node(node, platform.clone()).unwrap();
    rule.window
        .set_suspended_parts(node, CompositionParts::OFFSET)
        .unwrap();
    rule.pump_until_idle().unwrap();

    let calls = platform.calls();
    assert!(calls.iter().all(|call| !matches!(call, PlatformCall::Offset(_, _))));
    assert!(calls.iter().any(|call| matches!(call, PlatformCall::Size(_))));
}

#[test]
fn clip_children_pushes_a_local_clip() {
    let mut rule = SceneTestRule::new(800.0, 600.0);
    let root = rule.window.root();
    let node = rule
        .add_child(root, Rc::new(FixedSizePolicy::new(40.0, 30.0)))
        .unwrap();
    near_aligned(&mut rule, node);
    let platform = Rc::new(RecordingPlatformNode::new());
    rule.window.bind_platform_node(node, platform.clone()).unwrap();
    rule.window
        .set(node, builtin::keys().clip_children, PropertyValue::Bool(true))
        .unwrap();
    rule.pump_until_idle().unwrap();

    let expected = Rect::new(0.0, 0.0, 40.0, 30.0);
    assert!(platform
        .calls()
        .iter()
        .any(|call| *call == PlatformCall::Clip(Some(expected), true)));
}

#[test]
fn opacity_reaches_the_platform_clamped() {
    let mut rule = SceneTestRule::new(800.0, 600.0);
    let root = rule.window.root();
    let node = rule
        .add_child(root, Rc::new(FixedSizePolicy::new(40.0, 30.0)))
        .unwrap();
    let platform = Rc::new(RecordingPlatformNode::new());
    rule.window.bind_platform_node(node, platform.clone()).unwrap();
    rule.window
        .set(node, builtin::keys().opacity, PropertyValue::Float(2.5))
        .unwrap();
    rule.pump_until_idle().unwrap();

    assert!(platform
        .calls()
        .iter()
        .any(|call| *call == PlatformCall::Opacity(1.0)));
}

//! Keyboard focus traversal
//!
//! The navigator is stateless: every query is answered from the current
//! tree, so the tab sequence is purely a function of what is visible and
//! laid out right now. A modal scope blocks escalation past itself and
//! wraps traversal around its own children instead.

use trellis_core::VisualId;

use crate::tree::SceneTree;

/// Tab traversal direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FocusDirection {
    Next,
    Previous,
}

/// True when the node can actually receive focus right now: focusable,
/// visible, laid out with a non-empty render rect, and under visible
/// ancestors only.
fn is_focus_candidate(tree: &SceneTree, id: VisualId) -> bool {
    let Ok(node) = tree.get(id) else {
        return false;
    };
    if !node.is_attached() || !node.is_focusable() || !node.is_visible() {
        return false;
    }
    let Some(render_rect) = node.render_rect() else {
        return false;
    };
    if render_rect.is_empty() {
        return false;
    }
    tree.ancestors(id).all(|ancestor| {
        tree.get(ancestor)
            .map(|a| a.is_visible())
            .unwrap_or(false)
    })
}

/// Children of `parent` in traversal order: resolved z-index first, sibling
/// insertion order second, the same order the paint comparator uses.
fn ordered_children(tree: &SceneTree, parent: VisualId) -> Vec<VisualId> {
    let mut children: Vec<VisualId> = tree.children(parent).to_vec();
    children.sort_by(|a, b| tree.compare_paint_order(*a, *b));
    children
}

/// Focusable descendants of `node` in depth-first traversal order.
fn focusable_descendants(tree: &SceneTree, node: VisualId, out: &mut Vec<VisualId>) {
    for child in ordered_children(tree, node) {
        if is_focus_candidate(tree, child) {
            out.push(child);
        }
        focusable_descendants(tree, child, out);
    }
}

/// Returns the node that receives focus when traversing from `from`.
///
/// Descendants win first: the first (Next) or last (Previous) visible
/// focusable node inside `from`'s subtree. With no focusable descendants
/// the search moves to `from`'s siblings and escalates from there.
pub fn next_focusable(
    tree: &SceneTree,
    from: VisualId,
    direction: FocusDirection,
) -> Option<VisualId> {
    let mut descendants = Vec::new();
    focusable_descendants(tree, from, &mut descendants);
    match direction {
        FocusDirection::Next => {
            if let Some(first) = descendants.first() {
                return Some(*first);
            }
        }
        FocusDirection::Previous => {
            if let Some(last) = descendants.last() {
                return Some(*last);
            }
        }
    }
    let parent = tree.parent(from)?;
    focusable_sibling(tree, parent, from, direction)
}

/// Finds the focusable entry adjacent to `child_ref` among `parent`'s
/// children, escalating to the grandparent when this level is exhausted.
/// When `parent` is a modal scope, traversal instead wraps around within
/// the modal's children.
pub fn focusable_sibling(
    tree: &SceneTree,
    parent: VisualId,
    child_ref: VisualId,
    direction: FocusDirection,
) -> Option<VisualId> {
    let children = ordered_children(tree, parent);
    let position = children.iter().position(|c| *c == child_ref)?;

    let adjacent = match direction {
        FocusDirection::Next => children[position + 1..]
            .iter()
            .find(|c| is_focus_candidate(tree, **c)),
        FocusDirection::Previous => children[..position]
            .iter()
            .rev()
            .find(|c| is_focus_candidate(tree, **c)),
    };
    if let Some(found) = adjacent {
        return Some(*found);
    }

    let parent_is_modal = tree
        .get(parent)
        .map(|p| p.is_modal_scope())
        .unwrap_or(false);
    if parent_is_modal {
        // Wrap inside the modal rather than escaping it.
        return match direction {
            FocusDirection::Next => children
                .iter()
                .find(|c| is_focus_candidate(tree, **c))
                .copied(),
            FocusDirection::Previous => children
                .iter()
                .rev()
                .find(|c| is_focus_candidate(tree, **c))
                .copied(),
        };
    }

    let grandparent = tree.parent(parent)?;
    focusable_sibling(tree, grandparent, parent, direction)
}

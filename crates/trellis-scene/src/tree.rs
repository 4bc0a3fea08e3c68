//! The visual tree arena
//!
//! Nodes live in an explicit arena keyed by [`VisualId`]; ownership and
//! debug-tooling lookup are both served by the map instead of implicit
//! global state. Structural rules are enforced here: a child has exactly one
//! parent at a time, re-parenting requires explicit detach, and attaching
//! may never create a cycle.

use std::cmp::Ordering;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use trellis_core::{SceneError, VisualId};

use crate::policy::PolicyHandle;
use crate::properties::{builtin, PropertyTable};
use crate::visual::Visual;

pub struct SceneTree {
    nodes: FxHashMap<VisualId, Visual>,
    root: VisualId,
    next_id: u64,
}

impl SceneTree {
    /// Creates the tree with an attached root node.
    pub(crate) fn new(root_policy: PolicyHandle) -> Self {
        let root = VisualId::from_raw(1);
        let mut root_visual = Visual::new(root, root_policy, builtin::base_table());
        root_visual.attached = true;
        let mut nodes = FxHashMap::default();
        nodes.insert(root, root_visual);
        Self {
            nodes,
            root,
            next_id: 2,
        }
    }

    pub fn root(&self) -> VisualId {
        self.root
    }

    /// Allocates a new detached node.
    pub(crate) fn create(&mut self, policy: PolicyHandle, table: &'static PropertyTable) -> VisualId {
        let id = VisualId::from_raw(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, Visual::new(id, policy, table));
        id
    }

    pub fn contains(&self, id: VisualId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn get(&self, id: VisualId) -> Result<&Visual, SceneError> {
        self.nodes.get(&id).ok_or(SceneError::NodeMissing { id })
    }

    pub(crate) fn get_mut(&mut self, id: VisualId) -> Result<&mut Visual, SceneError> {
        self.nodes
            .get_mut(&id)
            .ok_or(SceneError::NodeMissing { id })
    }

    pub fn parent(&self, id: VisualId) -> Option<VisualId> {
        self.nodes.get(&id).and_then(|node| node.parent)
    }

    pub fn children(&self, id: VisualId) -> &[VisualId] {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_attached(&self, id: VisualId) -> bool {
        self.nodes.get(&id).is_some_and(|node| node.attached)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walks `id`'s ancestors, nearest first, root last.
    pub fn ancestors(&self, id: VisualId) -> impl Iterator<Item = VisualId> + '_ {
        let mut current = self.parent(id);
        std::iter::from_fn(move || {
            let next = current?;
            current = self.parent(next);
            Some(next)
        })
    }

    pub fn is_descendant_of(&self, id: VisualId, ancestor: VisualId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Pre-order subtree listing, `id` first, children in insertion order.
    pub fn subtree(&self, id: VisualId) -> Vec<VisualId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            let children = self.children(current);
            for child in children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    /// Links `child` under `parent`. Fails on missing nodes, an existing
    /// parent, or a cycle. Attachment state and ordering indices propagate
    /// through the subtree.
    pub(crate) fn attach(&mut self, parent: VisualId, child: VisualId) -> Result<(), SceneError> {
        if !self.contains(parent) {
            return Err(SceneError::NodeMissing { id: parent });
        }
        let child_node = self.get(child)?;
        if let Some(existing) = child_node.parent {
            return Err(SceneError::AlreadyParented {
                id: child,
                parent: existing,
            });
        }
        if parent == child || self.is_descendant_of(parent, child) {
            return Err(SceneError::ParentingCycle {
                id: child,
                ancestor: parent,
            });
        }

        let sibling_index = {
            let parent_node = self.get_mut(parent)?;
            parent_node.children.push(child);
            (parent_node.children.len() - 1) as u32
        };
        let parent_attached = self.get(parent)?.attached;
        {
            let child_node = self.get_mut(child)?;
            child_node.parent = Some(parent);
            child_node.sibling_index = sibling_index;
        }
        if parent_attached {
            for id in self.subtree(child) {
                if let Ok(node) = self.get_mut(id) {
                    node.attached = true;
                }
            }
            self.refresh_order();
        }
        Ok(())
    }

    /// Unlinks `child` from its parent and returns the detached subtree in
    /// pre-order (for the host to scrub spatial/pending/subscription state).
    /// Detaching an already parentless node is a no-op.
    pub(crate) fn detach(&mut self, child: VisualId) -> Result<Vec<VisualId>, SceneError> {
        let parent = match self.get(child)?.parent {
            Some(parent) => parent,
            None => return Ok(Vec::new()),
        };

        let subtree = self.subtree(child);
        if let Ok(parent_node) = self.get_mut(parent) {
            parent_node.children.retain(|c| *c != child);
            let siblings: SmallVec<[VisualId; 8]> =
                parent_node.children.iter().copied().collect();
            for (index, sibling) in siblings.into_iter().enumerate() {
                if let Ok(node) = self.get_mut(sibling) {
                    node.sibling_index = index as u32;
                }
            }
        }
        for id in &subtree {
            if let Ok(node) = self.get_mut(*id) {
                node.attached = false;
                node.clear_layout_caches();
            }
        }
        if let Ok(node) = self.get_mut(child) {
            node.parent = None;
        }
        self.refresh_order();
        Ok(subtree)
    }

    /// Removes a detached subtree from the arena entirely.
    pub(crate) fn dispose(&mut self, id: VisualId) -> Result<Vec<VisualId>, SceneError> {
        if self.get(id)?.attached {
            // Attached nodes must be detached first; this is structural
            // misuse, not a recoverable request.
            return Err(SceneError::AlreadyParented {
                id,
                parent: self.parent(id).unwrap_or(self.root),
            });
        }
        let subtree = self.subtree(id);
        for node in &subtree {
            self.nodes.remove(node);
        }
        Ok(subtree)
    }

    /// Recomputes levels and pre-order paint indices for the attached tree.
    /// Siblings are visited by resolved z-index, ties broken by insertion.
    pub(crate) fn refresh_order(&mut self) {
        let order = self.paint_order_listing();
        for (index, (id, level)) in order.into_iter().enumerate() {
            if let Ok(node) = self.get_mut(id) {
                node.view_order = index as u32;
                node.level = level;
            }
        }
    }

    fn paint_order_listing(&self) -> Vec<(VisualId, u32)> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root, 0u32)];
        while let Some((id, level)) = stack.pop() {
            out.push((id, level));
            let mut children: SmallVec<[VisualId; 8]> =
                self.children(id).iter().copied().collect();
            children.sort_by(|a, b| self.compare_siblings(*a, *b));
            // Reverse so the lowest z is popped (and indexed) first.
            for child in children.into_iter().rev() {
                stack.push((child, level + 1));
            }
        }
        out
    }

    fn compare_siblings(&self, a: VisualId, b: VisualId) -> Ordering {
        let (za, ia) = self
            .nodes
            .get(&a)
            .map(|n| (n.resolved_z_index(), n.sibling_index))
            .unwrap_or((0, 0));
        let (zb, ib) = self
            .nodes
            .get(&b)
            .map(|n| (n.resolved_z_index(), n.sibling_index))
            .unwrap_or((0, 0));
        za.cmp(&zb).then(ia.cmp(&ib))
    }

    /// Total paint order over arbitrary nodes: the root sorts lowest;
    /// siblings compare by resolved z-index then insertion order; other
    /// pairs compare their ancestor chains, document order augmented by
    /// explicit z overrides. `Less` means painted below (hit-tested later).
    pub fn compare_paint_order(&self, a: VisualId, b: VisualId) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        let path_a = self.order_path(a);
        let path_b = self.order_path(b);
        for (step_a, step_b) in path_a.iter().zip(path_b.iter()) {
            match step_a.cmp(step_b) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        // One is the other's ancestor: the shorter chain paints first.
        path_a.len().cmp(&path_b.len())
    }

    /// Chain of (z, sibling-index) pairs from the root down to `id`.
    fn order_path(&self, id: VisualId) -> SmallVec<[(i32, u32); 8]> {
        let mut path: SmallVec<[(i32, u32); 8]> = SmallVec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == self.root {
                break;
            }
            if let Some(node) = self.nodes.get(&node_id) {
                path.push((node.resolved_z_index(), node.sibling_index));
                current = node.parent;
            } else {
                break;
            }
        }
        path.reverse();
        path
    }
}

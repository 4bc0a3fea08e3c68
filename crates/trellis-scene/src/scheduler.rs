//! Severity-ranked invalidation scheduling
//!
//! The scheduler coalesces damage between host frames. One entry per node,
//! severities max-merged, redundant descendants subsumed by stronger
//! ancestors, and one wake-up posted per quiet period no matter how many
//! invalidations arrive. Processing order is insertion order, which front
//! loads ancestors because propagation records them before their children.

use indexmap::IndexMap;

use trellis_core::{InvalidationSpec, SceneError, Severity, VisualId};

use crate::tree::SceneTree;

/// Host-side callback that schedules a call back into
/// [`Window::process_invalidations`](crate::Window::process_invalidations)
/// on the UI thread. Posting must be cheap and thread-safe; the scheduler
/// guarantees it never posts twice without an intervening drain.
pub trait HostWaker: Send + Sync {
    fn request_wakeup(&self);
}

/// Why a pending entry exists, kept for logs and debug tooling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InvalidationReason {
    /// A property with a non-`None` invalidation spec changed.
    PropertyChanged,
    /// A child was attached or detached.
    TreeChanged,
    /// A parent entry recorded on behalf of an invalidated child.
    EscalatedFromChild,
    /// The window surface was resized.
    Resized,
    /// Direct request through the window API.
    Explicit,
}

#[derive(Clone, Copy, Debug)]
pub struct PendingInvalidation {
    pub severity: Severity,
    pub reason: InvalidationReason,
}

pub struct InvalidationScheduler {
    pending: IndexMap<VisualId, PendingInvalidation>,
    wakeup_posted: bool,
    /// Marker sequence of the previous cycle, kept only while sweeps leave
    /// new work behind. Two identical consecutive non-empty sequences mean
    /// the tree re-invalidates itself while being validated, which never
    /// converges.
    last_cycle: Vec<(VisualId, Severity)>,
}

impl InvalidationScheduler {
    pub(crate) fn new() -> Self {
        Self {
            pending: IndexMap::new(),
            wakeup_posted: false,
            last_cycle: Vec::new(),
        }
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_severity(&self, node: VisualId) -> Option<Severity> {
        self.pending.get(&node).map(|entry| entry.severity)
    }

    /// Records damage for `node` and negotiates propagation to its parent.
    /// Returns true when a host wake-up should be posted for this request.
    pub(crate) fn invalidate(
        &mut self,
        tree: &SceneTree,
        node: VisualId,
        severity: Severity,
        reason: InvalidationReason,
    ) -> bool {
        self.invalidate_inner(tree, node, severity, None, reason)
    }

    /// Records damage declared by a property's invalidation spec. The spec's
    /// declared parent severity seeds the first-hop proposal; escalation
    /// beyond the parent is negotiated through node policies as usual.
    pub(crate) fn invalidate_spec(
        &mut self,
        tree: &SceneTree,
        node: VisualId,
        spec: InvalidationSpec,
        reason: InvalidationReason,
    ) -> bool {
        self.invalidate_inner(tree, node, spec.self_severity, Some(spec.parent_severity), reason)
    }

    fn invalidate_inner(
        &mut self,
        tree: &SceneTree,
        node: VisualId,
        severity: Severity,
        declared_parent: Option<Severity>,
        reason: InvalidationReason,
    ) -> bool {
        if severity == Severity::None {
            return false;
        }
        if !tree.is_attached(node) {
            log::debug!("dropping {severity:?} invalidation for detached node {node}");
            return false;
        }

        let mut posted = false;

        // Parent negotiation runs before the node's own entry is recorded
        // so ancestors end up earlier in the processing order. A node with
        // both Width and Height explicitly set cannot change its slot in
        // the parent, so nothing is proposed upward for it.
        if let Some(parent) = tree.parent(node) {
            let proposed = match tree.get(node) {
                Ok(visual) if visual.is_size_set() => Severity::None,
                Ok(visual) => declared_parent
                    .unwrap_or_else(|| visual.policy.parent_severity_for(severity)),
                Err(_) => Severity::None,
            };
            let accepted = match tree.get(parent) {
                Ok(parent_visual) => parent_visual.policy.accept_child_severity(node, proposed),
                Err(_) => Severity::None,
            };
            if accepted != Severity::None {
                posted |= self.invalidate_inner(
                    tree,
                    parent,
                    accepted,
                    None,
                    InvalidationReason::EscalatedFromChild,
                );
            }
        }

        // Redundancy against pending ancestors: a stronger pending ancestor
        // already re-validates this node; a weaker one is raised in place so
        // the subtree is still processed once, from the top.
        let target = match self.nearest_pending_ancestor(tree, node) {
            Some((_, pending)) if pending.covers(severity) => return posted,
            Some((ancestor, _)) => ancestor,
            None => node,
        };

        let recorded = match self.pending.get_mut(&target) {
            Some(entry) => {
                entry.severity = entry.severity.merge(severity);
                entry.severity
            }
            None => {
                self.pending
                    .insert(target, PendingInvalidation { severity, reason });
                severity
            }
        };
        self.subsume_descendants(tree, target, recorded);

        if !self.wakeup_posted {
            self.wakeup_posted = true;
            posted = true;
        }
        posted
    }

    fn nearest_pending_ancestor(
        &self,
        tree: &SceneTree,
        node: VisualId,
    ) -> Option<(VisualId, Severity)> {
        tree.ancestors(node).find_map(|ancestor| {
            self.pending
                .get(&ancestor)
                .map(|entry| (ancestor, entry.severity))
        })
    }

    /// Drops pending descendants of `node` that the entry at `severity`
    /// re-validates anyway. Measure re-runs every pass below the node, so
    /// it clears everything; Arrange re-runs arrange and render; Render
    /// clears only other render entries.
    fn subsume_descendants(&mut self, tree: &SceneTree, node: VisualId, severity: Severity) {
        self.pending.retain(|id, entry| {
            if *id == node || !tree.is_descendant_of(*id, node) {
                return true;
            }
            !severity.covers(entry.severity)
        });
    }

    /// Removes pending entries for a detached subtree.
    pub(crate) fn forget(&mut self, ids: &[VisualId]) {
        for id in ids {
            self.pending.shift_remove(id);
        }
    }

    /// Swaps the pending table out for processing and re-arms the wake-up
    /// flag, so invalidations raised while entries are processed land in a
    /// fresh table for the next cycle.
    ///
    /// Fails with [`SceneError::InvalidationStorm`] when the taken sequence
    /// is identical to the previous cycle's.
    pub(crate) fn take_cycle(
        &mut self,
    ) -> Result<IndexMap<VisualId, PendingInvalidation>, SceneError> {
        self.wakeup_posted = false;
        let taken = std::mem::take(&mut self.pending);
        let markers: Vec<(VisualId, Severity)> = taken
            .iter()
            .map(|(id, entry)| (*id, entry.severity))
            .collect();
        if !markers.is_empty() && markers == self.last_cycle {
            let (first, severity) = markers[0];
            return Err(SceneError::InvalidationStorm { first, severity });
        }
        self.last_cycle = markers;
        Ok(taken)
    }

    /// Clears the storm history after a sweep that converged, so two
    /// independent external waves that damage the same nodes are not
    /// misdiagnosed as a feedback loop.
    pub(crate) fn note_idle(&mut self) {
        self.last_cycle.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use trellis_core::PropertyValue;

    use super::*;
    use crate::policy::DefaultPolicy;
    use crate::properties::builtin;

    fn chain(depth: usize) -> (SceneTree, Vec<VisualId>) {
        let mut tree = SceneTree::new(Rc::new(DefaultPolicy));
        let mut ids = vec![tree.root()];
        for _ in 0..depth {
            let id = tree.create(Rc::new(DefaultPolicy), builtin::base_table());
            tree.attach(*ids.last().unwrap(), id).unwrap();
            ids.push(id);
        }
        (tree, ids)
    }

    fn set_explicit_size(tree: &mut SceneTree, id: VisualId, width: f32, height: f32) {
        let keys = builtin::keys();
        let store = tree.get_mut(id).unwrap().store_mut();
        store.insert(keys.width, PropertyValue::Float(width));
        store.insert(keys.height, PropertyValue::Float(height));
    }

    #[test]
    fn severities_merge_upward_never_downgrade() {
        let (tree, ids) = chain(1);
        let mut scheduler = InvalidationScheduler::new();
        scheduler.invalidate(&tree, ids[0], Severity::Measure, InvalidationReason::Explicit);
        scheduler.invalidate(&tree, ids[0], Severity::Render, InvalidationReason::Explicit);
        assert_eq!(scheduler.pending_severity(ids[0]), Some(Severity::Measure));
    }

    #[test]
    fn measure_on_unsized_child_escalates_to_parent_first() {
        let (tree, ids) = chain(2);
        let mut scheduler = InvalidationScheduler::new();
        scheduler.invalidate(&tree, ids[2], Severity::Measure, InvalidationReason::Explicit);
        // The whole unsized chain escalates to the root, whose Measure
        // entry subsumes every descendant.
        let order: Vec<VisualId> = scheduler.pending.keys().copied().collect();
        assert_eq!(order, vec![ids[0]]);
        assert_eq!(scheduler.pending_severity(ids[0]), Some(Severity::Measure));
    }

    #[test]
    fn explicit_size_stops_parent_propagation() {
        let (mut tree, ids) = chain(2);
        set_explicit_size(&mut tree, ids[1], 100.0, 100.0);
        let mut scheduler = InvalidationScheduler::new();
        scheduler.invalidate(&tree, ids[1], Severity::Measure, InvalidationReason::Explicit);
        assert_eq!(scheduler.pending_severity(ids[0]), None);
        assert_eq!(scheduler.pending_severity(ids[1]), Some(Severity::Measure));
    }

    #[test]
    fn declared_parent_severity_seeds_the_first_hop() {
        let (tree, ids) = chain(1);
        let mut scheduler = InvalidationScheduler::new();
        // A Render-severity property that declares Arrange for the parent
        // overrides the policy default (which proposes nothing for Render).
        scheduler.invalidate_spec(
            &tree,
            ids[1],
            InvalidationSpec::new(Severity::Render, Severity::Arrange),
            InvalidationReason::PropertyChanged,
        );
        assert_eq!(scheduler.pending_severity(ids[0]), Some(Severity::Arrange));
        assert_eq!(scheduler.pending_severity(ids[1]), None);
    }

    #[test]
    fn explicit_size_overrides_declared_parent_severity() {
        let (mut tree, ids) = chain(1);
        set_explicit_size(&mut tree, ids[1], 10.0, 10.0);
        let mut scheduler = InvalidationScheduler::new();
        scheduler.invalidate_spec(
            &tree,
            ids[1],
            InvalidationSpec::MEASURE,
            InvalidationReason::PropertyChanged,
        );
        assert_eq!(scheduler.pending_severity(ids[0]), None);
        assert_eq!(scheduler.pending_severity(ids[1]), Some(Severity::Measure));
    }

    #[test]
    fn partial_explicit_size_still_propagates() {
        let (mut tree, ids) = chain(1);
        let keys = builtin::keys();
        tree.get_mut(ids[1])
            .unwrap()
            .store_mut()
            .insert(keys.width, PropertyValue::Float(100.0));
        let mut scheduler = InvalidationScheduler::new();
        scheduler.invalidate(&tree, ids[1], Severity::Measure, InvalidationReason::Explicit);
        assert_eq!(scheduler.pending_severity(ids[0]), Some(Severity::Measure));
    }

    #[test]
    fn pending_measure_ancestor_absorbs_descendant_requests() {
        let (mut tree, ids) = chain(2);
        set_explicit_size(&mut tree, ids[1], 100.0, 100.0);
        let mut scheduler = InvalidationScheduler::new();
        scheduler.invalidate(&tree, ids[1], Severity::Measure, InvalidationReason::Explicit);
        scheduler.invalidate(&tree, ids[2], Severity::Render, InvalidationReason::Explicit);
        assert_eq!(scheduler.pending_severity(ids[2]), None);
        assert_eq!(scheduler.pending.len(), 1);
    }

    #[test]
    fn weaker_pending_ancestor_is_raised_in_place() {
        let (mut tree, ids) = chain(2);
        set_explicit_size(&mut tree, ids[1], 100.0, 100.0);
        set_explicit_size(&mut tree, ids[2], 50.0, 50.0);
        let mut scheduler = InvalidationScheduler::new();
        scheduler.invalidate(&tree, ids[1], Severity::Render, InvalidationReason::Explicit);
        scheduler.invalidate(&tree, ids[2], Severity::Measure, InvalidationReason::Explicit);
        assert_eq!(scheduler.pending_severity(ids[1]), Some(Severity::Measure));
        assert_eq!(scheduler.pending_severity(ids[2]), None);
    }

    #[test]
    fn render_entries_do_not_subsume_arrange_descendants() {
        let (mut tree, ids) = chain(2);
        set_explicit_size(&mut tree, ids[1], 100.0, 100.0);
        set_explicit_size(&mut tree, ids[2], 50.0, 50.0);
        let mut scheduler = InvalidationScheduler::new();
        scheduler.invalidate(&tree, ids[2], Severity::Arrange, InvalidationReason::Explicit);
        scheduler.invalidate(&tree, ids[1], Severity::Render, InvalidationReason::Explicit);
        // The child must keep its stronger entry under a render-only parent.
        assert_eq!(scheduler.pending_severity(ids[2]), Some(Severity::Arrange));
        assert_eq!(scheduler.pending_severity(ids[1]), Some(Severity::Render));
    }

    #[test]
    fn wakeup_posts_once_per_quiet_period() {
        let (tree, ids) = chain(1);
        let mut scheduler = InvalidationScheduler::new();
        assert!(scheduler.invalidate(
            &tree,
            ids[1],
            Severity::Render,
            InvalidationReason::Explicit
        ));
        assert!(!scheduler.invalidate(
            &tree,
            ids[1],
            Severity::Measure,
            InvalidationReason::Explicit
        ));
        scheduler.take_cycle().unwrap();
        assert!(scheduler.invalidate(
            &tree,
            ids[1],
            Severity::Render,
            InvalidationReason::Explicit
        ));
    }

    #[test]
    fn detached_nodes_are_dropped() {
        let (mut tree, ids) = chain(1);
        tree.detach(ids[1]).unwrap();
        let mut scheduler = InvalidationScheduler::new();
        assert!(!scheduler.invalidate(
            &tree,
            ids[1],
            Severity::Measure,
            InvalidationReason::Explicit
        ));
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn identical_consecutive_cycles_are_a_storm() {
        let (mut tree, ids) = chain(1);
        set_explicit_size(&mut tree, ids[1], 10.0, 10.0);
        let mut scheduler = InvalidationScheduler::new();

        scheduler.invalidate(&tree, ids[1], Severity::Arrange, InvalidationReason::Explicit);
        scheduler.take_cycle().unwrap();
        scheduler.invalidate(&tree, ids[1], Severity::Arrange, InvalidationReason::Explicit);
        let err = scheduler.take_cycle().unwrap_err();
        assert!(matches!(err, SceneError::InvalidationStorm { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn idle_cycle_resets_storm_history() {
        let (mut tree, ids) = chain(1);
        set_explicit_size(&mut tree, ids[1], 10.0, 10.0);
        let mut scheduler = InvalidationScheduler::new();

        scheduler.invalidate(&tree, ids[1], Severity::Render, InvalidationReason::Explicit);
        scheduler.take_cycle().unwrap();
        scheduler.note_idle();
        scheduler.invalidate(&tree, ids[1], Severity::Render, InvalidationReason::Explicit);
        assert!(scheduler.take_cycle().is_ok());
    }
}

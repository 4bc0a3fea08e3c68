//! The window host coordinator
//!
//! One `Window` owns one visual tree and everything attached to it: the
//! invalidation scheduler, the spatial index, the lifecycle event bus,
//! property observers, and the cross-thread task queue. All mutation goes
//! through the window on the thread that created it; reads off-thread go
//! through [`PropertyReader`](trellis_core::PropertyReader) handles.

use std::rc::Rc;
use std::sync::{mpsc, Arc};

use rustc_hash::FxHashMap;

use trellis_core::{
    DiagnosticRegistry, InvalidationSpec, PropertyKey, PropertyValue, SceneError, SetOptions,
    Severity, UiThreadGuard, VisualId,
};
use trellis_geometry::{Point, Rect, Size};

use crate::events::{EventBus, LifecycleEvent, SubscriptionId};
use crate::focus::{self, FocusDirection};
use crate::layout::{self, LayoutCtx};
use crate::platform::{CompositionParts, PlatformNode};
use crate::policy::{DefaultPolicy, VisualPolicy};
use crate::properties::{builtin, PropertyTable};
use crate::scheduler::{HostWaker, InvalidationReason, InvalidationScheduler};
use crate::spatial::SpatialIndex;
use crate::tasks::{TaskHandle, WindowTask};
use crate::tree::SceneTree;
use crate::visual::Visual;

/// Which stage of a property change an observer is being told about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyChangeKind {
    /// The new value passed the veto and is about to be committed.
    Changing,
    /// The value has been committed.
    Changed,
    /// A property this one declares as a dependent has changed.
    Dependent,
    /// A validation-affecting property changed; error state may differ.
    ErrorsChanged,
}

/// Handle for a registered property observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type PropertyObserver = Box<dyn Fn(VisualId, PropertyKey, PropertyChangeKind)>;

#[derive(Default)]
struct PropertyObservers {
    next_id: u64,
    by_target: FxHashMap<(VisualId, PropertyKey), Vec<(ObserverId, PropertyObserver)>>,
}

impl PropertyObservers {
    fn observe(
        &mut self,
        node: VisualId,
        key: PropertyKey,
        callback: impl Fn(VisualId, PropertyKey, PropertyChangeKind) + 'static,
    ) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.by_target
            .entry((node, key))
            .or_default()
            .push((id, Box::new(callback)));
        id
    }

    fn remove(&mut self, observer: ObserverId) {
        for list in self.by_target.values_mut() {
            list.retain(|(id, _)| *id != observer);
        }
        self.by_target.retain(|_, list| !list.is_empty());
    }

    fn clear_node(&mut self, node: VisualId) {
        self.by_target.retain(|(id, _), _| *id != node);
    }

    fn notify(&self, node: VisualId, key: PropertyKey, kind: PropertyChangeKind) {
        if let Some(list) = self.by_target.get(&(node, key)) {
            for (_, callback) in list {
                callback(node, key, kind);
            }
        }
    }
}

pub struct Window {
    guard: UiThreadGuard,
    tree: SceneTree,
    scheduler: InvalidationScheduler,
    spatial: SpatialIndex,
    events: EventBus,
    registry: DiagnosticRegistry,
    observers: PropertyObservers,
    waker: Arc<dyn HostWaker>,
    task_sender: mpsc::Sender<WindowTask>,
    task_receiver: mpsc::Receiver<WindowTask>,
    size: Size,
}

impl Window {
    /// Creates a window on the current thread, which becomes its UI thread.
    /// The root node is attached from the start and fills the surface.
    pub fn new(waker: Arc<dyn HostWaker>, size: Size) -> Self {
        let (task_sender, task_receiver) = mpsc::channel();
        let tree = SceneTree::new(Rc::new(DefaultPolicy));
        let mut registry = DiagnosticRegistry::new();
        registry.register(tree.root(), "Visual");
        registry.set_debug_name(tree.root(), "Root");
        Self {
            guard: UiThreadGuard::capture(),
            spatial: SpatialIndex::new(Rect::from_size(size)),
            tree,
            scheduler: InvalidationScheduler::new(),
            events: EventBus::new(),
            registry,
            observers: PropertyObservers::default(),
            waker,
            task_sender,
            task_receiver,
            size,
        }
    }

    pub fn root(&self) -> VisualId {
        self.tree.root()
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn visual(&self, node: VisualId) -> Result<&Visual, SceneError> {
        self.tree.get(node)
    }

    pub fn parent(&self, node: VisualId) -> Option<VisualId> {
        self.tree.parent(node)
    }

    pub fn children(&self, node: VisualId) -> &[VisualId] {
        self.tree.children(node)
    }

    pub fn is_attached(&self, node: VisualId) -> bool {
        self.tree.is_attached(node)
    }

    /// Cloneable handle for posting work from other threads.
    pub fn tasks(&self) -> TaskHandle {
        TaskHandle::new(self.task_sender.clone(), Arc::clone(&self.waker))
    }

    // --- node lifecycle ----------------------------------------------------

    pub fn create_node(&mut self, policy: Rc<dyn VisualPolicy>) -> Result<VisualId, SceneError> {
        self.create_node_with_table(policy, builtin::base_table())
    }

    pub fn create_node_with_table(
        &mut self,
        policy: Rc<dyn VisualPolicy>,
        table: &'static PropertyTable,
    ) -> Result<VisualId, SceneError> {
        self.guard.ensure("create_node")?;
        let id = self.tree.create(policy, table);
        self.registry.register(id, table.class_name());
        Ok(id)
    }

    pub fn set_debug_name(&mut self, node: VisualId, name: impl Into<String>) {
        self.registry.set_debug_name(node, name);
    }

    /// Human-readable label for logs and debug tooling.
    pub fn describe(&self, node: VisualId) -> String {
        self.registry.describe(node)
    }

    pub fn attach(&mut self, parent: VisualId, child: VisualId) -> Result<(), SceneError> {
        self.guard.ensure("attach")?;
        self.tree.attach(parent, child)?;
        if self.tree.is_attached(child) {
            for id in self.tree.subtree(child) {
                self.events.emit(id, LifecycleEvent::Attached);
            }
        }
        self.request_invalidation(parent, Severity::Measure, InvalidationReason::TreeChanged);
        Ok(())
    }

    /// Unlinks `child` and scrubs per-window state for the whole subtree:
    /// spatial entries, pending invalidations. Subscriptions survive so a
    /// re-attached node keeps its observers.
    pub fn detach(&mut self, child: VisualId) -> Result<(), SceneError> {
        self.guard.ensure("detach")?;
        let parent = self.tree.parent(child);
        let subtree = self.tree.detach(child)?;
        for id in &subtree {
            self.spatial.remove(*id);
            self.events.emit(*id, LifecycleEvent::Detached);
        }
        self.scheduler.forget(&subtree);
        if let Some(parent) = parent {
            self.request_invalidation(parent, Severity::Measure, InvalidationReason::TreeChanged);
        }
        Ok(())
    }

    /// Removes a detached subtree from the window entirely, dropping its
    /// subscriptions, observers, and diagnostic entries.
    pub fn dispose(&mut self, node: VisualId) -> Result<(), SceneError> {
        self.guard.ensure("dispose")?;
        let removed = self.tree.dispose(node)?;
        for id in &removed {
            self.spatial.remove(*id);
            self.events.clear_node(*id);
            self.observers.clear_node(*id);
            self.registry.unregister(*id);
        }
        self.scheduler.forget(&removed);
        Ok(())
    }

    // --- platform binding --------------------------------------------------

    pub fn bind_platform_node(
        &mut self,
        node: VisualId,
        platform: Rc<dyn PlatformNode>,
    ) -> Result<(), SceneError> {
        self.guard.ensure("bind_platform_node")?;
        self.tree.get_mut(node)?.platform = Some(platform);
        self.request_invalidation(node, Severity::Render, InvalidationReason::Explicit);
        Ok(())
    }

    /// Marks composition parts the host is animating directly; suspended
    /// parts are skipped by the render pass until resumed.
    pub fn set_suspended_parts(
        &mut self,
        node: VisualId,
        parts: CompositionParts,
    ) -> Result<(), SceneError> {
        self.guard.ensure("set_suspended_parts")?;
        self.tree.get_mut(node)?.suspended_parts = parts;
        // A resumed part is stale until the next render pushes it again.
        self.request_invalidation(node, Severity::Render, InvalidationReason::Explicit);
        Ok(())
    }

    // --- events and observers ----------------------------------------------

    pub fn subscribe(
        &mut self,
        node: VisualId,
        event: LifecycleEvent,
        callback: impl Fn(VisualId, LifecycleEvent) + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(node, event, callback)
    }

    pub fn unsubscribe(&mut self, subscription: SubscriptionId) {
        self.events.unsubscribe(subscription);
    }

    pub fn observe_property(
        &mut self,
        node: VisualId,
        key: PropertyKey,
        callback: impl Fn(VisualId, PropertyKey, PropertyChangeKind) + 'static,
    ) -> ObserverId {
        self.observers.observe(node, key, callback)
    }

    pub fn unobserve_property(&mut self, observer: ObserverId) {
        self.observers.remove(observer);
    }

    // --- properties ----------------------------------------------------------

    /// Current value of a property, falling back to the table default.
    pub fn property(
        &self,
        node: VisualId,
        key: PropertyKey,
    ) -> Result<Option<PropertyValue>, SceneError> {
        Ok(self.tree.get(node)?.property(key))
    }

    pub fn set(
        &mut self,
        node: VisualId,
        key: PropertyKey,
        value: PropertyValue,
    ) -> Result<bool, SceneError> {
        self.try_set(node, key, value, SetOptions::DEFAULT)
    }

    /// Sets a property under the full change contract: convert, equality
    /// short-circuit, veto, commit, notifications, dependents, and finally
    /// severity-ranked invalidation. Returns false when the set collapsed
    /// to a no-op (equal value or veto).
    pub fn try_set(
        &mut self,
        node: VisualId,
        key: PropertyKey,
        value: PropertyValue,
        options: SetOptions,
    ) -> Result<bool, SceneError> {
        self.guard.ensure("try_set")?;
        let table = self.tree.get(node)?.table();
        let metadata = table.resolve(key).ok_or(SceneError::UnknownProperty {
            id: node,
            key: key.raw(),
        })?;

        let mut value = value;
        let old = {
            let visual = self.tree.get(node)?;
            if let Some(convert) = metadata.convert {
                value = convert(visual, value);
            }
            visual.store().get(key)
        };

        // Only a value already present in the store can short-circuit; an
        // explicit set of the default still records the value.
        if let Some(existing) = &old {
            if !options.suppress_equality_check
                && !options.force_changed_event
                && existing.value_eq(&value)
            {
                return Ok(false);
            }
        }

        if let Some(changing) = metadata.changing {
            let visual = self.tree.get(node)?;
            if !changing(visual, &value, old.as_ref()) {
                log::debug!(
                    "set of {} on {} vetoed",
                    metadata.name,
                    self.registry.describe(node)
                );
                return Ok(false);
            }
        }
        if !options.suppress_changing_event {
            self.observers.notify(node, key, PropertyChangeKind::Changing);
        }

        {
            let visual = self.tree.get_mut(node)?;
            visual.store().insert(key, value.clone());
            if let Some(changed) = metadata.changed {
                changed(visual, &value, old.as_ref());
            }
        }

        if !options.suppress_changed_event {
            self.observers.notify(node, key, PropertyChangeKind::Changed);
        }
        for dependent in &metadata.dependents {
            self.observers
                .notify(node, *dependent, PropertyChangeKind::Dependent);
        }
        if metadata.affects_validation {
            self.observers
                .notify(node, key, PropertyChangeKind::ErrorsChanged);
        }

        // Z order participates in paint order, which is tree state, not
        // layout state; it refreshes eagerly.
        if key == builtin::keys().z_index {
            self.tree.refresh_order();
        }
        self.request_property_invalidation(node, metadata.invalidation);
        Ok(true)
    }

    // --- invalidation and layout ---------------------------------------------

    /// Explicit invalidation request, severity-merged like any other.
    pub fn invalidate(&mut self, node: VisualId, severity: Severity) -> Result<(), SceneError> {
        self.guard.ensure("invalidate")?;
        self.request_invalidation(node, severity, InvalidationReason::Explicit);
        Ok(())
    }

    pub fn has_pending_invalidations(&self) -> bool {
        self.scheduler.has_pending()
    }

    pub fn pending_severity(&self, node: VisualId) -> Option<Severity> {
        self.scheduler.pending_severity(node)
    }

    fn request_invalidation(
        &mut self,
        node: VisualId,
        severity: Severity,
        reason: InvalidationReason,
    ) {
        if self.scheduler.invalidate(&self.tree, node, severity, reason) {
            self.waker.request_wakeup();
        }
    }

    fn request_property_invalidation(&mut self, node: VisualId, spec: InvalidationSpec) {
        if self.scheduler.invalidate_spec(
            &self.tree,
            node,
            spec,
            InvalidationReason::PropertyChanged,
        ) {
            self.waker.request_wakeup();
        }
    }

    pub fn resize(&mut self, size: Size) -> Result<(), SceneError> {
        self.guard.ensure("resize")?;
        if self.size == size {
            return Ok(());
        }
        self.size = size;
        self.spatial.set_bounds(Rect::from_size(size));
        let root = self.tree.root();
        self.request_invalidation(root, Severity::Measure, InvalidationReason::Resized);
        Ok(())
    }

    fn layout_ctx(&mut self) -> LayoutCtx<'_> {
        LayoutCtx {
            tree: &mut self.tree,
            spatial: &mut self.spatial,
            events: &self.events,
            viewport: Rect::from_size(self.size),
        }
    }

    /// Full layout of the tree: measure, arrange, and render from the root.
    pub fn perform_layout(&mut self) -> Result<(), SceneError> {
        self.guard.ensure("perform_layout")?;
        let root = self.tree.root();
        let viewport = Rect::from_size(self.size);
        let mut ctx = self.layout_ctx();
        layout::measure(&mut ctx, root, viewport.size())?;
        layout::arrange(&mut ctx, root, viewport)?;
        layout::render(&mut ctx, root)
    }

    /// Runs queued cross-thread tasks, then drains and processes the pending
    /// invalidation table. Call from the host in response to a wake-up.
    ///
    /// A fatal [`SceneError::InvalidationStorm`] means the tree never
    /// converges; the host should stop pumping this window.
    pub fn process_invalidations(&mut self) -> Result<(), SceneError> {
        self.guard.ensure("process_invalidations")?;
        self.process_queued_tasks()?;

        let cycle = self.scheduler.take_cycle()?;
        if cycle.is_empty() {
            self.scheduler.note_idle();
            return Ok(());
        }

        let root = self.tree.root();
        for (node, entry) in cycle {
            if !self.tree.is_attached(node) {
                log::trace!("skipping {node}: detached while pending");
                continue;
            }
            log::trace!(
                "validating {} at {:?} ({:?})",
                self.registry.describe(node),
                entry.severity,
                entry.reason
            );
            match entry.severity {
                Severity::Measure if node == root => self.perform_layout()?,
                Severity::Measure => self.revalidate_measure(node)?,
                Severity::Arrange => self.revalidate_arrange(node)?,
                Severity::Render => self.revalidate_render(node)?,
                Severity::None => {}
            }
        }
        // A sweep that left nothing newly pending converged; only work that
        // regenerates itself during processing counts toward a storm.
        if !self.scheduler.has_pending() {
            self.scheduler.note_idle();
        }
        Ok(())
    }

    /// Runs every task queued through [`TaskHandle::post`].
    pub fn process_queued_tasks(&mut self) -> Result<(), SceneError> {
        self.guard.ensure("process_queued_tasks")?;
        while let Ok(task) = self.task_receiver.try_recv() {
            task(self);
        }
        Ok(())
    }

    fn revalidate_measure(&mut self, node: VisualId) -> Result<(), SceneError> {
        let visual = self.tree.get(node)?;
        let constraint = match visual.last_measure_constraint {
            Some(constraint) => constraint,
            None => {
                log::warn!("{node} invalidated before its first layout; deferring to the root pass");
                return Ok(());
            }
        };
        let previous_rect = visual.last_arrange_rect;
        let mut ctx = self.layout_ctx();
        layout::measure(&mut ctx, node, constraint)?;
        if let Some(rect) = previous_rect {
            layout::arrange(&mut ctx, node, rect)?;
            layout::render(&mut ctx, node)?;
        }
        Ok(())
    }

    fn revalidate_arrange(&mut self, node: VisualId) -> Result<(), SceneError> {
        let visual = self.tree.get(node)?;
        let rect = match (visual.desired_size(), visual.last_arrange_rect) {
            (Some(_), Some(rect)) => rect,
            _ => {
                log::warn!("{node} invalidated before its first layout; deferring to the root pass");
                return Ok(());
            }
        };
        let mut ctx = self.layout_ctx();
        layout::arrange(&mut ctx, node, rect)?;
        layout::render(&mut ctx, node)
    }

    fn revalidate_render(&mut self, node: VisualId) -> Result<(), SceneError> {
        if self.tree.get(node)?.arranged_rect().is_none() {
            log::warn!("{node} invalidated before its first layout; deferring to the root pass");
            return Ok(());
        }
        let mut ctx = self.layout_ctx();
        layout::render(&mut ctx, node)
    }

    // --- queries ---------------------------------------------------------------

    /// Topmost hit-test-visible node under `point`, if any.
    pub fn hit_test(&self, point: Point) -> Option<VisualId> {
        self.hit_test_all(point).into_iter().next()
    }

    /// All hit-test-visible nodes under `point`, topmost first.
    pub fn hit_test_all(&self, point: Point) -> Vec<VisualId> {
        let probe = Rect::new(point.x, point.y, 0.0, 0.0);
        let mut hits: Vec<VisualId> = self
            .spatial
            .query_intersecting(probe)
            .into_iter()
            .filter(|id| {
                self.tree
                    .get(*id)
                    .ok()
                    .and_then(|visual| visual.absolute_bounds())
                    .map(|bounds| bounds.contains_point(point))
                    .unwrap_or(false)
            })
            .collect();
        hits.sort_by(|a, b| self.tree.compare_paint_order(*b, *a));
        hits
    }

    pub fn next_focusable(
        &self,
        from: VisualId,
        direction: FocusDirection,
    ) -> Option<VisualId> {
        focus::next_focusable(&self.tree, from, direction)
    }

    pub fn focusable_sibling(
        &self,
        parent: VisualId,
        child_ref: VisualId,
        direction: FocusDirection,
    ) -> Option<VisualId> {
        focus::focusable_sibling(&self.tree, parent, child_ref, direction)
    }
}

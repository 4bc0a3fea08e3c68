//! Test rule wrapping a window with a counting waker
//!
//! Tests drive the window the way a host would: mutate, then pump until the
//! scheduler goes idle. The waker only counts; nothing runs asynchronously.

use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use trellis_core::{PropertyValue, SceneError, VisualId};
use trellis_geometry::{Point, Size};
use trellis_scene::{builtin, HostWaker, VisualPolicy, Window};

/// Counts wake-up requests instead of scheduling anything.
#[derive(Default)]
pub struct TestWaker {
    wakeups: AtomicUsize,
}

impl TestWaker {
    pub fn wakeup_count(&self) -> usize {
        self.wakeups.load(Ordering::Relaxed)
    }
}

impl HostWaker for TestWaker {
    fn request_wakeup(&self) {
        self.wakeups.fetch_add(1, Ordering::Relaxed);
    }
}

/// A window plus the plumbing tests need around it.
pub struct SceneTestRule {
    pub window: Window,
    waker: Arc<TestWaker>,
}

impl SceneTestRule {
    pub fn new(width: f32, height: f32) -> Self {
        let waker = Arc::new(TestWaker::default());
        let window = Window::new(waker.clone(), Size::new(width, height));
        Self { window, waker }
    }

    pub fn wakeup_count(&self) -> usize {
        self.waker.wakeup_count()
    }

    /// Creates a node under `parent` with the given policy.
    pub fn add_child(
        &mut self,
        parent: VisualId,
        policy: Rc<dyn VisualPolicy>,
    ) -> Result<VisualId, SceneError> {
        let id = self.window.create_node(policy)?;
        self.window.attach(parent, id)?;
        Ok(id)
    }

    /// Pins an explicit Width and Height on the node.
    pub fn set_explicit_size(
        &mut self,
        node: VisualId,
        width: f32,
        height: f32,
    ) -> Result<(), SceneError> {
        let keys = builtin::keys();
        self.window.set(node, keys.width, PropertyValue::Float(width))?;
        self.window.set(node, keys.height, PropertyValue::Float(height))?;
        Ok(())
    }

    /// Drains invalidations until the scheduler reports no pending work.
    ///
    /// Panics after a bounded number of cycles so a non-converging test
    /// fails loudly instead of spinning.
    pub fn pump_until_idle(&mut self) -> Result<(), SceneError> {
        for _ in 0..32 {
            self.window.process_invalidations()?;
            if !self.window.has_pending_invalidations() {
                return Ok(());
            }
        }
        panic!("window failed to reach idle within 32 cycles");
    }

    /// Topmost node under the point, after a pump.
    pub fn hit(&mut self, x: f32, y: f32) -> Option<VisualId> {
        self.window.hit_test(Point::new(x, y))
    }
}

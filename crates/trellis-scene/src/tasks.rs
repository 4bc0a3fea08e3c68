//! Cross-thread task posting into the window's UI thread
//!
//! Background work cannot touch the tree directly; it posts a closure
//! through a [`TaskHandle`] and the window runs it at the start of the next
//! invalidation drain, on the UI thread, with full mutable access.

use std::sync::mpsc;
use std::sync::Arc;

use crate::scheduler::HostWaker;
use crate::window::Window;

/// A deferred mutation queued from any thread.
pub type WindowTask = Box<dyn FnOnce(&mut Window) + Send + 'static>;

/// Cloneable, `Send` handle for posting work to the owning window.
#[derive(Clone)]
pub struct TaskHandle {
    sender: mpsc::Sender<WindowTask>,
    waker: Arc<dyn HostWaker>,
}

impl TaskHandle {
    pub(crate) fn new(sender: mpsc::Sender<WindowTask>, waker: Arc<dyn HostWaker>) -> Self {
        Self { sender, waker }
    }

    /// Queues `task` and wakes the host. Returns false when the window has
    /// been dropped and the task will never run.
    pub fn post<F>(&self, task: F) -> bool
    where
        F: FnOnce(&mut Window) + Send + 'static,
    {
        if self.sender.send(Box::new(task)).is_err() {
            log::warn!("task posted to a closed window queue");
            return false;
        }
        self.waker.request_wakeup();
        true
    }
}

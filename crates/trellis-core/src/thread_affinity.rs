//! UI-thread affinity enforcement

use std::thread::{self, ThreadId};

use crate::SceneError;

/// Captures the thread a window was created on and rejects mutating calls
/// from anywhere else.
///
/// This is a hard invariant: tree mutation, property writes, invalidation
/// requests, and the layout passes all check it and fail fast. Reads do not
/// go through the guard.
#[derive(Clone, Copy, Debug)]
pub struct UiThreadGuard {
    owner: ThreadId,
}

impl UiThreadGuard {
    /// Binds the guard to the calling thread.
    pub fn capture() -> Self {
        Self {
            owner: thread::current().id(),
        }
    }

    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Fails with a stable diagnostic when called off the owning thread.
    pub fn ensure(&self, operation: &'static str) -> Result<(), SceneError> {
        if self.is_ui_thread() {
            Ok(())
        } else {
            Err(SceneError::WrongThread { operation })
        }
    }
}

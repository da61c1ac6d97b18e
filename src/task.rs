// subtitles-core - Subtitle lookup for media players
// Copyright (C) 2025 Henning Berge
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.


//! Fire-and-poll background operations
//!
//! The host's UI loop cannot await, so network work is dispatched onto the
//! runtime's worker threads and the host checks a [`TaskHandle`] from an idle
//! callback or a timer every [`POLL_INTERVAL`].
//!
//! # Contract
//! - `is_done()` never blocks and is `false` until the operation finished
//! - `poll()` returns [`TaskPoll::NotReady`] before completion, never a default
//! - after completion every `poll()` returns the same cached outcome
//! - errors and panics become the user-facing message string
//! - nothing is cancellable; a new dispatch leaves earlier ones running

use crate::error::{Result, SubtitleError};
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, error, warn};

/// How often the host should poll a pending task
pub const POLL_INTERVAL: Duration = Duration::from_millis(350);

/// Outcome observed by a poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskPoll<T> {
    /// Still running
    NotReady,
    /// Finished; the error side is the message for the status label
    Finished(std::result::Result<T, String>),
}

impl<T> TaskPoll<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, TaskPoll::Finished(_))
    }

    pub fn into_result(self) -> Option<std::result::Result<T, String>> {
        match self {
            TaskPoll::NotReady => None,
            TaskPoll::Finished(result) => Some(result),
        }
    }
}

struct TaskSlot<T> {
    name: &'static str,
    done: AtomicBool,
    outcome: Mutex<Option<std::result::Result<T, String>>>,
}

impl<T> TaskSlot<T> {
    fn complete(&self, outcome: std::result::Result<T, String>) {
        let mut slot = self.outcome.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(outcome);
        drop(slot);
        self.done.store(true, Ordering::Release);
    }
}

/// Handle to one dispatched operation
pub struct TaskHandle<T> {
    slot: Arc<TaskSlot<T>>,
}

impl<T> Clone for TaskHandle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Clone> TaskHandle<T> {
    /// Name given at dispatch, for logs
    pub fn name(&self) -> &'static str {
        self.slot.name
    }

    /// Whether the operation has finished, successfully or not
    pub fn is_done(&self) -> bool {
        self.slot.done.load(Ordering::Acquire)
    }

    /// Current outcome without blocking
    pub fn poll(&self) -> TaskPoll<T> {
        if !self.is_done() {
            return TaskPoll::NotReady;
        }

        let outcome = self.slot.outcome.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match outcome.as_ref() {
            Some(result) => TaskPoll::Finished(result.clone()),
            None => TaskPoll::NotReady,
        }
    }
}

/// Dispatches operations onto a tokio runtime
#[derive(Debug, Clone)]
pub struct TaskRunner {
    runtime: Handle,
}

impl TaskRunner {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Runner bound to the runtime of the calling context
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| SubtitleError::internal(format!("No tokio runtime available: {}", e)))
    }

    /// Start `operation` in the background and return its handle
    ///
    /// The handle is created before the operation is spawned, so it always
    /// starts out as not done.
    pub fn dispatch<T, F>(&self, name: &'static str, operation: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let slot = Arc::new(TaskSlot {
            name,
            done: AtomicBool::new(false),
            outcome: Mutex::new(None),
        });
        let completion = Arc::clone(&slot);

        debug!(task = name, "Dispatching background task");
        self.runtime.spawn(async move {
            let outcome = match AssertUnwindSafe(operation).catch_unwind().await {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(e)) => {
                    warn!(task = name, error = %e, "Background task failed");
                    Err(e.user_message())
                }
                Err(panic) => {
                    let message = panic_message(panic.as_ref());
                    error!(task = name, panic = %message, "Background task panicked");
                    Err(SubtitleError::TaskFailed(message).user_message())
                }
            };
            completion.complete(outcome);
            debug!(task = name, "Background task finished");
        });

        TaskHandle { slot }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

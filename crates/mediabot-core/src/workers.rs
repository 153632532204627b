//! Background execution for commands that must not hold up message delivery.
//!
//! Jobs run on the tokio runtime, at most `max_jobs` at a time.  A job's
//! outcome is sent to the requesting user through the transport; it never
//! travels back through `dispatch`.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

use crate::commands::Reply;
use crate::errors::Result;
use crate::processor::describe_failure;
use crate::transport::{MessageTarget, Transport, User};

pub struct Workers {
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
    transport: Arc<dyn Transport>,
}

impl Workers {
    pub fn new(max_jobs: usize, transport: Arc<dyn Transport>) -> Self {
        Self {
            tracker: TaskTracker::new(),
            permits: Arc::new(Semaphore::new(max_jobs.max(1))),
            transport,
        }
    }

    /// Run `job` in the background and deliver its reply or failure to `user`.
    pub fn spawn<F>(&self, label: &'static str, user: User, job: F)
    where
        F: Future<Output = Result<Reply>> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let transport = Arc::clone(&self.transport);
        self.tracker.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            debug!(job = label, nickname = %user.nickname, "Background job started");
            let reply = match AssertUnwindSafe(job).catch_unwind().await {
                Ok(Ok(reply)) => reply,
                Ok(Err(e)) => Some(describe_failure(&e, None)),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    error!(job = label, "Background job panicked: {}", message);
                    Some(format!("error: {message}"))
                }
            };
            if let Some(text) = reply {
                transport.send_message(&text, MessageTarget::User(user));
            }
        });
    }

    /// Number of jobs queued or running.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every job spawned so far to finish.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

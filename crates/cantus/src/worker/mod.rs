/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Worker Loops
//!
//! [`ProcessWorker`] consumes the process queue and drives synthesis;
//! [`UploadWorker`] consumes the upload queue and drives storage upload plus
//! callback delivery. Both run until shut down: a task failure terminates
//! that task's lifecycle, never the loop, and a loop-level failure is logged
//! and followed by a short pause before resuming.

pub mod processor;
pub mod uploader;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

pub use processor::ProcessWorker;
pub use uploader::UploadWorker;

/// Cooperative stop signal shared by the worker loops.
///
/// Signalling shutdown lets an in-flight task finish; only the loop's next
/// iteration observes the flag and exits.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests shutdown and wakes any idle waiters.
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolves when shutdown is requested.
    pub async fn wait(&self) {
        if self.is_shutdown() {
            return;
        }
        self.notify.notified().await;
    }
}

/// Tuning for the worker loops.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Idle re-check interval for the process queue (it has no native
    /// blocking fetch).
    pub poll_interval: Duration,
    /// Bounded wait used for the upload queue's blocking pop.
    pub upload_pop_timeout: Duration,
    /// Pause after a loop-level (non-task) failure before resuming.
    pub error_backoff: Duration,
    /// Directory the engine writes primary artifacts into.
    pub output_dir: PathBuf,
    /// Whether local artifacts are removed after the upload attempt.
    pub cleanup_after_upload: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            upload_pop_timeout: Duration::from_secs(5),
            error_backoff: Duration::from_secs(5),
            output_dir: PathBuf::from("outputs"),
            cleanup_after_upload: true,
        }
    }
}

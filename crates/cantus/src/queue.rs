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

//! Typed Queues
//!
//! [`ProcessQueue`] and [`UploadQueue`] wrap the raw stores with record
//! encoding, score computation, and the cancellation scan, so workers and the
//! gateway deal in [`Task`] and [`UploadJob`] values rather than serialized
//! members.

use std::sync::Arc;
use std::time::Duration;

use metrics::gauge;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::QueueError;
use crate::score::{compute_score, AdmissionClock};
use crate::store::memory::{MemoryFifoStore, MemoryPriorityStore};
use crate::store::{FifoStore, PriorityStore};
use crate::task::{Task, UploadJob};

/// Priority-ordered set of pending tasks.
pub struct ProcessQueue {
    store: Arc<dyn PriorityStore>,
    clock: AdmissionClock,
}

impl ProcessQueue {
    pub fn new(store: Arc<dyn PriorityStore>) -> Self {
        Self {
            store,
            clock: AdmissionClock::new(),
        }
    }

    /// Convenience constructor over the in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPriorityStore::new()))
    }

    /// Inserts a task, computing its ordering score at this instant.
    /// Returns the score for observability.
    pub async fn enqueue(&self, task: &Task) -> Result<f64, QueueError> {
        let score = compute_score(task.priority, self.clock.now());
        let member = serde_json::to_string(task)?;
        self.store.insert(member, score).await?;
        self.publish_depth().await;

        info!(
            "Task {} added to process queue with priority {}, score {}",
            task.id, task.priority, score
        );
        Ok(score)
    }

    /// Atomically removes and returns the highest-score pending task, or
    /// `None` when the queue is empty. A dequeued task is never re-inserted.
    pub async fn dequeue(&self) -> Result<Option<Task>, QueueError> {
        let Some(member) = self.store.pop_max().await? else {
            return Ok(None);
        };

        let task: Task = serde_json::from_str(&member)?;
        self.publish_depth().await;
        debug!("Task {} retrieved from process queue", task.id);
        Ok(Some(task))
    }

    /// Removes a still-pending task by identifier.
    ///
    /// Scans all resident members, decoding each; success is reported only
    /// when the store confirms the matching member was still resident at
    /// removal time, so a cancel racing a dequeue resolves to "not found"
    /// rather than clawing back a claimed task.
    pub async fn cancel(&self, task_id: Uuid) -> Result<bool, QueueError> {
        for member in self.store.scan().await? {
            let task: Task = match serde_json::from_str(&member) {
                Ok(task) => task,
                Err(e) => {
                    error!("Failed to decode process queue member: {}", e);
                    continue;
                }
            };

            if task.id == task_id {
                if self.store.remove(&member).await? {
                    self.publish_depth().await;
                    warn!("Task {} deleted from process queue", task_id);
                    return Ok(true);
                }
                // Claimed by a worker between scan and remove; nothing left
                // to cancel under this identifier.
                break;
            }
        }

        info!("Task {} not found in process queue", task_id);
        Ok(false)
    }

    /// Number of pending tasks.
    pub async fn depth(&self) -> Result<usize, QueueError> {
        self.store.len().await
    }

    async fn publish_depth(&self) {
        if let Ok(depth) = self.store.len().await {
            gauge!("cantus_process_queue_depth").set(depth as f64);
        }
    }
}

/// FIFO hand-off of completed results between the processing and delivery
/// stages.
pub struct UploadQueue {
    store: Arc<dyn FifoStore>,
}

impl UploadQueue {
    pub fn new(store: Arc<dyn FifoStore>) -> Self {
        Self { store }
    }

    /// Convenience constructor over the in-memory backend.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryFifoStore::new()))
    }

    pub async fn push(&self, job: &UploadJob) -> Result<(), QueueError> {
        let item = serde_json::to_string(job)?;
        self.store.push(item).await?;
        self.publish_depth().await;
        info!("Task {} pushed to upload queue", job.task_id);
        Ok(())
    }

    /// Pops the oldest job, waiting up to `timeout` for one to arrive.
    pub async fn pop(&self, timeout: Duration) -> Result<Option<UploadJob>, QueueError> {
        let Some(item) = self.store.pop_blocking(timeout).await? else {
            return Ok(None);
        };

        let job: UploadJob = serde_json::from_str(&item)?;
        self.publish_depth().await;
        debug!("Task {} retrieved from upload queue", job.task_id);
        Ok(Some(job))
    }

    /// Number of results awaiting delivery.
    pub async fn depth(&self) -> Result<usize, QueueError> {
        self.store.len().await
    }

    async fn publish_depth(&self) {
        if let Ok(depth) = self.store.len().await {
            gauge!("cantus_upload_queue_depth").set(depth as f64);
        }
    }
}

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

//! Process Worker
//!
//! Dequeues the highest-score pending task, invokes the synthesis engine,
//! and routes the outcome: success becomes an [`UploadJob`] on the upload
//! queue; any failure discards the task and sends the failure callback
//! directly, bypassing the upload stage.

use std::sync::Arc;

use metrics::counter;
use tracing::{error, info};

use crate::queue::{ProcessQueue, UploadQueue};
use crate::synthesis::{SynthesisRequest, Synthesizer};
use crate::task::{Task, UploadJob};
use crate::webhook::CallbackClient;
use crate::worker::{ShutdownHandle, WorkerConfig};

/// Consumer loop over the process queue.
///
/// The dequeue is atomic and destructive, so several instances can safely
/// drain one queue; each operates only on its privately claimed task.
pub struct ProcessWorker {
    process_queue: Arc<ProcessQueue>,
    upload_queue: Arc<UploadQueue>,
    synthesizer: Arc<dyn Synthesizer>,
    callbacks: Arc<CallbackClient>,
    config: WorkerConfig,
    shutdown: ShutdownHandle,
}

impl ProcessWorker {
    pub fn new(
        process_queue: Arc<ProcessQueue>,
        upload_queue: Arc<UploadQueue>,
        synthesizer: Arc<dyn Synthesizer>,
        callbacks: Arc<CallbackClient>,
        config: WorkerConfig,
        shutdown: ShutdownHandle,
    ) -> Self {
        Self {
            process_queue,
            upload_queue,
            synthesizer,
            callbacks,
            config,
            shutdown,
        }
    }

    /// Runs until shutdown. Never exits on a task error; loop-level errors
    /// pause the loop briefly and it resumes.
    pub async fn run(&self) {
        info!("Process worker started, waiting for tasks");

        while !self.shutdown.is_shutdown() {
            match self.process_queue.dequeue().await {
                Ok(Some(task)) => self.handle_task(task).await,
                Ok(None) => self.idle(self.config.poll_interval).await,
                Err(e) => {
                    error!("Process worker critical error: {}", e);
                    self.idle(self.config.error_backoff).await;
                }
            }
        }

        info!("Process worker stopped gracefully");
    }

    async fn idle(&self, duration: std::time::Duration) {
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.shutdown.wait() => {}
        }
    }

    async fn handle_task(&self, task: Task) {
        let request = SynthesisRequest::for_task(&task, &self.config.output_dir);
        info!(
            "[{}] Processing task: language={}, text_length={}",
            task.id,
            request.language,
            request.text.len()
        );

        match self.synthesizer.synthesize(&request).await {
            Ok(artifact_paths) => {
                let job = UploadJob {
                    task_id: task.id,
                    hook_url: task.payload.hook_url.clone(),
                    artifact_paths,
                    cleanup_after_upload: self.config.cleanup_after_upload,
                };

                match self.upload_queue.push(&job).await {
                    Ok(()) => {
                        counter!("cantus_tasks_processed").increment(1);
                        info!("[{}] Synthesis completed, pushed to upload queue", task.id);
                    }
                    Err(e) => {
                        // The result cannot reach the delivery stage; close
                        // out the task with a failure callback instead.
                        error!("[{}] Failed to hand off result: {}", task.id, e);
                        self.fail_task(&task, &format!("Result hand-off failed: {e}"), None)
                            .await;
                    }
                }
            }
            Err(e) => {
                error!("[{}] Task failed: {}", task.id, e);
                counter!("cantus_synthesis_failures").increment(1);

                remove_partial_artifact(&request);
                let code = e.error_code();
                self.fail_task(&task, &e.to_string(), code).await;
            }
        }
    }

    async fn fail_task(&self, task: &Task, message: &str, code: Option<&str>) {
        if let Err(e) = self
            .callbacks
            .deliver_failure(task.id, &task.payload.hook_url, message, code)
            .await
        {
            error!("[{}] Failure callback not delivered: {}", task.id, e);
        }
    }
}

/// A failed attempt may leave a partially-written primary artifact behind.
fn remove_partial_artifact(request: &SynthesisRequest) {
    if request.output_path.exists() {
        if let Err(e) = std::fs::remove_file(&request.output_path) {
            error!(
                "[{}] Failed to remove partial artifact {}: {}",
                request.task_id,
                request.output_path.display(),
                e
            );
        }
    }
}

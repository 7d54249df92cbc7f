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

//! Upload Worker
//!
//! Drains the upload queue: persists each artifact through the storage
//! capability, applies the cleanup policy to the local files whether or not
//! the upload succeeded, then delivers the outcome callback.

use std::collections::BTreeMap;
use std::sync::Arc;

use metrics::counter;
use tracing::{error, info};

use crate::error::StorageError;
use crate::queue::UploadQueue;
use crate::storage::ArtifactStore;
use crate::task::UploadJob;
use crate::webhook::{CallbackClient, DeliveredArtifacts};
use crate::worker::{ShutdownHandle, WorkerConfig};

/// Consumer loop over the upload queue.
///
/// Several instances may drain one queue; FIFO ordering then becomes
/// best-effort rather than globally strict.
pub struct UploadWorker {
    upload_queue: Arc<UploadQueue>,
    store: Arc<dyn ArtifactStore>,
    callbacks: Arc<CallbackClient>,
    config: WorkerConfig,
    shutdown: ShutdownHandle,
}

impl UploadWorker {
    pub fn new(
        upload_queue: Arc<UploadQueue>,
        store: Arc<dyn ArtifactStore>,
        callbacks: Arc<CallbackClient>,
        config: WorkerConfig,
        shutdown: ShutdownHandle,
    ) -> Self {
        Self {
            upload_queue,
            store,
            callbacks,
            config,
            shutdown,
        }
    }

    /// Runs until shutdown. The bounded pop keeps the loop responsive to the
    /// stop signal without busy-waiting.
    pub async fn run(&self) {
        info!("Upload worker started, waiting for tasks in upload queue");

        while !self.shutdown.is_shutdown() {
            match self.upload_queue.pop(self.config.upload_pop_timeout).await {
                Ok(Some(job)) => self.handle_job(job).await,
                Ok(None) => {}
                Err(e) => {
                    error!("Upload worker critical error: {}", e);
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.error_backoff) => {}
                        _ = self.shutdown.wait() => {}
                    }
                }
            }
        }

        info!("Upload worker stopped gracefully");
    }

    async fn handle_job(&self, job: UploadJob) {
        info!(
            "[{}] Starting artifact upload, count: {}",
            job.task_id,
            job.artifact_paths.len()
        );

        let uploaded = self.upload_artifacts(&job).await;

        // Disk space is the scarce resource here: local artifacts go away
        // after the attempt whether or not the upload worked.
        cleanup_local_files(&job);

        match uploaded {
            Ok(artifacts) => {
                counter!("cantus_uploads_completed").increment(1);
                if let Err(e) = self
                    .callbacks
                    .deliver_success(job.task_id, &job.hook_url, &artifacts)
                    .await
                {
                    error!("[{}] Success callback not delivered: {}", job.task_id, e);
                }
            }
            Err(e) => {
                error!("[{}] Upload task failed: {}", job.task_id, e);
                counter!("cantus_uploads_failed").increment(1);
                let message = format!("Artifact upload failed: {e}");
                if let Err(e) = self
                    .callbacks
                    .deliver_failure(job.task_id, &job.hook_url, &message, None)
                    .await
                {
                    error!("[{}] Failure callback not delivered: {}", job.task_id, e);
                }
            }
        }
    }

    async fn upload_artifacts(&self, job: &UploadJob) -> Result<DeliveredArtifacts, StorageError> {
        let mut urls = BTreeMap::new();
        for path in &job.artifact_paths {
            let url = self.store.put(path).await?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            info!("[{}] Uploaded {} -> {}", job.task_id, path.display(), url);
            urls.insert(file_name, url);
        }

        if urls.len() == 1 {
            let url = urls.into_values().next().unwrap_or_default();
            Ok(DeliveredArtifacts::Single(url))
        } else {
            Ok(DeliveredArtifacts::Batch(urls))
        }
    }
}

fn cleanup_local_files(job: &UploadJob) {
    if !job.cleanup_after_upload {
        return;
    }

    let mut cleaned = 0;
    for path in &job.artifact_paths {
        if path.exists() {
            match std::fs::remove_file(path) {
                Ok(()) => cleaned += 1,
                Err(e) => error!(
                    "[{}] Failed to remove local artifact {}: {}",
                    job.task_id,
                    path.display(),
                    e
                ),
            }
        }
    }

    if cleaned > 0 {
        info!("[{}] Cleaned up {} local files", job.task_id, cleaned);
    }
}

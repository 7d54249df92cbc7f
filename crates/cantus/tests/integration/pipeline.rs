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

//! End-to-end pipeline tests: submission through both workers to the
//! outcome callback, with stub synthesis and storage collaborators.

use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;

use cantus::gateway::SubmissionGateway;
use cantus::queue::{ProcessQueue, UploadQueue};
use cantus::retry::{BackoffStrategy, RetryPolicy};
use cantus::storage::ArtifactStore;
use cantus::webhook::CallbackClient;
use cantus::worker::{ProcessWorker, ShutdownHandle, UploadWorker, WorkerConfig};

use crate::harness::{submission, HookServer, RecordingStore, StubSynthesizer};

/// A running pipeline with both workers spawned.
struct Pipeline {
    gateway: Arc<SubmissionGateway>,
    shutdown: ShutdownHandle,
    output_dir: tempfile::TempDir,
}

impl Pipeline {
    async fn start(store: Arc<dyn ArtifactStore>) -> Self {
        let output_dir = tempfile::tempdir().unwrap();

        let process_queue = Arc::new(ProcessQueue::in_memory());
        let upload_queue = Arc::new(UploadQueue::in_memory());
        let gateway = Arc::new(SubmissionGateway::new(
            process_queue.clone(),
            vec!["en".to_string()],
        ));
        let callbacks = Arc::new(CallbackClient::new(fast_policy()).unwrap());

        let config = WorkerConfig {
            poll_interval: Duration::from_millis(10),
            upload_pop_timeout: Duration::from_millis(50),
            error_backoff: Duration::from_millis(50),
            output_dir: output_dir.path().to_path_buf(),
            cleanup_after_upload: true,
        };
        let shutdown = ShutdownHandle::new();

        let process_worker = ProcessWorker::new(
            process_queue,
            upload_queue.clone(),
            Arc::new(StubSynthesizer),
            callbacks.clone(),
            config.clone(),
            shutdown.clone(),
        );
        let upload_worker =
            UploadWorker::new(upload_queue, store, callbacks, config, shutdown.clone());

        tokio::spawn(async move { process_worker.run().await });
        tokio::spawn(async move { upload_worker.run().await });

        Self {
            gateway,
            shutdown,
            output_dir,
        }
    }

    fn artifact_path(&self, task_uuid: uuid::Uuid) -> std::path::PathBuf {
        self.output_dir.path().join(format!("{task_uuid}_output.wav"))
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.shutdown.shutdown();
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 4,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(200),
        backoff: BackoffStrategy::Exponential {
            base: 2.0,
            multiplier: 1.0,
        },
        jitter: false,
    }
}

#[tokio::test]
#[serial]
async fn successful_task_delivers_one_success_callback_and_cleans_up() {
    let hook = HookServer::start(vec![]).await;
    let pipeline = Pipeline::start(Arc::new(RecordingStore::default())).await;

    let admitted = pipeline
        .gateway
        .submit(submission("hello", 3, &hook.url))
        .await
        .unwrap();

    assert!(hook.wait_for_hits(1, Duration::from_secs(5)).await);
    // Give a misbehaving pipeline the chance to double-deliver.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let received = hook.received();
    assert_eq!(received.len(), 1);
    let body = &received[0];
    assert_eq!(body["status"], "success");
    assert_eq!(body["task_uuid"], admitted.task_uuid.to_string());
    assert!(body["timestamp"].is_i64());
    let url = body["s3_url"].as_str().unwrap();
    assert!(!url.is_empty());
    assert!(body.get("error_message").is_none());

    // Cleanup policy removed the local artifact.
    assert!(!pipeline.artifact_path(admitted.task_uuid).exists());
}

#[tokio::test]
#[serial]
async fn quiet_reference_failure_reports_the_error_code() {
    let hook = HookServer::start(vec![]).await;
    let pipeline = Pipeline::start(Arc::new(RecordingStore::default())).await;

    let admitted = pipeline
        .gateway
        .submit(submission("fail:quiet", 3, &hook.url))
        .await
        .unwrap();

    assert!(hook.wait_for_hits(1, Duration::from_secs(5)).await);

    let received = hook.received();
    assert_eq!(received.len(), 1);
    let body = &received[0];
    assert_eq!(body["status"], "failed");
    assert_eq!(body["task_uuid"], admitted.task_uuid.to_string());
    assert_eq!(body["error_code"], "AUDIO_TOO_QUIET");
    assert!(body["error_message"]
        .as_str()
        .unwrap()
        .contains("too quiet"));
    assert!(body.get("s3_url").is_none());
}

#[tokio::test]
#[serial]
async fn generic_failure_omits_the_error_code_and_removes_partial_output() {
    let hook = HookServer::start(vec![]).await;
    let pipeline = Pipeline::start(Arc::new(RecordingStore::default())).await;

    let admitted = pipeline
        .gateway
        .submit(submission("fail:engine", 3, &hook.url))
        .await
        .unwrap();

    assert!(hook.wait_for_hits(1, Duration::from_secs(5)).await);

    let received = hook.received();
    let body = &received[0];
    assert_eq!(body["status"], "failed");
    assert!(body.get("error_code").is_none());
    assert!(body["error_message"].as_str().unwrap().contains("engine"));

    // The stub left a partial artifact; the worker removed it.
    assert!(!pipeline.artifact_path(admitted.task_uuid).exists());
}

#[tokio::test]
#[serial]
async fn upload_failure_still_cleans_up_and_reports_failure() {
    let hook = HookServer::start(vec![]).await;
    let pipeline = Pipeline::start(Arc::new(RecordingStore::failing())).await;

    let admitted = pipeline
        .gateway
        .submit(submission("hello", 3, &hook.url))
        .await
        .unwrap();

    assert!(hook.wait_for_hits(1, Duration::from_secs(5)).await);

    let received = hook.received();
    let body = &received[0];
    assert_eq!(body["status"], "failed");
    assert!(body["error_message"]
        .as_str()
        .unwrap()
        .contains("upload failed"));
    assert!(body.get("s3_url").is_none());

    // Local artifact is gone even though the upload never succeeded.
    assert!(!pipeline.artifact_path(admitted.task_uuid).exists());
}

#[tokio::test]
#[serial]
async fn canceled_task_never_produces_a_callback() {
    let hook = HookServer::start(vec![]).await;

    // Build the pieces by hand so cancellation can win the race: the worker
    // is started only after the cancel completes.
    let output_dir = tempfile::tempdir().unwrap();
    let process_queue = Arc::new(ProcessQueue::in_memory());
    let upload_queue = Arc::new(UploadQueue::in_memory());
    let gateway = Arc::new(SubmissionGateway::new(
        process_queue.clone(),
        vec!["en".to_string()],
    ));
    let callbacks = Arc::new(CallbackClient::new(fast_policy()).unwrap());

    let admitted = gateway
        .submit(submission("hello", 3, &hook.url))
        .await
        .unwrap();
    assert!(gateway.cancel(admitted.task_uuid).await.unwrap());
    // Idempotent: the second attempt reports not-found without error.
    assert!(!gateway.cancel(admitted.task_uuid).await.unwrap());

    let config = WorkerConfig {
        poll_interval: Duration::from_millis(10),
        upload_pop_timeout: Duration::from_millis(50),
        error_backoff: Duration::from_millis(50),
        output_dir: output_dir.path().to_path_buf(),
        cleanup_after_upload: true,
    };
    let shutdown = ShutdownHandle::new();
    let worker = ProcessWorker::new(
        process_queue.clone(),
        upload_queue,
        Arc::new(StubSynthesizer),
        callbacks,
        config,
        shutdown.clone(),
    );
    tokio::spawn(async move { worker.run().await });

    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown.shutdown();

    assert_eq!(hook.hits(), 0);
    assert_eq!(process_queue.depth().await.unwrap(), 0);
}

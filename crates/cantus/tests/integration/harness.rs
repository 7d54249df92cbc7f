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

//! Shared fixtures: a scriptable synthesis stub, a recording artifact store,
//! and an in-process webhook receiver with a programmable response script.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use cantus::error::{StorageError, SynthesisError};
use cantus::gateway::{SubmissionParams, SubmissionRequest};
use cantus::storage::ArtifactStore;
use cantus::synthesis::{SynthesisRequest, Synthesizer};

/// Synthesis stub scripted through the request text:
/// - `"fail:quiet"` fails with the quiet-reference condition,
/// - `"fail:engine"` fails generically, leaving a partial artifact behind,
/// - anything else writes the primary artifact and succeeds.
pub struct StubSynthesizer;

#[async_trait]
impl Synthesizer for StubSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<PathBuf>, SynthesisError> {
        match request.text.as_str() {
            "fail:quiet" => Err(SynthesisError::AudioTooQuiet {
                rms_db: -48.2,
                threshold_db: -40.0,
            }),
            "fail:engine" => {
                std::fs::write(&request.output_path, b"partial")?;
                Err(SynthesisError::Engine("model exploded".to_string()))
            }
            _ => {
                std::fs::write(&request.output_path, b"RIFF")?;
                Ok(vec![request.output_path.clone()])
            }
        }
    }
}

/// Artifact store that records uploads and mints CDN-style URLs. Can be
/// flipped to fail every put.
#[derive(Default)]
pub struct RecordingStore {
    pub uploads: Mutex<Vec<PathBuf>>,
    pub fail: bool,
}

impl RecordingStore {
    pub fn failing() -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            fail: true,
        }
    }
}

#[async_trait]
impl ArtifactStore for RecordingStore {
    async fn put(&self, path: &Path) -> Result<String, StorageError> {
        if self.fail {
            return Err(StorageError::Upload("bucket unavailable".to_string()));
        }
        self.uploads.lock().unwrap().push(path.to_path_buf());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        Ok(format!("https://cdn.example/files/{name}"))
    }
}

#[derive(Clone)]
struct HookState {
    received: Arc<Mutex<Vec<serde_json::Value>>>,
    script: Arc<Mutex<VecDeque<u16>>>,
}

/// In-process webhook endpoint.
///
/// Responds with the scripted status codes in order, then 200 for every
/// further request, recording each received body.
pub struct HookServer {
    pub url: String,
    received: Arc<Mutex<Vec<serde_json::Value>>>,
}

impl HookServer {
    pub async fn start(script: Vec<u16>) -> Self {
        let state = HookState {
            received: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(Mutex::new(script.into())),
        };

        let app = Router::new()
            .route("/hook", post(receive))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            url: format!("http://{addr}/hook"),
            received: state.received,
        }
    }

    pub fn received(&self) -> Vec<serde_json::Value> {
        self.received.lock().unwrap().clone()
    }

    /// Total requests seen, including ones answered with failure statuses.
    pub fn hits(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    /// Polls until at least `count` requests arrived or the timeout elapses.
    pub async fn wait_for_hits(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if self.hits() >= count {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.hits() >= count
    }
}

async fn receive(
    State(state): State<HookState>,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    state.received.lock().unwrap().push(body);
    let next = state.script.lock().unwrap().pop_front();
    StatusCode::from_u16(next.unwrap_or(200)).unwrap_or(StatusCode::OK)
}

/// Valid submission pointed at the given hook.
pub fn submission(text: &str, priority: i64, hook_url: &str) -> SubmissionRequest {
    SubmissionRequest {
        text: Some(text.to_string()),
        spk_audio_prompt: Some("http://audio.example/sample.wav".to_string()),
        priority: Some(priority),
        hook_url: Some(hook_url.to_string()),
        params: SubmissionParams::default(),
    }
}

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

//! Synthesis Boundary
//!
//! [`Synthesizer`] is the injected capability that turns text plus a
//! reference voice sample into audio artifacts. The pipeline never assumes a
//! particular engine; implementations are constructor-injected so tests can
//! substitute stubs.
//!
//! This module also provides reference-locator resolution shared by engine
//! implementations: URL prompts are downloaded to a scratch directory with a
//! bounded timeout and removed again after the attempt, local-path prompts
//! are checked for existence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::SynthesisError;
use crate::task::Task;

/// Timeout for fetching a remote reference sample.
const REFERENCE_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// One synthesis invocation, built by the process worker from a claimed task.
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub task_id: Uuid,
    pub text: String,
    pub language: String,
    /// Reference voice sample locator: `http(s)` URL or local path.
    pub spk_audio_prompt: String,
    /// Where the engine is asked to write its primary artifact. The worker
    /// owns this path and removes it if the attempt fails partway.
    pub output_path: PathBuf,
    /// Engine-specific options passed through uninterpreted.
    pub options: Option<serde_json::Value>,
}

impl SynthesisRequest {
    /// Derives the engine invocation for a claimed task, placing the primary
    /// artifact under `output_dir`.
    pub fn for_task(task: &Task, output_dir: &Path) -> Self {
        Self {
            task_id: task.id,
            text: task.payload.text.clone(),
            language: task.payload.language.clone(),
            spk_audio_prompt: task.payload.spk_audio_prompt.clone(),
            output_path: output_dir.join(format!("{}_output.wav", task.id)),
            options: task.payload.options.clone(),
        }
    }
}

/// The opaque synthesis capability.
///
/// On success, returns the produced artifact paths in output order (a single
/// element for single-file engines). Failures carrying
/// [`SynthesisError::AudioTooQuiet`] are reported to the caller with a stable
/// error code; everything else surfaces as free text.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<PathBuf>, SynthesisError>;
}

/// A reference sample resolved to a local file.
///
/// Downloaded references are temporary and removed on drop, whether or not
/// the synthesis attempt succeeded.
#[derive(Debug)]
pub struct ResolvedReference {
    path: PathBuf,
    temporary: bool,
}

impl ResolvedReference {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ResolvedReference {
    fn drop(&mut self) {
        if self.temporary && self.path.exists() {
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!(
                    "Failed to clean up temporary reference {}: {}",
                    self.path.display(),
                    e
                );
            }
        }
    }
}

/// Resolves a reference locator to a local file.
///
/// URLs are fetched into `temp_dir` under a task-scoped name; local paths
/// must already exist.
pub async fn resolve_reference(
    http: &reqwest::Client,
    locator: &str,
    temp_dir: &Path,
    task_id: Uuid,
) -> Result<ResolvedReference, SynthesisError> {
    if locator.starts_with("http://") || locator.starts_with("https://") {
        let file_name = locator
            .rsplit('/')
            .next()
            .filter(|n| !n.is_empty())
            .unwrap_or("reference.wav");
        let local_path = temp_dir.join(format!("{task_id}_reference_{file_name}"));

        info!("Downloading reference audio from {}", locator);
        let response = http
            .get(locator)
            .timeout(REFERENCE_FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| SynthesisError::ReferenceDownload(e.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|e| SynthesisError::ReferenceDownload(e.to_string()))?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::ReferenceDownload(e.to_string()))?;

        tokio::fs::write(&local_path, &bytes).await?;
        info!("Reference audio downloaded to {}", local_path.display());

        return Ok(ResolvedReference {
            path: local_path,
            temporary: true,
        });
    }

    let path = PathBuf::from(locator);
    if !path.exists() {
        return Err(SynthesisError::ReferenceNotFound { path });
    }
    Ok(ResolvedReference {
        path,
        temporary: false,
    })
}

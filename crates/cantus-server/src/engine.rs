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

//! Command-Line Engine Adapter
//!
//! Drives an external synthesis engine binary: the configured argv template
//! is expanded per task (`{text}`, `{language}`, `{reference}`, `{output}`),
//! the process runs under a hard timeout, and its outcome maps onto the
//! pipeline's synthesis errors.
//!
//! Engines report the quiet-reference condition by printing a line
//! containing `AUDIO_TOO_QUIET rms_db=<x> threshold_db=<y>` to stderr and
//! exiting non-zero; anything else non-zero is a generic engine failure.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use cantus::error::SynthesisError;
use cantus::synthesis::{resolve_reference, SynthesisRequest, Synthesizer};

use crate::config::EngineConfig;

/// Synthesizer over an external engine process.
pub struct CommandSynthesizer {
    command: String,
    args: Vec<String>,
    temp_dir: PathBuf,
    timeout: Duration,
    http: reqwest::Client,
}

impl CommandSynthesizer {
    pub fn new(config: &EngineConfig, http: reqwest::Client) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            temp_dir: config.temp_dir.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            http,
        }
    }

    fn expand_args(&self, request: &SynthesisRequest, reference: &Path) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{text}", &request.text)
                    .replace("{language}", &request.language)
                    .replace("{reference}", &reference.display().to_string())
                    .replace("{output}", &request.output_path.display().to_string())
            })
            .collect()
    }
}

#[async_trait]
impl Synthesizer for CommandSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<Vec<PathBuf>, SynthesisError> {
        // Downloaded references clean themselves up when this guard drops,
        // whether or not the engine run succeeds.
        let reference = resolve_reference(
            &self.http,
            &request.spk_audio_prompt,
            &self.temp_dir,
            request.task_id,
        )
        .await?;

        let args = self.expand_args(request, reference.path());
        debug!("[{}] Running engine: {} {:?}", request.task_id, self.command, args);

        let child = Command::new(&self.command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // A timed-out engine must not keep running behind the worker.
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SynthesisError::Engine(format!("Failed to spawn engine: {e}")))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| SynthesisError::Timeout(self.timeout))?
            .map_err(|e| SynthesisError::Engine(format!("Engine I/O failure: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if let Some(quiet) = parse_quiet_marker(&stderr) {
                return Err(quiet);
            }
            let detail = stderr
                .lines()
                .last()
                .unwrap_or("engine exited with failure")
                .to_string();
            return Err(SynthesisError::Engine(detail));
        }

        if !request.output_path.exists() {
            return Err(SynthesisError::Engine(format!(
                "Engine reported success but produced no artifact at {}",
                request.output_path.display()
            )));
        }

        info!(
            "[{}] Voice generation completed: {}",
            request.task_id,
            request.output_path.display()
        );
        Ok(vec![request.output_path.clone()])
    }
}

/// Extracts the quiet-reference report from engine stderr, if present.
fn parse_quiet_marker(stderr: &str) -> Option<SynthesisError> {
    let line = stderr.lines().find(|l| l.contains("AUDIO_TOO_QUIET"))?;

    let field = |key: &str| -> Option<f64> {
        line.split_whitespace()
            .find_map(|token| token.strip_prefix(key))
            .and_then(|v| v.parse().ok())
    };

    Some(SynthesisError::AudioTooQuiet {
        rms_db: field("rms_db=")?,
        threshold_db: field("threshold_db=")?,
    })
}

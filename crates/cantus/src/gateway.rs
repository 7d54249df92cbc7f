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

//! Submission Gateway
//!
//! The only creation point for tasks. Validates the inbound request fields,
//! assigns identity and admission time, computes the ordering score, and
//! inserts into the process queue. Invalid requests fail synchronously with a
//! classified [`AdmissionError`] and never reach the queue.

use std::sync::Arc;

use metrics::counter;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{AdmissionError, SubmitError};
use crate::queue::ProcessQueue;
use crate::task::{Task, TaskPayload, DEFAULT_PRIORITY, MAX_PRIORITY, MIN_PRIORITY};

/// Inbound submission body, deserialized as received.
///
/// Every field is optional at the type level so validation can answer with a
/// field-specific message instead of a generic decode failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionRequest {
    pub text: Option<String>,
    pub spk_audio_prompt: Option<String>,
    pub priority: Option<i64>,
    pub hook_url: Option<String>,
    #[serde(default)]
    pub params: SubmissionParams,
}

/// Optional request parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionParams {
    pub language: Option<String>,
    /// Engine-specific options passed through uninterpreted.
    #[serde(flatten)]
    pub options: serde_json::Map<String, serde_json::Value>,
}

/// Successful admission receipt.
#[derive(Debug, Clone)]
pub struct Admitted {
    pub task_uuid: Uuid,
    /// Ordering score the task entered the queue with.
    pub score: f64,
}

/// Validates and admits submission requests.
pub struct SubmissionGateway {
    queue: Arc<ProcessQueue>,
    supported_languages: Vec<String>,
    default_language: String,
}

impl SubmissionGateway {
    pub fn new(queue: Arc<ProcessQueue>, supported_languages: Vec<String>) -> Self {
        Self {
            queue,
            supported_languages,
            default_language: "en".to_string(),
        }
    }

    /// Admits a request into the process queue.
    ///
    /// Validation order and messages follow the public API contract: `text`,
    /// `hook_url`, and `spk_audio_prompt` must be present and non-empty,
    /// `priority` (default 3) must lie in 1..=5, and the language (default
    /// `en`) must belong to the configured supported set.
    pub async fn submit(&self, request: SubmissionRequest) -> Result<Admitted, SubmitError> {
        let text = require_field(request.text, "text")?;
        let hook_url = require_field(request.hook_url, "hook_url")?;
        let spk_audio_prompt = require_field(request.spk_audio_prompt, "spk_audio_prompt")?;

        let priority = match request.priority {
            None => DEFAULT_PRIORITY,
            Some(p) if (i64::from(MIN_PRIORITY)..=i64::from(MAX_PRIORITY)).contains(&p) => p as u8,
            Some(p) => return Err(AdmissionError::PriorityOutOfRange { priority: p }.into()),
        };

        let language = request
            .params
            .language
            .unwrap_or_else(|| self.default_language.clone());
        if !self.supported_languages.iter().any(|l| l == &language) {
            return Err(AdmissionError::UnsupportedLanguage { language }.into());
        }

        let options = if request.params.options.is_empty() {
            None
        } else {
            Some(serde_json::Value::Object(request.params.options))
        };

        let task = Task::new(
            priority,
            TaskPayload {
                text,
                spk_audio_prompt,
                language,
                hook_url,
                options,
            },
        );

        let score = self.queue.enqueue(&task).await?;
        counter!("cantus_tasks_admitted").increment(1);
        info!("Created task: {}, priority: {}", task.id, task.priority);

        Ok(Admitted {
            task_uuid: task.id,
            score,
        })
    }

    /// Cancels a still-pending task. Idempotent: an unknown or already
    /// claimed identifier reports `false` rather than an error.
    pub async fn cancel(&self, task_id: Uuid) -> Result<bool, SubmitError> {
        let removed = self.queue.cancel(task_id).await?;
        if removed {
            counter!("cantus_tasks_canceled").increment(1);
            info!("Canceled task: {}", task_id);
        }
        Ok(removed)
    }
}

fn require_field(value: Option<String>, field: &'static str) -> Result<String, AdmissionError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AdmissionError::MissingField { field }),
    }
}

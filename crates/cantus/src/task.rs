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

//! Task Model
//!
//! This module defines the records moved through the pipeline's two queues:
//! [`Task`] for pending synthesis work and [`UploadJob`] for completed
//! results awaiting storage upload and callback delivery. Both are immutable
//! once constructed; they are only moved between queues or discarded.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Most urgent priority a caller may request.
pub const MIN_PRIORITY: u8 = 1;
/// Least urgent priority a caller may request.
pub const MAX_PRIORITY: u8 = 5;
/// Priority assigned when the caller does not specify one.
pub const DEFAULT_PRIORITY: u8 = 3;

/// One voice-synthesis request admitted into the pipeline.
///
/// Created only by the submission gateway. The task resides in the process
/// queue until exactly one process worker removes it; after that it either
/// becomes an [`UploadJob`] (success) or is discarded with a failure callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier, generated at admission and stable for the task's
    /// lifetime. Used for cancellation, logging, and callback correlation.
    pub id: Uuid,
    /// Urgency, 1 (most urgent) through 5. Feeds the ordering score.
    pub priority: u8,
    /// Admission timestamp.
    pub created_at: DateTime<Utc>,
    /// The caller's request data. Opaque to the queues; only the workers and
    /// the callback client look inside.
    pub payload: TaskPayload,
}

/// The caller-supplied request data carried by a [`Task`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPayload {
    /// Text to synthesize.
    pub text: String,
    /// Reference voice sample locator: an `http(s)` URL or a local path.
    pub spk_audio_prompt: String,
    /// Target language code (validated against the configured set).
    pub language: String,
    /// Webhook notified of the task's final outcome.
    pub hook_url: String,
    /// Engine-specific options passed through uninterpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<serde_json::Value>,
}

/// A completed synthesis result awaiting upload and callback delivery.
///
/// The originating task no longer exists as a queue entry by the time one of
/// these is created; everything the delivery stage needs is copied in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadJob {
    /// Identifier of the originating task.
    pub task_id: Uuid,
    /// Webhook copied from the task payload so delivery never re-resolves it.
    pub hook_url: String,
    /// Local artifact files produced by the synthesis engine, in output order.
    pub artifact_paths: Vec<PathBuf>,
    /// Whether local artifacts are deleted after the upload attempt.
    pub cleanup_after_upload: bool,
}

impl Task {
    /// Builds a task for an already-validated payload, stamping identity and
    /// admission time.
    pub fn new(priority: u8, payload: TaskPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            priority,
            created_at: Utc::now(),
            payload,
        }
    }
}

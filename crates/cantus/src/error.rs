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

//! Error Types
//!
//! One error enum per pipeline concern. Admission errors surface synchronously
//! to the submitting caller and never reach a queue; synthesis and storage
//! errors terminate a task's lifecycle with a failure callback; callback
//! errors are classified permanent vs. transient by the delivery client.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Stable machine-readable code attached to quiet-reference failures so
/// callers can handle them programmatically.
pub const AUDIO_TOO_QUIET: &str = "AUDIO_TOO_QUIET";

/// Request validation failures, surfaced as client errors at the submission
/// boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Priority must be between 1 and 5")]
    PriorityOutOfRange { priority: i64 },

    #[error("Unsupported language: {language}")]
    UnsupportedLanguage { language: String },
}

/// Queue store failures.
///
/// The in-memory stores cannot fail, but the store traits are written for
/// swappable backends where encoding and transport both can.
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to encode queue member: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Queue backend error: {0}")]
    Backend(String),
}

/// Errors from admitting a task through the submission gateway.
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

/// Failures produced by the synthesis engine or by resolving its reference
/// audio input.
#[derive(Error, Debug)]
pub enum SynthesisError {
    /// The reference sample's measured loudness is below the engine's floor.
    /// Carries the measurement so the failure callback can report it.
    #[error("Reference audio is too quiet: {rms_db:.2} dB RMS, threshold {threshold_db:.2} dB")]
    AudioTooQuiet { rms_db: f64, threshold_db: f64 },

    #[error("Reference audio not found: {path}")]
    ReferenceNotFound { path: PathBuf },

    #[error("Failed to download reference audio: {0}")]
    ReferenceDownload(String),

    #[error("Synthesis engine timed out after {0:?}")]
    Timeout(Duration),

    #[error("Synthesis engine failure: {0}")]
    Engine(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SynthesisError {
    /// Machine-readable code for failures callers are expected to branch on.
    /// Generic engine failures intentionally carry none.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            SynthesisError::AudioTooQuiet { .. } => Some(AUDIO_TOO_QUIET),
            _ => None,
        }
    }
}

/// Failures persisting an artifact to the object store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Artifact not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Terminal outcomes of webhook delivery.
///
/// Transient failures are retried internally by the callback client and never
/// surface here; these variants are the reasons delivery gave up.
#[derive(Error, Debug)]
pub enum CallbackError {
    #[error("Permanent HTTP error {status} from callback endpoint")]
    Permanent { status: u16 },

    #[error("Callback not delivered after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("Unexpected callback delivery error: {0}")]
    Unexpected(String),
}

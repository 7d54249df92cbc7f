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

//! Cantus Core Library
//!
//! Cantus is a two-stage task pipeline for voice synthesis workloads. Requests
//! are admitted through a [`SubmissionGateway`], scheduled by priority score in
//! a [`ProcessQueue`], synthesized by a [`ProcessWorker`], handed off through a
//! FIFO [`UploadQueue`], and finally persisted to object storage and reported
//! to a caller-supplied webhook by an [`UploadWorker`].
//!
//! The synthesis engine and the object store are injected capabilities
//! ([`Synthesizer`] and [`ArtifactStore`]); the pipeline never assumes a
//! particular engine, storage provider, or queue backend. Queue backends are
//! swappable through the [`store`] traits.

pub mod error;
pub mod gateway;
pub mod queue;
pub mod retry;
pub mod score;
pub mod storage;
pub mod store;
pub mod synthesis;
pub mod task;
pub mod webhook;
pub mod worker;

// Export core types
pub use error::{
    AdmissionError, CallbackError, QueueError, StorageError, SubmitError, SynthesisError,
};
pub use gateway::{Admitted, SubmissionGateway, SubmissionRequest};
pub use queue::{ProcessQueue, UploadQueue};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use storage::ArtifactStore;
pub use store::memory::{MemoryFifoStore, MemoryPriorityStore};
pub use store::{FifoStore, PriorityStore};
pub use synthesis::{SynthesisRequest, Synthesizer};
pub use task::{Task, TaskPayload, UploadJob};
pub use webhook::{CallbackClient, DeliveredArtifacts};
pub use worker::{ProcessWorker, ShutdownHandle, UploadWorker, WorkerConfig};

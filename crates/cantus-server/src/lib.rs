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

//! Cantus Server
//!
//! HTTP front door and process wiring for the Cantus pipeline: the axum API
//! (submission, cancellation, health, stats, metrics), TOML configuration,
//! the command-line synthesis engine adapter, and the filesystem artifact
//! store used by CDN-fronted deployments.

pub mod api;
pub mod config;
pub mod engine;
pub mod object_store;

pub use api::{build_router, AppState};
pub use config::CantusConfig;
pub use engine::CommandSynthesizer;
pub use object_store::FsArtifactStore;

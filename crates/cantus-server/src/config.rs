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

//! Server Configuration
//!
//! TOML-backed configuration with defaults for every field, so the server
//! starts with no file at all and a partial file only overrides what it
//! names.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use cantus::retry::{BackoffStrategy, RetryPolicy};
use cantus::worker::WorkerConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CantusConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub queue: QueueConfig,
    pub engine: EngineConfig,
    pub storage: StorageConfig,
    pub delivery: DeliveryConfig,
    pub task: TaskConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// Inbound request body cap in bytes.
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// When set, logs also rotate daily into this directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Idle re-check interval for the process queue.
    pub poll_interval_ms: u64,
    /// Bounded wait for the upload queue's blocking pop.
    pub upload_pop_timeout_secs: u64,
    /// Pause after a worker loop-level failure.
    pub error_backoff_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Synthesis engine executable.
    pub command: String,
    /// Argv template; `{text}`, `{language}`, `{reference}`, and `{output}`
    /// are substituted per task.
    pub args: Vec<String>,
    pub output_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub timeout_secs: u64,
    pub supported_languages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory artifacts are published into.
    pub public_dir: PathBuf,
    /// URL prefix the public directory is served under.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_secs: u64,
    pub jitter: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    pub cleanup_after_upload: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            max_body_bytes: 100 * 1024 * 1024,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            dir: None,
            json: false,
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            upload_pop_timeout_secs: 5,
            error_backoff_secs: 5,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: "cantus-engine".to_string(),
            args: vec![
                "--text".to_string(),
                "{text}".to_string(),
                "--language".to_string(),
                "{language}".to_string(),
                "--reference".to_string(),
                "{reference}".to_string(),
                "--output".to_string(),
                "{output}".to_string(),
            ],
            output_dir: PathBuf::from("outputs"),
            temp_dir: PathBuf::from("temp"),
            timeout_secs: 600,
            supported_languages: vec![
                "en".to_string(),
                "zh".to_string(),
                "ja".to_string(),
                "ko".to_string(),
                "es".to_string(),
                "fr".to_string(),
                "de".to_string(),
            ],
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            public_dir: PathBuf::from("public"),
            public_base_url: "http://localhost:8080/files".to_string(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay_ms: 1000,
            max_delay_secs: 60,
            jitter: true,
        }
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            cleanup_after_upload: true,
        }
    }
}

impl CantusConfig {
    /// Loads configuration from an optional TOML file; absent file means
    /// pure defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                let config = toml::from_str(&raw)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Worker tuning derived from the queue/engine/task sections.
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            poll_interval: Duration::from_millis(self.queue.poll_interval_ms),
            upload_pop_timeout: Duration::from_secs(self.queue.upload_pop_timeout_secs),
            error_backoff: Duration::from_secs(self.queue.error_backoff_secs),
            output_dir: self.engine.output_dir.clone(),
            cleanup_after_upload: self.task.cleanup_after_upload,
        }
    }

    /// Callback retry schedule from the delivery section.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.delivery.max_attempts,
            initial_delay: Duration::from_millis(self.delivery.initial_delay_ms),
            max_delay: Duration::from_secs(self.delivery.max_delay_secs),
            backoff: BackoffStrategy::Exponential {
                base: 2.0,
                multiplier: 1.0,
            },
            jitter: self.delivery.jitter,
        }
    }
}

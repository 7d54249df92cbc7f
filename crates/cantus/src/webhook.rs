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

//! Webhook Delivery
//!
//! Sends the final task outcome to the caller-supplied hook URL with bounded
//! retry. Failure classification:
//!
//! - HTTP 4xx other than 408/429: permanent, give up immediately.
//! - 408, 429, any 5xx, network failure or timeout: transient, retry with
//!   the configured backoff.
//! - Anything else: unexpected, abort retries.
//!
//! After exhausting all attempts the failure is logged and counted; there is
//! no replay store for undelivered callbacks.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use reqwest::StatusCode;
use serde_json::json;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::CallbackError;
use crate::retry::RetryPolicy;

/// Per-attempt request timeout.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Uploaded artifact references carried by a success callback.
#[derive(Debug, Clone)]
pub enum DeliveredArtifacts {
    /// Single-file result: the callback body carries `s3_url`.
    Single(String),
    /// Multi-file result: the callback body carries a `urls` mapping keyed by
    /// artifact file name.
    Batch(BTreeMap<String, String>),
}

/// HTTP client for outcome callbacks.
pub struct CallbackClient {
    http: reqwest::Client,
    policy: RetryPolicy,
}

impl CallbackClient {
    /// Builds a client with the given retry schedule.
    pub fn new(policy: RetryPolicy) -> Result<Self, CallbackError> {
        let http = reqwest::Client::builder()
            .timeout(ATTEMPT_TIMEOUT)
            .build()
            .map_err(|e| CallbackError::Unexpected(e.to_string()))?;
        Ok(Self { http, policy })
    }

    /// Notifies the hook that the task completed, including the uploaded
    /// artifact reference(s).
    pub async fn deliver_success(
        &self,
        task_id: Uuid,
        hook_url: &str,
        artifacts: &DeliveredArtifacts,
    ) -> Result<(), CallbackError> {
        let mut body = json!({
            "task_uuid": task_id,
            "status": "success",
            "timestamp": Utc::now().timestamp(),
        });
        match artifacts {
            DeliveredArtifacts::Single(url) => {
                body["s3_url"] = json!(url);
            }
            DeliveredArtifacts::Batch(urls) => {
                body["urls"] = json!(urls);
            }
        }

        self.deliver(task_id, hook_url, "success", body).await
    }

    /// Notifies the hook that the task failed, with a human-readable message
    /// and, when one applies, a stable machine-readable code.
    pub async fn deliver_failure(
        &self,
        task_id: Uuid,
        hook_url: &str,
        error_message: &str,
        error_code: Option<&str>,
    ) -> Result<(), CallbackError> {
        let mut body = json!({
            "task_uuid": task_id,
            "status": "failed",
            "timestamp": Utc::now().timestamp(),
            "error_message": error_message,
        });
        if let Some(code) = error_code {
            body["error_code"] = json!(code);
        }

        self.deliver(task_id, hook_url, "failed", body).await
    }

    async fn deliver(
        &self,
        task_id: Uuid,
        hook_url: &str,
        status_label: &str,
        body: serde_json::Value,
    ) -> Result<(), CallbackError> {
        for attempt in 0..self.policy.max_attempts {
            if attempt > 0 {
                let delay = self.policy.calculate_delay(attempt);
                info!(
                    "Retrying callback ({}) for task {}. Attempt {}/{}. Waiting {:.2}s",
                    status_label,
                    task_id,
                    attempt + 1,
                    self.policy.max_attempts,
                    delay.as_secs_f64()
                );
                tokio::time::sleep(delay).await;
            }

            match self.http.post(hook_url).json(&body).send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        info!(
                            "Callback ({}) for task {} delivered to {}",
                            status_label, task_id, hook_url
                        );
                        counter!("cantus_callbacks_delivered").increment(1);
                        return Ok(());
                    }

                    if is_permanent(status) {
                        error!(
                            "Failed to send callback for task {}: permanent HTTP error {}",
                            task_id, status
                        );
                        counter!("cantus_callbacks_rejected").increment(1);
                        return Err(CallbackError::Permanent {
                            status: status.as_u16(),
                        });
                    }

                    warn!(
                        "Failed to send callback for task {}: transient HTTP error {}. Retrying",
                        task_id, status
                    );
                }
                Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                    warn!(
                        "Failed to send callback for task {}: network error or timeout: {}. Retrying",
                        task_id, e
                    );
                }
                Err(e) => {
                    error!(
                        "Failed to send callback for task {}: unexpected error: {}. Giving up",
                        task_id, e
                    );
                    return Err(CallbackError::Unexpected(e.to_string()));
                }
            }
        }

        error!(
            "Failed to send callback for task {} after {} attempts",
            task_id, self.policy.max_attempts
        );
        counter!("cantus_callbacks_exhausted").increment(1);
        Err(CallbackError::Exhausted {
            attempts: self.policy.max_attempts,
        })
    }
}

/// A 4xx other than Request Timeout and Too Many Requests will never succeed
/// on retry.
fn is_permanent(status: StatusCode) -> bool {
    status.is_client_error()
        && status != StatusCode::REQUEST_TIMEOUT
        && status != StatusCode::TOO_MANY_REQUESTS
}

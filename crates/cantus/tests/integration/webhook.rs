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

//! Callback delivery protocol tests against a scripted endpoint.

use std::time::Duration;

use uuid::Uuid;

use cantus::error::CallbackError;
use cantus::retry::{BackoffStrategy, RetryPolicy};
use cantus::webhook::{CallbackClient, DeliveredArtifacts};

fn policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(200),
        backoff: BackoffStrategy::Exponential {
            base: 2.0,
            multiplier: 1.0,
        },
        jitter: false,
    }
}

#[tokio::test]
async fn transient_server_errors_are_retried_until_success() {
    let hook = crate::harness::HookServer::start(vec![500, 500, 500]).await;
    let client = CallbackClient::new(policy(10)).unwrap();

    let result = client
        .deliver_success(
            Uuid::new_v4(),
            &hook.url,
            &DeliveredArtifacts::Single("https://cdn.example/a.wav".to_string()),
        )
        .await;

    assert!(result.is_ok());
    // Three rejected attempts plus the delivered fourth.
    assert_eq!(hook.hits(), 4);
}

#[tokio::test]
async fn permanent_client_error_stops_after_one_attempt() {
    let hook = crate::harness::HookServer::start(vec![404]).await;
    let client = CallbackClient::new(policy(10)).unwrap();

    let result = client
        .deliver_failure(Uuid::new_v4(), &hook.url, "it broke", None)
        .await;

    assert!(matches!(
        result,
        Err(CallbackError::Permanent { status: 404 })
    ));
    assert_eq!(hook.hits(), 1);
}

#[tokio::test]
async fn rate_limiting_counts_as_transient() {
    let hook = crate::harness::HookServer::start(vec![429, 408]).await;
    let client = CallbackClient::new(policy(10)).unwrap();

    let result = client
        .deliver_failure(Uuid::new_v4(), &hook.url, "it broke", None)
        .await;

    assert!(result.is_ok());
    assert_eq!(hook.hits(), 3);
}

#[tokio::test]
async fn exhaustion_reports_the_attempt_count() {
    let hook = crate::harness::HookServer::start(vec![500, 500, 500, 500]).await;
    let client = CallbackClient::new(policy(3)).unwrap();

    let result = client
        .deliver_failure(Uuid::new_v4(), &hook.url, "it broke", None)
        .await;

    assert!(matches!(
        result,
        Err(CallbackError::Exhausted { attempts: 3 })
    ));
    assert_eq!(hook.hits(), 3);
}

#[tokio::test]
async fn unreachable_endpoint_is_transient_until_exhaustion() {
    // Nothing listens here; connections are refused.
    let client = CallbackClient::new(policy(2)).unwrap();

    let result = client
        .deliver_failure(Uuid::new_v4(), "http://127.0.0.1:9/hook", "it broke", None)
        .await;

    assert!(matches!(result, Err(CallbackError::Exhausted { attempts: 2 })));
}

#[tokio::test]
async fn success_body_carries_batch_url_mapping() {
    let hook = crate::harness::HookServer::start(vec![]).await;
    let client = CallbackClient::new(policy(3)).unwrap();

    let mut urls = std::collections::BTreeMap::new();
    urls.insert(
        "a.wav".to_string(),
        "https://cdn.example/a.wav".to_string(),
    );
    urls.insert(
        "b.wav".to_string(),
        "https://cdn.example/b.wav".to_string(),
    );

    client
        .deliver_success(Uuid::new_v4(), &hook.url, &DeliveredArtifacts::Batch(urls))
        .await
        .unwrap();

    let received = hook.received();
    assert_eq!(received.len(), 1);
    let body = &received[0];
    assert_eq!(body["status"], "success");
    assert_eq!(body["urls"]["a.wav"], "https://cdn.example/a.wav");
    assert_eq!(body["urls"]["b.wav"], "https://cdn.example/b.wav");
    assert!(body.get("s3_url").is_none());
}

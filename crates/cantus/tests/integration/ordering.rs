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

//! Queue ordering properties across the gateway/queue boundary.

use std::sync::Arc;

use cantus::gateway::SubmissionGateway;
use cantus::queue::ProcessQueue;

use crate::harness::submission;

#[tokio::test]
async fn urgent_submissions_dequeue_before_relaxed_ones() {
    let queue = Arc::new(ProcessQueue::in_memory());
    let gateway = SubmissionGateway::new(queue.clone(), vec!["en".to_string()]);

    let relaxed = gateway
        .submit(submission("first in", 5, "http://x/hook"))
        .await
        .unwrap();
    let urgent = gateway
        .submit(submission("second in", 1, "http://x/hook"))
        .await
        .unwrap();

    assert!(urgent.score > relaxed.score);
    assert_eq!(queue.dequeue().await.unwrap().unwrap().id, urgent.task_uuid);
    assert_eq!(
        queue.dequeue().await.unwrap().unwrap().id,
        relaxed.task_uuid
    );
}

#[tokio::test]
async fn rapid_same_priority_submissions_never_tie() {
    let queue = Arc::new(ProcessQueue::in_memory());
    let gateway = SubmissionGateway::new(queue.clone(), vec!["en".to_string()]);

    let mut scores = Vec::new();
    for i in 0..100 {
        let admitted = gateway
            .submit(submission(&format!("task {i}"), 3, "http://x/hook"))
            .await
            .unwrap();
        scores.push(admitted.score);
    }

    let mut deduped = scores.clone();
    deduped.sort_by(|a, b| a.partial_cmp(b).unwrap());
    deduped.dedup();
    assert_eq!(deduped.len(), scores.len());

    // Every admitted task is drained exactly once.
    let mut drained = 0;
    while queue.dequeue().await.unwrap().is_some() {
        drained += 1;
    }
    assert_eq!(drained, 100);
}

#[tokio::test]
async fn concurrent_consumers_drain_without_duplicates() {
    let queue = Arc::new(ProcessQueue::in_memory());
    let gateway = SubmissionGateway::new(queue.clone(), vec!["en".to_string()]);

    for i in 0..60i64 {
        gateway
            .submit(submission(&format!("task {i}"), 1 + (i % 5), "http://x/hook"))
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..6 {
        let queue = queue.clone();
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            while let Some(task) = queue.dequeue().await.unwrap() {
                ids.push(task.id);
            }
            ids
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }
    all.sort();
    all.dedup();
    assert_eq!(all.len(), 60);
    assert_eq!(queue.depth().await.unwrap(), 0);
}

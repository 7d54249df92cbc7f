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

//! In-memory store implementations.
//!
//! One mutex per store serializes every operation, which is what makes
//! `pop_max` destructive-and-exactly-once and makes `remove`'s return value
//! an exact claim check rather than a race-prone hint. The FIFO store wakes
//! blocked consumers through a [`Notify`] instead of polling.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::{timeout_at, Instant};

use crate::error::QueueError;
use crate::store::{FifoStore, PriorityStore};

/// Process-queue backend holding `(score, member)` pairs.
#[derive(Debug, Default)]
pub struct MemoryPriorityStore {
    members: Mutex<Vec<(f64, String)>>,
}

impl MemoryPriorityStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(f64, String)>> {
        self.members.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl PriorityStore for MemoryPriorityStore {
    async fn insert(&self, member: String, score: f64) -> Result<(), QueueError> {
        self.lock().push((score, member));
        Ok(())
    }

    async fn pop_max(&self) -> Result<Option<String>, QueueError> {
        let mut members = self.lock();
        let best = members
            .iter()
            .enumerate()
            .max_by(|a, b| a.1 .0.partial_cmp(&b.1 .0).unwrap_or(Ordering::Equal))
            .map(|(index, _)| index);

        Ok(best.map(|index| members.swap_remove(index).1))
    }

    async fn scan(&self) -> Result<Vec<String>, QueueError> {
        Ok(self.lock().iter().map(|(_, m)| m.clone()).collect())
    }

    async fn remove(&self, member: &str) -> Result<bool, QueueError> {
        let mut members = self.lock();
        match members.iter().position(|(_, m)| m == member) {
            Some(index) => {
                members.swap_remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn len(&self) -> Result<usize, QueueError> {
        Ok(self.lock().len())
    }
}

/// Upload-queue backend: a guarded deque plus a wakeup channel for blocked
/// consumers.
#[derive(Debug, Default)]
pub struct MemoryFifoStore {
    items: Mutex<VecDeque<String>>,
    available: Notify,
}

impl MemoryFifoStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl FifoStore for MemoryFifoStore {
    async fn push(&self, item: String) -> Result<(), QueueError> {
        self.lock().push_back(item);
        self.available.notify_one();
        Ok(())
    }

    async fn pop_blocking(&self, timeout: Duration) -> Result<Option<String>, QueueError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(item) = self.lock().pop_front() {
                return Ok(Some(item));
            }
            // A notify permit stored before we started waiting wakes us
            // immediately; spurious wakeups just re-check the deque.
            if timeout_at(deadline, self.available.notified()).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn len(&self) -> Result<usize, QueueError> {
        Ok(self.lock().len())
    }
}

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

//! Queue store abstraction.
//!
//! Worker and gateway logic never talks to a backend directly; it goes
//! through these two traits so the backing store is swappable:
//!
//! - [`PriorityStore`]: a weighted set with an atomic destructive pop of the
//!   maximum-score member. Backs the process queue.
//! - [`FifoStore`]: an ordered list with a blocking pop. Backs the upload
//!   hand-off between the processing and delivery stages.
//!
//! Members are serialized records (one JSON document per member), which keeps
//! the contract identical for in-memory and wire-protocol backends.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::QueueError;

/// Score-ordered set of serialized members.
#[async_trait]
pub trait PriorityStore: Send + Sync {
    /// Adds a member with the given ordering weight.
    async fn insert(&self, member: String, score: f64) -> Result<(), QueueError>;

    /// Atomically removes and returns the member with the maximum score, or
    /// `None` when the store is empty. A member returned here is never
    /// visible to another caller.
    async fn pop_max(&self) -> Result<Option<String>, QueueError>;

    /// Returns all currently resident members. Used by the cancellation scan;
    /// O(n) and only intended for moderate store sizes.
    async fn scan(&self) -> Result<Vec<String>, QueueError>;

    /// Removes an exact member, returning whether it was still resident.
    /// The boolean is authoritative: `false` means another caller already
    /// claimed or removed it.
    async fn remove(&self, member: &str) -> Result<bool, QueueError>;

    /// Number of resident members.
    async fn len(&self) -> Result<usize, QueueError>;
}

/// Ordered list of serialized items with blocking consumption.
#[async_trait]
pub trait FifoStore: Send + Sync {
    /// Appends an item to the tail.
    async fn push(&self, item: String) -> Result<(), QueueError>;

    /// Removes and returns the head item, waiting up to `timeout` for one to
    /// arrive. Returns `None` when the timeout elapses with nothing
    /// available. Must not busy-wait.
    async fn pop_blocking(&self, timeout: Duration) -> Result<Option<String>, QueueError>;

    /// Number of resident items.
    async fn len(&self) -> Result<usize, QueueError>;
}

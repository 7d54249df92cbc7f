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

//! Ordering Score
//!
//! Maps (priority, admission time) to the numeric weight the process queue
//! orders by. Dequeue takes the maximum score, so priority 1 — which gets the
//! largest multiplier — dominates.
//!
//! Known ordering consequences of this formula, kept for compatibility with
//! deployed callers rather than redesigned:
//! - Within one priority tier the newest admission has the highest score, so
//!   draining a backlog of equal-priority tasks runs newest-first.
//! - Scores grow without bound with wall-clock time, so a late lower-priority
//!   admission can overtake an earlier higher-priority one once the timestamp
//!   ratio exceeds the multiplier ratio.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::task::MAX_PRIORITY;

/// Computes the queue ordering score for a task.
///
/// `admitted_at` is Unix seconds with sub-second precision, as issued by
/// [`AdmissionClock::now`]. Priority 1 yields the largest multiplier.
pub fn compute_score(priority: u8, admitted_at: f64) -> f64 {
    f64::from(MAX_PRIORITY + 1 - priority) * admitted_at
}

/// Wall-clock source for admission timestamps that never issues the same
/// value twice.
///
/// Two tasks of equal priority admitted in the same instant would otherwise
/// tie on score, making their relative order unspecified. The clock bumps a
/// colliding reading by one microsecond instead.
#[derive(Debug, Default)]
pub struct AdmissionClock {
    last: Mutex<f64>,
}

impl AdmissionClock {
    const MIN_STEP: f64 = 1e-6;

    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current Unix time in seconds, strictly greater than every
    /// previous return value of this clock.
    pub fn now(&self) -> f64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let issued = if wall > *last {
            wall
        } else {
            *last + Self::MIN_STEP
        };
        *last = issued;
        issued
    }
}

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

//! Retry Policies
//!
//! Configurable backoff used by webhook delivery. Delays follow
//! `initial_delay * f(attempt) + jitter`, capped at `max_delay`; the jitter
//! is a sub-second random offset that keeps many simultaneously-retrying
//! deliveries from synchronizing.

use std::time::Duration;

use rand::Rng;

/// How the base delay grows with the attempt number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffStrategy {
    /// Every retry waits `initial_delay`.
    Fixed,
    /// Delay grows by `initial_delay * multiplier` per attempt.
    Linear { multiplier: f64 },
    /// Delay is `initial_delay * multiplier * base^attempt`.
    Exponential { base: f64, multiplier: f64 },
}

/// Retry schedule for an operation with bounded attempts.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    /// Ceiling applied to every computed delay.
    pub max_delay: Duration,
    pub backoff: BackoffStrategy,
    /// Whether to add the sub-second random offset.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff: BackoffStrategy::Exponential {
                base: 2.0,
                multiplier: 1.0,
            },
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Computes the sleep before retry attempt `attempt` (1-based; attempt 0
    /// is the initial try and never sleeps).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let initial = self.initial_delay.as_secs_f64();
        let base_delay = match self.backoff {
            BackoffStrategy::Fixed => initial,
            BackoffStrategy::Linear { multiplier } => initial * multiplier * f64::from(attempt),
            BackoffStrategy::Exponential { base, multiplier } => {
                initial * multiplier * base.powi(attempt as i32)
            }
        };

        let jitter = if self.jitter {
            rand::thread_rng().gen_range(0.0..1.0)
        } else {
            0.0
        };

        Duration::from_secs_f64((base_delay + jitter).min(self.max_delay.as_secs_f64()))
    }
}

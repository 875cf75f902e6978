//! Scripted response source.
//!
//! A [`ScriptedResponseSource`] stands in for a live model: it serves the
//! responses of a [`SourceConfig`] round-robin and can inject simulated
//! provider failures at a configured rate. `complete` takes `&mut self`, so an
//! instance belongs to exactly one execution path; concurrent runners build
//! one source per worker from a clone of the same config.

use crate::types::{Message, ScriptedResponse, SourceConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

/// Errors raised by a response source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Simulated provider failure (failure_rate={failure_rate:.2}, call #{call})")]
    SimulatedFailure { failure_rate: f64, call: u64 },
}

/// Deterministic response source backed by a [`SourceConfig`].
#[derive(Debug, Clone)]
pub struct ScriptedResponseSource {
    config: SourceConfig,
    cursor: usize,
    call_count: u64,
}

impl ScriptedResponseSource {
    #[must_use]
    pub const fn new(config: SourceConfig) -> Self {
        Self {
            config,
            cursor: 0,
            call_count: 0,
        }
    }

    /// Produce the next response.
    ///
    /// Every call increments the call counter. A simulated failure leaves the
    /// round-robin cursor where it was, so the next successful call receives
    /// the response the failed call would have. `messages` is accepted for
    /// API parity with a real provider and never inspected.
    ///
    /// With a `seed`, the failure draw comes from a `StdRng` seeded with it
    /// and the call number, so a given seed replays the same sequence of
    /// outcomes from a fresh source.
    ///
    /// # Errors
    /// Returns `SourceError::SimulatedFailure` when the failure draw hits.
    pub fn complete(
        &mut self,
        _messages: &[Message],
        seed: Option<u64>,
    ) -> Result<ScriptedResponse, SourceError> {
        self.call_count += 1;

        let failure_rate = self.config.failure_rate;
        if failure_rate > 0.0 {
            let draw: f64 = match seed {
                Some(seed) => {
                    StdRng::seed_from_u64(seed.wrapping_add(self.call_count)).random()
                }
                None => rand::rng().random(),
            };
            if draw < failure_rate {
                tracing::warn!(call = self.call_count, failure_rate, "simulated provider failure");
                return Err(SourceError::SimulatedFailure {
                    failure_rate,
                    call: self.call_count,
                });
            }
        }

        let responses = &self.config.responses;
        if responses.is_empty() {
            return Ok(ScriptedResponse::new(
                "",
                self.config.model_name.clone(),
                0,
                self.config.default_latency_ms,
            ));
        }

        let response = responses[self.cursor % responses.len()].clone();
        self.cursor += 1;
        Ok(response)
    }

    /// Number of `complete` calls since construction or the last reset.
    #[must_use]
    pub const fn call_count(&self) -> u64 {
        self.call_count
    }

    /// Rewind the cursor and zero the call counter.
    pub const fn reset(&mut self) {
        self.cursor = 0;
        self.call_count = 0;
    }

    #[must_use]
    pub const fn config(&self) -> &SourceConfig {
        &self.config
    }
}

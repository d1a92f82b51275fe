//! Exponential backoff with jitter for order resubmission

use rand::Rng;
use std::time::Duration;

/// Backoff schedule for one intent's retries
#[derive(Debug)]
pub struct Backoff {
    retries: u32,
    max_retries: u32,
    initial_ms: u64,
    multiplier: f64,
    /// Jitter fraction applied symmetrically around the base delay
    jitter: f64,
}

impl Backoff {
    /// Create a schedule allowing `max_retries` delays
    pub fn new(max_retries: u32, initial_ms: u64, multiplier: f64) -> Self {
        Self {
            retries: 0,
            max_retries,
            initial_ms,
            multiplier,
            jitter: 0.2,
        }
    }

    /// Next delay, or `None` once the schedule is exhausted
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.retries >= self.max_retries {
            return None;
        }

        let base = self.initial_ms as f64 * self.multiplier.powi(self.retries as i32);
        self.retries += 1;

        let spread = base * self.jitter;
        let low = (base - spread).max(0.0);
        let high = base + spread;
        let jittered = rand::thread_rng().gen_range(low..=high);

        Some(Duration::from_millis(jittered as u64))
    }

    /// Delays handed out so far
    pub fn retries(&self) -> u32 {
        self.retries
    }
}

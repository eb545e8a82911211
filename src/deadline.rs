//! Overall request deadline.

use std::time::{Duration, Instant};

use crate::error::PlanError;

#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    pub fn new(limit: Duration) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.started.elapsed())
    }

    pub fn is_expired(&self) -> bool {
        self.started.elapsed() >= self.limit
    }

    /// Fails with [`PlanError::DeadlineExceeded`] naming `stage` once the
    /// limit has passed.
    pub fn check(&self, stage: &'static str) -> Result<(), PlanError> {
        if self.is_expired() {
            Err(PlanError::DeadlineExceeded(stage))
        } else {
            Ok(())
        }
    }
}

use crate::core::{CmsError, Result, SharedClock};
use std::time::Duration;

/// Per-session cooldown between public submissions.
///
/// Advisory only: a new session starts with a fresh gate. The cooldown runs
/// from the last *successful* submission.
pub struct SubmissionGate {
    clock: SharedClock,
    cooldown: Duration,
    last_success: Option<i64>,
    message: &'static str,
}

impl SubmissionGate {
    pub fn new(clock: SharedClock, cooldown: Duration, message: &'static str) -> Self {
        Self {
            clock,
            cooldown,
            last_success: None,
            message,
        }
    }

    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Time left before another submission is accepted.
    pub fn remaining(&self, now: i64) -> Option<Duration> {
        let last = self.last_success?;
        let cooldown = i64::try_from(self.cooldown.as_millis()).unwrap_or(i64::MAX);
        let elapsed = now.saturating_sub(last).max(0);
        (elapsed < cooldown).then(|| Duration::from_millis((cooldown - elapsed) as u64))
    }

    pub fn check(&self, now: i64) -> Result<()> {
        match self.remaining(now) {
            Some(left) => Err(CmsError::Cooldown {
                message: self.message.to_string(),
                retry_after_secs: left.as_millis().div_ceil(1000) as u64,
            }),
            None => Ok(()),
        }
    }

    pub fn record_success(&mut self, at: i64) {
        self.last_success = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ManualClock;
    use std::sync::Arc;

    #[test]
    fn open_until_first_success_then_closed_for_the_cooldown() {
        let clock = ManualClock::starting_at(0);
        let mut gate = SubmissionGate::new(Arc::new(clock.clone()), Duration::from_secs(60), "wait");
        assert!(gate.check(gate.now_millis()).is_ok());

        gate.record_success(gate.now_millis());
        clock.advance_secs(10);
        match gate.check(gate.now_millis()) {
            Err(CmsError::Cooldown { message, retry_after_secs }) => {
                assert_eq!(message, "wait");
                assert_eq!(retry_after_secs, 50);
            }
            other => panic!("expected cooldown, got {:?}", other),
        }

        clock.advance_secs(50);
        assert!(gate.check(gate.now_millis()).is_ok());
    }
}

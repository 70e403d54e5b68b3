use std::time::Duration;

use tessera_configs::BatchSettings;

/// Retry budget and backoff schedule for batch operations.
///
/// Both schedules grow linearly with the number of attempts already made:
/// writes wait `write_fixed + attempt * write_step`, reads wait
/// `attempt * read_step`. The first attempt never waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    pub write_fixed: Duration,
    pub write_step: Duration,
    pub read_step: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &BatchSettings) -> Self {
        Self {
            max_retries: settings.max_retry_count,
            write_fixed: Duration::from_millis(settings.fixed_retry_after_ms),
            write_step: Duration::from_millis(settings.variable_retry_after_ms),
            read_step: Duration::from_millis(settings.read_retry_step_ms),
        }
    }

    /// Policy without any waiting between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            write_fixed: Duration::ZERO,
            write_step: Duration::ZERO,
            read_step: Duration::ZERO,
        }
    }

    /// Wait before the write attempt following `completed` attempts.
    pub fn write_delay(&self, completed: u32) -> Duration {
        if completed == 0 {
            return Duration::ZERO;
        }
        self.write_fixed + self.write_step * completed
    }

    /// Wait before the read attempt following `completed` attempts.
    pub fn read_delay(&self, completed: u32) -> Duration {
        self.read_step * completed
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&BatchSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_schedule_is_linear_with_floor() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.write_delay(0), Duration::ZERO);
        assert_eq!(policy.write_delay(1), Duration::from_millis(50));
        assert_eq!(policy.write_delay(2), Duration::from_millis(75));
        assert_eq!(policy.write_delay(5), Duration::from_millis(150));
    }

    #[test]
    fn test_read_schedule_has_no_floor() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.read_delay(0), Duration::ZERO);
        assert_eq!(policy.read_delay(1), Duration::from_millis(300));
        assert_eq!(policy.read_delay(3), Duration::from_millis(900));
    }

    #[test]
    fn test_immediate() {
        let policy = RetryPolicy::immediate(4);
        assert_eq!(policy.max_retries, 4);
        assert_eq!(policy.write_delay(3), Duration::ZERO);
    }
}

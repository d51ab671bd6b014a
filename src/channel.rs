//! Publication channels with batch-gated throughput control.
//!
//! A channel decides, per publish attempt, whether to actually transmit. The
//! gate is purely attempt-counted and independent of wall-clock time: a
//! repeating duty cycle of `publishes_per_batch` consecutive sends followed
//! by `publishes_ignored_after_batch` consecutive suppressions.

use crate::config::ChannelSettings;
use tracing::debug;

/// Named publication target with a counter-based batch gate.
#[derive(Debug)]
pub struct DataChannel {
    name: String,
    publishes_per_batch: u32,
    publishes_ignored_after_batch: u32,
    counter: u32,
}

impl DataChannel {
    /// Create a channel. `publishes_per_batch = 0` is a valid disabled
    /// configuration that suppresses all traffic.
    pub fn new(name: String, publishes_per_batch: u32, publishes_ignored_after_batch: u32) -> Self {
        Self {
            name,
            publishes_per_batch,
            publishes_ignored_after_batch,
            counter: 0,
        }
    }

    /// Build a channel from its configuration entry.
    pub fn from_settings(settings: &ChannelSettings) -> Self {
        Self::new(
            settings.name.clone(),
            settings.publishes_per_batch,
            settings.publishes_ignored_after_batch,
        )
    }

    /// Channel name, used as the pub/sub topic.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decide one publish attempt. Transmits iff the counter (before
    /// increment) is below `publishes_per_batch`; the counter cycles modulo
    /// `publishes_per_batch + publishes_ignored_after_batch`.
    pub fn should_publish(&mut self) -> bool {
        let cycle = self.publishes_per_batch + self.publishes_ignored_after_batch;
        if cycle == 0 {
            // publishes_per_batch = 0 with no suppression window: disabled.
            return false;
        }
        let transmit = self.counter < self.publishes_per_batch;
        self.counter += 1;
        if self.counter >= cycle {
            self.counter = 0;
        }
        transmit
    }

    /// Log the configured gate parameters at startup.
    pub fn log_attributes(&self) {
        debug!(
            channel = %self.name,
            publishes_per_batch = self.publishes_per_batch,
            publishes_ignored_after_batch = self.publishes_ignored_after_batch,
            "data channel configured"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decisions(channel: &mut DataChannel, attempts: usize) -> Vec<bool> {
        (0..attempts).map(|_| channel.should_publish()).collect()
    }

    #[test]
    fn test_two_send_one_suppress_scenario() {
        // (P=2, I=1), 6 attempts: transmit on {1,2,4,5}, suppress {3,6}.
        let mut channel = DataChannel::new("events".into(), 2, 1);
        assert_eq!(
            decisions(&mut channel, 6),
            [true, true, false, true, true, false]
        );
    }

    #[test]
    fn test_duty_cycle_repeats_indefinitely() {
        let mut channel = DataChannel::new("events".into(), 3, 2);
        let out = decisions(&mut channel, 20);
        for (i, sent) in out.iter().enumerate() {
            assert_eq!(*sent, i % 5 < 3, "attempt {}", i + 1);
        }
    }

    #[test]
    fn test_zero_batch_suppresses_everything() {
        let mut channel = DataChannel::new("disabled".into(), 0, 4);
        assert!(decisions(&mut channel, 10).iter().all(|sent| !sent));

        // Degenerate (0, 0) configuration is also fully suppressed.
        let mut channel = DataChannel::new("disabled".into(), 0, 0);
        assert!(decisions(&mut channel, 10).iter().all(|sent| !sent));
    }

    #[test]
    fn test_zero_ignored_transmits_every_attempt() {
        let mut channel = DataChannel::new("firehose".into(), 1, 0);
        assert!(decisions(&mut channel, 10).iter().all(|sent| *sent));
    }
}

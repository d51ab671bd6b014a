//! Polymorphic processing tasks.
//!
//! A processor wraps one data source and exposes readiness, period, and
//! output retrieval. The dispatch loop calls `is_ready_to_process` each tick
//! and, when true, `process`, which returns a finite sequence of opaque
//! string records for that tick only. Side effects are confined to the
//! processor's internal state (its readiness clock) and, for the
//! histogram-emitting variants, the shared histogram store.
//!
//! The closed set of variants is constructed through
//! [`registry::ProcessorRegistry`], which maps a type name from the
//! configuration to a factory.

pub mod command;
pub mod detector;
pub mod general;
pub mod histogram;
pub mod odb;
pub mod registry;

pub use registry::{ProcessorRegistry, RegistryContext};

use crate::error::AppResult;
use std::time::{Duration, Instant};

/// One independently-paced processing task.
pub trait Processor: std::fmt::Debug {
    /// Type tag, matching the configuration name.
    fn kind(&self) -> &'static str;

    /// True when this processor's own period has elapsed since it last
    /// produced output. `process` is only meaningful after this returned
    /// true for the current tick.
    fn is_ready_to_process(&self) -> bool;

    /// Configured poll period.
    fn period(&self) -> Duration;

    /// Change the poll period; takes effect on the next readiness check.
    fn set_period(&mut self, period: Duration);

    /// Produce this tick's records. Advances the readiness clock.
    fn process(&mut self) -> AppResult<Vec<String>>;
}

/// Elapsed-time readiness clock shared by the simple processor variants.
#[derive(Debug)]
pub struct Pacer {
    period: Duration,
    last_fired: Option<Instant>,
}

impl Pacer {
    /// Create a pacer that is immediately ready.
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_fired: None,
        }
    }

    /// True iff the period has elapsed since the last firing (or the pacer
    /// never fired).
    pub fn is_ready(&self) -> bool {
        self.ready_at(Instant::now())
    }

    pub(crate) fn ready_at(&self, now: Instant) -> bool {
        match self.last_fired {
            None => true,
            Some(last) => now.duration_since(last) >= self.period,
        }
    }

    /// Record a firing now.
    pub fn mark_fired(&mut self) {
        self.last_fired = Some(Instant::now());
    }

    /// Current period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Change the period; applies to the next readiness check.
    pub fn set_period(&mut self, period: Duration) {
        self.period = period;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_pacer_is_ready() {
        let pacer = Pacer::new(Duration::from_millis(500));
        assert!(pacer.is_ready());
    }

    #[test]
    fn test_pacer_gates_until_period_elapses() {
        let mut pacer = Pacer::new(Duration::from_millis(500));
        pacer.mark_fired();
        let now = Instant::now();
        assert!(!pacer.ready_at(now + Duration::from_millis(100)));
        assert!(pacer.ready_at(now + Duration::from_millis(600)));
    }

    #[test]
    fn test_period_change_applies_to_next_check() {
        let mut pacer = Pacer::new(Duration::from_secs(3600));
        pacer.mark_fired();
        assert!(!pacer.is_ready());
        pacer.set_period(Duration::ZERO);
        assert!(pacer.is_ready());
    }
}

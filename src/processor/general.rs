//! General-purpose processor.
//!
//! The simplest variant: a readiness clock and nothing else. It emits no
//! records and exists as the base cadence entry a channel can carry when it
//! only wants command-scheduler traffic, and as the template the other
//! variants follow.

use super::{Pacer, Processor};
use crate::error::AppResult;
use std::time::Duration;
use tracing::trace;

/// Processor that paces a channel without producing records.
#[derive(Debug)]
pub struct GeneralProcessor {
    pacer: Pacer,
    verbose: u8,
}

impl GeneralProcessor {
    /// Create a general processor with the given poll period.
    pub fn new(period: Duration, verbose: u8) -> Self {
        Self {
            pacer: Pacer::new(period),
            verbose,
        }
    }
}

impl Processor for GeneralProcessor {
    fn kind(&self) -> &'static str {
        "general"
    }

    fn is_ready_to_process(&self) -> bool {
        self.pacer.is_ready()
    }

    fn period(&self) -> Duration {
        self.pacer.period()
    }

    fn set_period(&mut self, period: Duration) {
        self.pacer.set_period(period);
    }

    fn process(&mut self) -> AppResult<Vec<String>> {
        self.pacer.mark_fired();
        if self.verbose > 1 {
            trace!("general processor fired");
        }
        Ok(Vec::new())
    }
}

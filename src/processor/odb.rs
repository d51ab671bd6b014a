//! Online-database-backed processor.
//!
//! Grabs a point-in-time snapshot of experiment configuration/status state
//! from an [`OdbSource`] at its own cadence and republishes it as one opaque
//! record. A failing grab is per-tick recoverable: logged by the dispatcher,
//! the snapshot simply missing from that tick.

use super::{Pacer, Processor};
use crate::error::AppResult;
use crate::odb::OdbSource;
use std::time::Duration;

/// Processor republishing online-database snapshots.
#[derive(Debug)]
pub struct OdbProcessor {
    source: Box<dyn OdbSource>,
    pacer: Pacer,
}

impl OdbProcessor {
    /// Create an ODB processor grabbing from `source` every `period`.
    pub fn new(source: Box<dyn OdbSource>, period: Duration) -> Self {
        Self {
            source,
            pacer: Pacer::new(period),
        }
    }
}

impl Processor for OdbProcessor {
    fn kind(&self) -> &'static str {
        "odb"
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
        let snapshot = self.source.snapshot()?;
        Ok(vec![snapshot])
    }
}

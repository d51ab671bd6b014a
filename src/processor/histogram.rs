//! Histogram-emitting processor.
//!
//! Exports the shared histogram store as one aggregate snapshot record on
//! its own cadence, typically to a dedicated histogram channel.

use super::{Pacer, Processor};
use crate::error::{AppResult, RelayError};
use crate::histogram::SharedHistogramStore;
use std::time::Duration;

/// Processor exporting the histogram store snapshot.
#[derive(Debug)]
pub struct HistogramProcessor {
    histograms: SharedHistogramStore,
    pacer: Pacer,
}

impl HistogramProcessor {
    /// Create a histogram processor exporting every `period`.
    pub fn new(histograms: SharedHistogramStore, period: Duration) -> Self {
        Self {
            histograms,
            pacer: Pacer::new(period),
        }
    }
}

impl Processor for HistogramProcessor {
    fn kind(&self) -> &'static str {
        "histogram"
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
        let store = self
            .histograms
            .lock()
            .map_err(|_| RelayError::Histogram("histogram store lock poisoned".into()))?;
        Ok(vec![store.serialize()])
    }
}

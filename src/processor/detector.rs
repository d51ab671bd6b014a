//! Detector/event-backed processor.
//!
//! Command-backed like [`super::command::CommandProcessor`], but interprets
//! the parsed events through a detector mapping: each bank is labelled with
//! its detector identity, every data word of a mapped bank is folded into
//! the shared histogram store under that identity, and the run number
//! announced in the dump output is forwarded to the store so histograms
//! restart at run boundaries.

use super::Processor;
use crate::command::CommandRunner;
use crate::detector::DetectorMap;
use crate::dump;
use crate::error::{AppResult, RelayError};
use crate::histogram::SharedHistogramStore;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Processor producing detector-labelled event records and histogram
/// samples.
#[derive(Debug)]
pub struct DetectorProcessor {
    runner: CommandRunner,
    map: DetectorMap,
    histograms: SharedHistogramStore,
    verbose: u8,
}

impl DetectorProcessor {
    /// Create a detector processor.
    pub fn new(
        runner: CommandRunner,
        map: DetectorMap,
        histograms: SharedHistogramStore,
        verbose: u8,
    ) -> Self {
        Self {
            runner,
            map,
            histograms,
            verbose,
        }
    }
}

impl Processor for DetectorProcessor {
    fn kind(&self) -> &'static str {
        "detector"
    }

    fn is_ready_to_process(&self) -> bool {
        self.runner.is_ready_for_execution()
    }

    fn period(&self) -> Duration {
        self.runner.wait_time()
    }

    fn set_period(&mut self, period: Duration) {
        self.runner.set_wait_time(period);
    }

    fn process(&mut self) -> AppResult<Vec<String>> {
        let output = self.runner.execute()?;
        let package = dump::parse(&output);

        let mut store = self
            .histograms
            .lock()
            .map_err(|_| RelayError::Histogram("histogram store lock poisoned".into()))?;

        if let Some(run_number) = package.run_number {
            store.set_run_number(run_number);
        }

        let mut records = Vec::with_capacity(package.events.len());
        for event in &package.events {
            let banks: Vec<_> = event
                .banks
                .iter()
                .map(|bank| {
                    let detector = self.map.detector_for(&bank.name);
                    if let Some(detector) = detector {
                        for word in &bank.words {
                            store.add_sample(detector, *word);
                        }
                    }
                    json!({
                        "bank": bank.name,
                        "detector": detector,
                        "words": bank.words,
                    })
                })
                .collect();
            let record = json!({
                "event_id": event.event_id,
                "serial": event.serial,
                "banks": banks,
            });
            records.push(record.to_string());
        }

        if self.verbose > 0 {
            debug!(events = records.len(), "detector processor produced records");
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommandSettings;
    use crate::histogram;
    use std::io::Write;

    fn mapping_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"CR00": "cosmic-ray-0"}"#).unwrap();
        file
    }

    fn dump_processor(store: SharedHistogramStore) -> DetectorProcessor {
        // printf reproduces a two-line dump: header plus one bank of words.
        let runner = CommandRunner::from_settings(&CommandSettings {
            program: "printf".into(),
            args: vec!["Run number: 7\nEvid:1- Serial:3-\nBank:CR00\n10 20 30\n".into()],
            event_id: None,
            bank_name: None,
            buffer_name: None,
            trigger_mask: None,
            num_events: None,
            minimum_time_between_commands_millis: 60_000,
        });
        let file = mapping_file();
        let map = DetectorMap::load(file.path()).unwrap();
        DetectorProcessor::new(runner, map, store, 0)
    }

    #[test]
    fn test_records_carry_detector_labels() {
        let store = histogram::shared_store();
        let mut processor = dump_processor(store);
        let records = processor.process().unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].contains("\"detector\":\"cosmic-ray-0\""));
    }

    #[test]
    fn test_samples_folded_into_store() {
        let store = histogram::shared_store();
        let mut processor = dump_processor(store.clone());
        processor.process().unwrap();
        let store = store.lock().unwrap();
        assert_eq!(store.hist("cosmic-ray-0").map(|h| h.entries()), Some(3));
    }

    #[test]
    fn test_run_number_forwarded_to_store() {
        let store = histogram::shared_store();
        let mut processor = dump_processor(store.clone());
        processor.process().unwrap();
        assert_eq!(store.lock().unwrap().run_number(), Some(7));
    }
}

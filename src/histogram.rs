//! Run-scoped histogram aggregation.
//!
//! The store accumulates numeric samples under a string key into either a
//! 1-D or a 2-D fixed-binning histogram. Histograms are created lazily on the
//! first sample for a key and keep their kind and binning for the whole
//! session; a reset zeroes counts in place.
//!
//! Run boundaries: a run-number change only schedules a reset. The reset is
//! applied lazily, immediately before the next sample is folded in
//! (reset-then-fill), so an export that happens after a run change but before
//! the first sample of the new run still reports the previous run's counts
//! once. This matches the observed behavior of the system this replaces and
//! is preserved deliberately.
//!
//! The store is owned by the session and shared behind `Arc<Mutex<_>>`. The
//! core loop is single-threaded so the mutex is never contended; it exists so
//! a future worker-per-processor variant needs no API change.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Default bin count for lazily created 1-D histograms.
pub const DEFAULT_1D_BINS: usize = 100;
/// Default sample range for lazily created 1-D histograms.
pub const DEFAULT_1D_RANGE: (f64, f64) = (0.0, 250_000.0);
/// Default per-axis bin count for lazily created 2-D histograms.
pub const DEFAULT_2D_BINS: usize = 12;
/// Default per-axis range for lazily created 2-D histograms.
pub const DEFAULT_2D_RANGE: (f64, f64) = (-6.0, 6.0);

/// A fixed-binning histogram. The kind (1-D vs 2-D) is fixed per key for the
/// session once created.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Hist {
    /// 1-D accumulator over a fixed numeric range.
    #[serde(rename_all = "kebab-case")]
    OneDim {
        /// Per-bin counts.
        bins: Vec<u64>,
        /// Inclusive lower edge of the range.
        low: f64,
        /// Exclusive upper edge of the range.
        high: f64,
        /// Samples below the range.
        underflow: u64,
        /// Samples at or above the upper edge.
        overflow: u64,
        /// Total samples folded in since the last reset.
        entries: u64,
    },
    /// 2-D accumulator with fixed bin counts and ranges on both axes.
    #[serde(rename_all = "kebab-case")]
    TwoDim {
        /// Row-major (y-major) per-cell counts, `x_bins * y_bins` long.
        bins: Vec<u64>,
        /// Bin count on the x axis.
        x_bins: usize,
        /// Bin count on the y axis.
        y_bins: usize,
        /// Inclusive lower edge on x.
        x_low: f64,
        /// Exclusive upper edge on x.
        x_high: f64,
        /// Inclusive lower edge on y.
        y_low: f64,
        /// Exclusive upper edge on y.
        y_high: f64,
        /// Samples falling outside either axis range.
        out_of_range: u64,
        /// Total samples folded in since the last reset.
        entries: u64,
    },
}

fn bin_index(value: f64, low: f64, high: f64, bins: usize) -> Option<usize> {
    if !value.is_finite() || value < low || value >= high {
        return None;
    }
    let idx = ((value - low) / (high - low) * bins as f64) as usize;
    Some(idx.min(bins - 1))
}

impl Hist {
    /// Create an empty 1-D histogram.
    pub fn one_dim(bins: usize, low: f64, high: f64) -> Self {
        Hist::OneDim {
            bins: vec![0; bins],
            low,
            high,
            underflow: 0,
            overflow: 0,
            entries: 0,
        }
    }

    /// Create an empty 2-D histogram.
    pub fn two_dim(
        x_bins: usize,
        x_low: f64,
        x_high: f64,
        y_bins: usize,
        y_low: f64,
        y_high: f64,
    ) -> Self {
        Hist::TwoDim {
            bins: vec![0; x_bins * y_bins],
            x_bins,
            y_bins,
            x_low,
            x_high,
            y_low,
            y_high,
            out_of_range: 0,
            entries: 0,
        }
    }

    /// Fold one sample into a 1-D histogram. Returns false on a
    /// dimensionality mismatch (sample dropped).
    pub fn fill(&mut self, value: f64) -> bool {
        match self {
            Hist::OneDim {
                bins,
                low,
                high,
                underflow,
                overflow,
                entries,
            } => {
                match bin_index(value, *low, *high, bins.len()) {
                    Some(idx) => bins[idx] += 1,
                    None if value < *low => *underflow += 1,
                    None => *overflow += 1,
                }
                *entries += 1;
                true
            }
            Hist::TwoDim { .. } => false,
        }
    }

    /// Fold one (x, y) sample into a 2-D histogram. Returns false on a
    /// dimensionality mismatch (sample dropped).
    pub fn fill_2d(&mut self, x: f64, y: f64) -> bool {
        match self {
            Hist::TwoDim {
                bins,
                x_bins,
                y_bins,
                x_low,
                x_high,
                y_low,
                y_high,
                out_of_range,
                entries,
            } => {
                let xi = bin_index(x, *x_low, *x_high, *x_bins);
                let yi = bin_index(y, *y_low, *y_high, *y_bins);
                match (xi, yi) {
                    (Some(xi), Some(yi)) => bins[yi * *x_bins + xi] += 1,
                    _ => *out_of_range += 1,
                }
                *entries += 1;
                true
            }
            Hist::OneDim { .. } => false,
        }
    }

    /// Zero all counts in place, preserving binning and range.
    pub fn reset(&mut self) {
        match self {
            Hist::OneDim {
                bins,
                underflow,
                overflow,
                entries,
                ..
            } => {
                bins.iter_mut().for_each(|b| *b = 0);
                *underflow = 0;
                *overflow = 0;
                *entries = 0;
            }
            Hist::TwoDim {
                bins,
                out_of_range,
                entries,
                ..
            } => {
                bins.iter_mut().for_each(|b| *b = 0);
                *out_of_range = 0;
                *entries = 0;
            }
        }
    }

    /// Total samples folded in since the last reset.
    pub fn entries(&self) -> u64 {
        match self {
            Hist::OneDim { entries, .. } | Hist::TwoDim { entries, .. } => *entries,
        }
    }
}

/// Run-scoped mapping from key to histogram.
#[derive(Debug, Default)]
pub struct HistogramStore {
    histograms: BTreeMap<String, Hist>,
    run_number: Option<i32>,
    reset_pending: bool,
}

/// Shared handle to the session's histogram store.
pub type SharedHistogramStore = Arc<Mutex<HistogramStore>>;

/// Create a fresh shared store for a session.
pub fn shared_store() -> SharedHistogramStore {
    Arc::new(Mutex::new(HistogramStore::default()))
}

impl HistogramStore {
    /// Fold a 1-D sample into the histogram for `key`, creating it with
    /// default binning if absent. A pending run-boundary reset is applied
    /// first; the incoming sample belongs to the new run.
    pub fn add_sample(&mut self, key: &str, value: f64) {
        if self.reset_pending {
            self.reset();
        }
        let hist = self.histograms.entry(key.to_string()).or_insert_with(|| {
            Hist::one_dim(DEFAULT_1D_BINS, DEFAULT_1D_RANGE.0, DEFAULT_1D_RANGE.1)
        });
        if !hist.fill(value) {
            warn!("dropping 1-D sample for 2-D histogram '{}'", key);
        }
    }

    /// Fold a 2-D sample into the histogram for `key`, creating it with
    /// default binning if absent. A pending run-boundary reset is applied
    /// first.
    pub fn add_sample_2d(&mut self, key: &str, x: f64, y: f64) {
        if self.reset_pending {
            self.reset();
        }
        let hist = self.histograms.entry(key.to_string()).or_insert_with(|| {
            Hist::two_dim(
                DEFAULT_2D_BINS,
                DEFAULT_2D_RANGE.0,
                DEFAULT_2D_RANGE.1,
                DEFAULT_2D_BINS,
                DEFAULT_2D_RANGE.0,
                DEFAULT_2D_RANGE.1,
            )
        });
        if !hist.fill_2d(x, y) {
            warn!("dropping 2-D sample for 1-D histogram '{}'", key);
        }
    }

    /// Record the current run number. A change in value schedules a lazy
    /// reset; repeating the current number is a no-op.
    pub fn set_run_number(&mut self, run_number: i32) {
        if let Some(current) = self.run_number {
            if current != run_number {
                self.reset_pending = true;
            }
        }
        self.run_number = Some(run_number);
    }

    /// Run number last reported by the event source, if any.
    pub fn run_number(&self) -> Option<i32> {
        self.run_number
    }

    /// Zero all histogram counts in place, preserving identity and binning,
    /// and clear any pending run-boundary reset.
    pub fn reset(&mut self) {
        for hist in self.histograms.values_mut() {
            hist.reset();
        }
        self.reset_pending = false;
    }

    /// Serialize the full mapping to one JSON object string keyed by
    /// histogram identity.
    pub fn serialize(&self) -> String {
        self.serialize_with(|_, hist| serde_json::to_value(hist))
    }

    /// Serialize with an injectable per-key encoder. An encoding failure for
    /// one key is logged and that key omitted; all other keys are still
    /// exported.
    pub fn serialize_with<F>(&self, encode: F) -> String
    where
        F: Fn(&str, &Hist) -> serde_json::Result<serde_json::Value>,
    {
        let mut snapshot = serde_json::Map::new();
        for (key, hist) in &self.histograms {
            match encode(key, hist) {
                Ok(value) => {
                    snapshot.insert(key.clone(), value);
                }
                Err(e) => {
                    warn!("failed to encode histogram '{}', omitting: {}", key, e);
                }
            }
        }
        serde_json::Value::Object(snapshot).to_string()
    }

    /// Number of histograms currently held.
    pub fn len(&self) -> usize {
        self.histograms.len()
    }

    /// True when no histogram has been created yet.
    pub fn is_empty(&self) -> bool {
        self.histograms.is_empty()
    }

    /// Look up a histogram by key.
    pub fn hist(&self, key: &str) -> Option<&Hist> {
        self.histograms.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_lazy_creation_with_default_binning() {
        let mut store = HistogramStore::default();
        store.add_sample("cr-energy", 1250.0);
        match store.hist("cr-energy") {
            Some(Hist::OneDim { bins, low, high, .. }) => {
                assert_eq!(bins.len(), DEFAULT_1D_BINS);
                assert_eq!(*low, DEFAULT_1D_RANGE.0);
                assert_eq!(*high, DEFAULT_1D_RANGE.1);
            }
            other => panic!("unexpected histogram: {:?}", other),
        }
        store.add_sample_2d("beam-xy", 0.5, -0.5);
        assert!(matches!(store.hist("beam-xy"), Some(Hist::TwoDim { .. })));
    }

    #[test]
    fn test_fill_counts_and_overflow() {
        let mut hist = Hist::one_dim(10, 0.0, 100.0);
        assert!(hist.fill(5.0)); // bin 0
        assert!(hist.fill(95.0)); // bin 9
        assert!(hist.fill(-1.0)); // underflow
        assert!(hist.fill(100.0)); // overflow (upper edge exclusive)
        match hist {
            Hist::OneDim {
                bins,
                underflow,
                overflow,
                entries,
                ..
            } => {
                assert_eq!(bins[0], 1);
                assert_eq!(bins[9], 1);
                assert_eq!(underflow, 1);
                assert_eq!(overflow, 1);
                assert_eq!(entries, 4);
            }
            Hist::TwoDim { .. } => panic!("wrong kind"),
        }
    }

    #[test]
    fn test_dimensionality_mismatch_drops_sample() {
        let mut store = HistogramStore::default();
        store.add_sample("k", 1.0);
        store.add_sample_2d("k", 1.0, 2.0); // mismatch, dropped
        assert_eq!(store.hist("k").map(Hist::entries), Some(1));
    }

    #[test]
    fn test_same_run_number_never_schedules_reset() {
        let mut store = HistogramStore::default();
        store.set_run_number(12);
        store.add_sample("k", 1.0);
        store.set_run_number(12);
        store.add_sample("k", 2.0);
        assert_eq!(store.hist("k").map(Hist::entries), Some(2));
    }

    #[test]
    fn test_run_change_resets_once_before_next_sample() {
        let mut store = HistogramStore::default();
        store.set_run_number(12);
        store.add_sample("k", 1.0);
        store.add_sample("k", 2.0);

        store.set_run_number(13);
        // Reset is lazy: nothing happens until the next sample arrives.
        assert_eq!(store.hist("k").map(Hist::entries), Some(2));

        store.add_sample("k", 3.0);
        // Old counts zeroed first, then the new-run sample folded in.
        assert_eq!(store.hist("k").map(Hist::entries), Some(1));

        // A second sample of the same run does not reset again.
        store.add_sample("k", 4.0);
        assert_eq!(store.hist("k").map(Hist::entries), Some(2));
    }

    #[test]
    fn test_export_between_run_change_and_first_sample_reports_old_counts() {
        let mut store = HistogramStore::default();
        store.set_run_number(12);
        store.add_sample("k", 1.0);
        store.set_run_number(13);

        let snapshot: Value = serde_json::from_str(&store.serialize()).unwrap();
        assert_eq!(snapshot["k"]["entries"], 1);
    }

    #[test]
    fn test_serialize_includes_all_keys() {
        let mut store = HistogramStore::default();
        store.add_sample("a", 1.0);
        store.add_sample("b", 2.0);
        store.add_sample_2d("c", 0.0, 0.0);
        let snapshot: Value = serde_json::from_str(&store.serialize()).unwrap();
        let obj = snapshot.as_object().unwrap();
        assert_eq!(obj.len(), 3);
        assert_eq!(snapshot["c"]["kind"], "two-dim");
    }

    #[test]
    fn test_per_key_encoding_failure_omits_only_that_key() {
        let mut store = HistogramStore::default();
        store.add_sample("good", 1.0);
        store.add_sample("bad", 2.0);
        store.add_sample("also-good", 3.0);

        let out = store.serialize_with(|key, hist| {
            if key == "bad" {
                Err(<serde_json::Error as serde::ser::Error>::custom("unencodable"))
            } else {
                serde_json::to_value(hist)
            }
        });
        let snapshot: Value = serde_json::from_str(&out).unwrap();
        let obj = snapshot.as_object().unwrap();
        assert!(obj.contains_key("good"));
        assert!(obj.contains_key("also-good"));
        assert!(!obj.contains_key("bad"));
    }

    #[test]
    fn test_reset_preserves_binning() {
        let mut store = HistogramStore::default();
        store.add_sample("k", 10.0);
        store.reset();
        match store.hist("k") {
            Some(Hist::OneDim { bins, entries, .. }) => {
                assert_eq!(bins.len(), DEFAULT_1D_BINS);
                assert_eq!(*entries, 0);
            }
            other => panic!("unexpected histogram: {:?}", other),
        }
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub reconcile: ReconcileParams,
    pub word_timing: WordTimingParams,
    pub silence: SilenceParams,
    pub exclusion: ExclusionConfig,
    pub preroll: PrerollMode,
    /// Fan-out width for word propagation and silence snapping.
    /// `None` uses the available parallelism.
    pub worker_threads: Option<usize>,
}

impl SyncConfig {
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let data =
            std::fs::read_to_string(path).map_err(|e| SyncError::io("read sync config", e))?;
        let config: Self =
            serde_json::from_str(&data).map_err(|e| SyncError::json("parse sync config", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), SyncError> {
        self.reconcile.validate()?;
        self.word_timing.validate()?;
        self.silence.validate()?;
        if let PrerollMode::Fixed { offset } = self.preroll {
            if !offset.is_finite() || offset < 0.0 {
                return Err(SyncError::invalid_config(format!(
                    "preroll offset must be a non-negative number of seconds, got {offset}"
                )));
            }
        }
        if self.worker_threads == Some(0) {
            return Err(SyncError::invalid_config("worker_threads must be >= 1"));
        }
        Ok(())
    }
}

/// Tunables of the candidate matching heuristic.
///
/// Positions are expressed as a fraction of the document (`index / count`),
/// times in seconds. "Early" segments get the duplicate-title protections:
/// a wider backward window, a bonus for candidates at or before their own
/// index and an absolute time ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileParams {
    /// Fraction of the audio duration accepted around the expected timestamp.
    pub timing_tolerance_fraction: f64,
    pub lookbehind: usize,
    pub lookahead: usize,
    /// Segments before this document fraction search back to candidate 0.
    pub very_early_fraction: f64,
    /// Segments before this document fraction are "early".
    pub early_fraction: f64,
    pub early_lookbehind: usize,
    /// Candidates starting inside this range are always scored for early,
    /// non-trivial segments.
    pub forced_range_start: f64,
    pub forced_range_end: f64,
    /// Normalized text must be longer than this to use the forced range.
    pub forced_min_chars: usize,
    pub exact_score: f64,
    pub early_exact_score: f64,
    pub superset_score: f64,
    /// Scaled by the share of the candidate text that is extra.
    pub superset_penalty: f64,
    /// Scaled by the share of the segment text the candidate covers.
    pub subset_score: f64,
    /// Scaled by the word-level Jaccard overlap.
    pub word_overlap_score: f64,
    /// Jaccard overlap below this counts as no textual overlap.
    pub min_word_overlap: f64,
    pub no_overlap_score: f64,
    pub proximity_bonus: f64,
    /// Subtracted from `proximity_bonus` per index away from the cursor.
    pub proximity_decay: f64,
    pub early_backward_bonus: f64,
    /// Per index past the segment's own index.
    pub early_forward_penalty: f64,
    pub timing_bonus: f64,
    pub early_ceiling_secs: f64,
    pub early_ceiling_fraction: f64,
    pub early_ceiling_penalty: f64,
    pub early_band_end: f64,
    pub early_band_bonus: f64,
    pub early_sub_band_start: f64,
    pub early_sub_band_end: f64,
    pub early_sub_band_bonus: f64,
    /// A match must score strictly above this.
    pub min_accept_score: f64,
    /// Matches later than `expected + max_overshoot_secs` are discarded.
    pub max_overshoot_secs: f64,
}

impl Default for ReconcileParams {
    fn default() -> Self {
        Self {
            timing_tolerance_fraction: 0.15,
            lookbehind: 2,
            lookahead: 5,
            very_early_fraction: 0.10,
            early_fraction: 0.30,
            early_lookbehind: 10,
            forced_range_start: 6.0,
            forced_range_end: 9.0,
            forced_min_chars: 5,
            exact_score: 100.0,
            early_exact_score: 150.0,
            superset_score: 80.0,
            superset_penalty: 40.0,
            subset_score: 60.0,
            word_overlap_score: 40.0,
            min_word_overlap: 0.5,
            no_overlap_score: -1000.0,
            proximity_bonus: 20.0,
            proximity_decay: 4.0,
            early_backward_bonus: 15.0,
            early_forward_penalty: 5.0,
            timing_bonus: 30.0,
            early_ceiling_secs: 20.0,
            early_ceiling_fraction: 0.15,
            early_ceiling_penalty: 500.0,
            early_band_end: 15.0,
            early_band_bonus: 15.0,
            early_sub_band_start: 5.0,
            early_sub_band_end: 10.0,
            early_sub_band_bonus: 10.0,
            min_accept_score: 50.0,
            max_overshoot_secs: 30.0,
        }
    }
}

impl ReconcileParams {
    /// The smaller of the absolute ceiling and the duration-relative one.
    pub fn early_ceiling(&self, audio_duration: f64) -> f64 {
        self.early_ceiling_secs
            .min(audio_duration * self.early_ceiling_fraction)
    }

    fn validate(&self) -> Result<(), SyncError> {
        for (name, value) in [
            ("timing_tolerance_fraction", self.timing_tolerance_fraction),
            ("very_early_fraction", self.very_early_fraction),
            ("early_fraction", self.early_fraction),
            ("early_ceiling_fraction", self.early_ceiling_fraction),
            ("min_word_overlap", self.min_word_overlap),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SyncError::invalid_config(format!(
                    "reconcile.{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if self.very_early_fraction > self.early_fraction {
            return Err(SyncError::invalid_config(
                "reconcile.very_early_fraction must not exceed early_fraction",
            ));
        }
        if self.lookahead == 0 {
            return Err(SyncError::invalid_config("reconcile.lookahead must be >= 1"));
        }
        if self.forced_range_end < self.forced_range_start {
            return Err(SyncError::invalid_config(
                "reconcile.forced_range_end must not precede forced_range_start",
            ));
        }
        if !self.max_overshoot_secs.is_finite() || self.max_overshoot_secs < 0.0 {
            return Err(SyncError::invalid_config(
                "reconcile.max_overshoot_secs must be a non-negative number",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordTimingParams {
    /// Gap inserted between consecutive words, seconds.
    pub word_padding: f64,
    /// Extra gap after a word ending in terminal punctuation, seconds.
    pub punctuation_pause: f64,
    pub min_word_duration: f64,
    /// Per-word floor used when the padded allocation does not fit.
    pub fallback_min_word_duration: f64,
}

impl Default for WordTimingParams {
    fn default() -> Self {
        Self {
            word_padding: 0.05,
            punctuation_pause: 0.15,
            min_word_duration: 0.10,
            fallback_min_word_duration: 0.05,
        }
    }
}

impl WordTimingParams {
    fn validate(&self) -> Result<(), SyncError> {
        for (name, value) in [
            ("word_padding", self.word_padding),
            ("punctuation_pause", self.punctuation_pause),
            ("min_word_duration", self.min_word_duration),
            ("fallback_min_word_duration", self.fallback_min_word_duration),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SyncError::invalid_config(format!(
                    "word_timing.{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SilenceParams {
    pub enabled: bool,
    /// How far a boundary may move to reach a silence edge, seconds.
    pub snap_window: f64,
    /// Hard floor applied to collapsed or inverted spans, seconds.
    pub min_span: f64,
}

impl Default for SilenceParams {
    fn default() -> Self {
        Self {
            enabled: true,
            snap_window: 0.5,
            min_span: 0.1,
        }
    }
}

impl SilenceParams {
    fn validate(&self) -> Result<(), SyncError> {
        if !self.snap_window.is_finite() || self.snap_window < 0.0 {
            return Err(SyncError::invalid_config(format!(
                "silence.snap_window must be a non-negative number, got {}",
                self.snap_window
            )));
        }
        if !self.min_span.is_finite() || self.min_span <= 0.0 {
            return Err(SyncError::invalid_config(format!(
                "silence.min_span must be positive, got {}",
                self.min_span
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExclusionConfig {
    pub use_default_patterns: bool,
    /// Extra regexes, matched case-insensitively against segment id or text.
    pub patterns: Vec<String>,
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            use_default_patterns: true,
            patterns: Vec::new(),
        }
    }
}

/// Treatment of leading silence before the narration starts.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PrerollMode {
    /// The aligner output already accounts for pre-roll.
    #[default]
    Ignore,
    /// Shift by the end of a leading silence found in the silence list.
    Detect,
    Fixed {
        offset: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_config_default_is_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.reconcile.lookahead, 5);
        assert_eq!(config.reconcile.lookbehind, 2);
        assert_eq!(config.preroll, PrerollMode::Ignore);
        assert!(config.silence.enabled);
        assert!(config.exclusion.use_default_patterns);
    }

    #[test]
    fn early_ceiling_takes_smaller_bound() {
        let params = ReconcileParams::default();
        assert!((params.early_ceiling(600.0) - 20.0).abs() < 1e-9);
        assert!((params.early_ceiling(60.0) - 9.0).abs() < 1e-9);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let json = r#"{
            "reconcile": { "lookahead": 8 },
            "preroll": { "mode": "fixed", "offset": 0.25 },
            "worker_threads": 2
        }"#;
        let config: SyncConfig = serde_json::from_str(json).expect("valid config json");
        assert_eq!(config.reconcile.lookahead, 8);
        assert_eq!(config.reconcile.lookbehind, 2);
        assert_eq!(config.preroll, PrerollMode::Fixed { offset: 0.25 });
        assert_eq!(config.worker_threads, Some(2));
        assert_eq!(config.word_timing, WordTimingParams::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_fraction() {
        let mut config = SyncConfig::default();
        config.reconcile.early_fraction = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_inverted_early_fractions() {
        let mut config = SyncConfig::default();
        config.reconcile.very_early_fraction = 0.5;
        config.reconcile.early_fraction = 0.3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_negative_window_and_zero_workers() {
        let mut config = SyncConfig::default();
        config.silence.snap_window = -1.0;
        assert!(config.validate().is_err());

        let mut config = SyncConfig::default();
        config.worker_threads = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_fails_on_missing_file() {
        let result = SyncConfig::load(Path::new("/nonexistent/sync_config.json"));
        assert!(matches!(result, Err(SyncError::Io { .. })));
    }

    #[test]
    fn load_reads_json_file() {
        let path = std::env::temp_dir().join("readalong_sync_config_load.json");
        std::fs::write(&path, r#"{"silence": {"snap_window": 0.3}}"#).expect("write config");
        let config = SyncConfig::load(&path).expect("load should succeed");
        assert!((config.silence.snap_window - 0.3).abs() < 1e-9);
        let _ = std::fs::remove_file(&path);
    }
}

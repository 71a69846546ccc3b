use std::cmp::Ordering;

use serde::Serialize;

use crate::error::SyncError;
use crate::types::{AlignedSegment, MatchQuality, Span, WordTiming};

pub const REPORT_SCHEMA_VERSION: u32 = 1;
const OUTLIER_TOP_N: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub schema_version: u32,
    pub meta: Meta,
    pub quality: QualityCounts,
    pub segments: TimelineMetrics,
    pub words: TimelineMetrics,
    pub outliers: OutlierReport,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Meta {
    pub generated_at: String,
    pub segment_count: usize,
    pub word_count: usize,
    pub candidate_count: usize,
    pub silence_count: usize,
    pub audio_duration_sec: f32,
}

/// Inputs that are not part of the engine output.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub generated_at: String,
    pub candidate_count: usize,
    pub silence_count: usize,
    pub audio_duration: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QualityCounts {
    pub exact: u32,
    pub partial: u32,
    pub fuzzy: u32,
    pub fallback: u32,
    pub reused: u32,
    pub placeholder: u32,
    pub degraded_ratio: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineMetrics {
    pub count: u32,
    pub structural: StructuralMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<MetricDistribution>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuralMetrics {
    pub non_positive_duration_count: u32,
    pub overlap_count: u32,
    pub non_monotonic_count: u32,
    pub gap_ratio: f32,
    pub overlap_ratio: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricDistribution {
    pub mean: f32,
    pub p50: f32,
    pub p90: f32,
    pub p95: f32,
    pub p99: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlierReport {
    /// Segments whose start is furthest from a linear read of the audio.
    pub largest_drift_ms: Vec<OutlierEntry>,
    pub longest_segments_ms: Vec<OutlierEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutlierEntry {
    pub id: String,
    pub quality: MatchQuality,
    pub value: f32,
}

pub fn compute_sync_report(
    segments: &[AlignedSegment],
    words: &[WordTiming],
    context: &ReportContext,
) -> Result<SyncReport, SyncError> {
    let mut notes = Vec::new();
    if segments.is_empty() {
        notes.push("no_segments".to_string());
    }
    if words.is_empty() {
        notes.push("no_word_timings".to_string());
    }

    let quality = count_qualities(segments)?;
    let degraded = quality.fallback + quality.reused + quality.placeholder;
    if degraded > 0 {
        notes.push(format!("degraded_segments={degraded}"));
    }
    if quality.placeholder > 0 {
        notes.push("no_aligner_candidates".to_string());
    }
    if context.candidate_count != segments.len() {
        notes.push(format!(
            "candidate_count_mismatch:candidates={} segments={}",
            context.candidate_count,
            segments.len()
        ));
    }

    let duration_ms = seconds_to_ms(context.audio_duration);
    let segment_spans = segments.iter().map(AlignedSegment::span).collect::<Vec<_>>();
    let word_spans = words.iter().map(WordTiming::span).collect::<Vec<_>>();
    let segment_metrics = compute_timeline_metrics(
        "segments",
        &segment_spans,
        segments.iter().map(|s| s.duration_ms),
        duration_ms,
    )?;
    let word_metrics = compute_timeline_metrics(
        "words",
        &word_spans,
        words.iter().map(|w| w.duration_ms),
        duration_ms,
    )?;
    if segment_metrics.structural.overlap_count > 0 {
        notes.push(format!(
            "overlapping_segments={}",
            segment_metrics.structural.overlap_count
        ));
    }

    Ok(SyncReport {
        schema_version: REPORT_SCHEMA_VERSION,
        meta: Meta {
            generated_at: context.generated_at.clone(),
            segment_count: segments.len(),
            word_count: words.len(),
            candidate_count: context.candidate_count,
            silence_count: context.silence_count,
            audio_duration_sec: checked_f32(context.audio_duration, "meta.audio_duration_sec")?,
        },
        quality,
        segments: segment_metrics,
        words: word_metrics,
        outliers: build_outliers(segments, context.audio_duration, OUTLIER_TOP_N),
        notes,
    })
}

fn count_qualities(segments: &[AlignedSegment]) -> Result<QualityCounts, SyncError> {
    let mut counts = QualityCounts::default();
    for segment in segments {
        let slot = match segment.quality {
            MatchQuality::Exact => &mut counts.exact,
            MatchQuality::Partial => &mut counts.partial,
            MatchQuality::Fuzzy => &mut counts.fuzzy,
            MatchQuality::Fallback => &mut counts.fallback,
            MatchQuality::Reused => &mut counts.reused,
            MatchQuality::Placeholder => &mut counts.placeholder,
        };
        *slot = slot.saturating_add(1);
    }
    let degraded = segments.iter().filter(|s| s.quality.is_degraded()).count();
    let ratio = if segments.is_empty() {
        0.0
    } else {
        degraded as f64 / segments.len() as f64
    };
    counts.degraded_ratio = checked_f32(ratio, "quality.degraded_ratio")?;
    Ok(counts)
}

fn compute_timeline_metrics(
    metric_prefix: &str,
    spans: &[Span],
    durations_ms: impl Iterator<Item = u64>,
    audio_duration_ms: u64,
) -> Result<TimelineMetrics, SyncError> {
    let durations = durations_ms.map(|ms| ms as f64).collect::<Vec<_>>();
    Ok(TimelineMetrics {
        count: to_u32(spans.len()),
        structural: compute_structural_metrics(metric_prefix, spans, audio_duration_ms)?,
        duration_ms: distribution_or_none(&durations),
    })
}

fn compute_structural_metrics(
    metric_prefix: &str,
    spans: &[Span],
    audio_duration_ms: u64,
) -> Result<StructuralMetrics, SyncError> {
    // Spans are [start, end), so end must be strictly greater than start.
    let non_positive_duration_count = spans
        .iter()
        .filter(|span| !(span.end > span.start))
        .count();

    let mut overlap_count = 0usize;
    let mut non_monotonic_count = 0usize;
    let mut gap_ms = 0u64;
    let mut overlap_ms = 0u64;

    for pair in spans.windows(2) {
        let current = &pair[0];
        let next = &pair[1];
        let current_end = seconds_to_ms(current.end);
        let next_start = seconds_to_ms(next.start);

        if current_end > next_start {
            overlap_count += 1;
            overlap_ms = overlap_ms.saturating_add(current_end - next_start);
        } else {
            gap_ms = gap_ms.saturating_add(next_start - current_end);
        }

        if current.start > next.start {
            non_monotonic_count += 1;
        }
    }

    let denom = audio_duration_ms as f64;
    let gap_ratio = if denom > 0.0 {
        gap_ms as f64 / denom
    } else {
        0.0
    };
    let overlap_ratio = if denom > 0.0 {
        overlap_ms as f64 / denom
    } else {
        0.0
    };

    Ok(StructuralMetrics {
        non_positive_duration_count: to_u32(non_positive_duration_count),
        overlap_count: to_u32(overlap_count),
        non_monotonic_count: to_u32(non_monotonic_count),
        gap_ratio: checked_f32(gap_ratio, &format!("{metric_prefix}.gap_ratio"))?,
        overlap_ratio: checked_f32(overlap_ratio, &format!("{metric_prefix}.overlap_ratio"))?,
    })
}

fn build_outliers(
    segments: &[AlignedSegment],
    audio_duration: f64,
    top_n: usize,
) -> OutlierReport {
    let count = segments.len();
    let largest_drift_ms = ranked_outliers(segments, top_n, |index, segment| {
        if audio_duration <= 0.0 || !audio_duration.is_finite() {
            return None;
        }
        let expected = audio_duration * index as f64 / count as f64;
        Some(((segment.start_time - expected) * 1000.0).abs())
    });
    let longest_segments_ms =
        ranked_outliers(segments, top_n, |_, segment| Some(segment.duration_ms as f64));

    OutlierReport {
        largest_drift_ms,
        longest_segments_ms,
    }
}

fn ranked_outliers(
    segments: &[AlignedSegment],
    top_n: usize,
    metric: impl Fn(usize, &AlignedSegment) -> Option<f64>,
) -> Vec<OutlierEntry> {
    let mut entries: Vec<OutlierEntry> = segments
        .iter()
        .enumerate()
        .filter_map(|(index, segment)| {
            metric(index, segment)
                .filter(|value| value.is_finite())
                .map(|value| OutlierEntry {
                    id: segment.id.clone(),
                    quality: segment.quality,
                    value: value as f32,
                })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.value
            .partial_cmp(&a.value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    entries.truncate(top_n);
    entries
}

fn distribution_or_none(values: &[f64]) -> Option<MetricDistribution> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mean_value = mean(&sorted);
    let p50_value = median_sorted(&sorted);
    let p90_value = percentile_sorted(&sorted, 0.9);
    let p95_value = percentile_sorted(&sorted, 0.95);
    let p99_value = percentile_sorted(&sorted, 0.99);

    Some(MetricDistribution {
        mean: checked_f32(mean_value, "distribution.mean").ok()?,
        p50: checked_f32(p50_value, "distribution.p50").ok()?,
        p90: checked_f32(p90_value, "distribution.p90").ok()?,
        p95: checked_f32(p95_value, "distribution.p95").ok()?,
        p99: checked_f32(p99_value, "distribution.p99").ok()?,
    })
}

fn seconds_to_ms(seconds: f64) -> u64 {
    let ms = (seconds * 1000.0).round();
    if ms.is_finite() && ms > 0.0 {
        ms as u64
    } else {
        0
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn median_sorted(sorted_values: &[f64]) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }
    let mid = sorted_values.len() / 2;
    if sorted_values.len() % 2 == 0 {
        (sorted_values[mid - 1] + sorted_values[mid]) / 2.0
    } else {
        sorted_values[mid]
    }
}

fn percentile_sorted(sorted_values: &[f64], percentile: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }
    if sorted_values.len() == 1 {
        return sorted_values[0];
    }

    let clamped = percentile.clamp(0.0, 1.0);
    let max_index = (sorted_values.len() - 1) as f64;
    let rank = clamped * max_index;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted_values[lower]
    } else {
        let weight = rank - lower as f64;
        sorted_values[lower] * (1.0 - weight) + sorted_values[upper] * weight
    }
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn checked_f32(value: f64, metric_name: &str) -> Result<f32, SyncError> {
    if !value.is_finite() {
        return Err(SyncError::invalid_input(format!(
            "metric '{metric_name}' produced non-finite value: {value}"
        )));
    }
    if value < f32::MIN as f64 || value > f32::MAX as f64 {
        return Err(SyncError::invalid_input(format!(
            "metric '{metric_name}' out of f32 range: {value}"
        )));
    }
    Ok(value as f32)
}

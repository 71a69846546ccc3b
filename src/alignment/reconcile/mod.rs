use std::collections::HashSet;

use crate::alignment::normalize::normalize_text;
use crate::config::ReconcileParams;
use crate::types::{
    duration_ms, AlignedSegment, AlignmentCandidate, MatchQuality, SourceSegment, Span,
};

mod fallback;
mod scoring;
#[cfg(test)]
mod tests;
mod window;

use scoring::{ScoredCandidate, TextMatch};

/// Aligner candidate with its normalized text computed once.
pub(crate) struct PreparedCandidate<'a> {
    pub(crate) candidate: &'a AlignmentCandidate,
    pub(crate) normalized: String,
}

impl PreparedCandidate<'_> {
    fn span(&self) -> Span {
        Span::new(self.candidate.begin_time, self.candidate.end_time)
    }
}

/// Per-segment view used by the window and scoring functions.
pub(crate) struct SegmentProbe<'a> {
    pub(crate) index: usize,
    pub(crate) normalized: &'a str,
    pub(crate) normalized_chars: usize,
    pub(crate) expected_time: f64,
    pub(crate) tolerance: f64,
    pub(crate) early: bool,
    pub(crate) very_early: bool,
    pub(crate) early_ceiling: f64,
}

impl<'a> SegmentProbe<'a> {
    pub(crate) fn new(
        params: &ReconcileParams,
        index: usize,
        segment_count: usize,
        normalized: &'a str,
        audio_duration: f64,
    ) -> Self {
        let fraction = if segment_count == 0 {
            0.0
        } else {
            index as f64 / segment_count as f64
        };
        Self {
            index,
            normalized,
            normalized_chars: normalized.chars().count(),
            expected_time: audio_duration * fraction,
            tolerance: audio_duration * params.timing_tolerance_fraction,
            early: fraction < params.early_fraction,
            very_early: fraction < params.very_early_fraction,
            early_ceiling: params.early_ceiling(audio_duration),
        }
    }
}

/// The single piece of state carried from one segment to the next.
#[derive(Debug, Default)]
pub(crate) struct ScanState {
    /// Forward-only cursor into the candidate list.
    pub(crate) fragment_index: usize,
    /// Bit patterns of every emitted (start, end) pair.
    used_spans: HashSet<(u64, u64)>,
    last_end: Option<f64>,
}

impl ScanState {
    pub(crate) fn is_used(&self, span: Span) -> bool {
        self.used_spans.contains(&span_key(span))
    }

    fn record(&mut self, span: Span, next_index: usize) {
        self.used_spans.insert(span_key(span));
        self.last_end = Some(span.end);
        self.fragment_index = self.fragment_index.max(next_index);
    }
}

fn span_key(span: Span) -> (u64, u64) {
    (span.start.to_bits(), span.end.to_bits())
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Rejection {
    EmptyWindow,
    BelowThreshold { score: f64 },
    PastEarlyCeiling { begin: f64, ceiling: f64 },
    Overshoot { begin: f64, expected: f64 },
}

impl Rejection {
    fn as_str(self) -> &'static str {
        match self {
            Rejection::EmptyWindow => "empty_window",
            Rejection::BelowThreshold { .. } => "below_threshold",
            Rejection::PastEarlyCeiling { .. } => "past_early_ceiling",
            Rejection::Overshoot { .. } => "overshoot",
        }
    }
}

/// Longest candidate end time, or zero when nothing usable was aligned.
pub fn derive_audio_duration(candidates: &[AlignmentCandidate]) -> f64 {
    candidates
        .iter()
        .map(|c| c.end_time)
        .filter(|t| t.is_finite())
        .fold(0.0, f64::max)
}

/// Assign one timestamp to every source segment.
///
/// The output has the same length and order as `segments`; ids, text and
/// types are copied verbatim. The audio duration is taken from the
/// candidates.
pub fn reconcile(
    segments: &[SourceSegment],
    candidates: &[AlignmentCandidate],
    params: &ReconcileParams,
) -> Vec<AlignedSegment> {
    reconcile_with_duration(segments, candidates, None, params)
}

/// Like [`reconcile`], with an explicit audio duration in seconds.
/// Non-finite or non-positive durations fall back to the derived one.
pub fn reconcile_with_duration(
    segments: &[SourceSegment],
    candidates: &[AlignmentCandidate],
    audio_duration: Option<f64>,
    params: &ReconcileParams,
) -> Vec<AlignedSegment> {
    let audio_duration = audio_duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or_else(|| derive_audio_duration(candidates));
    let prepared = candidates
        .iter()
        .map(|candidate| PreparedCandidate {
            candidate,
            normalized: normalize_text(&candidate.text),
        })
        .collect::<Vec<_>>();

    if prepared.is_empty() && !segments.is_empty() {
        tracing::warn!(
            segment_count = segments.len(),
            "reconcile: no aligner candidates, emitting placeholder timestamps"
        );
    }

    let mut state = ScanState::default();
    let aligned = segments
        .iter()
        .enumerate()
        .map(|(index, segment)| {
            reconcile_segment(
                params,
                &prepared,
                segments.len(),
                audio_duration,
                &mut state,
                index,
                segment,
            )
        })
        .collect::<Vec<_>>();

    let degraded = aligned.iter().filter(|s| s.quality.is_degraded()).count();
    tracing::debug!(
        segment_count = segments.len(),
        candidate_count = candidates.len(),
        audio_duration = format!("{:.3}", audio_duration),
        degraded,
        "reconcile: finished"
    );
    aligned
}

fn reconcile_segment(
    params: &ReconcileParams,
    candidates: &[PreparedCandidate<'_>],
    segment_count: usize,
    audio_duration: f64,
    state: &mut ScanState,
    index: usize,
    segment: &SourceSegment,
) -> AlignedSegment {
    let normalized = normalize_text(&segment.text);
    let probe = SegmentProbe::new(params, index, segment_count, &normalized, audio_duration);
    let window = window::search_window(params, &probe, state.fragment_index, candidates);
    let best = scoring::select_best(params, &probe, candidates, &window, state.fragment_index);

    let (span, quality) = match best.ok_or(Rejection::EmptyWindow).and_then(|scored| {
        check_acceptance(params, &probe, candidates, &scored).map(|()| scored)
    }) {
        Ok(scored) => {
            let first = &candidates[scored.index];
            let last = &candidates[scored.last_index];
            let span = Span::new(first.candidate.begin_time, last.candidate.end_time);
            tracing::debug!(
                segment_id = segment.id.as_str(),
                index,
                candidate_index = scored.index,
                last_candidate_index = scored.last_index,
                text_match = scored.text_match.as_str(),
                score_total = format!("{:.3}", scored.score.total),
                score_text = format!("{:.3}", scored.score.text_term),
                score_proximity = format!("{:.3}", scored.score.proximity_term),
                score_timing = format!("{:.3}", scored.score.timing_term),
                start = format!("{:.3}", span.start),
                end = format!("{:.3}", span.end),
                "reconcile: matched segment"
            );
            state.record(span, scored.last_index + 1);
            (span, scored.text_match.quality())
        }
        Err(rejection) => {
            let pick = fallback::pick(candidates, state);
            tracing::warn!(
                segment_id = segment.id.as_str(),
                index,
                reason = rejection.as_str(),
                detail = ?rejection,
                quality = pick.quality.as_str(),
                start = format!("{:.3}", pick.span.start),
                end = format!("{:.3}", pick.span.end),
                "reconcile: no acceptable match, using fallback timestamp"
            );
            state.record(pick.span, pick.next_index);
            (pick.span, pick.quality)
        }
    };

    AlignedSegment {
        id: segment.id.clone(),
        text: segment.text.clone(),
        segment_type: segment.segment_type,
        start_time: span.start,
        end_time: span.end,
        duration_ms: duration_ms(span.start, span.end),
        quality,
    }
}

/// Threshold plus the secondary sanity checks on the selected candidate.
fn check_acceptance(
    params: &ReconcileParams,
    probe: &SegmentProbe<'_>,
    candidates: &[PreparedCandidate<'_>],
    scored: &ScoredCandidate,
) -> Result<(), Rejection> {
    if matches!(scored.text_match, TextMatch::None) || scored.score.total <= params.min_accept_score
    {
        return Err(Rejection::BelowThreshold {
            score: scored.score.total,
        });
    }
    let begin = candidates[scored.index].candidate.begin_time;
    if probe.early && begin > probe.early_ceiling {
        return Err(Rejection::PastEarlyCeiling {
            begin,
            ceiling: probe.early_ceiling,
        });
    }
    if begin > probe.expected_time + params.max_overshoot_secs {
        return Err(Rejection::Overshoot {
            begin,
            expected: probe.expected_time,
        });
    }
    Ok(())
}

use crate::config::{PrerollMode, SilenceParams};
use crate::types::{AlignedSegment, SilencePeriod, Span};

/// Hard floor used by [`snap`] for collapsed spans, seconds.
pub const DEFAULT_MIN_SPAN: f64 = 0.1;

/// A leading silence must start this close to zero to count as pre-roll.
const PREROLL_MAX_START: f64 = 0.05;

/// Detected silences indexed for boundary lookups.
///
/// Invalid periods (non-finite, or `end <= start`) are dropped on
/// construction. Starts and ends are kept in two sorted lists so each
/// boundary lookup is a binary search and overlapping detector output does
/// not break ordering assumptions.
#[derive(Debug, Clone, Default)]
pub struct SilenceMap {
    starts: Vec<f64>,
    ends: Vec<f64>,
    leading: Option<SilencePeriod>,
}

impl SilenceMap {
    pub fn new(periods: &[SilencePeriod]) -> Self {
        let mut valid = periods
            .iter()
            .copied()
            .filter(|p| p.start.is_finite() && p.end.is_finite() && p.end > p.start)
            .collect::<Vec<_>>();
        let dropped = periods.len() - valid.len();
        if dropped > 0 {
            tracing::warn!(
                dropped,
                kept = valid.len(),
                "silence: ignoring invalid silence periods"
            );
        }
        valid.sort_by(|a, b| a.start.total_cmp(&b.start));

        let mut ends = valid.iter().map(|p| p.end).collect::<Vec<_>>();
        ends.sort_by(f64::total_cmp);
        Self {
            starts: valid.iter().map(|p| p.start).collect(),
            ends,
            leading: valid.first().copied(),
        }
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Closest silence end in `[start - window, start]`.
    fn end_before(&self, start: f64, window: f64) -> Option<f64> {
        let idx = self.ends.partition_point(|end| *end <= start);
        let end = *self.ends.get(idx.checked_sub(1)?)?;
        (end >= start - window).then_some(end)
    }

    /// Closest silence start in `[end, end + window]`.
    fn start_after(&self, end: f64, window: f64) -> Option<f64> {
        let idx = self.starts.partition_point(|start| *start < end);
        let start = *self.starts.get(idx)?;
        (start <= end + window).then_some(start)
    }

    /// Move span boundaries onto adjacent silence edges.
    ///
    /// The start moves back to the end of the closest preceding silence and
    /// the end moves forward to the start of the closest following silence,
    /// each only within `window`. Boundaries without a silence in reach pass
    /// through. The result always has `end > start`; collapsed spans get
    /// `end = start + min_span`.
    pub fn snap(&self, span: Span, window: f64, min_span: f64) -> Span {
        let mut snapped = span;
        if window.is_finite() && window >= 0.0 {
            if span.start.is_finite() {
                if let Some(end) = self.end_before(span.start, window) {
                    snapped.start = end;
                }
            }
            if span.end.is_finite() {
                if let Some(start) = self.start_after(span.end, window) {
                    snapped.end = start;
                }
            }
        }
        repair_span(snapped, min_span).unwrap_or(snapped)
    }

    /// Offset implied by a silence starting at the very beginning of the audio.
    pub fn detect_preroll(&self) -> Option<f64> {
        self.leading
            .filter(|p| p.start <= PREROLL_MAX_START)
            .map(|p| p.end)
    }
}

/// One-shot boundary snap against an unindexed silence list.
pub fn snap(start: f64, end: f64, silences: &[SilencePeriod], window: f64) -> Span {
    SilenceMap::new(silences).snap(Span::new(start, end), window, DEFAULT_MIN_SPAN)
}

/// Replacement for a span that is not strictly increasing, `None` when the
/// span is already valid. A non-finite start is moved to zero.
pub fn repair_span(span: Span, min_span: f64) -> Option<Span> {
    let start_ok = span.start.is_finite();
    if start_ok && span.end.is_finite() && span.end > span.start {
        return None;
    }
    let start = if start_ok { span.start } else { 0.0 };
    Some(Span::new(start, start + min_span))
}

/// Fix every inverted or collapsed aligned span in place. Returns how many
/// spans were changed.
pub fn repair_segment_spans(segments: &mut [AlignedSegment], min_span: f64) -> usize {
    let mut repaired = 0usize;
    for segment in segments.iter_mut() {
        if let Some(span) = repair_span(segment.span(), min_span) {
            tracing::warn!(
                segment_id = segment.id.as_str(),
                start = format!("{:.3}", segment.start_time),
                end = format!("{:.3}", segment.end_time),
                quality = segment.quality.as_str(),
                "silence: repairing degenerate segment span"
            );
            segment.set_span(span);
            repaired += 1;
        }
    }
    repaired
}

/// Seconds to add to every reconciled timestamp for the configured mode.
pub fn resolve_preroll(mode: &PrerollMode, silences: &SilenceMap) -> f64 {
    match mode {
        PrerollMode::Ignore => 0.0,
        PrerollMode::Fixed { offset } => *offset,
        PrerollMode::Detect => match silences.detect_preroll() {
            Some(offset) => {
                tracing::info!(
                    offset = format!("{:.3}", offset),
                    "silence: detected leading pre-roll"
                );
                offset
            }
            None => {
                tracing::debug!("silence: no leading silence, pre-roll offset is zero");
                0.0
            }
        },
    }
}

pub fn apply_offset(segments: &mut [AlignedSegment], offset: f64) {
    if offset == 0.0 || !offset.is_finite() {
        return;
    }
    for segment in segments.iter_mut() {
        let span = segment.span();
        segment.set_span(Span::new(span.start + offset, span.end + offset));
    }
}

/// Snap parameters bundled for the refiner seam.
#[derive(Debug, Clone, Copy)]
pub struct SnapSettings {
    pub window: f64,
    pub min_span: f64,
}

impl From<&SilenceParams> for SnapSettings {
    fn from(params: &SilenceParams) -> Self {
        Self {
            window: params.snap_window,
            min_span: params.min_span,
        }
    }
}

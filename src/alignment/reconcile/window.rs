use super::{PreparedCandidate, SegmentProbe};
use crate::config::ReconcileParams;

/// Candidate indices scored for one segment, ascending.
///
/// Normally `[cursor - lookbehind, cursor + lookahead)`. Early segments
/// reach further back so a repeated title cannot be pinned to a candidate
/// that is already past it, and early segments with non-trivial text also
/// score every candidate starting inside the forced time range.
pub(super) fn search_window(
    params: &ReconcileParams,
    probe: &SegmentProbe<'_>,
    cursor: usize,
    candidates: &[PreparedCandidate<'_>],
) -> Vec<usize> {
    let lo = if probe.very_early {
        0
    } else if probe.early {
        cursor.saturating_sub(params.early_lookbehind.max(params.lookbehind))
    } else {
        cursor.saturating_sub(params.lookbehind)
    };
    let hi = cursor.saturating_add(params.lookahead).min(candidates.len());

    let mut window = (lo..hi).collect::<Vec<_>>();
    if probe.early && probe.normalized_chars > params.forced_min_chars {
        let forced_range = params.forced_range_start..=params.forced_range_end;
        let before = window.len();
        window.extend(
            candidates
                .iter()
                .enumerate()
                .filter(|(index, prepared)| {
                    !(lo..hi).contains(index)
                        && forced_range.contains(&prepared.candidate.begin_time)
                })
                .map(|(index, _)| index),
        );
        if window.len() != before {
            window.sort_unstable();
        }
    }
    window
}

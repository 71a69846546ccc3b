use super::{PreparedCandidate, ScanState};
use crate::types::{MatchQuality, Span};

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct FallbackPick {
    pub(super) span: Span,
    pub(super) quality: MatchQuality,
    pub(super) next_index: usize,
}

/// Timestamp for a segment without an acceptable match.
///
/// Takes the first candidate at or after the cursor whose span was not
/// already emitted. Usage is tracked by span equality rather than index so
/// duplicated aligner spans are skipped too. With nothing left the last
/// candidate is reused; with no candidates at all a zero-length marker is
/// placed at the previous end.
pub(super) fn pick(candidates: &[PreparedCandidate<'_>], state: &ScanState) -> FallbackPick {
    let unused = candidates
        .iter()
        .enumerate()
        .skip(state.fragment_index)
        .find(|(_, prepared)| !state.is_used(prepared.span()));
    if let Some((index, prepared)) = unused {
        return FallbackPick {
            span: prepared.span(),
            quality: MatchQuality::Fallback,
            next_index: index + 1,
        };
    }

    if let Some(last) = candidates.last() {
        return FallbackPick {
            span: last.span(),
            quality: MatchQuality::Reused,
            next_index: candidates.len(),
        };
    }

    let at = state.last_end.unwrap_or(0.0);
    FallbackPick {
        span: Span::new(at, at),
        quality: MatchQuality::Placeholder,
        next_index: state.fragment_index,
    }
}

use super::{PreparedCandidate, SegmentProbe};
use crate::alignment::normalize::{contains_words, word_jaccard};
use crate::config::ReconcileParams;
use crate::types::MatchQuality;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum TextMatch {
    Exact,
    /// Candidate contains the segment text plus `extra_ratio` of other text.
    Superset { extra_ratio: f64 },
    /// Candidate (possibly merged with split continuations) covers
    /// `coverage` of the segment text.
    Subset { coverage: f64 },
    Overlap { jaccard: f64 },
    None,
}

impl TextMatch {
    pub(super) fn as_str(self) -> &'static str {
        match self {
            TextMatch::Exact => "exact",
            TextMatch::Superset { .. } => "superset",
            TextMatch::Subset { .. } => "subset",
            TextMatch::Overlap { .. } => "overlap",
            TextMatch::None => "none",
        }
    }

    pub(super) fn quality(self) -> MatchQuality {
        match self {
            TextMatch::Exact => MatchQuality::Exact,
            TextMatch::Superset { .. } | TextMatch::Subset { .. } => MatchQuality::Partial,
            TextMatch::Overlap { .. } => MatchQuality::Fuzzy,
            TextMatch::None => MatchQuality::Fallback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct ScoreBreakdown {
    pub(super) text_term: f64,
    pub(super) proximity_term: f64,
    pub(super) timing_term: f64,
    pub(super) total: f64,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct ScoredCandidate {
    pub(super) index: usize,
    /// Last candidate covered by the match; differs from `index` when split
    /// continuations were absorbed.
    pub(super) last_index: usize,
    pub(super) text_match: TextMatch,
    pub(super) score: ScoreBreakdown,
}

/// Highest total wins; equal totals keep the earlier candidate.
pub(super) fn select_best(
    params: &ReconcileParams,
    probe: &SegmentProbe<'_>,
    candidates: &[PreparedCandidate<'_>],
    window: &[usize],
    cursor: usize,
) -> Option<ScoredCandidate> {
    let mut best: Option<ScoredCandidate> = None;
    for &index in window {
        let scored = score_candidate(params, probe, candidates, index, cursor);
        let should_replace = match &best {
            None => true,
            Some(current) => scored.score.total > current.score.total + 1e-6,
        };
        if should_replace {
            best = Some(scored);
        }
    }
    best
}

pub(super) fn score_candidate(
    params: &ReconcileParams,
    probe: &SegmentProbe<'_>,
    candidates: &[PreparedCandidate<'_>],
    index: usize,
    cursor: usize,
) -> ScoredCandidate {
    let (text_match, last_index) = classify_text(params, probe.normalized, candidates, index);
    let Some(text_term) = text_term(params, probe, text_match) else {
        return ScoredCandidate {
            index,
            last_index,
            text_match,
            score: ScoreBreakdown {
                text_term: params.no_overlap_score,
                proximity_term: 0.0,
                timing_term: 0.0,
                total: params.no_overlap_score,
            },
        };
    };

    let proximity_term = proximity_term(params, probe, index, cursor);
    let timing_term = timing_term(params, probe, candidates[index].candidate.begin_time);
    ScoredCandidate {
        index,
        last_index,
        text_match,
        score: ScoreBreakdown {
            text_term,
            proximity_term,
            timing_term,
            total: text_term + proximity_term + timing_term,
        },
    }
}

/// Compare normalized segment text against candidate `index`.
///
/// A subset match walks forward over following candidates while their
/// concatenation is still contained in the segment text, so a line the
/// aligner split in two is scored (and later spanned) as one.
pub(super) fn classify_text(
    params: &ReconcileParams,
    expected: &str,
    candidates: &[PreparedCandidate<'_>],
    index: usize,
) -> (TextMatch, usize) {
    let candidate = candidates[index].normalized.as_str();
    if expected.is_empty() || candidate.is_empty() {
        return (TextMatch::None, index);
    }
    if candidate == expected {
        return (TextMatch::Exact, index);
    }

    // Containment is judged on whole words only.
    let expected_chars = expected.chars().count() as f64;
    if contains_words(candidate, expected) {
        let candidate_chars = candidate.chars().count() as f64;
        let extra_ratio = ((candidate_chars - expected_chars) / candidate_chars).max(0.0);
        return (TextMatch::Superset { extra_ratio }, index);
    }

    if contains_words(expected, candidate) {
        let mut joined = candidate.to_string();
        let mut last_index = index;
        while joined.len() < expected.len() {
            let Some(next) = candidates.get(last_index + 1) else {
                break;
            };
            if next.normalized.is_empty() {
                break;
            }
            let extended = format!("{joined} {}", next.normalized);
            if !contains_words(expected, &extended) {
                break;
            }
            joined = extended;
            last_index += 1;
        }
        let coverage = joined.chars().count() as f64 / expected_chars;
        return (TextMatch::Subset { coverage }, last_index);
    }

    let jaccard = word_jaccard(expected, candidate);
    if jaccard >= params.min_word_overlap {
        return (TextMatch::Overlap { jaccard }, index);
    }
    (TextMatch::None, index)
}

/// `None` vetoes the candidate outright.
pub(super) fn text_term(
    params: &ReconcileParams,
    probe: &SegmentProbe<'_>,
    text_match: TextMatch,
) -> Option<f64> {
    match text_match {
        TextMatch::Exact if probe.early => Some(params.early_exact_score),
        TextMatch::Exact => Some(params.exact_score),
        TextMatch::Superset { extra_ratio } => {
            Some(params.superset_score - params.superset_penalty * extra_ratio)
        }
        TextMatch::Subset { coverage } => Some(params.subset_score * coverage.min(1.0)),
        TextMatch::Overlap { jaccard } => Some(params.word_overlap_score * jaccard),
        TextMatch::None => None,
    }
}

pub(super) fn proximity_term(
    params: &ReconcileParams,
    probe: &SegmentProbe<'_>,
    index: usize,
    cursor: usize,
) -> f64 {
    let distance = index.abs_diff(cursor) as f64;
    let mut term = (params.proximity_bonus - params.proximity_decay * distance).max(0.0);
    if probe.early {
        // Later indices mean the aligner drifted ahead of an early segment.
        if index <= probe.index {
            term += params.early_backward_bonus;
        } else {
            term -= params.early_forward_penalty * (index - probe.index) as f64;
        }
    }
    term
}

pub(super) fn timing_term(params: &ReconcileParams, probe: &SegmentProbe<'_>, begin: f64) -> f64 {
    let mut term = 0.0;
    let delta = (begin - probe.expected_time).abs();
    if probe.tolerance > 0.0 && delta <= probe.tolerance {
        term += params.timing_bonus * (1.0 - delta / probe.tolerance);
    }
    if probe.early {
        if begin > probe.early_ceiling {
            return term - params.early_ceiling_penalty;
        }
        if (0.0..=params.early_band_end).contains(&begin) {
            term += params.early_band_bonus;
        }
        if (params.early_sub_band_start..=params.early_sub_band_end).contains(&begin) {
            term += params.early_sub_band_bonus;
        }
    }
    term
}

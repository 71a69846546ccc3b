use crate::alignment::reconcile::reconcile_with_duration;
use crate::alignment::silence::{SilenceMap, SnapSettings};
use crate::alignment::word_timing::propagate;
use crate::config::{ReconcileParams, WordTimingParams};
use crate::pipeline::traits::{BoundaryRefiner, SegmentReconciler, WordTimingPropagator};
use crate::types::{AlignedSegment, AlignmentCandidate, SourceSegment, Span, WordRef, WordTiming};

pub struct WindowedReconciler {
    pub params: ReconcileParams,
}

impl SegmentReconciler for WindowedReconciler {
    fn reconcile(
        &self,
        segments: &[SourceSegment],
        candidates: &[AlignmentCandidate],
        audio_duration: Option<f64>,
    ) -> Vec<AlignedSegment> {
        reconcile_with_duration(segments, candidates, audio_duration, &self.params)
    }
}

pub struct WeightedWordPropagator {
    pub params: WordTimingParams,
}

impl WordTimingPropagator for WeightedWordPropagator {
    fn propagate(&self, sentence: &AlignedSegment, words: &[WordRef]) -> Vec<WordTiming> {
        propagate(sentence, words, &self.params)
    }
}

pub struct SilenceSnapRefiner {
    pub settings: SnapSettings,
}

impl BoundaryRefiner for SilenceSnapRefiner {
    fn refine(&self, span: Span, silences: &SilenceMap) -> Span {
        silences.snap(span, self.settings.window, self.settings.min_span)
    }
}

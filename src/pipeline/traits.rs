use crate::alignment::silence::SilenceMap;
use crate::types::{AlignedSegment, AlignmentCandidate, SourceSegment, Span, WordRef, WordTiming};

pub trait SegmentReconciler: Send + Sync {
    /// Must return exactly one segment per input segment, in input order.
    fn reconcile(
        &self,
        segments: &[SourceSegment],
        candidates: &[AlignmentCandidate],
        audio_duration: Option<f64>,
    ) -> Vec<AlignedSegment>;
}

pub trait WordTimingPropagator: Send + Sync {
    fn propagate(&self, sentence: &AlignedSegment, words: &[WordRef]) -> Vec<WordTiming>;
}

pub trait BoundaryRefiner: Send + Sync {
    /// Must return a span with `end > start`.
    fn refine(&self, span: Span, silences: &SilenceMap) -> Span;
}

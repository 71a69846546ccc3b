use std::collections::{HashMap, HashSet};
use std::thread;

use crate::alignment::reconcile::derive_audio_duration;
use crate::alignment::silence::{apply_offset, repair_segment_spans, resolve_preroll, SilenceMap};
use crate::config::PrerollMode;
use crate::error::SyncError;
use crate::pipeline::traits::{BoundaryRefiner, SegmentReconciler, WordTimingPropagator};
use crate::types::{
    AlignedSegment, SegmentType, SourceSegment, SyncInput, SyncOutput, WordGroup, WordTiming,
};

pub struct SyncEngine {
    reconciler: Box<dyn SegmentReconciler>,
    word_propagator: Box<dyn WordTimingPropagator>,
    boundary_refiner: Option<Box<dyn BoundaryRefiner>>,
    preroll: PrerollMode,
    min_span: f64,
    worker_threads: usize,
}

pub(crate) struct SyncEngineParts {
    pub reconciler: Box<dyn SegmentReconciler>,
    pub word_propagator: Box<dyn WordTimingPropagator>,
    pub boundary_refiner: Option<Box<dyn BoundaryRefiner>>,
    pub preroll: PrerollMode,
    pub min_span: f64,
    pub worker_threads: usize,
}

impl SyncEngine {
    pub(crate) fn from_parts(parts: SyncEngineParts) -> Self {
        Self {
            reconciler: parts.reconciler,
            word_propagator: parts.word_propagator,
            boundary_refiner: parts.boundary_refiner,
            preroll: parts.preroll,
            min_span: parts.min_span,
            worker_threads: parts.worker_threads.max(1),
        }
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn has_boundary_refiner(&self) -> bool {
        self.boundary_refiner.is_some()
    }

    /// Reconcile, then propagate word timings and snap boundaries.
    ///
    /// Fails only on contract violations (no segments, duplicate ids).
    /// Data-quality problems degrade individual timestamps and are logged.
    pub fn synchronize(&self, input: &SyncInput) -> Result<SyncOutput, SyncError> {
        validate_segments(&input.segments)?;

        let audio_duration = input
            .audio_duration
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or_else(|| derive_audio_duration(&input.candidates));

        let mut aligned =
            self.reconciler
                .reconcile(&input.segments, &input.candidates, Some(audio_duration));
        if aligned.len() != input.segments.len() {
            return Err(SyncError::invalid_input(format!(
                "reconciler returned {} segments for {} inputs",
                aligned.len(),
                input.segments.len()
            )));
        }
        let repaired = repair_segment_spans(&mut aligned, self.min_span);

        let silences = SilenceMap::new(&input.silences);
        let preroll_offset = resolve_preroll(&self.preroll, &silences);
        apply_offset(&mut aligned, preroll_offset);

        let groups = index_word_groups(&input.segments, &input.word_groups);
        let (segments, words) = self.refine_all(aligned, &groups, &silences);

        let degraded = segments.iter().filter(|s| s.quality.is_degraded()).count();
        tracing::info!(
            segment_count = segments.len(),
            word_count = words.len(),
            candidate_count = input.candidates.len(),
            silence_count = silences.len(),
            degraded,
            repaired,
            audio_duration = format!("{:.3}", audio_duration),
            preroll_offset = format!("{:.3}", preroll_offset),
            worker_threads = self.worker_threads,
            "engine: synchronization finished"
        );

        Ok(SyncOutput {
            segments,
            words,
            audio_duration,
            preroll_offset,
        })
    }

    /// Per-segment work is independent, so segments are split into
    /// contiguous chunks, one per worker, and results are re-joined in order.
    fn refine_all(
        &self,
        aligned: Vec<AlignedSegment>,
        groups: &HashMap<&str, &WordGroup>,
        silences: &SilenceMap,
    ) -> (Vec<AlignedSegment>, Vec<WordTiming>) {
        let refined: Vec<(AlignedSegment, Vec<WordTiming>)> =
            if self.worker_threads <= 1 || aligned.len() < 2 {
                aligned
                    .iter()
                    .map(|segment| self.refine_segment(segment, groups, silences))
                    .collect()
            } else {
                let chunk_size = aligned.len().div_ceil(self.worker_threads);
                thread::scope(|scope| {
                    let handles = aligned
                        .chunks(chunk_size)
                        .map(|chunk| {
                            scope.spawn(move || {
                                chunk
                                    .iter()
                                    .map(|segment| self.refine_segment(segment, groups, silences))
                                    .collect::<Vec<_>>()
                            })
                        })
                        .collect::<Vec<_>>();
                    handles
                        .into_iter()
                        .flat_map(|handle| {
                            handle
                                .join()
                                .unwrap_or_else(|payload| std::panic::resume_unwind(payload))
                        })
                        .collect()
                })
            };

        let mut segments = Vec::with_capacity(refined.len());
        let mut words = Vec::new();
        for (segment, segment_words) in refined {
            segments.push(segment);
            words.extend(segment_words);
        }
        (segments, words)
    }

    fn refine_segment(
        &self,
        segment: &AlignedSegment,
        groups: &HashMap<&str, &WordGroup>,
        silences: &SilenceMap,
    ) -> (AlignedSegment, Vec<WordTiming>) {
        let mut refined = segment.clone();
        if let Some(refiner) = &self.boundary_refiner {
            refined.set_span(refiner.refine(refined.span(), silences));
        }

        let mut words = match groups.get(refined.id.as_str()) {
            Some(group) if refined.segment_type == SegmentType::Sentence => {
                self.word_propagator.propagate(&refined, &group.words)
            }
            _ => Vec::new(),
        };
        if let Some(refiner) = &self.boundary_refiner {
            for word in &mut words {
                word.set_span(refiner.refine(word.span(), silences));
            }
        }
        (refined, words)
    }
}

fn validate_segments(segments: &[SourceSegment]) -> Result<(), SyncError> {
    if segments.is_empty() {
        return Err(SyncError::invalid_input(
            "no source segments to synchronize",
        ));
    }
    let mut seen = HashSet::with_capacity(segments.len());
    for segment in segments {
        if !seen.insert(segment.id.as_str()) {
            return Err(SyncError::invalid_input(format!(
                "duplicate segment id '{}'",
                segment.id
            )));
        }
    }
    Ok(())
}

/// Word groups keyed by parent id. Groups pointing at unknown or
/// non-sentence segments, and repeated parents, are dropped with a warning.
fn index_word_groups<'a>(
    segments: &[SourceSegment],
    word_groups: &'a [WordGroup],
) -> HashMap<&'a str, &'a WordGroup> {
    let sentence_ids = segments
        .iter()
        .filter(|s| s.segment_type == SegmentType::Sentence)
        .map(|s| s.id.as_str())
        .collect::<HashSet<_>>();

    let mut groups = HashMap::with_capacity(word_groups.len());
    for group in word_groups {
        if !sentence_ids.contains(group.parent_id.as_str()) {
            tracing::warn!(
                parent_id = group.parent_id.as_str(),
                word_count = group.words.len(),
                "engine: word group has no matching sentence segment, skipping"
            );
            continue;
        }
        if groups.insert(group.parent_id.as_str(), group).is_some() {
            tracing::warn!(
                parent_id = group.parent_id.as_str(),
                "engine: repeated word group for sentence, keeping the last one"
            );
        }
    }
    groups
}

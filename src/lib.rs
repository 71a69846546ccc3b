pub mod alignment;
pub mod config;
pub mod error;
pub mod extraction;
pub mod pipeline;
pub mod types;

pub use alignment::reconcile::{reconcile, reconcile_with_duration};
pub use alignment::report::{compute_sync_report, ReportContext, SyncReport};
pub use alignment::silence::{snap, SilenceMap};
pub use alignment::word_timing::propagate;
pub use config::{PrerollMode, SyncConfig};
pub use error::SyncError;
pub use extraction::{extract, extract_word_groups, Document, ExclusionPolicy};
pub use pipeline::builder::SyncEngineBuilder;
pub use pipeline::runtime::SyncEngine;
pub use pipeline::traits::{BoundaryRefiner, SegmentReconciler, WordTimingPropagator};
pub use types::{
    AlignedSegment, AlignmentCandidate, MatchQuality, SegmentType, SilencePeriod, SourceSegment,
    Span, SyncInput, SyncOutput, WordGroup, WordRef, WordTiming,
};

use std::path::Path;

use crate::alignment::silence::SnapSettings;
use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::pipeline::defaults::{SilenceSnapRefiner, WeightedWordPropagator, WindowedReconciler};
use crate::pipeline::runtime::{SyncEngine, SyncEngineParts};
use crate::pipeline::traits::{BoundaryRefiner, SegmentReconciler, WordTimingPropagator};

pub struct SyncEngineBuilder {
    config: SyncConfig,
    reconciler: Option<Box<dyn SegmentReconciler>>,
    word_propagator: Option<Box<dyn WordTimingPropagator>>,
    boundary_refiner: Option<Box<dyn BoundaryRefiner>>,
}

impl SyncEngineBuilder {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            reconciler: None,
            word_propagator: None,
            boundary_refiner: None,
        }
    }

    pub fn from_config_file(path: &Path) -> Result<Self, SyncError> {
        Ok(Self::new(SyncConfig::load(path)?))
    }

    pub fn with_reconciler(mut self, reconciler: Box<dyn SegmentReconciler>) -> Self {
        self.reconciler = Some(reconciler);
        self
    }

    pub fn with_word_propagator(mut self, word_propagator: Box<dyn WordTimingPropagator>) -> Self {
        self.word_propagator = Some(word_propagator);
        self
    }

    /// Replaces silence snapping. Takes effect even when `silence.enabled` is
    /// false in the configuration.
    pub fn with_boundary_refiner(mut self, boundary_refiner: Box<dyn BoundaryRefiner>) -> Self {
        self.boundary_refiner = Some(boundary_refiner);
        self
    }

    pub fn build(self) -> Result<SyncEngine, SyncError> {
        self.config.validate()?;

        let worker_threads = self.config.worker_threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        let boundary_refiner = match self.boundary_refiner {
            Some(refiner) => Some(refiner),
            None if self.config.silence.enabled => Some(Box::new(SilenceSnapRefiner {
                settings: SnapSettings::from(&self.config.silence),
            }) as Box<dyn BoundaryRefiner>),
            None => None,
        };

        Ok(SyncEngine::from_parts(SyncEngineParts {
            reconciler: self.reconciler.unwrap_or_else(|| {
                Box::new(WindowedReconciler {
                    params: self.config.reconcile.clone(),
                })
            }),
            word_propagator: self.word_propagator.unwrap_or_else(|| {
                Box::new(WeightedWordPropagator {
                    params: self.config.word_timing.clone(),
                })
            }),
            boundary_refiner,
            preroll: self.config.preroll,
            min_span: self.config.silence.min_span,
            worker_threads,
        }))
    }
}

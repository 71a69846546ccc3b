pub mod normalize;
pub mod reconcile;
pub mod report;
pub mod silence;
pub mod word_timing;

//! Intent document operations: template merge and geometry normalization.

pub mod dimension;
pub mod merge;

pub use dimension::{enforce_dimension_mode, normalize_dimension_mode, prepare_template, DimensionMode, Enforcement};
pub use merge::{force_profile, merge_job_meta, merge_with_template};

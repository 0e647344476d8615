//! High-level operations.
//!
//! This module contains the implementation of toolstage commands that do
//! more than print.

pub mod pipeline;

pub use pipeline::{build, planned_builders, PipelineOptions, PipelineReport, StageReport};

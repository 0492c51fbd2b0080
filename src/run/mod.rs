//! Per-run orchestration: discovery and grouping of raw measurement
//! files, the linear per-run pipeline, and the reference-point
//! configuration it computes distances against.

pub mod config;
pub mod measurement_dir;
pub mod pipeline;

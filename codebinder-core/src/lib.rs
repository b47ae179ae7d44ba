#![doc = "codebinder-core: core logic library for codebinder."]

//! This crate contains all logic, data models and pipelines for codebinder:
//! collecting the files of a source-code project, estimating their rendered
//! cost, packing them into size-bounded parts, rendering each part as a
//! paginated PDF, and finalising the produced artifact set for delivery.
//!
//! # Usage
//! Add this as a dependency for all shared pipeline, packing, rendering and
//! job orchestration code. The `codebinder` binary crate is CLI glue only.

pub mod archive;
pub mod collect;
pub mod config;
pub mod contract;
pub mod estimate;
pub mod finalise;
pub mod job;
pub mod pack;
pub mod refine;
pub mod render;

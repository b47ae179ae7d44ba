//! codebinder CLI crate: command parsing, config loading and orchestration
//! glue. All business logic (collection, packing, rendering, jobs) lives in
//! the `codebinder-core` crate.

pub mod cli;
pub mod load_config;

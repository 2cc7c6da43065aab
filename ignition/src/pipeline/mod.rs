//! The stage pipeline: trait and runner.

mod runner;

pub use runner::{BootPipeline, BootStage};

//! The two top-level pipelines: asset build and differential deploy

pub mod build;
pub mod deploy;

pub use build::{BuildEngine, BuildOutcome};
pub use deploy::{DeployOutcome, DeployPipeline};

// vim: ts=4

//! # captionforge-pipeline
//!
//! Resumable caption → description → image pipeline.
//!
//! - [`manifest`]: CSV-backed tables keyed by image id, "existing wins" merge
//! - [`enhance`] / [`render`]: stage runners that only touch unfinished ids
//! - [`reconcile`]: the single "is this artifact done?" predicate
//! - [`pipeline`]: validation gate → fetch → enhance → render → sync
//!
//! External services enter through the [`Enhancer`] and [`ImageGenerator`]
//! capabilities; [`providers`] holds the HTTP implementations.

pub mod capability;
pub mod enhance;
pub mod error;
pub mod manifest;
pub mod pipeline;
pub mod providers;
pub mod reconcile;
pub mod render;
mod writer;

pub use capability::{CapabilityError, Enhancer, ImageGenerator};
pub use enhance::{run_enhance, EnhanceReport, EnhanceStage};
pub use error::PipelineError;
pub use pipeline::{Capabilities, RunOptions, RunReport, Stage, StageFailure};
pub use reconcile::{all_artifacts_valid, ArtifactStatus, ValidationReport};
pub use render::{run_render, RenderReport, RenderStage};

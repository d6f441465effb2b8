//! Captionforge core library: domain types, configuration, artifact identity.
//!
//! Public API surface:
//! - [`types`]: newtypes, input rows, manifest records, render parameters
//! - [`config`]: YAML configuration load with `${ENV}` placeholders
//! - [`identity`]: content-derived artifact names
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod identity;
pub mod types;

pub use config::Config;
pub use error::ConfigError;
pub use types::{EnhancementRecord, ImageId, RenderParams, RenderRecord, WorkUnit};

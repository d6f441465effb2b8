//! # captionforge-storage
//!
//! Object-store capability and one-way directory mirroring.
//!
//! - [`ObjectStore`]: `list / get / put` against a remote bucket
//! - [`S3Store`]: AWS S3 implementation
//! - [`MemoryStore`]: in-process implementation
//! - [`sync_dir`]: upload local files whose key is not yet remote
//! - [`ensure_input`]: download the input table when absent locally

pub mod error;
pub mod fetch;
pub mod memory;
pub mod s3;
pub mod store;
pub mod sync;

pub use error::StorageError;
pub use fetch::{ensure_input, FetchOutcome};
pub use memory::MemoryStore;
pub use s3::S3Store;
pub use store::ObjectStore;
pub use sync::{sync_dir, SyncOptions, SyncReport, UploadFailure, UploadPlan};

//! Push local files selected by glob patterns to an S3 bucket.
//!
//! [`deploy::deploy`] resolves the files, derives each object key and content type, and
//! uploads them one at a time with optional gzip, public-read ACL and cache-control.

pub mod config;
pub mod content;
pub mod deploy;
pub mod error;
pub mod matcher;
pub mod s3;
pub mod store;
pub mod target;
pub mod transfer;

pub use config::{Access, DeployArgs, StoreCredentials, UploadSpec};
pub use deploy::{RunContext, RunState, RunSummary, deploy, run};
pub use error::{DeployError, Result, SourceOp, TransferStage};
pub use store::{AttributeUpdate, Bucket, ObjectHandle, ObjectStore, ObjectWriter, StoreError};
pub use target::FileEntry;
pub use transfer::{UploadOutcome, UploadResult};

//! Capability traits for the remote object store.
//!
//! The deploy engine only talks to these traits. [`crate::s3`] implements them on top of
//! `aws-sdk-s3`; tests use an in-memory implementation.

use async_trait::async_trait;
use std::io::Write;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Content-encoding identifier written when compression is enabled.
pub const GZIP_ENCODING: &str = "gzip";

/// Errors returned by an object store implementation
#[derive(Error, Debug)]
pub enum StoreError {
    /// The credentials lack permission for the operation
    #[error("access denied for bucket '{bucket}': {message}")]
    AccessDenied { bucket: String, message: String },

    /// The object or bucket does not exist
    #[error("not found: {key}")]
    NotFound { key: String },

    /// The operation was interrupted because the run was torn down
    #[error("operation cancelled")]
    Cancelled,

    /// Local buffering or codec failure while streaming the body
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other SDK or service error
    #[error("store error: {0}")]
    Sdk(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Metadata mutation applied to an object after its body was committed.
///
/// Content type is always present; encoding and cache-control only when requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeUpdate {
    pub content_type: String,
    pub content_encoding: Option<String>,
    pub cache_control: Option<String>,
}

impl AttributeUpdate {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            content_encoding: None,
            cache_control: None,
        }
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.content_encoding = Some(encoding.into());
        self
    }

    /// Set cache-control; empty values are ignored.
    pub fn with_cache_control(mut self, cache_control: Option<&str>) -> Self {
        self.cache_control = cache_control
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        self
    }
}

/// Entry point into a store: hands out bucket handles.
pub trait ObjectStore: Send + Sync {
    type Bucket: Bucket;

    fn bucket(&self, name: &str) -> Self::Bucket;
}

pub trait Bucket: Send + Sync {
    type Object: ObjectHandle;

    fn name(&self) -> &str;

    fn object(&self, key: &str) -> Self::Object;
}

/// Handle on a single remote object.
#[async_trait]
pub trait ObjectHandle: Send + Sync {
    type Writer: ObjectWriter;

    fn key(&self) -> &str;

    /// Open a write stream. Nothing is visible remotely until the writer is closed.
    async fn new_writer(&self, cancel: CancellationToken) -> StoreResult<Self::Writer>;

    /// Grant anonymous read access to the object.
    async fn set_public_read(&self) -> StoreResult<()>;

    async fn update_attributes(&self, update: &AttributeUpdate) -> StoreResult<()>;
}

/// Write stream for an object body. Closing it commits the object.
#[async_trait]
pub trait ObjectWriter: Write + Send + Sized {
    /// Commit the object and return the number of bytes stored.
    async fn close(self) -> StoreResult<u64>;
}

//! Per-file upload: body phase, then metadata phase.
//!
//! The phases are encoded as type states. Metadata can only be applied to a
//! [`Transfer<Committed>`], which only [`Transfer::write_body`] produces.

use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::Write;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::{Access, UploadSpec};
use crate::error::{DeployError, Result, SourceOp, TransferStage};
use crate::store::{AttributeUpdate, Bucket, GZIP_ENCODING, ObjectHandle, ObjectWriter, StoreError};
use crate::target::FileEntry;

// Read buffer for streaming the local file (64KB)
const CHUNK_SIZE: usize = 64 * 1024;

/// Outcome of one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded { bytes_read: u64, bytes_written: u64 },
    /// Dry run: nothing was read or written
    Planned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    pub entry: FileEntry,
    pub outcome: UploadOutcome,
}

/// Nothing has been sent yet
pub struct Pending;

/// The body is committed remotely
pub struct Committed {
    bytes_read: u64,
    bytes_written: u64,
}

pub struct Transfer<'a, O, S> {
    entry: &'a FileEntry,
    object: O,
    spec: &'a UploadSpec,
    state: S,
}

/// Upload one file, or only log it in dry-run mode.
pub async fn transfer<B: Bucket>(
    bucket: &B,
    entry: &FileEntry,
    spec: &UploadSpec,
    cancel: &CancellationToken,
) -> Result<UploadResult> {
    info!(
        name = %entry.path.display(),
        bucket = bucket.name(),
        target = %entry.target,
        content_type = %entry.content_type,
        compress = spec.compress,
        "Uploading file"
    );

    if spec.dry_run {
        return Ok(UploadResult {
            entry: entry.clone(),
            outcome: UploadOutcome::Planned,
        });
    }

    Transfer::new(bucket.object(&entry.target), entry, spec)
        .write_body(cancel)
        .await?
        .apply_metadata()
        .await
}

impl<'a, O: ObjectHandle> Transfer<'a, O, Pending> {
    pub fn new(object: O, entry: &'a FileEntry, spec: &'a UploadSpec) -> Self {
        Self {
            entry,
            object,
            spec,
            state: Pending,
        }
    }

    /// Stream the local file into the object and commit it.
    pub async fn write_body(
        self,
        cancel: &CancellationToken,
    ) -> Result<Transfer<'a, O, Committed>> {
        let mut file = File::open(&self.entry.path)
            .await
            .map_err(|source| self.io_error(SourceOp::Open, source))?;

        let writer = self
            .object
            .new_writer(cancel.child_token())
            .await
            .map_err(|e| self.error(TransferStage::OpenWriter, e))?;

        let mut sink = if self.spec.compress {
            BodySink::Gzip(GzEncoder::new(writer, Compression::default()))
        } else {
            BodySink::Plain(writer)
        };

        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut bytes_read = 0u64;
        loop {
            let n = file
                .read(&mut buffer)
                .await
                .map_err(|source| self.io_error(SourceOp::Read, source))?;
            if n == 0 {
                break; // EOF
            }

            sink.write_all(&buffer[..n])
                .map_err(|e| self.error(TransferStage::Write, e.into()))?;
            bytes_read += n as u64;
        }
        drop(file);

        let writer = sink
            .finish()
            .map_err(|e| self.error(TransferStage::Compress, e.into()))?;
        let bytes_written = writer
            .close()
            .await
            .map_err(|e| self.error(TransferStage::Commit, e))?;

        info!(
            name = %self.entry.path.display(),
            target = %self.entry.target,
            content_type = %self.entry.content_type,
            compress = self.spec.compress,
            cache_control = self.spec.cache_control.as_deref().unwrap_or(""),
            bytes_read,
            bytes_written,
            "Uploaded file"
        );

        Ok(Transfer {
            entry: self.entry,
            object: self.object,
            spec: self.spec,
            state: Committed {
                bytes_read,
                bytes_written,
            },
        })
    }
}

impl<O: ObjectHandle> Transfer<'_, O, Committed> {
    /// ACL first, then content type, encoding and cache-control.
    pub async fn apply_metadata(self) -> Result<UploadResult> {
        if self.spec.access == Access::Public {
            self.object
                .set_public_read()
                .await
                .map_err(|e| self.error(TransferStage::Acl, e))?;
        }

        let update = self.attributes();
        self.object
            .update_attributes(&update)
            .await
            .map_err(|e| self.error(TransferStage::Attributes, e))?;

        info!(
            name = %self.entry.path.display(),
            target = %self.entry.target,
            content_type = %update.content_type,
            content_encoding = update.content_encoding.as_deref().unwrap_or(""),
            cache_control = update.cache_control.as_deref().unwrap_or(""),
            access = %self.spec.access,
            "Updated attributes"
        );

        Ok(UploadResult {
            entry: self.entry.clone(),
            outcome: UploadOutcome::Uploaded {
                bytes_read: self.state.bytes_read,
                bytes_written: self.state.bytes_written,
            },
        })
    }

    fn attributes(&self) -> AttributeUpdate {
        let update = AttributeUpdate::new(&self.entry.content_type)
            .with_cache_control(self.spec.cache_control.as_deref());
        if self.spec.compress {
            update.with_encoding(GZIP_ENCODING)
        } else {
            update
        }
    }
}

impl<O: ObjectHandle, S> Transfer<'_, O, S> {
    fn error(&self, stage: TransferStage, source: StoreError) -> DeployError {
        DeployError::Transfer {
            path: self.entry.path.clone(),
            target: self.entry.target.clone(),
            stage,
            source,
        }
    }

    fn io_error(&self, op: SourceOp, source: std::io::Error) -> DeployError {
        DeployError::Io {
            path: self.entry.path.clone(),
            op,
            source,
        }
    }
}

/// Object writer, optionally behind a gzip encoder
enum BodySink<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
}

impl<W: Write> BodySink<W> {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        match self {
            Self::Plain(w) => w.write_all(buf),
            Self::Gzip(w) => w.write_all(buf),
        }
    }

    /// Write the gzip footer (if any) and hand back the underlying writer.
    fn finish(self) -> std::io::Result<W> {
        match self {
            Self::Plain(mut w) => {
                w.flush()?;
                Ok(w)
            }
            Self::Gzip(w) => w.finish(),
        }
    }
}

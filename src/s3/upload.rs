use async_trait::async_trait;
use aws_sdk_s3::{Client, primitives::ByteStream};
use std::io::{self, Write};
use tempfile::NamedTempFile;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::from_aws_error;
use crate::store::{ObjectWriter, StoreError, StoreResult};

/// Stages an object body in a temp file and sends it with a single PutObject on close.
///
/// Memory use stays flat regardless of object size; the body only lives on disk
/// until the upload finishes.
pub struct S3Writer {
    client: Client,
    bucket: String,
    key: String,
    staged: NamedTempFile,
    size: u64,
    cancel: CancellationToken,
}

impl S3Writer {
    pub(crate) fn new(
        client: Client,
        bucket: &str,
        key: &str,
        cancel: CancellationToken,
    ) -> io::Result<Self> {
        Ok(Self {
            client,
            bucket: bucket.to_string(),
            key: key.to_string(),
            staged: NamedTempFile::new()?,
            size: 0,
            cancel,
        })
    }
}

impl Write for S3Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.staged.write(buf)?;
        self.size += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.staged.flush()
    }
}

#[async_trait]
impl ObjectWriter for S3Writer {
    async fn close(mut self) -> StoreResult<u64> {
        self.staged.flush()?;
        let size = self.size;

        let upload = async {
            let body = ByteStream::from_path(self.staged.path())
                .await
                .map_err(|e| StoreError::Sdk(format!("failed to stream staged body: {e}")))?;

            let output = self
                .client
                .put_object()
                .bucket(&self.bucket)
                .key(&self.key)
                .body(body)
                .content_length(size as i64)
                .send()
                .await
                .map_err(|e| from_aws_error(&self.bucket, &self.key, e))?;
            Ok::<_, StoreError>(output)
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(StoreError::Cancelled),
            result = upload => {
                result?;
            }
        }

        debug!("uploaded {size} bytes to s3://{}/{}", self.bucket, self.key);
        Ok(size)
    }
}

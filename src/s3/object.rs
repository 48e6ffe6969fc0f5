use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::types::{MetadataDirective, ObjectCannedAcl};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;

use super::error::from_aws_error;
use super::upload::S3Writer;
use crate::store::{AttributeUpdate, Bucket, ObjectHandle, StoreResult};

#[derive(Clone)]
pub struct S3Bucket {
    client: Client,
    name: String,
}

impl S3Bucket {
    pub(crate) fn new(client: Client, name: &str) -> Self {
        Self {
            client,
            name: name.to_string(),
        }
    }
}

impl Bucket for S3Bucket {
    type Object = S3Object;

    fn name(&self) -> &str {
        &self.name
    }

    fn object(&self, key: &str) -> S3Object {
        S3Object {
            client: self.client.clone(),
            bucket: self.name.clone(),
            key: key.to_string(),
            public: AtomicBool::new(false),
        }
    }
}

pub struct S3Object {
    client: Client,
    bucket: String,
    key: String,
    // set once public-read was granted through this handle
    public: AtomicBool,
}

impl S3Object {
    /// `CopySource` value: bucket/key with the key URL-encoded
    fn copy_source(&self) -> String {
        format!("{}/{}", self.bucket, urlencoding::encode(&self.key))
    }
}

#[async_trait]
impl ObjectHandle for S3Object {
    type Writer = S3Writer;

    fn key(&self) -> &str {
        &self.key
    }

    async fn new_writer(&self, cancel: CancellationToken) -> StoreResult<S3Writer> {
        Ok(S3Writer::new(
            self.client.clone(),
            &self.bucket,
            &self.key,
            cancel,
        )?)
    }

    async fn set_public_read(&self) -> StoreResult<()> {
        self.client
            .put_object_acl()
            .bucket(&self.bucket)
            .key(&self.key)
            .acl(ObjectCannedAcl::PublicRead)
            .send()
            .await
            .map_err(|e| from_aws_error(&self.bucket, &self.key, e))?;

        self.public.store(true, Ordering::Release);
        Ok(())
    }

    /// S3 metadata is immutable, so attributes are replaced by copying the object onto itself.
    async fn update_attributes(&self, update: &AttributeUpdate) -> StoreResult<()> {
        let mut copy = self
            .client
            .copy_object()
            .bucket(&self.bucket)
            .key(&self.key)
            .copy_source(self.copy_source())
            .metadata_directive(MetadataDirective::Replace)
            .content_type(&update.content_type)
            .set_content_encoding(update.content_encoding.clone())
            .set_cache_control(update.cache_control.clone());

        // a copy resets the ACL to private
        if self.public.load(Ordering::Acquire) {
            copy = copy.acl(ObjectCannedAcl::PublicRead);
        }

        copy.send()
            .await
            .map_err(|e| from_aws_error(&self.bucket, &self.key, e))?;
        Ok(())
    }
}

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_credential_types::provider::ProvideCredentials;
use aws_sdk_s3::Client;
use tracing::debug;

use super::object::S3Bucket;
use crate::config::StoreCredentials;
use crate::error::{DeployError, Result};
use crate::store::ObjectStore;

/// S3 store backed by a single SDK client for the whole run
#[derive(Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    /// Build the SDK client and resolve credentials once so auth problems surface
    /// before any file is matched.
    pub async fn connect(credentials: &StoreCredentials) -> Result<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(credentials.region.clone()));

        if let Some(profile) = &credentials.profile {
            loader = loader.profile_name(profile);
        }

        if let Some(keys) = &credentials.keys {
            loader = loader.credentials_provider(Credentials::new(
                &keys.access_key_id,
                &keys.secret_access_key,
                keys.session_token.clone(),
                None,
                "s3deploy",
            ));
        }

        if let Some(endpoint) = &credentials.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        let sdk_config = loader.load().await;

        let provider = sdk_config
            .credentials_provider()
            .ok_or_else(|| DeployError::Auth("no AWS credentials provider configured".into()))?;
        let resolved = provider
            .provide_credentials()
            .await
            .map_err(|e| DeployError::Auth(format!("could not resolve AWS credentials: {e}")))?;

        debug!(
            region = %credentials.region,
            access_key_id = resolved.access_key_id(),
            "resolved credentials"
        );

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(credentials.force_path_style)
            .build();

        Ok(Self {
            client: Client::from_conf(s3_config),
        })
    }
}

impl ObjectStore for S3Store {
    type Bucket = S3Bucket;

    fn bucket(&self, name: &str) -> S3Bucket {
        S3Bucket::new(self.client.clone(), name)
    }
}

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{Args, ValueEnum};
use serde::Deserialize;
use std::fmt;

use crate::error::{DeployError, Result};

/// Object ACL applied after upload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Access {
    #[default]
    Private,
    Public,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => f.write_str("private"),
            Self::Public => f.write_str("public"),
        }
    }
}

/// Static keys decoded from the credentials payload
#[derive(Clone, Deserialize, PartialEq, Eq)]
pub struct StaticKeys {
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
}

impl fmt::Debug for StaticKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticKeys")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CredentialsPayload {
    #[serde(flatten)]
    keys: StaticKeys,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    endpoint: Option<String>,
}

/// Everything needed to acquire a store handle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreCredentials {
    pub region: String,
    pub profile: Option<String>,
    pub endpoint: Option<String>,
    pub force_path_style: bool,
    /// `None` falls back to the default AWS credential chain
    pub keys: Option<StaticKeys>,
}

impl StoreCredentials {
    /// Decode a credentials payload (raw JSON or base64-encoded JSON).
    ///
    /// Region and endpoint inside the payload win over the ones passed in.
    pub fn decode(
        payload: &str,
        region: Option<String>,
        profile: Option<String>,
        endpoint: Option<String>,
        force_path_style: bool,
    ) -> Result<Self> {
        let payload = payload.trim();

        let (keys, region, endpoint) = if payload.is_empty() {
            (None, region, endpoint)
        } else {
            let parsed = parse_payload(payload)?;
            (
                Some(parsed.keys),
                parsed.region.or(region),
                parsed.endpoint.or(endpoint),
            )
        };

        let region = region
            .filter(|r| !r.is_empty())
            .ok_or_else(|| DeployError::config("AWS_REGION is not set and the credentials payload has no region"))?;
        validate_region(&region)?;

        Ok(Self {
            region,
            profile: profile.filter(|p| !p.is_empty()),
            endpoint: endpoint.filter(|e| !e.is_empty()),
            force_path_style,
            keys,
        })
    }
}

fn parse_payload(payload: &str) -> Result<CredentialsPayload> {
    let json = if payload.starts_with('{') {
        payload.to_string()
    } else {
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| DeployError::config(format!("credentials are neither JSON nor base64: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|_| DeployError::config("decoded credentials are not valid UTF-8"))?
    };

    let parsed: CredentialsPayload = serde_json::from_str(&json)
        .map_err(|e| DeployError::config(format!("malformed credentials payload: {e}")))?;

    if parsed.keys.access_key_id.is_empty() || parsed.keys.secret_access_key.is_empty() {
        return Err(DeployError::config(
            "credentials payload has an empty access_key_id or secret_access_key",
        ));
    }

    Ok(parsed)
}

/// Immutable description of one deploy run
#[derive(Debug, Clone)]
pub struct UploadSpec {
    pub bucket: String,
    pub access: Access,
    pub source: String,
    pub target: String,
    pub strip_prefix: String,
    pub exclude: Vec<String>,
    pub dry_run: bool,
    pub compress: bool,
    pub cache_control: Option<String>,
    pub credentials: StoreCredentials,
}

impl UploadSpec {
    /// Check the settings that do not depend on the store.
    pub fn validate(&self) -> Result<()> {
        validate_bucket_name(&self.bucket)?;

        if self.source.trim().is_empty() {
            return Err(DeployError::config("PLUGIN_SOURCE cannot be empty"));
        }

        if self.exclude.iter().any(|pattern| pattern.is_empty()) {
            return Err(DeployError::config("exclude patterns cannot be empty"));
        }

        Ok(())
    }
}

/// Deploy flags; each one can also come from the environment
#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    /// Credentials JSON (raw or base64): access_key_id, secret_access_key, session_token, region, endpoint
    #[arg(long, env = "PLUGIN_CREDENTIALS", default_value = "", hide_env_values = true)]
    pub credentials: String,

    /// Target bucket
    #[arg(long, env = "PLUGIN_BUCKET")]
    pub bucket: String,

    /// ACL applied to uploaded objects
    #[arg(long, env = "PLUGIN_ACL", value_enum, default_value_t = Access::Private)]
    pub acl: Access,

    /// Glob selecting the files to upload (supports **)
    #[arg(long, env = "PLUGIN_SOURCE")]
    pub source: String,

    /// Key prefix in the bucket
    #[arg(long, env = "PLUGIN_TARGET", default_value = "")]
    pub target: String,

    /// Literal prefix removed from local paths before building keys
    #[arg(long, env = "PLUGIN_STRIP_PREFIX", default_value = "")]
    pub strip_prefix: String,

    /// Glob(s) of files to leave out (comma-separated or repeated)
    #[arg(long, env = "PLUGIN_EXCLUDE")]
    pub exclude: Vec<String>,

    /// Show what would be uploaded without touching the bucket
    #[arg(long, env = "PLUGIN_DRY_RUN")]
    pub dry_run: bool,

    /// Gzip file bodies and set Content-Encoding: gzip
    #[arg(long, env = "PLUGIN_COMPRESS")]
    pub compress: bool,

    /// Cache-Control header for uploaded objects
    #[arg(long, env = "PLUGIN_CACHE_CONTROL")]
    pub cache_control: Option<String>,

    /// AWS region (overridden by a region in the credentials payload)
    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,

    /// AWS profile used when no credentials payload is given
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,

    /// Custom S3-compatible endpoint (MinIO, R2, ...)
    #[arg(long, env = "PLUGIN_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Use path-style bucket addressing
    #[arg(long, env = "PLUGIN_PATH_STYLE")]
    pub path_style: bool,
}

/// Split a comma-separated pattern list, leaving commas inside `{a,b}` groups alone.
fn split_patterns(list: &str) -> Vec<String> {
    let mut patterns = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    for c in list.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                patterns.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    patterns.push(current);

    patterns
        .into_iter()
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

impl TryFrom<DeployArgs> for UploadSpec {
    type Error = DeployError;

    fn try_from(args: DeployArgs) -> Result<Self> {
        let force_path_style = args.path_style || args.endpoint.is_some();
        let credentials = StoreCredentials::decode(
            &args.credentials,
            args.region,
            args.profile,
            args.endpoint,
            force_path_style,
        )?;

        let spec = Self {
            bucket: args.bucket,
            access: args.acl,
            source: args.source,
            target: args.target,
            strip_prefix: args.strip_prefix,
            exclude: args
                .exclude
                .iter()
                .flat_map(|p| split_patterns(p))
                .collect(),
            dry_run: args.dry_run,
            compress: args.compress,
            cache_control: args.cache_control.filter(|c| !c.is_empty()),
            credentials,
        };
        spec.validate()?;

        Ok(spec)
    }
}

/// Validate AWS region format
fn validate_region(region: &str) -> Result<()> {
    if region.is_empty() {
        return Err(DeployError::config("AWS_REGION cannot be empty"));
    }

    // Basic validation - ensure it looks like a region (contains a dash)
    if !region.contains('-') {
        return Err(DeployError::config(format!(
            "AWS_REGION '{}' doesn't look like a valid region (e.g., us-west-2, eu-west-1)",
            region
        )));
    }

    Ok(())
}

/// Validate S3 bucket name according to AWS rules
fn validate_bucket_name(bucket: &str) -> Result<()> {
    if bucket.len() < 3 || bucket.len() > 63 {
        return Err(DeployError::config(format!(
            "bucket '{}' must be between 3 and 63 characters (got {})",
            bucket,
            bucket.len()
        )));
    }

    let edge_ok = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
    if !bucket.starts_with(edge_ok) || !bucket.ends_with(edge_ok) {
        return Err(DeployError::config(format!(
            "bucket '{}' must start and end with a lowercase letter or number",
            bucket
        )));
    }

    if let Some(c) = bucket
        .chars()
        .find(|&c| !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' && c != '.')
    {
        return Err(DeployError::config(format!(
            "bucket '{}' contains invalid character '{}'. Only lowercase letters, numbers, hyphens, and periods are allowed",
            bucket, c
        )));
    }

    if bucket.contains("..") {
        return Err(DeployError::config(format!(
            "bucket '{}' cannot contain consecutive periods",
            bucket
        )));
    }

    // IP address format is not allowed
    if bucket.split('.').all(|part| part.parse::<u8>().is_ok()) {
        return Err(DeployError::config(format!(
            "bucket '{}' cannot be formatted as an IP address",
            bucket
        )));
    }

    Ok(())
}

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::store::StoreError;

/// Step of the per-file transfer at which a remote operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStage {
    /// Opening the remote write stream
    OpenWriter,
    /// Streaming bytes into the (possibly compressing) writer
    Write,
    /// Flushing the gzip footer
    Compress,
    /// Closing the write stream, which commits the object
    Commit,
    /// Granting public read access
    Acl,
    /// Updating content type, encoding and cache-control
    Attributes,
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Self::OpenWriter => "open writer",
            Self::Write => "write body",
            Self::Compress => "finish compression",
            Self::Commit => "commit object",
            Self::Acl => "set public-read",
            Self::Attributes => "update attributes",
        };
        f.write_str(stage)
    }
}

/// What was being done to the local file when it failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOp {
    Open,
    Read,
}

impl fmt::Display for SourceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Open => "open",
            Self::Read => "read",
        })
    }
}

/// Errors that abort a deploy run
#[derive(Error, Debug)]
pub enum DeployError {
    /// Malformed flags or credentials payload
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Credential resolution or client setup failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// An include or exclude pattern could not be expanded
    #[error("Could not match files for pattern '{pattern}': {message}")]
    Match { pattern: String, message: String },

    /// Local file could not be opened or read
    #[error("Could not {op} source file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        op: SourceOp,
        #[source]
        source: std::io::Error,
    },

    /// A remote write, commit, ACL or attribute update failed
    #[error("Could not upload {} to '{target}' ({stage}): {source}", .path.display())]
    Transfer {
        path: PathBuf,
        target: String,
        stage: TransferStage,
        #[source]
        source: StoreError,
    },
}

impl DeployError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn pattern(pattern: &str, error: impl fmt::Display) -> Self {
        Self::Match {
            pattern: pattern.to_string(),
            message: error.to_string(),
        }
    }

    /// Local path the error relates to, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } | Self::Transfer { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(message) => {
                format!(
                    "Invalid configuration: {}\n\nPossible solutions:\n  \
                     1. Check the PLUGIN_* variables or flags passed to s3deploy\n  \
                     2. Verify PLUGIN_CREDENTIALS is valid JSON (raw or base64)",
                    message
                )
            }
            Self::Auth(message) => {
                format!(
                    "Authentication failed: {}\n\nPossible solutions:\n  \
                     1. Check your AWS credentials: aws sts get-caller-identity\n  \
                     2. Verify AWS_REGION and AWS_PROFILE\n  \
                     3. If using a custom endpoint, check PLUGIN_ENDPOINT",
                    message
                )
            }
            Self::Match { pattern, message } => {
                format!(
                    "Could not match files for '{}': {}\n\nPossible solutions:\n  \
                     1. Check the glob syntax (*, **, ?, [..], {{a,b}})\n  \
                     2. Ensure the source directory is readable",
                    pattern, message
                )
            }
            Self::Io { path, op, source } => {
                format!(
                    "Could not {} source file {}: {}\n\nPossible solutions:\n  \
                     1. Check file permissions: ls -l {}\n  \
                     2. Make sure nothing removes build output during the upload",
                    op,
                    path.display(),
                    source,
                    path.display()
                )
            }
            Self::Transfer {
                source: StoreError::AccessDenied { bucket, message },
                target,
                ..
            } => {
                format!(
                    "Access denied writing '{}' to bucket '{}': {}\n\nPossible solutions:\n  \
                     1. Verify bucket permissions for your IAM user/role\n  \
                     2. Public uploads need s3:PutObjectAcl and ACLs enabled on the bucket\n  \
                     3. Check AWS_REGION matches the bucket region",
                    target, bucket, message
                )
            }
            _ => self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;

use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use std::error::Error;
use std::fmt::Debug;

use crate::store::StoreError;

/// Map an SDK error onto [`StoreError`], keeping the full error chain in the message.
pub(crate) fn from_aws_error<E, R>(bucket: &str, key: &str, error: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + Error + Send + Sync + 'static,
    R: Debug + Send + Sync + 'static,
{
    let code = error.code().map(str::to_string);
    let message = DisplayErrorContext(&error).to_string();
    classify(bucket, key, code.as_deref(), message)
}

fn classify(bucket: &str, key: &str, code: Option<&str>, message: String) -> StoreError {
    let lower = message.to_lowercase();
    match code {
        Some("AccessDenied" | "AllAccessDisabled" | "AccessControlListNotSupported") => {
            StoreError::AccessDenied {
                bucket: bucket.to_string(),
                message,
            }
        }
        Some("NoSuchKey" | "NoSuchBucket" | "NotFound") => StoreError::NotFound {
            key: format!("s3://{}/{}", bucket, key),
        },
        _ if lower.contains("access denied") || lower.contains("forbidden") => {
            StoreError::AccessDenied {
                bucket: bucket.to_string(),
                message,
            }
        }
        _ => StoreError::Sdk(message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_by_code() {
        let err = classify("my-bucket", "a.txt", Some("AccessDenied"), "denied".into());
        assert!(matches!(err, StoreError::AccessDenied { ref bucket, .. } if bucket == "my-bucket"));

        let err = classify("my-bucket", "a.txt", Some("NoSuchBucket"), "missing".into());
        match err {
            StoreError::NotFound { key } => assert_eq!(key, "s3://my-bucket/a.txt"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_classify_by_message() {
        let err = classify("my-bucket", "a.txt", None, "HTTP 403 Forbidden".into());
        assert!(matches!(err, StoreError::AccessDenied { .. }));

        let err = classify("my-bucket", "a.txt", Some("SlowDown"), "please reduce rate".into());
        assert!(matches!(err, StoreError::Sdk(ref m) if m == "please reduce rate"));
    }
}

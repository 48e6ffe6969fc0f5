//! Run orchestration: authenticate, match, then upload files one at a time.
//!
//! The first failing file aborts the run. Files uploaded before it stay in the bucket.

use indicatif::ProgressBar;
use std::fmt;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::UploadSpec;
use crate::error::Result;
use crate::matcher;
use crate::s3::S3Store;
use crate::store::{Bucket, ObjectStore};
use crate::target::{FileEntry, normalize_prefix};
use crate::transfer::{UploadOutcome, UploadResult, transfer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Authenticated,
    Resolving,
    Uploading,
    Finished,
    Aborted,
}

impl RunState {
    fn advance(&mut self, next: RunState) {
        let from = *self;
        debug!(from = %from, to = %next, "run state");
        *self = next;
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Resources held for the duration of one run.
///
/// Dropping the context cancels any remote operation still in flight.
pub struct RunContext<B: Bucket> {
    bucket: B,
    cancel: CancellationToken,
}

impl<B: Bucket> RunContext<B> {
    pub fn open<S: ObjectStore<Bucket = B>>(store: S, bucket: &str) -> Self {
        Self {
            bucket: store.bucket(bucket),
            cancel: CancellationToken::new(),
        }
    }

    pub fn bucket(&self) -> &B {
        &self.bucket
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

impl<B: Bucket> Drop for RunContext<B> {
    fn drop(&mut self) {
        self.cancel.cancel();
        debug!(bucket = self.bucket.name(), "released store handle");
    }
}

/// What a finished run did
#[derive(Debug, Default)]
pub struct RunSummary {
    pub results: Vec<UploadResult>,
    pub skipped_dirs: usize,
    /// Matched paths that disappeared before they could be stat'ed
    pub skipped_missing: Vec<PathBuf>,
}

impl RunSummary {
    pub fn uploaded(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, UploadOutcome::Uploaded { .. }))
            .count()
    }

    pub fn planned(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == UploadOutcome::Planned)
            .count()
    }

    /// Local bytes read and remote bytes written
    pub fn bytes(&self) -> (u64, u64) {
        self.results
            .iter()
            .fold((0, 0), |(read, written), r| match r.outcome {
                UploadOutcome::Uploaded {
                    bytes_read,
                    bytes_written,
                } => (read + bytes_read, written + bytes_written),
                UploadOutcome::Planned => (read, written),
            })
    }
}

/// Authenticate against S3 and run the deploy.
pub async fn deploy(spec: &UploadSpec, progress: Option<&ProgressBar>) -> Result<RunSummary> {
    spec.validate()?;

    let mut state = RunState::Init;
    let store = match S3Store::connect(&spec.credentials).await {
        Ok(store) => store,
        Err(e) => {
            error!(bucket = %spec.bucket, error = %e, "Could not connect to the object store");
            state.advance(RunState::Aborted);
            return Err(e);
        }
    };
    state.advance(RunState::Authenticated);

    run(store, spec, progress).await
}

/// Run the deploy against an already authenticated store.
pub async fn run<S: ObjectStore>(
    store: S,
    spec: &UploadSpec,
    progress: Option<&ProgressBar>,
) -> Result<RunSummary> {
    let ctx = RunContext::open(store, &spec.bucket);
    let mut state = RunState::Authenticated;

    let result = execute(&ctx, spec, progress, &mut state).await;
    match &result {
        Ok(summary) => {
            state.advance(RunState::Finished);
            info!(
                bucket = %spec.bucket,
                uploaded = summary.uploaded(),
                planned = summary.planned(),
                skipped_dirs = summary.skipped_dirs,
                "Finished"
            );
        }
        Err(_) => state.advance(RunState::Aborted),
    }

    result
}

async fn execute<B: Bucket>(
    ctx: &RunContext<B>,
    spec: &UploadSpec,
    progress: Option<&ProgressBar>,
    state: &mut RunState,
) -> Result<RunSummary> {
    info!(bucket = ctx.bucket().name(), "Attempting to upload");

    state.advance(RunState::Resolving);
    let target_prefix = normalize_prefix(&spec.target);
    let matches = matcher::resolve(&spec.source, &spec.exclude).inspect_err(|e| {
        error!(error = %e, "Could not match files");
    })?;

    state.advance(RunState::Uploading);
    if let Some(pb) = progress {
        pb.set_length(matches.len() as u64);
    }

    let mut summary = RunSummary::default();
    for path in matches {
        if let Some(pb) = progress {
            pb.inc(1);
        }

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(name = %path.display(), error = %e, "Skipping path that can no longer be read");
                summary.skipped_missing.push(path);
                continue;
            }
        };

        if metadata.is_dir() {
            summary.skipped_dirs += 1;
            continue;
        }

        let entry = FileEntry::new(path, target_prefix, &spec.strip_prefix);
        if let Some(pb) = progress {
            pb.set_message(entry.target.clone());
        }

        let result = transfer(ctx.bucket(), &entry, spec, ctx.cancel_token())
            .await
            .inspect_err(|e| {
                error!(
                    name = %entry.path.display(),
                    bucket = ctx.bucket().name(),
                    target = %entry.target,
                    error = %e,
                    "Could not upload file"
                );
            })?;
        summary.results.push(result);
    }

    Ok(summary)
}

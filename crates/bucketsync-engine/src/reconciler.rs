//! Directory-to-bucket reconciliation engine
//!
//! The [`Reconciler`] makes a bucket mirror a local directory tree.
//!
//! ## Sync Flow
//!
//! 1. **Listing**: capture the full remote key set in one call
//! 2. **Walking**: depth-first walk of the local tree; each file claims its
//!    key from the ledger, then is compared (download + digest) or uploaded
//! 3. **Deleting**: one bulk delete of every key left unclaimed
//!
//! The claim step runs in the sequential planning phase, so it is atomic
//! and strictly precedes any delete decision even when file transfers run
//! on a bounded worker pool. The final delete fires only after the pool is
//! fully drained.
//!
//! ## Retry Logic
//!
//! Transient store failures are retried with exponential backoff: 1s, 2s,
//! 4s (max 3 retries by default). Anything else aborts the run; a partial
//! sync is safe because rerunning is idempotent.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use bucketsync_core::domain::{ObjectKey, SyncRoot};
use bucketsync_core::ports::{IObjectStore, StoreError};

use crate::digest;
use crate::ledger::KeyLedger;
use crate::SyncError;

// ============================================================================
// Options and reports
// ============================================================================

/// Tunables for a reconciliation run
#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
    /// Maximum file operations in flight; 1 reproduces the strictly
    /// sequential reference behavior
    pub concurrency: usize,
    /// Plan and compare, but perform no uploads or deletes
    pub dry_run: bool,
    /// Retries per remote call on transient store failures
    pub retry_attempts: u32,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            dry_run: false,
            retry_attempts: 3,
        }
    }
}

/// Summary of a completed synchronization run
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Files uploaded (new or changed)
    pub files_uploaded: u64,
    /// Files left alone because remote content already matched
    pub files_skipped: u64,
    /// Remote objects deleted because no local file claimed them
    pub objects_deleted: u64,
    /// Wall-clock duration of the run in milliseconds
    pub duration_ms: u64,
}

/// A single mismatch discovered during verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    /// A local file has no remote object
    MissingRemotely {
        /// The absent key
        key: ObjectKey,
    },
    /// A local file and its remote object hold different bytes
    ContentMismatch {
        /// The diverging key
        key: ObjectKey,
    },
    /// The bucket holds a different number of objects than the directory
    /// holds files; catches orphan objects the per-file check cannot see
    ObjectCountMismatch {
        /// Objects counted remotely
        remote_objects: u64,
        /// Regular files counted locally
        local_files: u64,
    },
}

impl Display for Finding {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRemotely { key } => {
                write!(f, "missing on the bucket: {key}")
            }
            Self::ContentMismatch { key } => {
                write!(f, "content differs on the bucket: {key}")
            }
            Self::ObjectCountMismatch {
                remote_objects,
                local_files,
            } => write!(
                f,
                "bucket holds {remote_objects} object(s) but the directory holds {local_files} file(s)"
            ),
        }
    }
}

/// Outcome of a read-only verification pass
#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    /// Every mismatch found; empty means fully synchronized
    pub findings: Vec<Finding>,
    /// Regular files counted locally
    pub local_files: u64,
    /// Objects counted remotely
    pub remote_objects: u64,
}

impl VerifyReport {
    /// Whether the bucket exactly mirrors the directory.
    #[must_use]
    pub fn is_synchronized(&self) -> bool {
        self.findings.is_empty()
    }
}

// ============================================================================
// Planning
// ============================================================================

/// A local file scheduled for processing
#[derive(Debug)]
struct PlannedFile {
    path: PathBuf,
    key: ObjectKey,
    /// Whether the key was claimed from the remote set (object already
    /// exists, content must be compared)
    claimed: bool,
}

/// What happened to one planned file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOutcome {
    Uploaded,
    Skipped,
}

/// Recursively collects every regular file under `dir`.
///
/// Directory entries are visited in iteration order; symlinks are followed
/// the way `metadata` resolves them, so a link to a file counts as a file.
fn collect_files<'a>(
    dir: &'a Path,
    out: &'a mut Vec<PathBuf>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), SyncError>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = tokio::fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let metadata = tokio::fs::metadata(&path).await?;

            if metadata.is_dir() {
                collect_files(&path, out).await?;
            } else if metadata.is_file() {
                out.push(path);
            }
        }

        Ok(())
    })
}

/// Maps every collected file to its object key, failing fast when two
/// files contest one key instead of letting the last write win.
fn index_by_key(
    root: &SyncRoot,
    paths: Vec<PathBuf>,
) -> Result<BTreeMap<ObjectKey, PathBuf>, SyncError> {
    let mut by_key: BTreeMap<ObjectKey, PathBuf> = BTreeMap::new();

    for path in paths {
        let key = root.key_for(&path)?;
        if let Some(first) = by_key.get(&key) {
            return Err(SyncError::DuplicateKey {
                key,
                first: first.clone(),
                second: path,
            });
        }
        by_key.insert(key, path);
    }

    Ok(by_key)
}

// ============================================================================
// Reconciler
// ============================================================================

/// Base delay for exponential backoff (1 second)
const RETRY_BASE_DELAY_SECS: u64 = 1;

/// One-way synchronization engine
///
/// Drives the bucket toward the state of the local directory: uploads new
/// and changed files, keeps unchanged ones, deletes remote objects no
/// local file maps to.
///
/// ## Dependencies
///
/// - `store`: remote bucket operations behind the [`IObjectStore`] port
/// - `sync_root`: the local directory being mirrored, fixed for the run
pub struct Reconciler {
    store: Arc<dyn IObjectStore>,
    sync_root: SyncRoot,
    options: ReconcilerOptions,
    /// Remote key set captured at initialization; consumed by the first
    /// `synchronize` call, re-listed on subsequent runs.
    ledger: Option<KeyLedger>,
    cancel: CancellationToken,
}

impl Reconciler {
    /// Creates a `Reconciler` and captures the initial remote key set.
    ///
    /// # Arguments
    /// * `sync_root` - Local directory to mirror (must exist)
    /// * `store` - Object store adapter for the target bucket
    /// * `options` - Concurrency, dry-run, and retry tunables
    ///
    /// # Errors
    /// `SyncError::PathNotFound`/`SyncError::NotADirectory` if the root is
    /// unusable; `SyncError::Store` if the initial listing fails.
    pub async fn initialize(
        sync_root: SyncRoot,
        store: Arc<dyn IObjectStore>,
        options: ReconcilerOptions,
    ) -> Result<Self, SyncError> {
        let metadata = match tokio::fs::metadata(sync_root.as_path()).await {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(SyncError::PathNotFound(sync_root.as_path().to_path_buf()));
            }
            Err(err) => return Err(err.into()),
        };
        if !metadata.is_dir() {
            return Err(SyncError::NotADirectory(sync_root.as_path().to_path_buf()));
        }

        let mut reconciler = Self {
            store,
            sync_root,
            options,
            ledger: None,
            cancel: CancellationToken::new(),
        };

        let initial = reconciler.list_remote_keys().await?;
        debug!(
            remote_objects = initial.len(),
            "captured initial remote key set"
        );
        reconciler.ledger = Some(KeyLedger::new(initial));

        Ok(reconciler)
    }

    /// Token for cancelling this run from another task.
    ///
    /// Cancellation is cooperative: it is observed before each remote call,
    /// and partial progress is left as-is (rerunning is idempotent).
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    // ========================================================================
    // synchronize()
    // ========================================================================

    /// Performs one full synchronization run.
    ///
    /// 1. Takes the remote key set (from initialization, or a fresh listing
    ///    on reruns)
    /// 2. Walks the local tree, claiming keys and uploading new/changed files
    /// 3. Bulk-deletes every key left unclaimed
    ///
    /// # Returns
    /// A [`SyncReport`] summarizing uploads, skips, and deletions
    ///
    /// # Errors
    /// Aborts on the first store or I/O failure; partial progress remains
    /// on the bucket and is reconciled by the next run.
    #[tracing::instrument(skip(self), fields(sync_root = %self.sync_root))]
    pub async fn synchronize(&mut self) -> Result<SyncReport, SyncError> {
        let start = Instant::now();

        let taken = self.ledger.take();
        // Shared reborrow: the worker pool hands out one future per file,
        // each borrowing the reconciler immutably.
        let this = &*self;

        let mut ledger = match taken {
            Some(ledger) => ledger,
            None => KeyLedger::new(this.list_remote_keys().await?),
        };

        info!(
            remote_objects = ledger.len(),
            dry_run = this.options.dry_run,
            "starting synchronization"
        );

        let planned = this.plan(&mut ledger).await?;
        let total_files = planned.len();

        let concurrency = this.options.concurrency.max(1);
        let outcomes: Vec<FileOutcome> = stream::iter(planned)
            .map(|entry| this.sync_file(entry))
            .buffer_unordered(concurrency)
            .try_collect()
            .await?;

        let mut report = SyncReport::default();
        for outcome in outcomes {
            match outcome {
                FileOutcome::Uploaded => report.files_uploaded += 1,
                FileOutcome::Skipped => report.files_skipped += 1,
            }
        }

        // Every key still unclaimed belongs to no local file.
        let pending = ledger.into_pending();
        for key in &pending {
            if this.options.dry_run {
                info!(key = %key, "dry run: would remove remote object");
            } else {
                info!(key = %key, "removing remote object with no local counterpart");
            }
        }
        if !pending.is_empty() && !this.options.dry_run {
            this.remote_call("delete_many", || {
                let keys = pending.clone();
                async move { this.store.delete_many(&keys).await }
            })
            .await?;
        }
        report.objects_deleted = pending.len() as u64;
        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            files = total_files,
            uploaded = report.files_uploaded,
            skipped = report.files_skipped,
            deleted = report.objects_deleted,
            duration_ms = report.duration_ms,
            "synchronization complete"
        );

        Ok(report)
    }

    /// Walks the tree and claims keys, sequentially.
    ///
    /// Claims happening here, before any transfer starts, is what makes the
    /// claim/delete ordering trivially safe under concurrency.
    async fn plan(&self, ledger: &mut KeyLedger) -> Result<Vec<PlannedFile>, SyncError> {
        let mut paths = Vec::new();
        collect_files(self.sync_root.as_path(), &mut paths).await?;

        let indexed = index_by_key(&self.sync_root, paths)?;

        let mut planned = Vec::with_capacity(indexed.len());
        for (key, path) in indexed {
            let claimed = ledger.claim(&key);
            planned.push(PlannedFile { path, key, claimed });
        }

        debug!(files = planned.len(), "local walk complete");
        Ok(planned)
    }

    /// Processes one planned file: compare-then-upload for claimed keys,
    /// unconditional upload for new ones.
    async fn sync_file(&self, entry: PlannedFile) -> Result<FileOutcome, SyncError> {
        if entry.claimed {
            // Stage the remote object in a scratch file and compare digests.
            // One scratch per in-flight comparison; removed on drop.
            let scratch = tempfile::NamedTempFile::new()?;
            let scratch_path = scratch.path().to_path_buf();

            self.remote_call("download", || {
                let key = entry.key.clone();
                let target = scratch_path.clone();
                async move { self.store.download(&key, &target).await }
            })
            .await?;

            let remote_digest = digest::digest_file(&scratch_path).await?;
            let local_digest = digest::digest_file(&entry.path).await?;

            if remote_digest == local_digest {
                debug!(key = %entry.key, "content unchanged, keeping remote object");
                return Ok(FileOutcome::Skipped);
            }

            if self.options.dry_run {
                info!(key = %entry.key, "dry run: would upload changed file");
            } else {
                info!(key = %entry.key, path = %entry.path.display(), "uploading changed file");
                self.upload_file(&entry).await?;
            }
            Ok(FileOutcome::Uploaded)
        } else {
            if self.options.dry_run {
                info!(key = %entry.key, "dry run: would upload new file");
            } else {
                info!(key = %entry.key, path = %entry.path.display(), "uploading new file");
                self.upload_file(&entry).await?;
            }
            Ok(FileOutcome::Uploaded)
        }
    }

    async fn upload_file(&self, entry: &PlannedFile) -> Result<(), SyncError> {
        self.remote_call("upload", || {
            let key = entry.key.clone();
            let path = entry.path.clone();
            async move { self.store.upload(&path, &key).await }
        })
        .await
    }

    // ========================================================================
    // verify()
    // ========================================================================

    /// Read-only verification that the bucket mirrors the directory.
    ///
    /// Re-lists remote keys and re-walks the tree. Every local file must be
    /// present remotely with matching content; findings accumulate instead
    /// of aborting the scan, so one pass yields the full report. A final
    /// count comparison catches orphan remote objects.
    ///
    /// Mutates nothing but scratch files.
    ///
    /// # Errors
    /// `SyncError::Store` on listing/download infrastructure failures;
    /// mismatches are findings, not errors.
    #[tracing::instrument(skip(self), fields(sync_root = %self.sync_root))]
    pub async fn verify(&self) -> Result<VerifyReport, SyncError> {
        info!("starting verification");

        let remote_keys = self.list_remote_keys().await?;

        let mut paths = Vec::new();
        collect_files(self.sync_root.as_path(), &mut paths).await?;
        let indexed = index_by_key(&self.sync_root, paths)?;

        let mut report = VerifyReport {
            findings: Vec::new(),
            local_files: indexed.len() as u64,
            remote_objects: remote_keys.len() as u64,
        };

        for (key, path) in &indexed {
            if !remote_keys.contains(key) {
                warn!(key = %key, "file is missing on the bucket");
                report.findings.push(Finding::MissingRemotely { key: key.clone() });
                continue;
            }

            let scratch = tempfile::NamedTempFile::new()?;
            let scratch_path = scratch.path().to_path_buf();

            let downloaded = self
                .remote_call("download", || {
                    let key = key.clone();
                    let target = scratch_path.clone();
                    async move { self.store.download(&key, &target).await }
                })
                .await;

            match downloaded {
                Ok(()) => {
                    let remote_digest = digest::digest_file(&scratch_path).await?;
                    let local_digest = digest::digest_file(path).await?;
                    if remote_digest != local_digest {
                        warn!(key = %key, "file content differs on the bucket");
                        report
                            .findings
                            .push(Finding::ContentMismatch { key: key.clone() });
                    }
                }
                // Listed a moment ago but gone now; a finding, not an abort.
                Err(SyncError::Store(StoreError::NotFound(_))) => {
                    warn!(key = %key, "file is missing on the bucket");
                    report.findings.push(Finding::MissingRemotely { key: key.clone() });
                }
                Err(err) => return Err(err),
            }
        }

        if report.remote_objects != report.local_files {
            warn!(
                remote_objects = report.remote_objects,
                local_files = report.local_files,
                "bucket object count does not match local file count"
            );
            report.findings.push(Finding::ObjectCountMismatch {
                remote_objects: report.remote_objects,
                local_files: report.local_files,
            });
        }

        if report.is_synchronized() {
            info!(
                files = report.local_files,
                "directory is synchronized"
            );
        } else {
            info!(
                findings = report.findings.len(),
                "directory is not synchronized"
            );
        }

        Ok(report)
    }

    // ========================================================================
    // Remote call plumbing
    // ========================================================================

    async fn list_remote_keys(
        &self,
    ) -> Result<std::collections::BTreeSet<ObjectKey>, SyncError> {
        self.remote_call("list_all_keys", || async move {
            self.store.list_all_keys().await
        })
        .await
    }

    /// Executes a store operation with cancellation checks and exponential
    /// backoff on transient failures.
    ///
    /// Only `StoreError::Unavailable` is considered transient; everything
    /// else (absent objects, local I/O, partial deletes) returns immediately.
    async fn remote_call<T, F, Fut>(&self, operation: &'static str, f: F) -> Result<T, SyncError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, StoreError>>,
    {
        let mut last_error: Option<StoreError> = None;

        for attempt in 0..=self.options.retry_attempts {
            if self.cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            match f().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(operation, attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err @ StoreError::Unavailable(_))
                    if attempt < self.options.retry_attempts =>
                {
                    let delay_secs = RETRY_BASE_DELAY_SECS << attempt;
                    warn!(
                        operation,
                        attempt,
                        delay_secs,
                        error = %err,
                        "transient store error, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                    last_error = Some(err);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(SyncError::Store(last_error.unwrap_or_else(|| {
            StoreError::Unavailable(format!("retry budget exhausted for {operation}"))
        })))
    }
}

// ============================================================================
// Tests
// ============================================================================

//! S3 object store adapter (secondary/driven adapter)
//!
//! Implements [`IObjectStore`] with the AWS SDK against any S3-compatible
//! endpoint. The client is built from an explicit [`RemoteConfig`] — one
//! instance per run, never a process-wide singleton — and opening a store
//! creates the bucket when it does not exist yet.
//!
//! ## Design Decisions
//!
//! - **Path-style addressing**: self-hosted endpoints (MinIO) resolve
//!   buckets by path, not by virtual host; the flag comes from config.
//! - **Paginated listing**: `list_objects_v2` caps pages at 1000 keys, so
//!   the full listing follows continuation tokens.
//! - **Batched deletes**: `delete_objects` accepts at most 1000 keys per
//!   call; larger sets are chunked and per-key failures from every chunk
//!   are collected instead of being dropped.

use std::collections::BTreeSet;
use std::path::Path;

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use tracing::{debug, info, instrument, warn};

use bucketsync_core::config::RemoteConfig;
use bucketsync_core::domain::ObjectKey;
use bucketsync_core::ports::{DeleteFailure, IObjectStore, StoreError};

/// Maximum number of keys per `delete_objects` request.
const DELETE_BATCH_SIZE: usize = 1000;

/// Signing region used when none is configured. Custom endpoints accept
/// any region string.
const DEFAULT_REGION: &str = "us-east-1";

/// Adapter that bridges the [`IObjectStore`] port to an S3-compatible bucket.
pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    /// Open a store for `bucket`, creating the bucket if it is absent.
    ///
    /// # Errors
    /// Returns `StoreError::Unavailable` if the endpoint cannot be reached
    /// or the bucket cannot be created.
    pub async fn open(remote: &RemoteConfig, bucket: &str) -> Result<Self, StoreError> {
        let client = build_client(remote).await;
        ensure_bucket(&client, bucket).await?;
        Ok(Self {
            client,
            bucket: bucket.to_string(),
        })
    }

    /// The bucket this store operates on.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// Build an S3 client from explicit remote configuration.
///
/// Credentials and endpoint come from the config (already overlaid with
/// environment variables by the caller); anything unset falls back to the
/// ambient AWS credential chain.
async fn build_client(remote: &RemoteConfig) -> Client {
    let region = Region::new(
        remote
            .region
            .clone()
            .unwrap_or_else(|| DEFAULT_REGION.to_string()),
    );

    let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region);

    if let (Some(id), Some(secret)) = (&remote.access_key_id, &remote.secret_access_key) {
        loader = loader.credentials_provider(Credentials::new(
            id.clone(),
            secret.clone(),
            None,
            None,
            "bucketsync-config",
        ));
    }

    let shared = loader.load().await;

    let mut builder = aws_sdk_s3::config::Builder::from(&shared);
    if let Some(endpoint) = &remote.endpoint_url {
        builder = builder.endpoint_url(endpoint);
    }
    builder = builder.force_path_style(remote.force_path_style);

    Client::from_conf(builder.build())
}

/// Create the bucket when it does not exist yet.
async fn ensure_bucket(client: &Client, bucket: &str) -> Result<(), StoreError> {
    match client.head_bucket().bucket(bucket).send().await {
        Ok(_) => {
            debug!(bucket, "bucket exists");
            Ok(())
        }
        Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => {
            info!(bucket, "bucket not found, creating");
            client
                .create_bucket()
                .bucket(bucket)
                .send()
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            Ok(())
        }
        Err(err) => Err(StoreError::Unavailable(err.to_string())),
    }
}

/// Convert per-key errors from a `delete_objects` response.
fn delete_failures_from(errors: &[aws_sdk_s3::types::Error]) -> Vec<DeleteFailure> {
    errors
        .iter()
        .map(|e| DeleteFailure {
            key: e.key().unwrap_or_default().to_string(),
            message: e
                .message()
                .or_else(|| e.code())
                .unwrap_or("unknown error")
                .to_string(),
        })
        .collect()
}

#[async_trait::async_trait]
impl IObjectStore for S3ObjectStore {
    #[instrument(skip(self), fields(bucket = %self.bucket))]
    async fn list_all_keys(&self) -> Result<BTreeSet<ObjectKey>, StoreError> {
        let mut keys = BTreeSet::new();
        let mut continuation: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(&self.bucket);
            if let Some(token) = &continuation {
                request = request.continuation_token(token);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;

            for object in response.contents() {
                let Some(raw) = object.key() else { continue };
                match ObjectKey::new(raw.to_string()) {
                    Ok(key) => {
                        keys.insert(key);
                    }
                    Err(err) => {
                        // A foreign object that does not follow the key
                        // convention cannot correspond to a local file.
                        warn!(key = raw, %err, "skipping unparseable remote key");
                    }
                }
            }

            if response.is_truncated() == Some(true) {
                continuation = response.next_continuation_token().map(String::from);
                if continuation.is_none() {
                    break;
                }
            } else {
                break;
            }
        }

        debug!(count = keys.len(), "listed remote keys");
        Ok(keys)
    }

    #[instrument(skip(self), fields(bucket = %self.bucket, key = %key))]
    async fn upload(&self, local_path: &Path, key: &ObjectKey) -> Result<(), StoreError> {
        let body = ByteStream::from_path(local_path).await.map_err(|e| {
            StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, e))
        })?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .body(body)
            .send()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        debug!("upload complete");
        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket, key = %key))]
    async fn download(&self, key: &ObjectKey, local_path: &Path) -> Result<(), StoreError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    StoreError::NotFound(key.clone())
                } else {
                    StoreError::Unavailable(err.to_string())
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            .into_bytes();

        if let Some(parent) = local_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(local_path, &data).await?;

        debug!(bytes = data.len(), "download complete");
        Ok(())
    }

    #[instrument(skip(self, keys), fields(bucket = %self.bucket, count = keys.len()))]
    async fn delete_many(&self, keys: &BTreeSet<ObjectKey>) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }

        let ordered: Vec<&ObjectKey> = keys.iter().collect();
        let mut failures = Vec::new();

        for chunk in ordered.chunks(DELETE_BATCH_SIZE) {
            let mut identifiers = Vec::with_capacity(chunk.len());
            for key in chunk {
                let identifier = ObjectIdentifier::builder()
                    .key(key.as_str())
                    .build()
                    .map_err(|e| StoreError::Unavailable(e.to_string()))?;
                identifiers.push(identifier);
            }

            let delete = Delete::builder()
                .set_objects(Some(identifiers))
                .build()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;

            let response = self
                .client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;

            failures.extend(delete_failures_from(response.errors()));
        }

        if failures.is_empty() {
            debug!("bulk delete complete");
            Ok(())
        } else {
            Err(StoreError::PartialDelete(failures))
        }
    }
}

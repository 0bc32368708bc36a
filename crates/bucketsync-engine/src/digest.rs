//! Streaming content digest helper
//!
//! Computes the 128-bit digest used to decide whether a local file and its
//! remote counterpart hold the same bytes. Files are streamed in fixed-size
//! chunks so memory use stays bounded regardless of file size.

use std::path::Path;

use md5::{Digest, Md5};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use bucketsync_core::domain::ContentDigest;

/// Bytes read per chunk while digesting. Tunable; affects only memory use,
/// never the resulting digest.
pub const DIGEST_CHUNK_SIZE: usize = 8192;

/// Compute the content digest of a file.
///
/// Pure with respect to shared state; safe to call concurrently on
/// distinct files.
///
/// # Errors
/// Returns the underlying I/O error if the file cannot be read.
pub async fn digest_file(path: &Path) -> std::io::Result<ContentDigest> {
    let mut file = File::open(path).await?;
    let mut hasher = Md5::new();
    let mut buffer = vec![0u8; DIGEST_CHUNK_SIZE];

    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    let bytes: [u8; ContentDigest::WIDTH_BYTES] = hasher.finalize().into();
    Ok(ContentDigest::from_bytes(bytes))
}

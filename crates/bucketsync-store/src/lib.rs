//! bucketsync Store - S3-compatible object store adapter
//!
//! Implements the [`IObjectStore`] port against any S3-compatible endpoint
//! (AWS S3, MinIO, Cloudflare R2) using the AWS SDK.
//!
//! ## Modules
//!
//! - [`s3`] - Client construction from [`RemoteConfig`] and the
//!   [`S3ObjectStore`] adapter
//!
//! [`IObjectStore`]: bucketsync_core::ports::IObjectStore
//! [`RemoteConfig`]: bucketsync_core::config::RemoteConfig

pub mod s3;

pub use s3::S3ObjectStore;

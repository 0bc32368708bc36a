//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the reconciliation
//! engine depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IObjectStore`] - Remote bucket operations (list, upload, download,
//!   bulk delete)

pub mod object_store;

pub use object_store::{DeleteFailure, IObjectStore, StoreError};

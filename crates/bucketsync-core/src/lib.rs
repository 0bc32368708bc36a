//! bucketsync Core - Domain types and port contracts
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain newtypes** - `SyncRoot`, `ObjectKey`, `ContentDigest`
//! - **Port definitions** - The `IObjectStore` trait that adapter crates implement
//! - **Configuration** - Remote endpoint/credential settings and sync tunables
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure types with no I/O; the ports module defines
//! the object-store contract the reconciliation engine depends on. The only
//! production adapter lives in `bucketsync-store`.

pub mod config;
pub mod domain;
pub mod ports;

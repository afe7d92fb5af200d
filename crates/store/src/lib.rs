//! Badgeboard Storage Layer
//!
//! This crate defines the storage ports of the sync pipeline and provides the
//! in-memory implementation used by the worker and the tests:
//!
//! - **catalog**: read-only badge catalog lookup
//! - **record**: the student record store port, including the atomic merge
//!   contract shared with the append-only progress log
//! - **memory**: keyed-map implementation with structural uniqueness
//!
//! Persistence technology is an open seam: the worker only ever talks to the
//! [`RecordStore`] and [`BadgeCatalog`] traits.

pub mod catalog;
pub mod memory;
pub mod record;

pub use catalog::{BadgeCatalog, StaticCatalog};
pub use memory::MemoryRecordStore;
pub use record::{MergeReceipt, RecordStore};

//! Core manifest data structures for siteport
//!
//! The manifest is the single source of truth for a migration's per-item
//! progress and for the mapping between source and destination identities.
//! It is saved after each run and seeds the next one, which is how partial
//! runs resume without redoing finished work.
//!
//! # Key Concepts
//!
//! - **ContentReference**: id + hierarchical location + optional URL slug
//! - **ManifestEntry**: one source item's mapped location, destination and status
//! - **ManifestEntryPartition**: all entries of one content type, indexed four ways
//! - **Manifest**: the partition table plus run-level errors
//!
//! # Example
//!
//! ```no_run
//! use siteport_core_manifest::{ContentReference, ContentType, Manifest};
//! use uuid::Uuid;
//!
//! let manifest = Manifest::new(Uuid::new_v4());
//! let users = manifest.partition(&ContentType::new("user"));
//! let alice = ContentReference::new(Uuid::new_v4(), "alice".parse().unwrap());
//! users.get_or_add(&alice);
//! manifest.save("manifest.json").unwrap();
//! ```

pub mod entry;
pub mod error;
pub mod manifest;
pub mod partition;
pub mod reference;
pub mod validate;

// Re-export main types for convenience
pub use entry::{ManifestEntry, MigrationStatus};
pub use error::{Error, Result};
pub use manifest::{Manifest, ManifestDocument};
pub use partition::{ManifestEntryPartition, PartitionStats};
pub use reference::{ContentLocation, ContentReference, ContentType, LOCATION_SEPARATOR};
pub use validate::{validate_manifest_document, validate_manifest_file, validate_manifest_value};

/// Schema version for persisted manifests
pub const MANIFEST_SCHEMA_VERSION: &str = "siteport.manifest.v1";

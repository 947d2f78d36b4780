//! Per-content-type migration drivers
//!
//! [`ContentMigrator`] enumerates the source listing, records every item in
//! the manifest and splits the pending ones into batches. [`BatchMigrator`]
//! takes one batch through filter, mapping, prepare, publish and
//! post-publish, recording each outcome on the item's manifest entry.

mod batch;
mod content;
mod item;

pub use batch::{BatchMigrationResult, BatchMigrator};
pub use content::{ContentMigrationResult, ContentMigrator};
pub use item::{
    ContentItemPostPublishContext, ContentItemPrePublishContext, ContentMappingContext,
    ContentMigrationItem, ItemMigrationResult,
};

//! Values threaded through the per-item extension chains

use siteport_core_manifest::{ContentLocation, ContentReference, ManifestEntry, MigrationStatus};

/// A listed source item with its manifest entry, as filters see it
#[derive(Debug, Clone)]
pub struct ContentMigrationItem<T> {
    pub item: T,
    pub entry: ManifestEntry,
}

impl<T> ContentMigrationItem<T> {
    pub fn new(item: T, entry: ManifestEntry) -> Self {
        Self { item, entry }
    }
}

/// Mapping input and output: the item and where it should land
#[derive(Debug, Clone)]
pub struct ContentMappingContext<T> {
    pub item: T,
    pub mapped_location: ContentLocation,
}

impl<T> ContentMappingContext<T> {
    pub fn new(item: T, mapped_location: ContentLocation) -> Self {
        Self {
            item,
            mapped_location,
        }
    }

    /// Same item, different destination location
    pub fn map_to(&self, location: ContentLocation) -> Self
    where
        T: Clone,
    {
        Self::new(self.item.clone(), location)
    }
}

#[derive(Debug, Clone)]
pub struct ContentItemPrePublishContext<T> {
    pub entry: ManifestEntry,
    /// Prepared item about to be published
    pub item: T,
}

impl<T> ContentItemPrePublishContext<T> {
    pub fn new(entry: ManifestEntry, item: T) -> Self {
        Self { entry, item }
    }
}

#[derive(Debug, Clone)]
pub struct ContentItemPostPublishContext<T> {
    pub entry: ManifestEntry,
    /// Item as listed on the source
    pub source: T,
    /// Item as the destination stored it
    pub published: T,
}

impl<T> ContentItemPostPublishContext<T> {
    pub fn new(entry: ManifestEntry, source: T, published: T) -> Self {
        Self {
            entry,
            source,
            published,
        }
    }
}

/// Outcome of one item in a batch
#[derive(Debug, Clone)]
pub struct ItemMigrationResult<T> {
    pub source: ContentReference,
    pub status: MigrationStatus,
    /// Published item, for Migrated results
    pub published: Option<T>,
    pub errors: Vec<String>,
}

impl<T> ItemMigrationResult<T> {
    pub fn migrated(source: ContentReference, published: T) -> Self {
        Self {
            source,
            status: MigrationStatus::Migrated,
            published: Some(published),
            errors: Vec::new(),
        }
    }

    pub fn skipped(source: ContentReference) -> Self {
        Self::without_item(source, MigrationStatus::Skipped, Vec::new())
    }

    pub fn failed(source: ContentReference, errors: Vec<String>) -> Self {
        Self::without_item(source, MigrationStatus::Failed, errors)
    }

    pub fn canceled(source: ContentReference) -> Self {
        Self::without_item(source, MigrationStatus::Canceled, Vec::new())
    }

    fn without_item(source: ContentReference, status: MigrationStatus, errors: Vec<String>) -> Self {
        Self {
            source,
            status,
            published: None,
            errors,
        }
    }
}

/*!
 * Manifest-first reference resolution
 */

use crate::cache::ReferenceCache;
use crate::error::Result;
use siteport_core_manifest::{ContentReference, ContentType, ManifestEntry, ManifestEntryPartition};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

/// Translates identities of one content type between source and destination
///
/// The manifest is always asked first. The destination cache is only
/// consulted for entries whose destination is not yet known, and a hit there
/// is written back to the manifest.
#[derive(Clone)]
pub struct ManifestReferenceResolver {
    partition: Arc<ManifestEntryPartition>,
    source_cache: Arc<dyn ReferenceCache>,
    destination_cache: Arc<dyn ReferenceCache>,
}

impl ManifestReferenceResolver {
    pub fn new(
        partition: Arc<ManifestEntryPartition>,
        source_cache: Arc<dyn ReferenceCache>,
        destination_cache: Arc<dyn ReferenceCache>,
    ) -> Self {
        Self {
            partition,
            source_cache,
            destination_cache,
        }
    }

    pub fn content_type(&self) -> &ContentType {
        self.partition.content_type()
    }

    fn entry_for(&self, source: &ContentReference) -> Option<ManifestEntry> {
        self.partition
            .by_source_id(&source.id)
            .or_else(|| self.partition.by_source_location(&source.location))
    }

    /// Destination equivalent of a source reference, if one exists
    pub async fn find_destination(
        &self,
        source: &ContentReference,
        cancel: &CancellationToken,
    ) -> Result<Option<ContentReference>> {
        let Some(entry) = self.entry_for(source) else {
            debug!(content_type = %self.content_type(), source = %source.location, "No manifest entry for reference");
            return Ok(None);
        };
        if let Some(destination) = entry.destination() {
            return Ok(Some(destination.clone()));
        }

        let found = self
            .destination_cache
            .for_location(entry.mapped_location(), cancel)
            .await?;
        if let Some(destination) = &found {
            self.partition
                .destination_found(entry.source().id, destination.clone())?;
        }
        Ok(found)
    }

    /// Source item a destination id was migrated from
    pub fn find_source_for_destination(&self, destination_id: &Uuid) -> Option<ContentReference> {
        self.partition
            .by_destination_id(destination_id)
            .map(|e| e.source().clone())
    }

    /// Current source reference for a possibly stale source reference
    ///
    /// Falls back to the source listing by id, then by location.
    pub async fn find_source(
        &self,
        source: &ContentReference,
        cancel: &CancellationToken,
    ) -> Result<Option<ContentReference>> {
        if let Some(entry) = self.entry_for(source) {
            return Ok(Some(entry.source().clone()));
        }
        if let Some(found) = self.source_cache.for_id(&source.id, cancel).await? {
            return Ok(Some(found));
        }
        self.source_cache.for_location(&source.location, cancel).await
    }
}

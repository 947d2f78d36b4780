//! One batch of one content type through the item pipeline

use super::item::{
    ContentItemPostPublishContext, ContentItemPrePublishContext, ContentMappingContext,
    ContentMigrationItem, ItemMigrationResult,
};
use crate::content::ContentItem;
use crate::context::MigrationContext;
use crate::error::{MigrationError, Result};
use crate::extensions::{
    BatchCompletedKind, FilterKind, MappingKind, PostPublishKind, PrePublishKind, TransformerKind,
};
use futures::stream::{self, StreamExt};
use siteport_core_manifest::{ContentType, ManifestEntry, ManifestEntryPartition, MigrationStatus};
use std::collections::HashSet;
use std::marker::PhantomData;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Outcome of one batch, handed to batch-completed hooks
#[derive(Debug, Clone)]
pub struct BatchMigrationResult<T> {
    pub content_type: ContentType,
    pub batch_number: usize,
    pub items: Vec<ItemMigrationResult<T>>,
}

impl<T> BatchMigrationResult<T> {
    pub fn count(&self, status: MigrationStatus) -> usize {
        self.items.iter().filter(|i| i.status == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(MigrationStatus::Failed) > 0
    }
}

pub struct BatchMigrator<T> {
    _content: PhantomData<fn() -> T>,
}

impl<T: ContentItem> Default for BatchMigrator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ContentItem> BatchMigrator<T> {
    pub fn new() -> Self {
        Self {
            _content: PhantomData,
        }
    }

    /// Migrate one batch
    ///
    /// Item failures are recorded on their entries and never fail the batch.
    /// An error from the filter or batch-completed chain aborts the batch and
    /// is returned.
    pub async fn migrate_batch(
        &self,
        ctx: &MigrationContext,
        batch_number: usize,
        items: Vec<ContentMigrationItem<T>>,
    ) -> Result<BatchMigrationResult<T>> {
        let partition = ctx.manifest().partition(&T::CONTENT_TYPE);
        let candidates: Vec<_> = items.iter().map(|i| i.item.reference().clone()).collect();
        debug!(content_type = %T::CONTENT_TYPE, batch = batch_number, items = candidates.len(), "Starting batch");

        let kept = match ctx.run_extensions::<FilterKind<T>>(items).await {
            Ok(kept) => kept,
            Err(MigrationError::Canceled) => Vec::new(),
            Err(e) => return Err(e),
        };
        let mut results = Vec::with_capacity(candidates.len());

        if ctx.is_cancelled() {
            for source in candidates {
                mark(&partition, source.id, MigrationStatus::Canceled);
                results.push(ItemMigrationResult::canceled(source));
            }
            return Ok(self.finish(batch_number, results));
        }

        let candidate_ids: HashSet<Uuid> = candidates.iter().map(|r| r.id).collect();
        let mut kept_ids = HashSet::new();
        let kept: Vec<_> = kept
            .into_iter()
            .filter(|i| candidate_ids.contains(&i.item.id()) && kept_ids.insert(i.item.id()))
            .collect();

        for source in candidates.into_iter().filter(|r| !kept_ids.contains(&r.id)) {
            mark(&partition, source.id, MigrationStatus::Skipped);
            results.push(ItemMigrationResult::skipped(source));
        }

        let concurrency = ctx.config().batch_concurrency.max(1);
        let migrated: Vec<ItemMigrationResult<T>> = stream::iter(kept)
            .map(|item| self.migrate_item(ctx, &partition, item))
            .buffer_unordered(concurrency)
            .collect()
            .await;
        results.extend(migrated);

        let result = self.finish(batch_number, results);
        info!(
            content_type = %T::CONTENT_TYPE,
            batch = batch_number,
            migrated = result.count(MigrationStatus::Migrated),
            skipped = result.count(MigrationStatus::Skipped),
            failed = result.count(MigrationStatus::Failed),
            canceled = result.count(MigrationStatus::Canceled),
            "Batch complete"
        );

        if ctx.is_cancelled() {
            return Ok(result);
        }
        ctx.run_extensions::<BatchCompletedKind<T>>(result).await
    }

    fn finish(&self, batch_number: usize, items: Vec<ItemMigrationResult<T>>) -> BatchMigrationResult<T> {
        BatchMigrationResult {
            content_type: T::CONTENT_TYPE,
            batch_number,
            items,
        }
    }

    async fn migrate_item(
        &self,
        ctx: &MigrationContext,
        partition: &ManifestEntryPartition,
        item: ContentMigrationItem<T>,
    ) -> ItemMigrationResult<T> {
        let source = item.item.reference().clone();
        match self.try_migrate(ctx, partition, &item).await {
            Ok(published) => ItemMigrationResult::migrated(source, published),
            Err(e) if e.is_canceled() || ctx.is_cancelled() => {
                mark(partition, source.id, MigrationStatus::Canceled);
                ItemMigrationResult::canceled(source)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(
                    content_type = %T::CONTENT_TYPE,
                    source = %source.location,
                    category = %e.category(),
                    error = %message,
                    "Item migration failed"
                );
                if let Err(err) = partition.mark_failed(source.id, vec![message.clone()]) {
                    warn!(source = %source.location, error = %err, "Could not record item failure");
                }
                ItemMigrationResult::failed(source, vec![message])
            }
        }
    }

    async fn try_migrate(
        &self,
        ctx: &MigrationContext,
        partition: &ManifestEntryPartition,
        item: &ContentMigrationItem<T>,
    ) -> Result<T> {
        let cancel = ctx.cancel_token();
        let source_id = item.item.id();
        if cancel.is_cancelled() {
            return Err(MigrationError::Canceled);
        }

        let mapping = ctx
            .run_extensions::<MappingKind<T>>(ContentMappingContext::new(
                item.item.clone(),
                item.entry.mapped_location().clone(),
            ))
            .await?;
        let entry = partition.map_location(source_id, mapping.mapped_location)?;

        let prepared = self.prepare(ctx, &item.item, &entry).await?;

        let ready = ctx
            .run_extensions::<PrePublishKind<T>>(ContentItemPrePublishContext::new(entry, prepared))
            .await?;
        if cancel.is_cancelled() {
            return Err(MigrationError::Canceled);
        }

        let publisher = ctx.endpoints().publisher::<T>()?;
        let published = publisher
            .publish(&ready.item, cancel)
            .await
            .map_err(|e| MigrationError::endpoint(T::CONTENT_TYPE, "publish", e))?;
        let entry = partition.destination_found(source_id, published.reference().clone())?;

        ctx.run_extensions::<PostPublishKind<T>>(ContentItemPostPublishContext::new(
            entry,
            item.item.clone(),
            published.clone(),
        ))
        .await?;
        partition.mark_migrated(source_id)?;
        Ok(published)
    }

    /// Pull, relocate, transform, convert, then point dependencies at the destination
    async fn prepare(&self, ctx: &MigrationContext, source: &T, entry: &ManifestEntry) -> Result<T> {
        let cancel = ctx.cancel_token();
        let listing = ctx.endpoints().source_listing::<T>()?;
        let mut item = listing
            .pull(source, cancel)
            .await
            .map_err(|e| MigrationError::endpoint(T::CONTENT_TYPE, "pull", e))?;
        item.reference_mut().location = entry.mapped_location().clone();

        let mut item = ctx.run_extensions::<TransformerKind<T>>(item).await?;
        if let Some(converter) = ctx.endpoints().destination.converter::<T>() {
            item = converter
                .convert(item, cancel)
                .await
                .map_err(|e| MigrationError::endpoint(T::CONTENT_TYPE, "convert", e))?;
        }

        self.resolve_dependencies(ctx, &mut item).await?;
        Ok(item)
    }

    async fn resolve_dependencies(&self, ctx: &MigrationContext, item: &mut T) -> Result<()> {
        let source_id = item.id();
        for dependency in item.dependencies_mut() {
            let resolver = ctx.resolver(&dependency.content_type)?;
            match resolver
                .find_destination(dependency.reference, ctx.cancel_token())
                .await?
            {
                Some(destination) => *dependency.reference = destination,
                None => {
                    return Err(MigrationError::item(
                        T::CONTENT_TYPE,
                        source_id,
                        format!(
                            "unresolved {} reference '{}'",
                            dependency.content_type, dependency.reference.location
                        ),
                    ))
                }
            }
        }
        Ok(())
    }
}

fn mark(partition: &ManifestEntryPartition, source_id: Uuid, status: MigrationStatus) {
    if let Err(e) = partition.set_status(source_id, status) {
        warn!(content_type = %partition.content_type(), source_id = %source_id, error = %e, "Could not record item status");
    }
}

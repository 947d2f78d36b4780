//! Enumerate one content type and drive its batches

use super::batch::{BatchMigrationResult, BatchMigrator};
use super::item::ContentMigrationItem;
use crate::content::ContentItem;
use crate::context::MigrationContext;
use crate::endpoint::PageRequest;
use crate::error::{MigrationError, Result};
use serde::Serialize;
use siteport_core_manifest::{ContentType, MigrationStatus};
use std::collections::HashSet;
use std::marker::PhantomData;
use tracing::{debug, info};

/// Totals for one content type across all of its batches
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentMigrationResult {
    pub content_type: ContentType,
    pub migrated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub canceled: usize,
    /// Entries carried over as Migrated from an earlier run
    pub already_migrated: usize,
    pub batches: usize,
    /// `location: message` for every failed item
    pub errors: Vec<String>,
    /// The type was switched off for this run and never enumerated
    pub disabled: bool,
}

impl ContentMigrationResult {
    pub fn new(content_type: ContentType) -> Self {
        Self {
            content_type,
            migrated: 0,
            skipped: 0,
            failed: 0,
            canceled: 0,
            already_migrated: 0,
            batches: 0,
            errors: Vec::new(),
            disabled: false,
        }
    }

    pub fn disabled(content_type: ContentType) -> Self {
        Self {
            disabled: true,
            ..Self::new(content_type)
        }
    }

    /// Fold one batch into the totals
    pub fn record<T>(&mut self, batch: &BatchMigrationResult<T>) {
        self.batches += 1;
        for item in &batch.items {
            match item.status {
                MigrationStatus::Migrated => self.migrated += 1,
                MigrationStatus::Skipped => self.skipped += 1,
                MigrationStatus::Canceled => self.canceled += 1,
                MigrationStatus::Failed => {
                    self.failed += 1;
                    self.errors.extend(
                        item.errors
                            .iter()
                            .map(|e| format!("{}: {}", item.source.location, e)),
                    );
                }
                MigrationStatus::Pending => {}
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.canceled == 0
    }

    /// Items enumerated this run, carried-over ones included
    pub fn total(&self) -> usize {
        self.migrated + self.skipped + self.failed + self.canceled + self.already_migrated
    }
}

pub struct ContentMigrator<T> {
    batches: BatchMigrator<T>,
    _content: PhantomData<fn() -> T>,
}

impl<T: ContentItem> Default for ContentMigrator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ContentItem> ContentMigrator<T> {
    pub fn new() -> Self {
        Self {
            batches: BatchMigrator::new(),
            _content: PhantomData,
        }
    }

    /// Migrate every source item of `T`
    ///
    /// Items already Migrated in the manifest are counted but not touched.
    /// Pending items are ordered by location depth so containers publish
    /// before their contents, and no batch spans two depths.
    pub async fn migrate(&self, ctx: &MigrationContext) -> Result<ContentMigrationResult> {
        let content_type = T::CONTENT_TYPE;
        if !ctx.config().includes(&content_type) {
            ctx.capabilities().disable(&content_type);
        }
        if !ctx.capabilities().is_enabled(&content_type) {
            info!(content_type = %content_type, "Content type disabled, nothing to migrate");
            return Ok(ContentMigrationResult::disabled(content_type));
        }

        let listed = self.discover(ctx).await?;
        let partition = ctx.manifest().partition(&content_type);
        let mut result = ContentMigrationResult::new(content_type.clone());

        let mut pending = Vec::with_capacity(listed.len());
        for item in listed {
            let entry = partition.get_or_add(item.reference());
            if entry.status() == MigrationStatus::Migrated {
                result.already_migrated += 1;
            } else {
                pending.push(ContentMigrationItem::new(item, entry));
            }
        }
        info!(
            content_type = %content_type,
            pending = pending.len(),
            already_migrated = result.already_migrated,
            "Discovered source content"
        );

        pending.sort_by_key(|i| i.item.location().segments().len());
        for (index, batch) in chunk_by_depth(pending, ctx.config().batch_size)
            .into_iter()
            .enumerate()
        {
            let outcome = self.batches.migrate_batch(ctx, index + 1, batch).await?;
            result.record(&outcome);
        }

        info!(
            content_type = %content_type,
            migrated = result.migrated,
            skipped = result.skipped,
            failed = result.failed,
            canceled = result.canceled,
            batches = result.batches,
            "Content type complete"
        );
        Ok(result)
    }

    /// Page through the source listing until it runs dry or reaches its total
    async fn discover(&self, ctx: &MigrationContext) -> Result<Vec<T>> {
        let listing = ctx.endpoints().source_listing::<T>()?;
        let cancel = ctx.cancel_token();
        let mut request = PageRequest::new(1, ctx.config().cache_page_size);
        let mut seen = HashSet::new();
        let mut items = Vec::new();
        let mut listed = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(MigrationError::Canceled);
            }
            let page = listing
                .list_page(request, cancel)
                .await
                .map_err(|e| MigrationError::endpoint(T::CONTENT_TYPE, "listing", e))?;
            if page.items.is_empty() {
                break;
            }
            listed += page.items.len();
            debug!(content_type = %T::CONTENT_TYPE, page = request.page_number, items = page.items.len(), "Listed page");
            items.extend(page.items.into_iter().filter(|i| seen.insert(i.id())));
            if listed >= page.total_count {
                break;
            }
            request = request.next();
        }
        Ok(items)
    }
}

/// Split depth-sorted items into batches of at most `size`, breaking at depth changes
fn chunk_by_depth<T: ContentItem>(
    items: Vec<ContentMigrationItem<T>>,
    size: usize,
) -> Vec<Vec<ContentMigrationItem<T>>> {
    let size = size.max(1);
    let mut batches: Vec<Vec<ContentMigrationItem<T>>> = Vec::new();
    let mut depth = None;
    for item in items {
        let item_depth = item.item.location().segments().len();
        let start_new = match batches.last() {
            Some(current) => current.len() >= size || depth != Some(item_depth),
            None => true,
        };
        if start_new {
            batches.push(Vec::with_capacity(size));
        }
        depth = Some(item_depth);
        if let Some(current) = batches.last_mut() {
            current.push(item);
        }
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentPermissions, Project};
    use crate::migrator::ItemMigrationResult;
    use siteport_core_manifest::{ContentLocation, ContentReference, ManifestEntry};
    use uuid::Uuid;

    fn project(path: &str) -> ContentMigrationItem<Project> {
        let location: ContentLocation = path.parse().unwrap();
        let reference = ContentReference::new(Uuid::new_v4(), location);
        let item = Project {
            reference: reference.clone(),
            description: String::new(),
            parent: None,
            owner: ContentReference::new(Uuid::new_v4(), ContentLocation::root("admin").unwrap()),
            permissions: ContentPermissions::default(),
        };
        ContentMigrationItem::new(item, ManifestEntry::new(reference))
    }

    #[test]
    fn test_chunks_break_at_size_and_depth() {
        let mut items = vec![
            project("Finance/Quarterly"),
            project("Finance"),
            project("Sales"),
            project("Ops"),
            project("Sales/EMEA"),
        ];
        items.sort_by_key(|i| i.item.location().segments().len());

        let batches = chunk_by_depth(items, 2);
        let sizes: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 1, 2]);
        assert!(batches[2]
            .iter()
            .all(|i| i.item.location().segments().len() == 2));
    }

    #[test]
    fn test_chunks_of_nothing() {
        assert!(chunk_by_depth::<Project>(Vec::new(), 10).is_empty());
    }

    #[test]
    fn test_record_totals() {
        let reference = |name: &str| ContentReference::new(Uuid::new_v4(), ContentLocation::root(name).unwrap());
        let batch = BatchMigrationResult::<Project> {
            content_type: Project::CONTENT_TYPE,
            batch_number: 1,
            items: vec![
                ItemMigrationResult::skipped(reference("a")),
                ItemMigrationResult::failed(reference("b"), vec!["denied".to_string()]),
                ItemMigrationResult::canceled(reference("c")),
            ],
        };

        let mut result = ContentMigrationResult::new(Project::CONTENT_TYPE);
        result.already_migrated = 2;
        result.record(&batch);

        assert_eq!(result.batches, 1);
        assert_eq!(result.total(), 5);
        assert_eq!(result.errors, vec!["b: denied".to_string()]);
        assert!(!result.is_success());
        assert!(ContentMigrationResult::disabled(Project::CONTENT_TYPE).disabled);
    }
}

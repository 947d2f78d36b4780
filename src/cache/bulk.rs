//! Manifest-backed cache with a single-flight bulk load

use super::{CacheSide, ReferenceCache};
use crate::content::ContentItem;
use crate::endpoint::{ContentListing, PageRequest};
use crate::error::{MigrationError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use siteport_core_manifest::{ContentLocation, ContentReference, ContentType, Manifest};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

/// Callback invoked for every item the bulk load sees
pub type ItemObserver<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct BulkReferenceCache<T: ContentItem> {
    side: CacheSide,
    listing: Arc<dyn ContentListing<T>>,
    manifest: Arc<Manifest>,
    page_size: usize,
    by_location: DashMap<ContentLocation, ContentReference>,
    by_id: DashMap<Uuid, ContentReference>,
    loaded: AtomicBool,
    load_lock: Mutex<()>,
    load_count: AtomicUsize,
    observer: Option<ItemObserver<T>>,
}

impl<T: ContentItem> BulkReferenceCache<T> {
    pub fn new(
        side: CacheSide,
        listing: Arc<dyn ContentListing<T>>,
        manifest: Arc<Manifest>,
        page_size: usize,
    ) -> Self {
        Self {
            side,
            listing,
            manifest,
            page_size: page_size.max(1),
            by_location: DashMap::new(),
            by_id: DashMap::new(),
            loaded: AtomicBool::new(false),
            load_lock: Mutex::new(()),
            load_count: AtomicUsize::new(0),
            observer: None,
        }
    }

    /// Observe every listed item during the bulk load
    pub fn with_observer(mut self, observer: ItemObserver<T>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Number of completed bulk loads (0 or 1)
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::Acquire)
    }

    /// Number of references held in memory
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load every reference once; concurrent callers wait for the first
    ///
    /// A failed or cancelled load leaves the cache unloaded, so the next
    /// caller starts over from page 1.
    pub async fn ensure_loaded(&self, cancel: &CancellationToken) -> Result<()> {
        if self.is_loaded() {
            return Ok(());
        }

        let _guard = self.load_lock.lock().await;
        if self.is_loaded() {
            return Ok(());
        }

        self.load_all(cancel).await?;
        self.loaded.store(true, Ordering::Release);
        self.load_count.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    async fn load_all(&self, cancel: &CancellationToken) -> Result<()> {
        let partition = self.manifest.partition(&T::CONTENT_TYPE);
        let mut request = PageRequest::new(1, self.page_size);
        let mut seen = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(MigrationError::Canceled);
            }

            let page = self
                .listing
                .list_page(request, cancel)
                .await
                .map_err(|source| MigrationError::CacheLoad {
                    content_type: T::CONTENT_TYPE,
                    side: self.side,
                    source,
                })?;

            if page.items.is_empty() {
                break;
            }
            seen += page.items.len();

            for item in &page.items {
                let reference = item.reference().clone();
                if self.side == CacheSide::Destination {
                    partition.destination_found_at(&reference.location, reference.clone());
                }
                if let Some(observer) = &self.observer {
                    observer(item);
                }
                self.by_id.insert(reference.id, reference.clone());
                self.by_location.insert(reference.location.clone(), reference);
            }

            debug!(
                content_type = %T::CONTENT_TYPE,
                side = %self.side,
                page = request.page_number,
                seen,
                total = page.total_count,
                "Loaded reference page"
            );

            if seen >= page.total_count {
                break;
            }
            request = request.next();
        }

        info!(
            content_type = %T::CONTENT_TYPE,
            side = %self.side,
            references = self.by_id.len(),
            "Reference cache loaded"
        );
        Ok(())
    }

    fn manifest_for_location(&self, location: &ContentLocation) -> Option<ContentReference> {
        let partition = self.manifest.existing_partition(&T::CONTENT_TYPE)?;
        match self.side {
            CacheSide::Source => partition
                .by_source_location(location)
                .map(|e| e.source().clone()),
            CacheSide::Destination => partition
                .by_mapped_location(location)
                .and_then(|e| e.destination().cloned())
                .filter(|d| &d.location == location),
        }
    }

    fn manifest_for_id(&self, id: &Uuid) -> Option<ContentReference> {
        let partition = self.manifest.existing_partition(&T::CONTENT_TYPE)?;
        match self.side {
            CacheSide::Source => partition.by_source_id(id).map(|e| e.source().clone()),
            CacheSide::Destination => partition
                .by_destination_id(id)
                .and_then(|e| e.destination().cloned()),
        }
    }
}

#[async_trait]
impl<T: ContentItem> ReferenceCache for BulkReferenceCache<T> {
    fn content_type(&self) -> ContentType {
        T::CONTENT_TYPE
    }

    fn side(&self) -> CacheSide {
        self.side
    }

    async fn for_location(
        &self,
        location: &ContentLocation,
        cancel: &CancellationToken,
    ) -> Result<Option<ContentReference>> {
        if let Some(found) = self.manifest_for_location(location) {
            return Ok(Some(found));
        }
        self.ensure_loaded(cancel).await?;
        Ok(self.by_location.get(location).map(|r| r.clone()))
    }

    async fn for_id(&self, id: &Uuid, cancel: &CancellationToken) -> Result<Option<ContentReference>> {
        if let Some(found) = self.manifest_for_id(id) {
            return Ok(Some(found));
        }
        self.ensure_loaded(cancel).await?;
        Ok(self.by_id.get(id).map(|r| r.clone()))
    }
}

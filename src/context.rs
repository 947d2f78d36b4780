/*!
 * Per-run migration context
 *
 * Everything an action, migrator or extension needs for one run is reached
 * through a [`MigrationContext`]: configuration, the manifest, endpoint
 * collaborators, the frozen extension registry, the run's capabilities and
 * its cancellation token. Caches and migrators are created on first request
 * and shared for the rest of the run.
 */

use crate::cache::{BulkReferenceCache, CacheSide, LockedProjectCache, ReferenceCache};
use crate::config::MigrationConfig;
use crate::content::{visit_content_type, ContentItem, ContentTypeVisitor, Project};
use crate::endpoint::Endpoints;
use crate::error::{MigrationError, Result};
use crate::extensions::{ExtensionKind, ExtensionRegistry, ExtensionRunner};
use crate::migrator::ContentMigrator;
use crate::resolver::ManifestReferenceResolver;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use siteport_core_manifest::{ContentType, Manifest};
use std::any::Any;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

type Slot = Arc<dyn Any + Send + Sync>;

/// Run-scoped switches decided while the run executes
#[derive(Debug, Default)]
pub struct MigrationCapabilities {
    disabled: RwLock<BTreeSet<ContentType>>,
}

impl MigrationCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave a content type out of the rest of the run
    pub fn disable(&self, content_type: &ContentType) {
        if self.disabled.write().insert(content_type.clone()) {
            info!(content_type = %content_type, "Content type disabled for this run");
        }
    }

    pub fn is_enabled(&self, content_type: &ContentType) -> bool {
        !self.disabled.read().contains(content_type)
    }

    pub fn disabled(&self) -> Vec<ContentType> {
        self.disabled.read().iter().cloned().collect()
    }
}

pub struct MigrationContext {
    config: MigrationConfig,
    manifest: Arc<Manifest>,
    endpoints: Endpoints,
    extensions: ExtensionRegistry,
    capabilities: MigrationCapabilities,
    cancel: CancellationToken,
    caches: DashMap<(ContentType, CacheSide), Slot>,
    migrators: DashMap<ContentType, Slot>,
    locked_projects: Mutex<Option<Arc<LockedProjectCache>>>,
}

impl MigrationContext {
    pub fn new(
        config: MigrationConfig,
        manifest: Arc<Manifest>,
        endpoints: Endpoints,
        extensions: ExtensionRegistry,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            config,
            manifest,
            endpoints,
            extensions,
            capabilities: MigrationCapabilities::new(),
            cancel,
            caches: DashMap::new(),
            migrators: DashMap::new(),
            locked_projects: Mutex::new(None),
        }
    }

    pub fn plan_id(&self) -> Uuid {
        self.manifest.plan_id()
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn shared_manifest(&self) -> Arc<Manifest> {
        self.manifest.clone()
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn extensions(&self) -> &ExtensionRegistry {
        &self.extensions
    }

    pub fn capabilities(&self) -> &MigrationCapabilities {
        &self.capabilities
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run the chain registered for kind `K`
    pub async fn run_extensions<K: ExtensionKind>(&self, input: K::Context) -> Result<K::Context> {
        ExtensionRunner::new(&self.extensions)
            .execute::<K>(self, input)
            .await
    }

    /// Bulk reference cache for `T` on one side, shared for the run
    ///
    /// Destination projects are served by the locked project cache's
    /// reference cache, so both views share one listing.
    pub fn bulk_cache<T: ContentItem>(&self, side: CacheSide) -> Result<Arc<BulkReferenceCache<T>>> {
        if side == CacheSide::Destination && T::CONTENT_TYPE == Project::CONTENT_TYPE {
            let shared: Slot = self.locked_project_cache()?.references();
            return downcast_slot(shared);
        }

        let key = (T::CONTENT_TYPE, side);
        if let Some(slot) = self.caches.get(&key) {
            return downcast_slot(slot.value().clone());
        }

        let listing = match side {
            CacheSide::Source => self.endpoints.source_listing::<T>()?,
            CacheSide::Destination => self.endpoints.destination_listing::<T>()?,
        };
        let created: Slot = Arc::new(BulkReferenceCache::<T>::new(
            side,
            listing,
            self.manifest.clone(),
            self.config.cache_page_size,
        ));
        let slot = self.caches.entry(key).or_insert(created).value().clone();
        downcast_slot(slot)
    }

    /// Reference cache for a runtime content-type tag
    pub fn reference_cache(
        &self,
        content_type: &ContentType,
        side: CacheSide,
    ) -> Result<Arc<dyn ReferenceCache>> {
        visit_content_type(content_type, CacheFor { context: self, side })
            .unwrap_or_else(|| Err(MigrationError::UnknownContentType(content_type.clone())))
    }

    /// Manifest-first resolver for a runtime content-type tag
    pub fn resolver(&self, content_type: &ContentType) -> Result<ManifestReferenceResolver> {
        let source = self.reference_cache(content_type, CacheSide::Source)?;
        let destination = self.reference_cache(content_type, CacheSide::Destination)?;
        Ok(ManifestReferenceResolver::new(
            self.manifest.partition(content_type),
            source,
            destination,
        ))
    }

    /// Destination project cache that also answers lock questions
    pub fn locked_project_cache(&self) -> Result<Arc<LockedProjectCache>> {
        let mut slot = self.locked_projects.lock();
        if let Some(cache) = slot.as_ref() {
            return Ok(cache.clone());
        }
        let cache = Arc::new(LockedProjectCache::new(
            CacheSide::Destination,
            self.endpoints.destination_listing::<Project>()?,
            self.manifest.clone(),
            self.config.cache_page_size,
        ));
        *slot = Some(cache.clone());
        Ok(cache)
    }

    /// Migrator for content type `T`, shared for the run
    pub fn content_migrator<T: ContentItem>(&self) -> Result<Arc<ContentMigrator<T>>> {
        if let Some(slot) = self.migrators.get(&T::CONTENT_TYPE) {
            return downcast_slot(slot.value().clone());
        }
        let created: Slot = Arc::new(ContentMigrator::<T>::new());
        let slot = self
            .migrators
            .entry(T::CONTENT_TYPE)
            .or_insert(created)
            .value()
            .clone();
        downcast_slot(slot)
    }
}

fn downcast_slot<V: Any + Send + Sync>(slot: Slot) -> Result<Arc<V>> {
    slot.downcast::<V>().map_err(|_| {
        MigrationError::Config(format!(
            "content type slot holds a value other than {}; two item types share one content type tag",
            std::any::type_name::<V>()
        ))
    })
}

struct CacheFor<'a> {
    context: &'a MigrationContext,
    side: CacheSide,
}

impl ContentTypeVisitor for CacheFor<'_> {
    type Output = Result<Arc<dyn ReferenceCache>>;

    fn visit<T: ContentItem>(self) -> Self::Output {
        let cache: Arc<dyn ReferenceCache> = self.context.bulk_cache::<T>(self.side)?;
        Ok(cache)
    }
}

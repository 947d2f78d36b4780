//! Destination project cache that also tracks permission locking

use super::{BulkReferenceCache, CacheSide, ReferenceCache};
use crate::content::{ContentItem, ContentPermissions, Project};
use crate::endpoint::ContentListing;
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use siteport_core_manifest::{ContentLocation, ContentReference, ContentType, Manifest};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub struct LockedProjectCache {
    inner: Arc<BulkReferenceCache<Project>>,
    permissions: Arc<DashMap<Uuid, ContentPermissions>>,
}

impl LockedProjectCache {
    pub fn new(
        side: CacheSide,
        listing: Arc<dyn ContentListing<Project>>,
        manifest: Arc<Manifest>,
        page_size: usize,
    ) -> Self {
        let permissions = Arc::new(DashMap::new());
        let recorder = permissions.clone();
        let inner = BulkReferenceCache::new(side, listing, manifest, page_size).with_observer(
            Arc::new(move |project: &Project| {
                recorder.insert(project.id(), project.permissions);
            }),
        );
        Self {
            inner: Arc::new(inner),
            permissions,
        }
    }

    /// The underlying project reference cache; loading either loads both
    pub fn references(&self) -> Arc<BulkReferenceCache<Project>> {
        self.inner.clone()
    }

    /// Whether the project's permissions are locked
    ///
    /// `LockedToProject` is always locked. `LockedToProjectWithoutNested` only
    /// counts when `include_without_nested` is set. Unknown projects are not
    /// locked.
    pub async fn is_project_locked(
        &self,
        project_id: &Uuid,
        include_without_nested: bool,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        self.inner.ensure_loaded(cancel).await?;
        let mode = self.permissions.get(project_id).map(|p| *p);
        Ok(match mode {
            Some(ContentPermissions::LockedToProject) => true,
            Some(ContentPermissions::LockedToProjectWithoutNested) => include_without_nested,
            Some(ContentPermissions::ManagedByOwner) | None => false,
        })
    }

    /// [`is_project_locked`](Self::is_project_locked) counting both locked modes
    pub async fn is_locked(&self, project_id: &Uuid, cancel: &CancellationToken) -> Result<bool> {
        self.is_project_locked(project_id, true, cancel).await
    }

    pub fn load_count(&self) -> usize {
        self.inner.load_count()
    }
}

#[async_trait]
impl ReferenceCache for LockedProjectCache {
    fn content_type(&self) -> ContentType {
        Project::CONTENT_TYPE
    }

    fn side(&self) -> CacheSide {
        self.inner.side()
    }

    async fn for_location(
        &self,
        location: &ContentLocation,
        cancel: &CancellationToken,
    ) -> Result<Option<ContentReference>> {
        self.inner.for_location(location, cancel).await
    }

    async fn for_id(&self, id: &Uuid, cancel: &CancellationToken) -> Result<Option<ContentReference>> {
        self.inner.for_id(id, cancel).await
    }
}

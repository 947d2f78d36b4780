//! Reference caches: identity to lightweight reference stub
//!
//! Lookups consult the manifest first (no endpoint traffic) and fall back to
//! a one-time paged bulk listing that is then served from memory.

mod bulk;
mod locked_project;

pub use bulk::{BulkReferenceCache, ItemObserver};
pub use locked_project::LockedProjectCache;

use crate::error::Result;
use async_trait::async_trait;
use siteport_core_manifest::{ContentLocation, ContentReference, ContentType};
use std::fmt;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Which system a cache lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheSide {
    Source,
    Destination,
}

impl fmt::Display for CacheSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheSide::Source => write!(f, "source"),
            CacheSide::Destination => write!(f, "destination"),
        }
    }
}

#[async_trait]
pub trait ReferenceCache: Send + Sync {
    fn content_type(&self) -> ContentType;

    fn side(&self) -> CacheSide;

    async fn for_location(
        &self,
        location: &ContentLocation,
        cancel: &CancellationToken,
    ) -> Result<Option<ContentReference>>;

    async fn for_id(&self, id: &Uuid, cancel: &CancellationToken) -> Result<Option<ContentReference>>;
}

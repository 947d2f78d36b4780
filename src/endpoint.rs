/*!
 * Endpoint collaborator interfaces
 *
 * The kernel never talks to a server directly. Each side of a migration is an
 * [`EndpointSet`] holding, per content type, a paged listing, an optional
 * publisher and an optional converter. Concrete wire clients live outside
 * this crate and are registered here.
 */

use crate::content::ContentItem;
use crate::error::{MigrationError, Result};
use async_trait::async_trait;
use siteport_core_manifest::ContentType;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// One page of a paged listing request; page numbers start at 1
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page_number: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page_number: usize, page_size: usize) -> Self {
        Self {
            page_number,
            page_size,
        }
    }

    /// Index of the first item on this page
    pub fn offset(&self) -> usize {
        self.page_number.saturating_sub(1) * self.page_size
    }

    pub fn next(&self) -> Self {
        Self::new(self.page_number + 1, self.page_size)
    }
}

/// Items of one page plus the total the server reports for the listing
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: usize) -> Self {
        Self { items, total_count }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }
}

/// Paged enumeration of one content type on one side
#[async_trait]
pub trait ContentListing<T: ContentItem>: Send + Sync {
    async fn list_page(&self, request: PageRequest, cancel: &CancellationToken) -> anyhow::Result<Page<T>>;

    /// Fetch the full record for a listed item
    async fn pull(&self, item: &T, _cancel: &CancellationToken) -> anyhow::Result<T> {
        Ok(item.clone())
    }
}

/// Creates or updates an item on the destination and returns what was stored
#[async_trait]
pub trait ContentPublisher<T: ContentItem>: Send + Sync {
    async fn publish(&self, item: &T, cancel: &CancellationToken) -> anyhow::Result<T>;
}

/// Reshapes a prepared source item into its destination form
#[async_trait]
pub trait ContentConverter<T: ContentItem>: Send + Sync {
    async fn convert(&self, item: T, cancel: &CancellationToken) -> anyhow::Result<T>;
}

type Slot = Arc<dyn Any + Send + Sync>;

/// Per-content-type collaborators of one side of a migration
#[derive(Clone, Default)]
pub struct EndpointSet {
    listings: HashMap<ContentType, Slot>,
    publishers: HashMap<ContentType, Slot>,
    converters: HashMap<ContentType, Slot>,
}

impl EndpointSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing<T: ContentItem>(mut self, listing: Arc<dyn ContentListing<T>>) -> Self {
        self.listings.insert(T::CONTENT_TYPE, Arc::new(listing));
        self
    }

    pub fn with_publisher<T: ContentItem>(mut self, publisher: Arc<dyn ContentPublisher<T>>) -> Self {
        self.publishers.insert(T::CONTENT_TYPE, Arc::new(publisher));
        self
    }

    pub fn with_converter<T: ContentItem>(mut self, converter: Arc<dyn ContentConverter<T>>) -> Self {
        self.converters.insert(T::CONTENT_TYPE, Arc::new(converter));
        self
    }

    pub fn listing<T: ContentItem>(&self) -> Option<Arc<dyn ContentListing<T>>> {
        downcast(self.listings.get(&T::CONTENT_TYPE)?)
    }

    pub fn publisher<T: ContentItem>(&self) -> Option<Arc<dyn ContentPublisher<T>>> {
        downcast(self.publishers.get(&T::CONTENT_TYPE)?)
    }

    pub fn converter<T: ContentItem>(&self) -> Option<Arc<dyn ContentConverter<T>>> {
        downcast(self.converters.get(&T::CONTENT_TYPE)?)
    }

    pub fn has_listing(&self, content_type: &ContentType) -> bool {
        self.listings.contains_key(content_type)
    }

    pub fn has_publisher(&self, content_type: &ContentType) -> bool {
        self.publishers.contains_key(content_type)
    }
}

fn downcast<V: Clone + 'static>(slot: &Slot) -> Option<V> {
    slot.downcast_ref::<V>().cloned()
}

/// Source and destination collaborators for a run
#[derive(Clone, Default)]
pub struct Endpoints {
    pub source: EndpointSet,
    pub destination: EndpointSet,
}

impl Endpoints {
    pub fn new(source: EndpointSet, destination: EndpointSet) -> Self {
        Self {
            source,
            destination,
        }
    }

    pub fn source_listing<T: ContentItem>(&self) -> Result<Arc<dyn ContentListing<T>>> {
        self.source
            .listing::<T>()
            .ok_or_else(|| MigrationError::missing(T::CONTENT_TYPE, "source listing"))
    }

    pub fn destination_listing<T: ContentItem>(&self) -> Result<Arc<dyn ContentListing<T>>> {
        self.destination
            .listing::<T>()
            .ok_or_else(|| MigrationError::missing(T::CONTENT_TYPE, "destination listing"))
    }

    pub fn publisher<T: ContentItem>(&self) -> Result<Arc<dyn ContentPublisher<T>>> {
        self.destination
            .publisher::<T>()
            .ok_or_else(|| MigrationError::missing(T::CONTENT_TYPE, "destination publisher"))
    }
}

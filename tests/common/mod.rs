/*!
 * In-memory sites shared by the integration tests
 */

#![allow(dead_code)]

use anyhow::bail;
use async_trait::async_trait;
use parking_lot::RwLock;
use siteport::content::{
    ContentPermissions, DataSource, ExtractRefreshTask, ExtractTarget, Group, Project, User, Workbook,
};
use siteport::manifest::{ContentLocation, ContentReference};
use siteport::{ContentItem, ContentListing, ContentPublisher, EndpointSet, Endpoints, Page, PageRequest};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One content type's items on one site
pub struct MemoryStore<T> {
    items: RwLock<Vec<T>>,
    rejected: RwLock<HashSet<String>>,
    list_calls: AtomicUsize,
    publish_calls: AtomicUsize,
    page_delay: Option<Duration>,
}

impl<T: ContentItem> MemoryStore<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(items),
            rejected: RwLock::new(HashSet::new()),
            list_calls: AtomicUsize::new(0),
            publish_calls: AtomicUsize::new(0),
            page_delay: None,
        }
    }

    /// Sleep before answering every page request
    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = Some(delay);
        self
    }

    pub fn insert(&self, item: T) {
        self.items.write().push(item);
    }

    /// Make publishes of this item name fail
    pub fn reject(&self, name: &str) {
        self.rejected.write().insert(name.to_string());
    }

    pub fn items(&self) -> Vec<T> {
        self.items.read().clone()
    }

    pub fn find(&self, location: &str) -> Option<T> {
        self.items
            .read()
            .iter()
            .find(|i| i.location().to_string() == location)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn publish_calls(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<T: ContentItem> ContentListing<T> for MemoryStore<T> {
    async fn list_page(&self, request: PageRequest, cancel: &CancellationToken) -> anyhow::Result<Page<T>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.page_delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => bail!("listing canceled"),
            }
        }
        let items = self.items.read();
        let page = items
            .iter()
            .skip(request.offset())
            .take(request.page_size)
            .cloned()
            .collect();
        Ok(Page::new(page, items.len()))
    }
}

#[async_trait]
impl<T: ContentItem> ContentPublisher<T> for MemoryStore<T> {
    async fn publish(&self, item: &T, _cancel: &CancellationToken) -> anyhow::Result<T> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(name) = item.location().name() {
            if self.rejected.read().contains(name) {
                bail!("destination rejected '{}'", item.location());
            }
        }
        let mut published = item.clone();
        published.reference_mut().id = Uuid::new_v4();
        self.items.write().push(published.clone());
        Ok(published)
    }
}

/// Every content type of one site
pub struct Site {
    pub users: Arc<MemoryStore<User>>,
    pub groups: Arc<MemoryStore<Group>>,
    pub projects: Arc<MemoryStore<Project>>,
    pub data_sources: Arc<MemoryStore<DataSource>>,
    pub workbooks: Arc<MemoryStore<Workbook>>,
    pub tasks: Arc<MemoryStore<ExtractRefreshTask>>,
}

impl Site {
    pub fn empty() -> Self {
        Self::with_users(Vec::new())
    }

    pub fn with_users(users: Vec<User>) -> Self {
        Self {
            users: Arc::new(MemoryStore::new(users)),
            groups: Arc::new(MemoryStore::new(Vec::new())),
            projects: Arc::new(MemoryStore::new(Vec::new())),
            data_sources: Arc::new(MemoryStore::new(Vec::new())),
            workbooks: Arc::new(MemoryStore::new(Vec::new())),
            tasks: Arc::new(MemoryStore::new(Vec::new())),
        }
    }

    /// Listings for every content type
    pub fn listings(&self) -> EndpointSet {
        EndpointSet::new()
            .with_listing::<User>(self.users.clone())
            .with_listing::<Group>(self.groups.clone())
            .with_listing::<Project>(self.projects.clone())
            .with_listing::<DataSource>(self.data_sources.clone())
            .with_listing::<Workbook>(self.workbooks.clone())
            .with_listing::<ExtractRefreshTask>(self.tasks.clone())
    }

    /// Listings and publishers for every content type
    pub fn publishers(&self) -> EndpointSet {
        self.listings()
            .with_publisher::<User>(self.users.clone())
            .with_publisher::<Group>(self.groups.clone())
            .with_publisher::<Project>(self.projects.clone())
            .with_publisher::<DataSource>(self.data_sources.clone())
            .with_publisher::<Workbook>(self.workbooks.clone())
            .with_publisher::<ExtractRefreshTask>(self.tasks.clone())
    }
}

/// Source lists, destination lists and publishes
pub fn endpoints(source: &Site, destination: &Site) -> Endpoints {
    Endpoints::new(source.listings(), destination.publishers())
}

pub fn location(path: &str) -> ContentLocation {
    path.parse().unwrap()
}

pub fn reference(path: &str) -> ContentReference {
    ContentReference::new(Uuid::new_v4(), location(path))
}

pub fn user(name: &str) -> User {
    User {
        reference: reference(name),
        email: Some(format!("{}@example.com", name)),
        site_role: "Explorer".to_string(),
    }
}

pub fn group(name: &str, members: &[&User]) -> Group {
    Group {
        reference: reference(name),
        domain: Some("local".to_string()),
        members: members.iter().map(|u| u.reference.clone()).collect(),
    }
}

pub fn project(path: &str, owner: &User, parent: Option<&Project>, permissions: ContentPermissions) -> Project {
    Project {
        reference: reference(path),
        description: format!("{} content", path),
        parent: parent.map(|p| p.reference.clone()),
        owner: owner.reference.clone(),
        permissions,
    }
}

pub fn data_source(name: &str, project: &Project, owner: &User) -> DataSource {
    DataSource {
        reference: ContentReference::new(Uuid::new_v4(), project.reference.location.append(name).unwrap()),
        project: project.reference.clone(),
        owner: owner.reference.clone(),
        certified: false,
    }
}

pub fn workbook(name: &str, project: &Project, owner: &User) -> Workbook {
    Workbook {
        reference: ContentReference::new(Uuid::new_v4(), project.reference.location.append(name).unwrap()),
        project: project.reference.clone(),
        owner: owner.reference.clone(),
        show_tabs: true,
    }
}

pub fn refresh_task(name: &str, data_source: &DataSource) -> ExtractRefreshTask {
    ExtractRefreshTask {
        reference: reference(name),
        target: ExtractTarget::DataSource(data_source.reference.clone()),
        schedule: "daily 02:00".to_string(),
    }
}

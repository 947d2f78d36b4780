//! The migration manifest: partition table, run-level errors and persistence
//!
//! A manifest is the single source of truth for per-item progress. It is
//! saved after a run and handed to the next run as the "previous manifest" so
//! already-migrated items are not touched again.

use crate::entry::ManifestEntry;
use crate::error::{Error, Result};
use crate::partition::{ManifestEntryPartition, PartitionStats};
use crate::reference::ContentType;
use crate::MANIFEST_SCHEMA_VERSION;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Persisted form of a [`Manifest`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestDocument {
    /// Schema version identifier
    pub schema: String,

    /// Identifier of the migration plan that produced this manifest
    pub plan_id: Uuid,

    /// Manifest creation timestamp (UTC)
    pub created_utc: DateTime<Utc>,

    /// Run-level errors (not tied to one item)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,

    /// Entries per content type, in discovery order
    pub partitions: BTreeMap<ContentType, Vec<ManifestEntry>>,
}

/// Per-content-type partitioned record of migration progress
#[derive(Debug)]
pub struct Manifest {
    plan_id: Uuid,
    created_utc: DateTime<Utc>,
    partitions: DashMap<ContentType, Arc<ManifestEntryPartition>>,
    errors: Mutex<Vec<String>>,
}

impl Manifest {
    /// Create an empty manifest for a plan
    pub fn new(plan_id: Uuid) -> Self {
        Self {
            plan_id,
            created_utc: Utc::now(),
            partitions: DashMap::new(),
            errors: Mutex::new(Vec::new()),
        }
    }

    /// Create a manifest for a new run seeded from a previous run's manifest
    ///
    /// Migrated entries carry over unchanged; all others are reset to Pending
    /// so they are retried. Run-level errors are not carried over.
    pub fn seeded_from(plan_id: Uuid, previous: &Manifest) -> Self {
        let manifest = Self::new(plan_id);
        for item in previous.partitions.iter() {
            let partition = manifest.partition(item.key());
            for entry in item.value().entries() {
                partition.seed(entry);
            }
        }
        info!(
            plan_id = %plan_id,
            previous_plan_id = %previous.plan_id,
            partitions = manifest.partitions.len(),
            "Seeded manifest from previous run"
        );
        manifest
    }

    pub fn plan_id(&self) -> Uuid {
        self.plan_id
    }

    pub fn created_utc(&self) -> DateTime<Utc> {
        self.created_utc
    }

    /// Get the partition for a content type, creating it on first use
    ///
    /// Concurrent first callers race on the map's entry lock; exactly one
    /// partition instance is created and every caller receives it.
    pub fn partition(&self, content_type: &ContentType) -> Arc<ManifestEntryPartition> {
        if let Some(existing) = self.partitions.get(content_type) {
            return existing.clone();
        }
        self.partitions
            .entry(content_type.clone())
            .or_insert_with(|| {
                debug!(content_type = %content_type, "Creating manifest partition");
                Arc::new(ManifestEntryPartition::new(content_type.clone()))
            })
            .clone()
    }

    /// Get an existing partition without creating one
    pub fn existing_partition(&self, content_type: &ContentType) -> Option<Arc<ManifestEntryPartition>> {
        self.partitions.get(content_type).map(|p| p.clone())
    }

    /// Content types with a partition, sorted by name
    pub fn content_types(&self) -> Vec<ContentType> {
        let mut types: Vec<ContentType> = self.partitions.iter().map(|p| p.key().clone()).collect();
        types.sort();
        types
    }

    /// Record a run-level error
    pub fn add_error<S: Into<String>>(&self, error: S) {
        self.errors.lock().push(error.into());
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    /// Statistics per content type
    pub fn stats(&self) -> BTreeMap<ContentType, PartitionStats> {
        self.partitions
            .iter()
            .map(|p| (p.key().clone(), p.value().stats()))
            .collect()
    }

    /// Snapshot into the persisted form
    pub fn to_document(&self) -> ManifestDocument {
        ManifestDocument {
            schema: MANIFEST_SCHEMA_VERSION.to_string(),
            plan_id: self.plan_id,
            created_utc: self.created_utc,
            errors: self.errors(),
            partitions: self
                .partitions
                .iter()
                .map(|p| (p.key().clone(), p.value().entries()))
                .collect(),
        }
    }

    /// Rebuild a manifest from its persisted form, keeping statuses as stored
    pub fn from_document(document: ManifestDocument) -> Result<Self> {
        if document.schema != MANIFEST_SCHEMA_VERSION {
            return Err(Error::version_mismatch(
                MANIFEST_SCHEMA_VERSION,
                document.schema.as_str(),
            ));
        }

        let manifest = Self {
            plan_id: document.plan_id,
            created_utc: document.created_utc,
            partitions: DashMap::new(),
            errors: Mutex::new(document.errors),
        };
        for (content_type, entries) in document.partitions {
            let partition = manifest.partition(&content_type);
            for entry in entries {
                partition.restore(entry);
            }
            partition.verify_indices()?;
        }
        Ok(manifest)
    }

    /// Save the manifest to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_document())?;
        std::fs::write(path.as_ref(), json)?;
        debug!(path = %path.as_ref().display(), "Manifest saved");
        Ok(())
    }

    /// Load a manifest from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::manifest_not_found(path));
        }

        let contents = std::fs::read_to_string(path)?;
        let document: ManifestDocument = serde_json::from_str(&contents)?;
        Self::from_document(document)
    }
}

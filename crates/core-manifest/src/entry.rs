//! Manifest entries: per-item migration status and identity mapping

use crate::error::{Error, Result};
use crate::reference::{ContentLocation, ContentReference};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Migration status of a single content item
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum MigrationStatus {
    /// Discovered but not yet processed in this run
    #[default]
    Pending,
    /// Published and all post-publish hooks succeeded
    Migrated,
    /// Excluded by a filter
    Skipped,
    /// A stage errored; see the entry's errors
    Failed,
    /// The run was cancelled before the item finished
    Canceled,
}

impl MigrationStatus {
    /// Terminal statuses are not revisited within a run
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MigrationStatus::Pending)
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationStatus::Pending => write!(f, "pending"),
            MigrationStatus::Migrated => write!(f, "migrated"),
            MigrationStatus::Skipped => write!(f, "skipped"),
            MigrationStatus::Failed => write!(f, "failed"),
            MigrationStatus::Canceled => write!(f, "canceled"),
        }
    }
}

impl FromStr for MigrationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(MigrationStatus::Pending),
            "migrated" => Ok(MigrationStatus::Migrated),
            "skipped" => Ok(MigrationStatus::Skipped),
            "failed" => Ok(MigrationStatus::Failed),
            "canceled" | "cancelled" => Ok(MigrationStatus::Canceled),
            _ => Err(Error::validation(format!("Invalid migration status: {}", s))),
        }
    }
}

/// One source item's progress and identity mapping
///
/// Entries are owned by a [`ManifestEntryPartition`](crate::ManifestEntryPartition),
/// which hands out clones; every mutation goes through the partition so its
/// indices stay consistent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ManifestEntry {
    source: ContentReference,
    mapped_location: ContentLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    destination: Option<ContentReference>,
    #[serde(default)]
    status: MigrationStatus,
    #[serde(default)]
    has_migrated: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

impl ManifestEntry {
    /// Create a pending entry mapped to the source location
    pub fn new(source: ContentReference) -> Self {
        let mapped_location = source.location.clone();
        Self {
            source,
            mapped_location,
            destination: None,
            status: MigrationStatus::Pending,
            has_migrated: false,
            errors: Vec::new(),
        }
    }

    pub fn source(&self) -> &ContentReference {
        &self.source
    }

    pub fn mapped_location(&self) -> &ContentLocation {
        &self.mapped_location
    }

    pub fn destination(&self) -> Option<&ContentReference> {
        self.destination.as_ref()
    }

    pub fn status(&self) -> MigrationStatus {
        self.status
    }

    /// Whether the item reached Migrated in this or any earlier run
    pub fn has_migrated(&self) -> bool {
        self.has_migrated
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub(crate) fn set_source(&mut self, source: ContentReference) {
        self.source = source;
    }

    pub(crate) fn set_mapped_location(&mut self, location: ContentLocation) {
        self.mapped_location = location;
    }

    pub(crate) fn set_destination(&mut self, destination: ContentReference) {
        self.destination = Some(destination);
    }

    /// Move out of Pending; only Pending entries may change status
    pub(crate) fn transition(&mut self, to: MigrationStatus) -> Result<()> {
        if self.status.is_terminal() || to == MigrationStatus::Pending {
            return Err(Error::InvalidTransition {
                source_id: self.source.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        if to == MigrationStatus::Migrated {
            self.has_migrated = true;
        }
        Ok(())
    }

    pub(crate) fn push_error(&mut self, error: String) {
        self.errors.push(error);
    }

    /// Prepare a carried-over entry for a new run
    ///
    /// Migrated entries keep their status; everything else is retried.
    pub(crate) fn reset_for_new_run(&mut self) {
        if self.status != MigrationStatus::Migrated {
            self.status = MigrationStatus::Pending;
            self.errors.clear();
        }
    }
}

//! Per-content-type manifest partition with four consistent lookup indices
//!
//! Every entry can be found by its source id, source location, destination id
//! (once known) and mapped location. All four indices live behind one lock so
//! a mutation that touches several of them is observed atomically.

use crate::entry::{ManifestEntry, MigrationStatus};
use crate::error::{Error, Result};
use crate::reference::{ContentLocation, ContentReference, ContentType};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::warn;
use uuid::Uuid;

/// Statistics for one partition
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartitionStats {
    pub total: u64,
    pub pending: u64,
    pub migrated: u64,
    pub skipped: u64,
    pub failed: u64,
    pub canceled: u64,
}

impl PartitionStats {
    /// Share of entries that are Migrated or Skipped
    pub fn completion_percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            ((self.migrated + self.skipped) as f64 / self.total as f64) * 100.0
        }
    }

    /// Check if every entry reached Migrated or Skipped
    pub fn is_complete(&self) -> bool {
        self.migrated + self.skipped == self.total
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    fn record(&mut self, status: MigrationStatus) {
        self.total += 1;
        match status {
            MigrationStatus::Pending => self.pending += 1,
            MigrationStatus::Migrated => self.migrated += 1,
            MigrationStatus::Skipped => self.skipped += 1,
            MigrationStatus::Failed => self.failed += 1,
            MigrationStatus::Canceled => self.canceled += 1,
        }
    }
}

#[derive(Debug, Default)]
struct PartitionIndex {
    entries: HashMap<Uuid, ManifestEntry>,
    order: Vec<Uuid>,
    by_source_location: HashMap<ContentLocation, Uuid>,
    by_destination_id: HashMap<Uuid, Uuid>,
    by_mapped_location: HashMap<ContentLocation, Uuid>,
    /// Source ids returned by `get_or_add` in this run
    enumerated: HashSet<Uuid>,
}

impl PartitionIndex {
    fn get(&self, source_id: &Uuid) -> Option<ManifestEntry> {
        self.entries.get(source_id).cloned()
    }

    fn insert(&mut self, entry: ManifestEntry) {
        let id = entry.source().id;
        self.index_location(LocationIndex::Source, entry.source().location.clone(), id);
        self.index_location(LocationIndex::Mapped, entry.mapped_location().clone(), id);
        if let Some(dest) = entry.destination() {
            self.by_destination_id.insert(dest.id, id);
        }
        if self.entries.insert(id, entry).is_none() {
            self.order.push(id);
        }
    }

    fn index_location(&mut self, which: LocationIndex, location: ContentLocation, id: Uuid) {
        let index = match which {
            LocationIndex::Source => &mut self.by_source_location,
            LocationIndex::Mapped => &mut self.by_mapped_location,
        };
        if let Some(previous) = index.insert(location.clone(), id) {
            if previous != id {
                warn!(
                    location = %location,
                    previous = %previous,
                    current = %id,
                    index = which.name(),
                    "Duplicate manifest location; latest entry wins"
                );
            }
        }
    }

    fn unindex_location(&mut self, which: LocationIndex, location: &ContentLocation, id: Uuid) {
        let index = match which {
            LocationIndex::Source => &mut self.by_source_location,
            LocationIndex::Mapped => &mut self.by_mapped_location,
        };
        if index.get(location) == Some(&id) {
            index.remove(location);
        }
    }

    fn set_destination(&mut self, source_id: Uuid, destination: ContentReference) -> Result<ManifestEntry> {
        let entry = self
            .entries
            .get_mut(&source_id)
            .ok_or(Error::UnknownEntry(source_id))?;
        if let Some(old) = entry.destination() {
            let old_id = old.id;
            if self.by_destination_id.get(&old_id) == Some(&source_id) {
                self.by_destination_id.remove(&old_id);
            }
        }
        self.by_destination_id.insert(destination.id, source_id);
        entry.set_destination(destination);
        Ok(entry.clone())
    }

    fn update<F>(&mut self, source_id: Uuid, f: F) -> Result<ManifestEntry>
    where
        F: FnOnce(&mut ManifestEntry) -> Result<()>,
    {
        let entry = self
            .entries
            .get_mut(&source_id)
            .ok_or(Error::UnknownEntry(source_id))?;
        f(entry)?;
        Ok(entry.clone())
    }
}

#[derive(Debug, Clone, Copy)]
enum LocationIndex {
    Source,
    Mapped,
}

impl LocationIndex {
    fn name(self) -> &'static str {
        match self {
            LocationIndex::Source => "source_location",
            LocationIndex::Mapped => "mapped_location",
        }
    }
}

/// All manifest entries of one content type
#[derive(Debug)]
pub struct ManifestEntryPartition {
    content_type: ContentType,
    index: RwLock<PartitionIndex>,
}

impl ManifestEntryPartition {
    pub fn new(content_type: ContentType) -> Self {
        Self {
            content_type,
            index: RwLock::new(PartitionIndex::default()),
        }
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Return the entry for an enumerated source item, creating it if needed
    ///
    /// A carried-over entry matches by source id first and by source location
    /// second (the item was recreated at the same place). The stored source
    /// reference is refreshed so moved items stay findable. An entry already
    /// enumerated in this run is never re-keyed to another id.
    pub fn get_or_add(&self, source: &ContentReference) -> ManifestEntry {
        let mut index = self.index.write();
        index.enumerated.insert(source.id);

        let existing_id = if index.entries.contains_key(&source.id) {
            Some(source.id)
        } else {
            index
                .by_source_location
                .get(&source.location)
                .copied()
                .filter(|id| !index.enumerated.contains(id))
        };
        let existing = existing_id.and_then(|id| index.entries.get(&id).cloned().map(|e| (id, e)));

        let Some((id, mut entry)) = existing else {
            let entry = ManifestEntry::new(source.clone());
            index.insert(entry.clone());
            return entry;
        };
        if entry.source() == source {
            return entry;
        }

        let old_location = entry.source().location.clone();
        index.unindex_location(LocationIndex::Source, &old_location, id);
        if id != source.id {
            // Re-key under the new source id
            index.entries.remove(&id);
            index.order.retain(|x| *x != id);
            let mapped = entry.mapped_location().clone();
            index.unindex_location(LocationIndex::Mapped, &mapped, id);
            if let Some(dest) = entry.destination() {
                index.by_destination_id.remove(&dest.id);
            }
        }
        entry.set_source(source.clone());
        index.insert(entry.clone());
        entry
    }

    /// Insert a carried-over entry, resetting non-migrated statuses for the new run
    pub fn seed(&self, mut entry: ManifestEntry) {
        entry.reset_for_new_run();
        self.index.write().insert(entry);
    }

    /// Insert an entry exactly as given (used when restoring a persisted manifest)
    pub fn restore(&self, entry: ManifestEntry) {
        self.index.write().insert(entry);
    }

    /// Record the destination equivalent of a source item
    pub fn destination_found(
        &self,
        source_id: Uuid,
        destination: ContentReference,
    ) -> Result<ManifestEntry> {
        self.index.write().set_destination(source_id, destination)
    }

    /// Record a destination item found at a mapped location, if an entry maps there
    pub fn destination_found_at(
        &self,
        mapped_location: &ContentLocation,
        destination: ContentReference,
    ) -> Option<ManifestEntry> {
        let mut index = self.index.write();
        let source_id = *index.by_mapped_location.get(mapped_location)?;
        index.set_destination(source_id, destination).ok()
    }

    /// Relocate an entry's destination location
    pub fn map_location(&self, source_id: Uuid, location: ContentLocation) -> Result<ManifestEntry> {
        let mut index = self.index.write();
        let old = index
            .entries
            .get(&source_id)
            .map(|e| e.mapped_location().clone())
            .ok_or(Error::UnknownEntry(source_id))?;
        if old == location {
            return index.get(&source_id).ok_or(Error::UnknownEntry(source_id));
        }
        index.unindex_location(LocationIndex::Mapped, &old, source_id);
        index.index_location(LocationIndex::Mapped, location.clone(), source_id);
        index.update(source_id, |e| {
            e.set_mapped_location(location);
            Ok(())
        })
    }

    /// Move a pending entry to a terminal status
    pub fn set_status(&self, source_id: Uuid, status: MigrationStatus) -> Result<ManifestEntry> {
        self.index.write().update(source_id, |e| e.transition(status))
    }

    pub fn mark_migrated(&self, source_id: Uuid) -> Result<ManifestEntry> {
        self.set_status(source_id, MigrationStatus::Migrated)
    }

    pub fn mark_skipped(&self, source_id: Uuid) -> Result<ManifestEntry> {
        self.set_status(source_id, MigrationStatus::Skipped)
    }

    pub fn mark_canceled(&self, source_id: Uuid) -> Result<ManifestEntry> {
        self.set_status(source_id, MigrationStatus::Canceled)
    }

    /// Record errors and move the entry to Failed
    pub fn mark_failed<I>(&self, source_id: Uuid, errors: I) -> Result<ManifestEntry>
    where
        I: IntoIterator<Item = String>,
    {
        self.index.write().update(source_id, |e| {
            e.transition(MigrationStatus::Failed)?;
            for error in errors {
                e.push_error(error);
            }
            Ok(())
        })
    }

    pub fn by_source_id(&self, source_id: &Uuid) -> Option<ManifestEntry> {
        self.index.read().get(source_id)
    }

    pub fn by_source_location(&self, location: &ContentLocation) -> Option<ManifestEntry> {
        let index = self.index.read();
        index.by_source_location.get(location).and_then(|id| index.get(id))
    }

    pub fn by_destination_id(&self, destination_id: &Uuid) -> Option<ManifestEntry> {
        let index = self.index.read();
        index
            .by_destination_id
            .get(destination_id)
            .and_then(|id| index.get(id))
    }

    pub fn by_mapped_location(&self, location: &ContentLocation) -> Option<ManifestEntry> {
        let index = self.index.read();
        index.by_mapped_location.get(location).and_then(|id| index.get(id))
    }

    /// Snapshot of all entries in discovery order
    pub fn entries(&self) -> Vec<ManifestEntry> {
        let index = self.index.read();
        index.order.iter().filter_map(|id| index.get(id)).collect()
    }

    pub fn len(&self) -> usize {
        self.index.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> PartitionStats {
        let index = self.index.read();
        let mut stats = PartitionStats::default();
        for entry in index.entries.values() {
            stats.record(entry.status());
        }
        stats
    }

    /// Check that every index key points at an entry carrying that key
    pub fn verify_indices(&self) -> Result<()> {
        let index = self.index.read();
        let check = |ok: bool, what: &str, key: &dyn std::fmt::Display| {
            if ok {
                Ok(())
            } else {
                Err(Error::validation(format!(
                    "partition '{}': {} index entry {} is stale",
                    self.content_type, what, key
                )))
            }
        };

        for (location, id) in &index.by_source_location {
            let ok = index
                .entries
                .get(id)
                .is_some_and(|e| &e.source().location == location);
            check(ok, "source location", location)?;
        }
        for (location, id) in &index.by_mapped_location {
            let ok = index
                .entries
                .get(id)
                .is_some_and(|e| e.mapped_location() == location);
            check(ok, "mapped location", location)?;
        }
        for (dest_id, id) in &index.by_destination_id {
            let ok = index
                .entries
                .get(id)
                .and_then(|e| e.destination())
                .is_some_and(|d| &d.id == dest_id);
            check(ok, "destination id", dest_id)?;
        }
        for (id, entry) in &index.entries {
            check(&entry.source().id == id, "source id", id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn reference(path: &str) -> ContentReference {
        ContentReference::new(Uuid::new_v4(), path.parse().unwrap())
    }

    fn partition() -> ManifestEntryPartition {
        ManifestEntryPartition::new(ContentType::new("workbook"))
    }

    #[test]
    fn test_all_four_indices_after_mutations() {
        let p = partition();
        let source = reference("Sales/Pipeline");
        p.get_or_add(&source);

        let mapped: ContentLocation = "Migrated/Sales/Pipeline".parse().unwrap();
        p.map_location(source.id, mapped.clone()).unwrap();

        let dest = reference("Migrated/Sales/Pipeline");
        p.destination_found(source.id, dest.clone()).unwrap();
        p.mark_migrated(source.id).unwrap();

        let by_id = p.by_source_id(&source.id).unwrap();
        assert_eq!(p.by_source_location(&source.location).unwrap(), by_id);
        assert_eq!(p.by_destination_id(&dest.id).unwrap(), by_id);
        assert_eq!(p.by_mapped_location(&mapped).unwrap(), by_id);
        assert!(p.by_mapped_location(&source.location).is_none());
        assert_eq!(by_id.status(), MigrationStatus::Migrated);
        p.verify_indices().unwrap();
    }

    #[test]
    fn test_destination_replaced_drops_old_key() {
        let p = partition();
        let source = reference("A");
        p.get_or_add(&source);

        let first = reference("A");
        let second = reference("A");
        p.destination_found(source.id, first.clone()).unwrap();
        p.destination_found(source.id, second.clone()).unwrap();

        assert!(p.by_destination_id(&first.id).is_none());
        assert_eq!(
            p.by_destination_id(&second.id).unwrap().source().id,
            source.id
        );
        p.verify_indices().unwrap();
    }

    #[test]
    fn test_get_or_add_is_idempotent() {
        let p = partition();
        let source = reference("A/B");
        let first = p.get_or_add(&source);
        let second = p.get_or_add(&source);
        assert_eq!(first, second);
        assert_eq!(p.len(), 1);
    }

    #[test]
    fn test_get_or_add_follows_moved_source() {
        let p = partition();
        let mut source = reference("Old/Report");
        p.get_or_add(&source);

        source.location = "New/Report".parse().unwrap();
        p.get_or_add(&source);

        assert_eq!(p.len(), 1);
        assert!(p.by_source_location(&"Old/Report".parse().unwrap()).is_none());
        assert!(p.by_source_location(&source.location).is_some());
        p.verify_indices().unwrap();
    }

    #[test]
    fn test_get_or_add_rekeys_recreated_item_at_same_location() {
        let p = partition();
        let original = reference("Team/Report");
        p.seed(ManifestEntry::new(original.clone()));
        let dest = reference("Team/Report");
        p.destination_found(original.id, dest.clone()).unwrap();

        let recreated = ContentReference::new(Uuid::new_v4(), original.location.clone());
        let entry = p.get_or_add(&recreated);

        assert_eq!(entry.source().id, recreated.id);
        assert_eq!(p.len(), 1);
        assert!(p.by_source_id(&original.id).is_none());
        assert_eq!(
            p.by_destination_id(&dest.id).unwrap().source().id,
            recreated.id
        );
        p.verify_indices().unwrap();
    }

    #[test]
    fn test_two_items_listed_at_one_location_keep_their_entries() {
        let p = partition();
        let first = reference("Team/Report");
        let second = ContentReference::new(Uuid::new_v4(), first.location.clone());

        p.get_or_add(&first);
        let entry = p.get_or_add(&second);

        assert_eq!(entry.source().id, second.id);
        assert_eq!(p.len(), 2);
        p.mark_migrated(first.id).unwrap();
        p.mark_failed(second.id, ["duplicate".to_string()]).unwrap();
        assert_eq!(p.by_source_id(&first.id).unwrap().status(), MigrationStatus::Migrated);
        assert_eq!(p.by_source_id(&second.id).unwrap().status(), MigrationStatus::Failed);
        p.verify_indices().unwrap();
    }

    #[test]
    fn test_destination_found_at_mapped_location() {
        let p = partition();
        let source = reference("Finance");
        p.get_or_add(&source);

        let dest = reference("Finance");
        let updated = p.destination_found_at(&source.location, dest.clone()).unwrap();
        assert_eq!(updated.destination(), Some(&dest));

        assert!(p
            .destination_found_at(&"Elsewhere".parse().unwrap(), reference("Elsewhere"))
            .is_none());
    }

    #[test]
    fn test_mark_failed_records_errors_and_blocks_further_changes() {
        let p = partition();
        let source = reference("A");
        p.get_or_add(&source);
        let failed = p
            .mark_failed(source.id, vec!["publish rejected".to_string()])
            .unwrap();
        assert_eq!(failed.status(), MigrationStatus::Failed);
        assert_eq!(failed.errors(), ["publish rejected".to_string()]);
        assert!(p.mark_migrated(source.id).is_err());
    }

    #[test]
    fn test_unknown_entry_errors() {
        let p = partition();
        let id = Uuid::new_v4();
        assert!(matches!(p.mark_skipped(id), Err(Error::UnknownEntry(x)) if x == id));
        assert!(p.map_location(id, "X".parse().unwrap()).is_err());
    }

    #[test]
    fn test_stats() {
        let p = partition();
        let refs: Vec<_> = (0..4).map(|i| reference(&format!("Item{}", i))).collect();
        for r in &refs {
            p.get_or_add(r);
        }
        p.mark_migrated(refs[0].id).unwrap();
        p.mark_skipped(refs[1].id).unwrap();
        p.mark_failed(refs[2].id, Vec::new()).unwrap();

        let stats = p.stats();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.migrated, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.completion_percent(), 50.0);
        assert!(!stats.is_complete());
        assert!(stats.has_failures());
    }

    #[test]
    fn test_concurrent_mutations_keep_indices_consistent() {
        let p = Arc::new(partition());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let p = p.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let source = reference(&format!("T{}/Item{}", t, i));
                        p.get_or_add(&source);
                        let mapped: ContentLocation =
                            format!("Mapped/T{}/Item{}", t, i).parse().unwrap();
                        p.map_location(source.id, mapped.clone()).unwrap();
                        let dest = ContentReference::new(Uuid::new_v4(), mapped);
                        p.destination_found(source.id, dest).unwrap();
                        p.mark_migrated(source.id).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(p.len(), 400);
        assert_eq!(p.stats().migrated, 400);
        p.verify_indices().unwrap();
        for entry in p.entries() {
            let dest = entry.destination().unwrap();
            assert_eq!(p.by_destination_id(&dest.id).unwrap(), entry);
            assert_eq!(p.by_mapped_location(entry.mapped_location()).unwrap(), entry);
        }
    }
}

//! Track cache: one current record per entity identity.
//!
//! Every mutation goes through a single `DashMap` entry, so the lookup, the
//! marking-lock merge and the store happen under one shard lock and never
//! across I/O.

use dashmap::DashMap;
use tracing::debug;
use trackbridge_core::types::{EntityIdentity, TrackRecord};

#[derive(Debug, Default)]
struct Slot {
    record: Option<TrackRecord>,
    /// User-assigned marking; Some means locked
    locked_marking: Option<String>,
    publish: Option<bool>,
}

impl Slot {
    fn apply(&self, record: &mut TrackRecord) {
        if let Some(marking) = &self.locked_marking {
            record.custom_marking = marking.clone();
            record.marking_locked = true;
        } else {
            record.marking_locked = false;
        }

        if let Some(publish) = self.publish {
            record.publish = publish;
        }

        if record.custom_marking.trim().is_empty() {
            record.custom_marking = record.identity.to_string();
        }
    }
}

/// Concurrent store of the latest state of every observed entity.
///
/// Records are never removed; pruning stale tracks is left to consumers.
#[derive(Debug, Default)]
pub struct TrackCache {
    slots: DashMap<EntityIdentity, Slot>,
}

impl TrackCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a freshly decoded record into the cache and returns the stored copy.
    ///
    /// A locked marking always wins over the candidate's marking, and a
    /// record without a marking gets its identity string as the label.
    pub fn upsert(&self, mut candidate: TrackRecord) -> TrackRecord {
        let identity = candidate.identity;
        let mut slot = self.slots.entry(identity).or_default();

        slot.apply(&mut candidate);
        slot.record = Some(candidate.clone());

        debug!(
            identity = %identity,
            marking = %candidate.custom_marking,
            locked = candidate.marking_locked,
            "Track cached"
        );
        candidate
    }

    /// Sets or clears the marking lock for an identity.
    ///
    /// A lock set before the entity is first seen applies to its first
    /// record. Unlocking keeps the given marking until the next update
    /// replaces it. Returns the updated record if the entity is cached.
    pub fn set_lock(
        &self,
        identity: EntityIdentity,
        marking: &str,
        locked: bool,
    ) -> Option<TrackRecord> {
        let mut slot = self.slots.entry(identity).or_default();
        slot.locked_marking = locked.then(|| marking.to_string());

        let mut record = slot.record.take()?;
        record.custom_marking = marking.to_string();
        slot.apply(&mut record);
        slot.record = Some(record.clone());
        Some(record)
    }

    /// Controls whether the entity is forwarded as CoT.
    ///
    /// The flag survives later updates. Returns the updated record if the
    /// entity is cached.
    pub fn set_publish(&self, identity: EntityIdentity, publish: bool) -> Option<TrackRecord> {
        let mut slot = self.slots.entry(identity).or_default();
        slot.publish = Some(publish);

        let record = slot.record.as_mut()?;
        record.publish = publish;
        Some(record.clone())
    }

    pub fn get(&self, identity: &EntityIdentity) -> Option<TrackRecord> {
        self.slots.get(identity).and_then(|slot| slot.record.clone())
    }

    pub fn contains(&self, identity: &EntityIdentity) -> bool {
        self.slots
            .get(identity)
            .map(|slot| slot.record.is_some())
            .unwrap_or(false)
    }

    /// All cached records, ordered by identity.
    pub fn snapshot(&self) -> Vec<TrackRecord> {
        let mut records: Vec<TrackRecord> = self
            .slots
            .iter()
            .filter_map(|slot| slot.record.clone())
            .collect();
        records.sort_by_key(|r| r.identity);
        records
    }

    /// Number of cached records.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.record.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

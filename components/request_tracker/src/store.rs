//! Insertion-ordered table of logical requests
//!
//! Records are only ever removed all at once via [`RequestStore::clear`]; a capture session is
//! reset, never edited.

use crate::record::{LogicalRequest, RequestPatch};
use cdp_types::RequestId;
use std::collections::HashMap;
use tracing::debug;

/// Outcome of [`RequestStore::upsert_create`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// A new record was appended
    Created,
    /// The id was already present; the incoming fields were merged instead
    Merged,
}

/// The canonical request collection
#[derive(Debug, Default, Clone)]
pub struct RequestStore {
    records: HashMap<RequestId, LogicalRequest>,
    order: Vec<RequestId>,
}

impl RequestStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` if its id is new, otherwise merge `patch` into the existing record
    ///
    /// Ordering is only affected on creation.
    pub fn upsert_create(&mut self, record: LogicalRequest, patch: RequestPatch) -> Upsert {
        if let Some(existing) = self.records.get_mut(&record.id) {
            patch.apply_to(existing);
            return Upsert::Merged;
        }
        self.order.push(record.id.clone());
        self.records.insert(record.id.clone(), record);
        Upsert::Created
    }

    /// Merge a partial update into an existing record
    ///
    /// Returns `false` (and changes nothing) when the id is unknown, which is the normal
    /// outcome of an event racing ahead of its initiating event.
    pub fn merge(&mut self, id: &RequestId, patch: RequestPatch) -> bool {
        match self.records.get_mut(id) {
            Some(record) => {
                patch.apply_to(record);
                true
            }
            None => {
                debug!("Ignoring update for unknown request: {}", id);
                false
            }
        }
    }

    /// Mutate an existing record in place
    pub fn update<F>(&mut self, id: &RequestId, f: F) -> bool
    where
        F: FnOnce(&mut LogicalRequest),
    {
        match self.records.get_mut(id) {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }

    /// Look up a record
    pub fn get(&self, id: &RequestId) -> Option<&LogicalRequest> {
        self.records.get(id)
    }

    /// Whether a record exists for `id`
    pub fn contains(&self, id: &RequestId) -> bool {
        self.records.contains_key(id)
    }

    /// All records in insertion order
    pub fn list_all(&self) -> impl Iterator<Item = &LogicalRequest> + '_ {
        self.order.iter().filter_map(move |id| self.records.get(id))
    }

    /// Ids in insertion order
    pub fn ids(&self) -> &[RequestId] {
        &self.order
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Remove every record
    pub fn clear(&mut self) {
        debug!("Clearing {} tracked requests", self.order.len());
        self.records.clear();
        self.order.clear();
    }
}

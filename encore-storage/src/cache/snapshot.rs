//! Immutable view of one collection.
//!
//! All helpers return a new snapshot; the cache swaps whole snapshots in and
//! never mutates one in place.

use encore_core::{Record, RecordId};

/// Ordered records of one kind as the client currently believes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSnapshot {
    records: Vec<Record>,
}

impl CollectionSnapshot {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    pub fn find(&self, id: &RecordId) -> Option<&Record> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.find(id).is_some()
    }

    pub fn position(&self, id: &RecordId) -> Option<usize> {
        self.records.iter().position(|r| &r.id == id)
    }

    /// New snapshot with `record` in front.
    pub fn prepend(&self, record: Record) -> Self {
        let mut records = Vec::with_capacity(self.records.len() + 1);
        records.push(record);
        records.extend(self.records.iter().cloned());
        Self { records }
    }

    /// New snapshot with `record` at `index`, or last when `index` is past
    /// the end.
    pub fn insert(&self, index: usize, record: Record) -> Self {
        let mut records = self.records.clone();
        records.insert(index.min(records.len()), record);
        Self { records }
    }

    /// New snapshot with the record matching `id` swapped for `record`, in
    /// the same position. Unchanged when `id` is absent.
    pub fn replace(&self, id: &RecordId, record: Record) -> Self {
        let mut records = self.records.clone();
        if let Some(slot) = records.iter_mut().find(|r| &r.id == id) {
            *slot = record;
        }
        Self { records }
    }

    /// New snapshot without the record matching `id`.
    pub fn remove(&self, id: &RecordId) -> Self {
        Self {
            records: self.records.iter().filter(|r| &r.id != id).cloned().collect(),
        }
    }

    /// New snapshot with `f` applied to the record matching `id`.
    pub fn update<F>(&self, id: &RecordId, f: F) -> Self
    where
        F: FnOnce(&mut Record),
    {
        let mut records = self.records.clone();
        if let Some(record) = records.iter_mut().find(|r| &r.id == id) {
            f(record);
        }
        Self { records }
    }

    /// Records still waiting on the remote store.
    pub fn pending(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| r.is_pending())
    }

    /// Whether no optimistic records are overlaid.
    pub fn is_settled(&self) -> bool {
        self.pending().next().is_none()
    }
}

impl From<Vec<Record>> for CollectionSnapshot {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

impl<'a> IntoIterator for &'a CollectionSnapshot {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

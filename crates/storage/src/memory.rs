// Path: crates/storage/src/memory.rs
//! In-memory stores.

use crate::range::range_records;
use ioi_api::state::{KvIter, KvStore, StateError, VersionedKvStore};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A `BTreeMap`-backed store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        self.data.remove(key);
        Ok(())
    }

    fn iterate(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Result<KvIter<'_>, StateError> {
        Ok(Box::new(range_records(&self.data, start, end, false).map(Ok)))
    }

    fn reverse_iterate(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<KvIter<'_>, StateError> {
        Ok(Box::new(range_records(&self.data, start, end, true).map(Ok)))
    }
}

/// A memory store that retains an immutable copy of every committed version.
#[derive(Debug, Default)]
pub struct VersionedMemoryStore {
    working: MemoryStore,
    versions: BTreeMap<u64, Arc<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl VersionedMemoryStore {
    /// Creates an empty store with no committed versions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots the working set as the next version and returns its number.
    pub fn commit(&mut self) -> u64 {
        let version = self.latest_version() + 1;
        self.versions
            .insert(version, Arc::new(self.working.data.clone()));
        version
    }
}

impl KvStore for VersionedMemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        self.working.get(key)
    }
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        self.working.set(key, value)
    }
    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        self.working.delete(key)
    }
    fn iterate(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Result<KvIter<'_>, StateError> {
        self.working.iterate(start, end)
    }
    fn reverse_iterate(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<KvIter<'_>, StateError> {
        self.working.reverse_iterate(start, end)
    }
}

impl VersionedKvStore for VersionedMemoryStore {
    fn latest_version(&self) -> u64 {
        self.versions.keys().next_back().copied().unwrap_or(0)
    }

    fn view_at(&self, version: u64) -> Result<Box<dyn KvStore + '_>, StateError> {
        let data = self
            .versions
            .get(&version)
            .cloned()
            .ok_or_else(|| StateError::Backend(format!("version {version} is not retained")))?;
        Ok(Box::new(VersionView { data }))
    }
}

/// A read-only view of one committed version.
struct VersionView {
    data: Arc<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl KvStore for VersionView {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], _value: &[u8]) -> Result<(), StateError> {
        Err(StateError::PermissionDenied(format!(
            "write to committed version: {}",
            hex::encode(key)
        )))
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        Err(StateError::PermissionDenied(format!(
            "delete from committed version: {}",
            hex::encode(key)
        )))
    }

    fn iterate(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Result<KvIter<'_>, StateError> {
        Ok(Box::new(range_records(&self.data, start, end, false).map(Ok)))
    }

    fn reverse_iterate(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<KvIter<'_>, StateError> {
        Ok(Box::new(range_records(&self.data, start, end, true).map(Ok)))
    }
}

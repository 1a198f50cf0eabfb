// Path: crates/storage/src/adapter.rs

//! Bridges from a host `KvStore` to the engine-facing `VmStore`.

use ioi_api::state::{KvStore, Order, Record, StateError, VmStore};

fn collect(
    store: &dyn KvStore,
    start: Option<&[u8]>,
    end: Option<&[u8]>,
    order: Order,
) -> Result<Vec<Record>, StateError> {
    let it = match order {
        Order::Ascending => store.iterate(start, end)?,
        Order::Descending => store.reverse_iterate(start, end)?,
    };
    it.collect()
}

/// Exposes a host store to the engine as a pure pass-through.
pub struct StoreAdapter<'a> {
    parent: &'a mut dyn KvStore,
}

impl<'a> StoreAdapter<'a> {
    /// Wraps `parent`. An absent store is a wiring error and is rejected here
    /// rather than at first use.
    pub fn new(parent: Option<&'a mut dyn KvStore>) -> Result<Self, StateError> {
        let parent = parent
            .ok_or_else(|| StateError::Misconfigured("store adapter requires a store".into()))?;
        Ok(Self { parent })
    }
}

impl VmStore for StoreAdapter<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        self.parent.get(key)
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        self.parent.set(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        self.parent.delete(key)
    }

    fn scan(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
    ) -> Result<Vec<Record>, StateError> {
        collect(&*self.parent, start, end, order)
    }
}

/// Exposes a host store to the engine for query-phase calls. Writes are denied.
pub struct ReadOnlyStoreAdapter<'a> {
    parent: &'a dyn KvStore,
}

impl<'a> ReadOnlyStoreAdapter<'a> {
    /// Wraps `parent`. An absent store is rejected.
    pub fn new(parent: Option<&'a dyn KvStore>) -> Result<Self, StateError> {
        let parent = parent
            .ok_or_else(|| StateError::Misconfigured("store adapter requires a store".into()))?;
        Ok(Self { parent })
    }
}

impl VmStore for ReadOnlyStoreAdapter<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        self.parent.get(key)
    }

    fn set(&mut self, key: &[u8], _value: &[u8]) -> Result<(), StateError> {
        Err(StateError::PermissionDenied(format!(
            "write attempted in read-only query context: {}",
            hex::encode(key)
        )))
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        Err(StateError::PermissionDenied(format!(
            "delete attempted in read-only query context: {}",
            hex::encode(key)
        )))
    }

    fn scan(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
    ) -> Result<Vec<Record>, StateError> {
        collect(self.parent, start, end, order)
    }
}

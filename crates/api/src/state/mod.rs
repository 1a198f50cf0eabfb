// Path: crates/api/src/state/mod.rs
//! Key-value store capabilities.
//!
//! [`KvStore`] is the host-side store a client is given. [`VmStore`] is the
//! narrower capability handed to the engine; it returns owned records so the
//! guest can interleave scans with writes.

pub use ioi_types::error::StateError;

/// A key/value pair.
pub type Record = (Vec<u8>, Vec<u8>);

/// A fallible iterator over records borrowed from a store.
pub type KvIter<'a> = Box<dyn Iterator<Item = Result<Record, StateError>> + 'a>;

/// Iteration direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    /// Increasing key order.
    Ascending,
    /// Decreasing key order.
    Descending,
}

impl TryFrom<u32> for Order {
    type Error = StateError;

    fn try_from(v: u32) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Self::Ascending),
            2 => Ok(Self::Descending),
            other => Err(StateError::InvalidValue(format!("unknown iteration order {other}"))),
        }
    }
}

/// A dyn-safe key-value store.
///
/// Ranges are half-open `[start, end)`; `None` leaves a side unbounded.
pub trait KvStore: Send + Sync {
    /// Gets a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError>;

    /// Returns whether a key is present.
    fn has(&self, key: &[u8]) -> Result<bool, StateError> {
        Ok(self.get(key)?.is_some())
    }

    /// Inserts or overwrites a value.
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError>;

    /// Deletes a key. Deleting an absent key is not an error.
    fn delete(&mut self, key: &[u8]) -> Result<(), StateError>;

    /// Iterates `[start, end)` in ascending key order.
    fn iterate(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Result<KvIter<'_>, StateError>;

    /// Iterates `[start, end)` in descending key order.
    fn reverse_iterate(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<KvIter<'_>, StateError>;
}

// Blanket implementation to allow `KvStore` to be used behind a `Box` trait object.
impl<T: KvStore + ?Sized> KvStore for Box<T> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        (**self).get(key)
    }
    fn has(&self, key: &[u8]) -> Result<bool, StateError> {
        (**self).has(key)
    }
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        (**self).set(key, value)
    }
    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        (**self).delete(key)
    }
    fn iterate(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Result<KvIter<'_>, StateError> {
        (**self).iterate(start, end)
    }
    fn reverse_iterate(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<KvIter<'_>, StateError> {
        (**self).reverse_iterate(start, end)
    }
}

impl<T: KvStore + ?Sized> KvStore for &mut T {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        (**self).get(key)
    }
    fn has(&self, key: &[u8]) -> Result<bool, StateError> {
        (**self).has(key)
    }
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        (**self).set(key, value)
    }
    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        (**self).delete(key)
    }
    fn iterate(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Result<KvIter<'_>, StateError> {
        (**self).iterate(start, end)
    }
    fn reverse_iterate(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<KvIter<'_>, StateError> {
        (**self).reverse_iterate(start, end)
    }
}

/// The store capability the engine requires.
pub trait VmStore: Send {
    /// Gets a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError>;
    /// Inserts or overwrites a value.
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError>;
    /// Deletes a key.
    fn delete(&mut self, key: &[u8]) -> Result<(), StateError>;
    /// Collects `[start, end)` in the requested order.
    fn scan(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        order: Order,
    ) -> Result<Vec<Record>, StateError>;
}

/// A store that retains read-only views of committed versions.
pub trait VersionedKvStore: Send + Sync {
    /// The most recently committed version, or 0 if nothing was committed.
    fn latest_version(&self) -> u64;

    /// Returns a read-only view of the store as committed at `version`.
    fn view_at(&self, version: u64) -> Result<Box<dyn KvStore + '_>, StateError>;
}

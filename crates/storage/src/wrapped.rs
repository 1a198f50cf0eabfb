// Path: crates/storage/src/wrapped.rs

//! A dual-prefix router that merges two stores into one keyspace.
//!
//! Used only while recovering a client from a substitute: the contract sees a
//! single store in which `first_prefix` keys reach the first store and every
//! other key reaches the second. Matched prefixes are stripped before
//! delegating; callers always address keys with the original prefix.

use crate::range::next_prefix;
use ioi_api::state::{KvIter, KvStore, StateError};

/// One side of a `WrappedStore`, either writable or read-only.
pub enum StoreSide<'a> {
    /// Reads and writes pass through.
    ReadWrite(&'a mut dyn KvStore),
    /// Reads pass through; writes are denied.
    ReadOnly(&'a dyn KvStore),
}

impl StoreSide<'_> {
    fn reader(&self) -> &dyn KvStore {
        match self {
            Self::ReadWrite(s) => &**s,
            Self::ReadOnly(s) => *s,
        }
    }

    fn writer(&mut self, key: &[u8]) -> Result<&mut dyn KvStore, StateError> {
        match self {
            Self::ReadWrite(s) => Ok(&mut **s),
            Self::ReadOnly(_) => Err(StateError::PermissionDenied(format!(
                "write to read-only side of wrapped store: {}",
                hex::encode(key)
            ))),
        }
    }
}

/// Which routing class a key falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    First,
    SecondPrefixed,
    SecondBare,
}

/// Routes keys between two stores by literal prefix ("first-prefix-or-else").
pub struct WrappedStore<'a> {
    first: StoreSide<'a>,
    second: StoreSide<'a>,
    first_prefix: Vec<u8>,
    second_prefix: Vec<u8>,
}

impl<'a> WrappedStore<'a> {
    /// Creates a router over the two sides.
    pub fn new(
        first: StoreSide<'a>,
        second: StoreSide<'a>,
        first_prefix: impl Into<Vec<u8>>,
        second_prefix: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            first,
            second,
            first_prefix: first_prefix.into(),
            second_prefix: second_prefix.into(),
        }
    }

    fn route(&self, key: &[u8]) -> Route {
        if key.starts_with(&self.first_prefix) {
            Route::First
        } else if key.starts_with(&self.second_prefix) {
            Route::SecondPrefixed
        } else {
            Route::SecondBare
        }
    }

    fn trim<'k>(&self, key: &'k [u8]) -> &'k [u8] {
        key.strip_prefix(self.first_prefix.as_slice())
            .or_else(|| key.strip_prefix(self.second_prefix.as_slice()))
            .unwrap_or(key)
    }

    fn side(&self, route: Route) -> &dyn KvStore {
        match route {
            Route::First => self.first.reader(),
            Route::SecondPrefixed | Route::SecondBare => self.second.reader(),
        }
    }

    /// Resolves a range to one side and its translated bounds.
    ///
    /// Ranges are routed by `start`. An `end` on the other side of the routing
    /// boundary is rejected, except for the exclusive upper bound of the start
    /// key's prefix, which maps to an unbounded end on that side.
    fn resolve_range(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<(Route, Option<Vec<u8>>, Option<Vec<u8>>), StateError> {
        let route = self.route(start.unwrap_or_default());
        let trimmed_start = start.map(|s| self.trim(s).to_vec());
        let trimmed_end = match end {
            None => None,
            Some(e) => {
                let owning_prefix = match route {
                    Route::First => Some(self.first_prefix.as_slice()),
                    Route::SecondPrefixed => Some(self.second_prefix.as_slice()),
                    Route::SecondBare => None,
                };
                let is_prefix_bound = owning_prefix
                    .and_then(next_prefix)
                    .is_some_and(|ub| ub.as_slice() == e);
                if is_prefix_bound {
                    None
                } else if self.route(e) == route {
                    Some(self.trim(e).to_vec())
                } else {
                    return Err(StateError::InvalidRange(format!(
                        "range [{}, {}) straddles the wrapped store prefixes",
                        hex::encode(start.unwrap_or_default()),
                        hex::encode(e)
                    )));
                }
            }
        };
        Ok((route, trimmed_start, trimmed_end))
    }
}

impl KvStore for WrappedStore<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        self.side(self.route(key)).get(self.trim(key))
    }

    fn has(&self, key: &[u8]) -> Result<bool, StateError> {
        self.side(self.route(key)).has(self.trim(key))
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        let trimmed = self.trim(key).to_vec();
        match self.route(key) {
            Route::First => self.first.writer(key)?.set(&trimmed, value),
            _ => self.second.writer(key)?.set(&trimmed, value),
        }
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        let trimmed = self.trim(key).to_vec();
        match self.route(key) {
            Route::First => self.first.writer(key)?.delete(&trimmed),
            _ => self.second.writer(key)?.delete(&trimmed),
        }
    }

    fn iterate(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Result<KvIter<'_>, StateError> {
        let (route, s, e) = self.resolve_range(start, end)?;
        self.side(route).iterate(s.as_deref(), e.as_deref())
    }

    fn reverse_iterate(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<KvIter<'_>, StateError> {
        let (route, s, e) = self.resolve_range(start, end)?;
        self.side(route).reverse_iterate(s.as_deref(), e.as_deref())
    }
}

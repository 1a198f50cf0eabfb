// Path: crates/storage/src/cache.rs

//! A copy-on-write write buffer over a store.

use ioi_api::state::{KvIter, KvStore, Record, StateError};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::iter::{Fuse, Peekable};
use tracing::trace;

struct MergingIterator<'a, W>
where
    W: Iterator<Item = (&'a Vec<u8>, &'a Option<Vec<u8>>)>,
{
    base: Peekable<Fuse<KvIter<'a>>>,
    writes: Peekable<W>,
    descending: bool,
}

impl<'a, W> Iterator for MergingIterator<'a, W>
where
    W: Iterator<Item = (&'a Vec<u8>, &'a Option<Vec<u8>>)>,
{
    type Item = Result<Record, StateError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // Surface backend errors as soon as they reach the head of the base stream.
            if matches!(self.base.peek(), Some(Err(_))) {
                return self.base.next();
            }
            let base_key = self
                .base
                .peek()
                .and_then(|res| res.as_ref().ok().map(|(k, _)| k.as_slice()));
            let write_key = self.writes.peek().map(|(k, _)| k.as_slice());

            let decision = match (base_key, write_key) {
                (Some(bk), Some(wk)) => {
                    let ord = bk.cmp(wk);
                    Some(if self.descending { ord.reverse() } else { ord })
                }
                (Some(_), None) => Some(Ordering::Less),
                (None, Some(_)) => Some(Ordering::Greater),
                (None, None) => None,
            };

            match decision {
                Some(Ordering::Less) => return self.base.next(),
                Some(Ordering::Greater) => {
                    if let Some((key, Some(val))) = self.writes.next() {
                        return Some(Ok((key.clone(), val.clone())));
                    }
                }
                Some(Ordering::Equal) => {
                    self.base.next();
                    if let Some((key, Some(val))) = self.writes.next() {
                        return Some(Ok((key.clone(), val.clone())));
                    }
                }
                None => return None,
            }
        }
    }
}

/// An in-memory, copy-on-write buffer for any `KvStore`.
///
/// Reads are first checked against the local `writes` cache and fall back to
/// the base store. Writes are captured locally and reach the base only through
/// [`CacheStore::write`]; dropping the cache discards them.
pub struct CacheStore<'a> {
    base: &'a mut dyn KvStore,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> CacheStore<'a> {
    /// Creates an empty buffer on top of `base`.
    pub fn new(base: &'a mut dyn KvStore) -> Self {
        Self {
            base,
            writes: BTreeMap::new(),
        }
    }

    /// Flushes buffered writes to the base store in key order.
    pub fn write(self) -> Result<usize, StateError> {
        let count = self.writes.len();
        for (key, value_opt) in &self.writes {
            match value_opt {
                Some(value) => self.base.set(key, value)?,
                None => self.base.delete(key)?,
            }
        }
        trace!(target: "storage", count, "flushed cache store");
        Ok(count)
    }

    fn merged<'s>(
        &'s self,
        base: KvIter<'s>,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
        descending: bool,
    ) -> KvIter<'s> {
        let Some(b) = crate::range::bounds(start, end) else {
            return Box::new(std::iter::empty());
        };
        let range = self.writes.range(b);
        let base = base.fuse().peekable();
        if descending {
            Box::new(MergingIterator {
                base,
                writes: range.rev().peekable(),
                descending,
            })
        } else {
            Box::new(MergingIterator {
                base,
                writes: range.peekable(),
                descending,
            })
        }
    }
}

impl KvStore for CacheStore<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        match self.writes.get(key) {
            Some(value_opt) => Ok(value_opt.clone()),
            None => self.base.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn iterate(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Result<KvIter<'_>, StateError> {
        let base = self.base.iterate(start, end)?;
        Ok(self.merged(base, start, end, false))
    }

    fn reverse_iterate(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<KvIter<'_>, StateError> {
        let base = self.base.reverse_iterate(start, end)?;
        Ok(self.merged(base, start, end, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    fn seeded() -> MemoryStore {
        let mut s = MemoryStore::new();
        for (k, v) in [(b"a", b"1"), (b"c", b"3"), (b"e", b"5")] {
            s.set(k, v).unwrap();
        }
        s
    }

    #[test]
    fn test_merged_iteration_both_directions() {
        let mut base = seeded();
        let mut cache = CacheStore::new(&mut base);
        cache.set(b"b", b"2").unwrap();
        cache.set(b"c", b"33").unwrap();
        cache.delete(b"e").unwrap();

        let fwd: Vec<Record> = cache.iterate(None, None).unwrap().map(Result::unwrap).collect();
        assert_eq!(
            fwd,
            vec![
                (b"a".to_vec(), b"1".to_vec()),
                (b"b".to_vec(), b"2".to_vec()),
                (b"c".to_vec(), b"33".to_vec()),
            ]
        );

        let rev: Vec<Vec<u8>> = cache
            .reverse_iterate(Some(b"b"), None)
            .unwrap()
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(rev, vec![b"c".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn test_drop_discards_and_write_flushes() {
        let mut base = seeded();
        {
            let mut cache = CacheStore::new(&mut base);
            cache.set(b"z", b"26").unwrap();
        }
        assert!(base.get(b"z").unwrap().is_none());

        let mut cache = CacheStore::new(&mut base);
        cache.set(b"z", b"26").unwrap();
        cache.delete(b"a").unwrap();
        cache.set(b"z", b"26").unwrap();
        assert_eq!(cache.write().unwrap(), 2);
        assert_eq!(base.get(b"z").unwrap(), Some(b"26".to_vec()));
        assert!(base.get(b"a").unwrap().is_none());
    }
}

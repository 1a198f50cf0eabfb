// Path: crates/storage/src/prefix.rs

//! A store view that confines all keys to a fixed namespace.

use crate::range::next_prefix;
use ioi_api::state::{KvIter, KvStore, StateError};

/// A wrapper that provides namespaced, isolated access to an inner store.
///
/// Every key is transparently prefixed on the way in and stripped on the way
/// out, so the holder only ever sees its own keyspace. Hosts use this to carve
/// per-client stores out of one module store.
pub struct PrefixStore<S> {
    inner: S,
    prefix: Vec<u8>,
}

impl<S: KvStore> PrefixStore<S> {
    /// Creates a namespaced view over `inner`.
    pub fn new(inner: S, prefix: impl Into<Vec<u8>>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }

    /// Returns the inner store.
    pub fn into_inner(self) -> S {
        self.inner
    }

    #[inline]
    fn qualify(&self, key: &[u8]) -> Vec<u8> {
        [self.prefix.as_slice(), key].concat()
    }

    fn qualify_range(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> (Vec<u8>, Option<Vec<u8>>) {
        let start = self.qualify(start.unwrap_or_default());
        let end = match end {
            Some(e) => Some(self.qualify(e)),
            None => next_prefix(&self.prefix),
        };
        (start, end)
    }

    fn strip<'a>(&'a self, it: KvIter<'a>) -> KvIter<'a> {
        let n = self.prefix.len();
        Box::new(it.map(move |item| {
            item.map(|(k, v)| (k.get(n..).map(<[u8]>::to_vec).unwrap_or_default(), v))
        }))
    }
}

impl<S: KvStore> KvStore for PrefixStore<S> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StateError> {
        self.inner.get(&self.qualify(key))
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<(), StateError> {
        let key = self.qualify(key);
        self.inner.set(&key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StateError> {
        let key = self.qualify(key);
        self.inner.delete(&key)
    }

    fn iterate(&self, start: Option<&[u8]>, end: Option<&[u8]>) -> Result<KvIter<'_>, StateError> {
        let (s, e) = self.qualify_range(start, end);
        let it = self.inner.iterate(Some(&s), e.as_deref())?;
        Ok(self.strip(it))
    }

    fn reverse_iterate(
        &self,
        start: Option<&[u8]>,
        end: Option<&[u8]>,
    ) -> Result<KvIter<'_>, StateError> {
        let (s, e) = self.qualify_range(start, end);
        let it = self.inner.reverse_iterate(Some(&s), e.as_deref())?;
        Ok(self.strip(it))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;

    #[test]
    fn test_prefix_isolation() {
        let mut backing = MemoryStore::new();
        backing.set(b"other", b"x").unwrap();
        {
            let mut client = PrefixStore::new(&mut backing, b"clients/07-tm-0/".to_vec());
            client.set(b"clientState", b"cs").unwrap();
            client.set(b"consensusStates/0-1", b"c1").unwrap();
            assert_eq!(client.get(b"clientState").unwrap(), Some(b"cs".to_vec()));
            assert!(client.get(b"other").unwrap().is_none());

            let all: Vec<_> = client
                .iterate(None, None)
                .unwrap()
                .map(|r| r.unwrap().0)
                .collect();
            assert_eq!(
                all,
                vec![b"clientState".to_vec(), b"consensusStates/0-1".to_vec()]
            );
        }
        assert_eq!(
            backing.get(b"clients/07-tm-0/clientState").unwrap(),
            Some(b"cs".to_vec())
        );
    }
}

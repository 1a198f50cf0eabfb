// Path: crates/services/src/ibc/light_clients/wasm/checksums.rs
//! The checksum registry: the set of approved bytecode identities, kept in the
//! module store under [`CHECKSUMS_PREFIX`]. Entries are never removed.

use ioi_api::state::{KvStore, StateError};
use ioi_storage::next_prefix;
use ioi_types::error::WasmError;
use ioi_types::ibc::Checksum;
use ioi_types::keys::{checksum_key, CHECKSUMS_PREFIX};
use serde::{Deserialize, Serialize};

/// Page size used when a request leaves `limit` at zero.
pub const DEFAULT_PAGE_LIMIT: u64 = 100;

/// Reports whether `checksum` is registered.
pub fn has_checksum(store: &dyn KvStore, checksum: &Checksum) -> Result<bool, StateError> {
    store.has(&checksum_key(checksum.as_bytes()))
}

/// Registers `checksum`.
pub fn add_checksum(store: &mut dyn KvStore, checksum: &Checksum) -> Result<(), StateError> {
    store.set(&checksum_key(checksum.as_bytes()), &[])
}

fn decode_key(key: &[u8]) -> Result<Checksum, WasmError> {
    let raw = key
        .strip_prefix(CHECKSUMS_PREFIX)
        .ok_or_else(|| StateError::InvalidValue(format!("foreign registry key {}", hex::encode(key))))?;
    Checksum::try_from(raw)
}

fn scan(
    store: &dyn KvStore,
    start: Option<Vec<u8>>,
) -> Result<impl Iterator<Item = Result<Checksum, WasmError>> + '_, WasmError> {
    let start = start.unwrap_or_else(|| CHECKSUMS_PREFIX.to_vec());
    let end = next_prefix(CHECKSUMS_PREFIX);
    let iter = store.iterate(Some(start.as_slice()), end.as_deref())?;
    Ok(iter.map(|item| {
        let (key, _) = item?;
        decode_key(&key)
    }))
}

/// Lists every registered checksum in key order.
pub fn all_checksums(store: &dyn KvStore) -> Result<Vec<Checksum>, WasmError> {
    scan(store, None)?.collect()
}

/// A page selector. `key` (a raw checksum from a previous `next_key`) takes
/// precedence over `offset`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Vec<u8>>,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub limit: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse {
    /// Key to pass in the next request, absent on the last page.
    pub next_key: Option<Vec<u8>>,
    /// Total number of registered checksums. Only filled for offset requests.
    pub total: u64,
}

/// Returns one page of registered checksums.
pub fn paginate_checksums(
    store: &dyn KvStore,
    page: &PageRequest,
) -> Result<(Vec<Checksum>, PageResponse), WasmError> {
    let limit = usize::try_from(match page.limit {
        0 => DEFAULT_PAGE_LIMIT,
        l => l,
    })
    .unwrap_or(usize::MAX);

    if let Some(key) = &page.key {
        let mut items = scan(store, Some(checksum_key(key)))?;
        let checksums = items.by_ref().take(limit).collect::<Result<Vec<_>, _>>()?;
        let next_key = items.next().transpose()?.map(|c| c.as_bytes().to_vec());
        return Ok((
            checksums,
            PageResponse {
                next_key,
                total: 0,
            },
        ));
    }

    let mut checksums = Vec::with_capacity(limit.min(64));
    let mut next_key = None;
    let mut total = 0u64;
    for (i, item) in scan(store, None)?.enumerate() {
        let checksum = item?;
        total += 1;
        let i = i as u64;
        if i < page.offset {
            continue;
        }
        if checksums.len() < limit {
            checksums.push(checksum);
        } else if next_key.is_none() {
            next_key = Some(checksum.as_bytes().to_vec());
        }
    }
    Ok((checksums, PageResponse { next_key, total }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ioi_storage::MemoryStore;

    fn registry(n: u8) -> MemoryStore {
        let mut store = MemoryStore::new();
        for i in 0..n {
            add_checksum(&mut store, &Checksum([i; 32])).unwrap();
        }
        // unrelated module keys must not leak into listings
        store.set(b"\x01other", b"x").unwrap();
        store
    }

    #[test]
    fn test_has_and_list() {
        let store = registry(3);
        assert!(has_checksum(&store, &Checksum([1; 32])).unwrap());
        assert!(!has_checksum(&store, &Checksum([9; 32])).unwrap());
        assert_eq!(
            all_checksums(&store).unwrap(),
            vec![Checksum([0; 32]), Checksum([1; 32]), Checksum([2; 32])]
        );
    }

    #[test]
    fn test_paginate_by_offset_then_key() {
        let store = registry(5);
        let (first, res) = paginate_checksums(
            &store,
            &PageRequest {
                limit: 2,
                offset: 1,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(first, vec![Checksum([1; 32]), Checksum([2; 32])]);
        assert_eq!(res.total, 5);
        assert_eq!(res.next_key, Some(vec![3; 32]));

        let (second, res) = paginate_checksums(
            &store,
            &PageRequest {
                key: res.next_key,
                limit: 2,
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(second, vec![Checksum([3; 32]), Checksum([4; 32])]);
        assert_eq!(res.next_key, None);
    }

    #[test]
    fn test_default_limit() {
        let store = registry(3);
        let (all, res) = paginate_checksums(&store, &PageRequest::default()).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(res.next_key, None);
    }
}

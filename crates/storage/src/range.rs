// Path: crates/storage/src/range.rs

use ioi_api::state::Record;
use std::collections::BTreeMap;
use std::ops::Bound::{self, Excluded, Included, Unbounded};

/// Calculates the smallest byte vector that is strictly greater than all keys
/// starting with the given prefix. Returns None if the prefix is empty or all 0xFF bytes.
pub fn next_prefix(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut ub = prefix.to_vec();
    for i in (0..ub.len()).rev() {
        if let Some(byte) = ub.get_mut(i) {
            if *byte != 0xFF {
                *byte += 1;
                ub.truncate(i + 1);
                return Some(ub);
            }
        }
    }
    None
}

/// Converts an optional half-open range into `BTreeMap` bounds, or `None` if it is empty.
pub(crate) fn bounds(
    start: Option<&[u8]>,
    end: Option<&[u8]>,
) -> Option<(Bound<Vec<u8>>, Bound<Vec<u8>>)> {
    if let (Some(s), Some(e)) = (start, end) {
        if s >= e {
            return None;
        }
    }
    let lo = start.map_or(Unbounded, |s| Included(s.to_vec()));
    let hi = end.map_or(Unbounded, |e| Excluded(e.to_vec()));
    Some((lo, hi))
}

/// Returns the records of `map` within `[start, end)`, ascending or descending.
pub(crate) fn range_records<'a>(
    map: &'a BTreeMap<Vec<u8>, Vec<u8>>,
    start: Option<&[u8]>,
    end: Option<&[u8]>,
    descending: bool,
) -> Box<dyn Iterator<Item = Record> + 'a> {
    let Some(b) = bounds(start, end) else {
        return Box::new(std::iter::empty());
    };
    let it = map.range(b).map(|(k, v)| (k.clone(), v.clone()));
    if descending {
        Box::new(it.rev())
    } else {
        Box::new(it)
    }
}

// Path: crates/types/src/keys/mod.rs
//! Defines constants for well-known store keys.
//!
//! These are the keys a wasm light client and its contract agree on inside a
//! client-prefixed store, plus the module-level key for the checksum registry.

use crate::ibc::Height;

/// The store key for the client state within a client store.
pub const CLIENT_STATE_KEY: &[u8] = b"clientState";

/// The store key prefix for consensus states within a client store.
pub const CONSENSUS_STATE_PREFIX: &[u8] = b"consensusStates/";

/// The module store prefix under which registered checksums are kept as a set.
pub const CHECKSUMS_PREFIX: &[u8] = &[0x00];

/// Prefix routing the subject client's store inside a recovery `WrappedStore`.
pub const SUBJECT_PREFIX: &[u8] = b"subject/";

/// Prefix routing the substitute client's store inside a recovery `WrappedStore`.
pub const SUBSTITUTE_PREFIX: &[u8] = b"substitute/";

/// Returns the key of the consensus state stored at `height`.
pub fn consensus_state_key(height: &Height) -> Vec<u8> {
    [CONSENSUS_STATE_PREFIX, height.to_string().as_bytes()].concat()
}

/// Returns the registry key for a checksum.
pub fn checksum_key(checksum: &[u8]) -> Vec<u8> {
    [CHECKSUMS_PREFIX, checksum].concat()
}

// Path: crates/types/src/codec.rs

//! Defines the canonical, deterministic binary codec for values persisted in client stores.
//!
//! Client and consensus states are written with `parity-scale-codec` (SCALE) so every
//! replica produces identical bytes for the same logical value. Contracts that read
//! these keys directly see the same layout.

use crate::error::StateError;
use parity_scale_codec::{Decode, DecodeAll, Encode};

/// Encodes a value into its canonical SCALE byte representation.
pub fn to_bytes_canonical<T: Encode>(v: &T) -> Vec<u8> {
    v.encode()
}

/// Decodes a value from canonical SCALE bytes, rejecting trailing input.
pub fn from_bytes_canonical<T: Decode>(b: &[u8]) -> Result<T, StateError> {
    T::decode_all(&mut &*b).map_err(|e| StateError::Decode(format!("canonical decode failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ibc::{ConsensusState, Height};

    #[test]
    fn test_canonical_codec_roundtrip() {
        let cs = ConsensusState {
            data: vec![1, 2, 3],
            timestamp: 42,
        };
        let encoded = to_bytes_canonical(&cs);
        assert_eq!(from_bytes_canonical::<ConsensusState>(&encoded).unwrap(), cs);
    }

    #[test]
    fn test_canonical_decode_rejects_trailing_bytes() {
        let mut encoded = to_bytes_canonical(&Height::new(1, 5));
        encoded.push(0);
        assert!(matches!(
            from_bytes_canonical::<Height>(&encoded),
            Err(StateError::Decode(_))
        ));
    }
}

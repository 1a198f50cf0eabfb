// Path: crates/services/src/ibc/light_clients/wasm/compression.rs
//! Gzip handling for uploaded and snapshotted bytecode.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use ioi_types::error::WasmError;
use std::io::{Read, Write};

const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

/// Reports whether `input` starts with the gzip magic bytes.
pub fn is_gzip(input: &[u8]) -> bool {
    input.starts_with(&GZIP_MAGIC)
}

/// Decompresses `src`, failing once the output would exceed `limit` bytes.
pub fn uncompress(src: &[u8], limit: usize) -> Result<Vec<u8>, WasmError> {
    let mut out = Vec::new();
    GzDecoder::new(src)
        .take(limit as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| WasmError::InvalidData(format!("gzip decode: {e}")))?;
    if out.len() > limit {
        return Err(WasmError::CodeTooLarge {
            size: out.len(),
            max: limit,
        });
    }
    Ok(out)
}

/// Gzip-compresses `src` at the default level.
pub fn gzip_it(src: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(src)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_round_trip_and_sniff() {
        let raw = b"\0asm\x01\x00\x00\x00 some module bytes".to_vec();
        let zipped = gzip_it(&raw).unwrap();
        assert!(is_gzip(&zipped));
        assert!(!is_gzip(&raw));
        assert_eq!(uncompress(&zipped, 1024).unwrap(), raw);
    }

    #[test]
    fn test_uncompress_is_bounded() {
        let zipped = gzip_it(&[7u8; 4096]).unwrap();
        assert!(matches!(
            uncompress(&zipped, 4095),
            Err(WasmError::CodeTooLarge { max: 4095, .. })
        ));
        assert_eq!(uncompress(&zipped, 4096).unwrap().len(), 4096);
    }

    #[test]
    fn test_uncompress_rejects_garbage() {
        let mut bogus = GZIP_MAGIC.to_vec();
        bogus.extend_from_slice(b"not really gzip");
        assert!(matches!(uncompress(&bogus, 100), Err(WasmError::InvalidData(_))));
    }
}

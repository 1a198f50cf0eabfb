// Path: crates/services/src/ibc/light_clients/wasm/snapshot.rs
//! State-sync snapshot extension carrying registered bytecode.
//!
//! The registry itself travels with ordinary state sync. This extension only
//! repopulates the engine's code cache on the restoring node.
//!
//! Format 1 items are bare gzip blobs. Format 2 items prefix each blob with
//! the 32-byte checksum of the uncompressed code, which restore verifies.

use super::checksums::all_checksums;
use super::compression::{gzip_it, is_gzip, uncompress};
use super::keeper::WasmKeeper;
use ioi_api::snapshot::{ExtensionSnapshotter, PayloadReader, PayloadWriter};
use ioi_api::state::VersionedKvStore;
use ioi_telemetry::wasm_metrics;
use ioi_types::error::{SnapshotError, WasmError};
use ioi_types::ibc::Checksum;
use ioi_types::CHECKSUM_LEN;
use std::sync::Arc;

pub const SNAPSHOT_NAME: &str = "08-wasm";
pub const SNAPSHOT_FORMAT_RAW: u32 = 1;
pub const SNAPSHOT_FORMAT_TAGGED: u32 = 2;

const SUPPORTED_FORMATS: &[u32] = &[SNAPSHOT_FORMAT_RAW, SNAPSHOT_FORMAT_TAGGED];

pub struct WasmSnapshotter {
    store: Arc<dyn VersionedKvStore>,
    keeper: Arc<WasmKeeper>,
    format: u32,
}

impl std::fmt::Debug for WasmSnapshotter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmSnapshotter")
            .field("format", &self.format)
            .finish_non_exhaustive()
    }
}

impl WasmSnapshotter {
    /// Exports in the tagged format.
    pub fn new(store: Arc<dyn VersionedKvStore>, keeper: Arc<WasmKeeper>) -> Self {
        Self {
            store,
            keeper,
            format: SNAPSHOT_FORMAT_TAGGED,
        }
    }

    /// Selects the export format.
    pub fn with_format(mut self, format: u32) -> Result<Self, SnapshotError> {
        if !SUPPORTED_FORMATS.contains(&format) {
            return Err(SnapshotError::UnknownFormat(format));
        }
        self.format = format;
        Ok(self)
    }

    fn encode_item(&self, checksum: &Checksum, code: &[u8]) -> Result<Vec<u8>, SnapshotError> {
        let zipped = gzip_it(code).map_err(|e| SnapshotError::Compression(e.to_string()))?;
        if self.format == SNAPSHOT_FORMAT_RAW {
            return Ok(zipped);
        }
        let mut item = Vec::with_capacity(CHECKSUM_LEN + zipped.len());
        item.extend_from_slice(checksum.as_bytes());
        item.extend_from_slice(&zipped);
        Ok(item)
    }

    fn restore_item(&self, format: u32, item: &[u8]) -> Result<Checksum, SnapshotError> {
        let (tag, compressed) = match format {
            SNAPSHOT_FORMAT_RAW => (None, item),
            _ => {
                let (Some(tag), Some(rest)) = (item.get(..CHECKSUM_LEN), item.get(CHECKSUM_LEN..)) else {
                    return Err(SnapshotError::Malformed(format!(
                        "item of {} bytes has no checksum tag",
                        item.len()
                    )));
                };
                (Some(Checksum::try_from(tag)?), rest)
            }
        };
        if !is_gzip(compressed) {
            return Err(SnapshotError::Malformed("not a gzip".into()));
        }
        let code = uncompress(compressed, self.keeper.max_wasm_size())?;
        let computed = Checksum::of(&code);
        if let Some(tag) = tag {
            if tag != computed {
                return Err(SnapshotError::ChecksumMismatch {
                    expected: tag.to_hex(),
                    got: computed.to_hex(),
                });
            }
        }
        self.keeper
            .context()
            .engine()
            .store_code_unchecked(&code)
            .map_err(|e| WasmError::InvalidCode(format!("failed to store contract: {e}")))?;
        Ok(computed)
    }
}

impl ExtensionSnapshotter for WasmSnapshotter {
    fn snapshot_name(&self) -> &'static str {
        SNAPSHOT_NAME
    }

    fn snapshot_format(&self) -> u32 {
        self.format
    }

    fn supported_formats(&self) -> &'static [u32] {
        SUPPORTED_FORMATS
    }

    fn snapshot_extension(&self, height: u64, write: &mut PayloadWriter<'_>) -> Result<(), SnapshotError> {
        let view = self
            .store
            .view_at(height)
            .map_err(|e| SnapshotError::Wasm(e.into()))?;
        let checksums = all_checksums(view.as_ref())?;
        for checksum in &checksums {
            let code = self
                .keeper
                .context()
                .engine()
                .get_code(checksum)
                .map_err(|e| SnapshotError::Wasm(e.into()))?;
            write(self.encode_item(checksum, &code)?)?;
            wasm_metrics().inc_snapshot_items("export");
        }
        tracing::info!(
            target: "snapshot",
            height,
            format = self.format,
            items = checksums.len(),
            "exported wasm snapshot extension"
        );
        Ok(())
    }

    fn restore_extension(
        &self,
        height: u64,
        format: u32,
        read: &mut PayloadReader<'_>,
    ) -> Result<(), SnapshotError> {
        if !SUPPORTED_FORMATS.contains(&format) {
            return Err(SnapshotError::UnknownFormat(format));
        }
        let mut restored = 0usize;
        while let Some(item) = read()? {
            let checksum = self.restore_item(format, &item)?;
            tracing::debug!(target: "snapshot", %checksum, "restored wasm code");
            wasm_metrics().inc_snapshot_items("restore");
            restored += 1;
        }
        tracing::info!(target: "snapshot", height, format, items = restored, "restored wasm snapshot extension");
        Ok(())
    }
}

// Path: crates/api/src/snapshot/mod.rs
//! The state-sync snapshot extension contract.

use ioi_types::error::SnapshotError;

/// A sink for snapshot payload items.
pub type PayloadWriter<'a> = dyn FnMut(Vec<u8>) -> Result<(), SnapshotError> + 'a;

/// A source of snapshot payload items. `Ok(None)` signals end of stream.
pub type PayloadReader<'a> = dyn FnMut() -> Result<Option<Vec<u8>>, SnapshotError> + 'a;

/// An extension that contributes extra payload items to a state-sync snapshot.
pub trait ExtensionSnapshotter: Send + Sync {
    /// The extension's unique name.
    fn snapshot_name(&self) -> &'static str;

    /// The format written by `snapshot_extension`.
    fn snapshot_format(&self) -> u32;

    /// All formats `restore_extension` accepts.
    fn supported_formats(&self) -> &'static [u32];

    /// Writes the extension's items for the state committed at `height`.
    fn snapshot_extension(&self, height: u64, write: &mut PayloadWriter<'_>) -> Result<(), SnapshotError>;

    /// Consumes items until the reader signals end of stream.
    fn restore_extension(
        &self,
        height: u64,
        format: u32,
        read: &mut PayloadReader<'_>,
    ) -> Result<(), SnapshotError>;
}

// Path: crates/vm/wasm/src/region.rs
//! Guest memory regions.
//!
//! Every byte buffer crossing the sandbox boundary is described by a 12-byte
//! region in guest memory: `offset`, `capacity`, `length`, each a
//! little-endian u32. Buffers are allocated by the guest's `allocate` export.

use ioi_types::error::VmError;
use wasmtime::{AsContext, AsContextMut, Memory, TypedFunc};

/// Size of a serialized region.
pub const REGION_SIZE: usize = 12;

/// Upper bound on any single buffer read out of guest memory.
pub const MAX_REGION_LENGTH: u32 = 64 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub offset: u32,
    pub capacity: u32,
    pub length: u32,
}

fn mem_err(e: impl std::fmt::Display) -> VmError {
    VmError::MemoryError(e.to_string())
}

pub fn read_region_header(
    ctx: impl AsContext,
    memory: &Memory,
    ptr: u32,
) -> Result<Region, VmError> {
    if ptr == 0 {
        return Err(VmError::MemoryError("null region pointer".into()));
    }
    let mut raw = [0u8; REGION_SIZE];
    memory.read(&ctx, ptr as usize, &mut raw).map_err(mem_err)?;
    let word = |i: usize| -> u32 {
        let mut b = [0u8; 4];
        b.copy_from_slice(raw.get(i..i + 4).unwrap_or(&[0; 4]));
        u32::from_le_bytes(b)
    };
    let region = Region {
        offset: word(0),
        capacity: word(4),
        length: word(8),
    };
    if region.length > region.capacity {
        return Err(VmError::MemoryError(format!(
            "region length {} exceeds capacity {}",
            region.length, region.capacity
        )));
    }
    Ok(region)
}

/// Reads the buffer described by the region at `ptr`.
pub fn read_region(ctx: impl AsContext, memory: &Memory, ptr: u32) -> Result<Vec<u8>, VmError> {
    let region = read_region_header(&ctx, memory, ptr)?;
    if region.length > MAX_REGION_LENGTH {
        return Err(VmError::MemoryError(format!(
            "region length {} exceeds limit {}",
            region.length, MAX_REGION_LENGTH
        )));
    }
    let mut buf = vec![0u8; region.length as usize];
    memory
        .read(&ctx, region.offset as usize, &mut buf)
        .map_err(mem_err)?;
    Ok(buf)
}

/// Allocates a guest buffer, copies `data` into it, and returns the region pointer.
pub fn write_region(
    mut ctx: impl AsContextMut,
    memory: &Memory,
    allocate: &TypedFunc<u32, u32>,
    data: &[u8],
) -> anyhow::Result<u32> {
    let len = u32::try_from(data.len()).map_err(mem_err)?;
    let ptr = allocate.call(&mut ctx, len)?;
    let region = read_region_header(&ctx, memory, ptr)?;
    if region.capacity < len {
        return Err(VmError::MemoryError(format!(
            "allocated capacity {} is smaller than {}",
            region.capacity, len
        ))
        .into());
    }
    memory
        .write(&mut ctx, region.offset as usize, data)
        .map_err(mem_err)?;
    memory
        .write(&mut ctx, ptr as usize + 8, &len.to_le_bytes())
        .map_err(mem_err)?;
    Ok(ptr)
}

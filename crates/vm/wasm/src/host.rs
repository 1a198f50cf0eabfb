// Path: crates/vm/wasm/src/host.rs
//! Host functions imported by contracts from the `env` module.

use crate::region::{read_region, write_region};
use ioi_api::state::{Order, Record, VmStore};
use ioi_types::config::VmFuelCosts;
use ioi_types::error::StateError;
use std::collections::VecDeque;
use thiserror::Error;
use wasmtime::{Caller, Extern, Linker, Memory, StoreLimits, Trap, TypedFunc};

/// Host imports a contract may declare.
pub const ALLOWED_IMPORTS: &[&str] = &[
    "db_read",
    "db_write",
    "db_remove",
    "db_scan",
    "db_next",
    "debug",
    "abort",
];

/// Errors raised by host functions. They abort the running contract.
#[derive(Debug, Error)]
pub enum HostTrap {
    #[error("contract aborted: {0}")]
    Abort(String),
    #[error("write attempted in read-only query context")]
    ReadOnly,
    #[error("unknown iterator id {0}")]
    UnknownIterator(u32),
    #[error("missing guest export: {0}")]
    MissingExport(&'static str),
    #[error("store error: {0}")]
    Store(#[from] StateError),
}

pub(crate) struct SendSyncPtr<T: ?Sized>(pub *mut T);
unsafe impl<T: ?Sized> Send for SendSyncPtr<T> {}
unsafe impl<T: ?Sized> Sync for SendSyncPtr<T> {}

pub(crate) struct HostState {
    store: SendSyncPtr<dyn VmStore>,
    read_only: bool,
    iterators: Vec<VecDeque<Record>>,
    fuel_costs: VmFuelCosts,
    print_debug: bool,
    pub(crate) limits: StoreLimits,
}

impl HostState {
    /// # Safety
    ///
    /// `store` must stay valid, and must not be accessed by anyone else, for as
    /// long as this state lives. If `read_only` is set, `store` must never be
    /// written through.
    pub(crate) unsafe fn new(
        store: *mut (dyn VmStore + 'static),
        read_only: bool,
        fuel_costs: VmFuelCosts,
        print_debug: bool,
        limits: StoreLimits,
    ) -> Self {
        Self {
            store: SendSyncPtr(store),
            read_only,
            iterators: Vec::new(),
            fuel_costs,
            print_debug,
            limits,
        }
    }

    fn store(&self) -> &dyn VmStore {
        // SAFETY: guaranteed valid by the contract of `HostState::new`.
        unsafe { &*self.store.0 }
    }

    fn store_mut(&mut self) -> Result<&mut dyn VmStore, HostTrap> {
        if self.read_only {
            return Err(HostTrap::ReadOnly);
        }
        // SAFETY: valid and exclusively ours per `HostState::new`; the store was
        // handed in as `&mut` since `read_only` is false.
        Ok(unsafe { &mut *self.store.0 })
    }
}

fn memory(caller: &mut Caller<'_, HostState>) -> Result<Memory, HostTrap> {
    match caller.get_export("memory") {
        Some(Extern::Memory(m)) => Ok(m),
        _ => Err(HostTrap::MissingExport("memory")),
    }
}

fn allocate(caller: &mut Caller<'_, HostState>) -> anyhow::Result<TypedFunc<u32, u32>> {
    let func = caller
        .get_export("allocate")
        .and_then(Extern::into_func)
        .ok_or(HostTrap::MissingExport("allocate"))?;
    Ok(func.typed::<u32, u32>(&caller)?)
}

/// Deducts host-function fuel, trapping with `OutOfFuel` if it runs out.
fn charge(caller: &mut Caller<'_, HostState>, amount: u64) -> anyhow::Result<()> {
    let fuel = caller.get_fuel()?;
    if fuel < amount {
        caller.set_fuel(0)?;
        return Err(Trap::OutOfFuel.into());
    }
    caller.set_fuel(fuel - amount)?;
    Ok(())
}

fn read_arg(caller: &mut Caller<'_, HostState>, ptr: u32) -> anyhow::Result<Vec<u8>> {
    let mem = memory(caller)?;
    Ok(read_region(&*caller, &mem, ptr)?)
}

fn write_result(caller: &mut Caller<'_, HostState>, data: &[u8]) -> anyhow::Result<u32> {
    let mem = memory(caller)?;
    let alloc = allocate(caller)?;
    write_region(&mut *caller, &mem, &alloc, data)
}

fn encode_item(item: Option<Record>) -> Vec<u8> {
    let (key, value) = item.unwrap_or_default();
    let mut out = Vec::with_capacity(key.len() + value.len() + 8);
    out.extend_from_slice(&key);
    out.extend_from_slice(&(key.len() as u32).to_be_bytes());
    out.extend_from_slice(&value);
    out.extend_from_slice(&(value.len() as u32).to_be_bytes());
    out
}

fn db_read(mut caller: Caller<'_, HostState>, key_ptr: u32) -> anyhow::Result<u32> {
    let key = read_arg(&mut caller, key_ptr)?;
    let costs = caller.data().fuel_costs.clone();
    charge(
        &mut caller,
        costs.base_cost + costs.state_get_per_byte * key.len() as u64,
    )?;
    let value = caller.data().store().get(&key).map_err(HostTrap::from)?;
    match value {
        None => Ok(0),
        Some(v) => {
            charge(&mut caller, costs.state_get_per_byte * v.len() as u64)?;
            write_result(&mut caller, &v)
        }
    }
}

fn db_write(mut caller: Caller<'_, HostState>, key_ptr: u32, value_ptr: u32) -> anyhow::Result<()> {
    if caller.data().read_only {
        return Err(HostTrap::ReadOnly.into());
    }
    let key = read_arg(&mut caller, key_ptr)?;
    let value = read_arg(&mut caller, value_ptr)?;
    let costs = caller.data().fuel_costs.clone();
    charge(
        &mut caller,
        costs.base_cost + costs.state_set_per_byte * (key.len() + value.len()) as u64,
    )?;
    caller
        .data_mut()
        .store_mut()?
        .set(&key, &value)
        .map_err(HostTrap::from)?;
    Ok(())
}

fn db_remove(mut caller: Caller<'_, HostState>, key_ptr: u32) -> anyhow::Result<()> {
    if caller.data().read_only {
        return Err(HostTrap::ReadOnly.into());
    }
    let key = read_arg(&mut caller, key_ptr)?;
    let costs = caller.data().fuel_costs.clone();
    charge(
        &mut caller,
        costs.base_cost + costs.state_set_per_byte * key.len() as u64,
    )?;
    caller
        .data_mut()
        .store_mut()?
        .delete(&key)
        .map_err(HostTrap::from)?;
    Ok(())
}

fn db_scan(
    mut caller: Caller<'_, HostState>,
    start_ptr: u32,
    end_ptr: u32,
    order: i32,
) -> anyhow::Result<u32> {
    let start = match start_ptr {
        0 => None,
        p => Some(read_arg(&mut caller, p)?),
    };
    let end = match end_ptr {
        0 => None,
        p => Some(read_arg(&mut caller, p)?),
    };
    let order = Order::try_from(order as u32).map_err(HostTrap::from)?;
    let base = caller.data().fuel_costs.base_cost;
    charge(&mut caller, base)?;
    let records = caller
        .data()
        .store()
        .scan(start.as_deref(), end.as_deref(), order)
        .map_err(HostTrap::from)?;
    let state = caller.data_mut();
    state.iterators.push(records.into());
    Ok(state.iterators.len() as u32)
}

fn db_next(mut caller: Caller<'_, HostState>, iterator_id: u32) -> anyhow::Result<u32> {
    let per_item = caller.data().fuel_costs.state_scan_per_item;
    charge(&mut caller, per_item)?;
    let item = caller
        .data_mut()
        .iterators
        .get_mut((iterator_id as usize).wrapping_sub(1))
        .ok_or(HostTrap::UnknownIterator(iterator_id))?
        .pop_front();
    write_result(&mut caller, &encode_item(item))
}

fn debug(mut caller: Caller<'_, HostState>, msg_ptr: u32) -> anyhow::Result<()> {
    let base = caller.data().fuel_costs.base_cost;
    charge(&mut caller, base)?;
    if caller.data().print_debug {
        let msg = read_arg(&mut caller, msg_ptr)?;
        tracing::debug!(target: "wasm", msg = %String::from_utf8_lossy(&msg), "contract debug");
    }
    Ok(())
}

fn abort(mut caller: Caller<'_, HostState>, msg_ptr: u32) -> anyhow::Result<()> {
    let msg = read_arg(&mut caller, msg_ptr)?;
    Err(HostTrap::Abort(String::from_utf8_lossy(&msg).into_owned()).into())
}

/// Registers every host import on `linker`.
pub(crate) fn link(linker: &mut Linker<HostState>) -> anyhow::Result<()> {
    linker.func_wrap("env", "db_read", db_read)?;
    linker.func_wrap("env", "db_write", db_write)?;
    linker.func_wrap("env", "db_remove", db_remove)?;
    linker.func_wrap("env", "db_scan", db_scan)?;
    linker.func_wrap("env", "db_next", db_next)?;
    linker.func_wrap("env", "debug", debug)?;
    linker.func_wrap("env", "abort", abort)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_item_layout() {
        let encoded = encode_item(Some((b"ab".to_vec(), b"xyz".to_vec())));
        assert_eq!(encoded, b"ab\x00\x00\x00\x02xyz\x00\x00\x00\x03".to_vec());
        assert_eq!(encode_item(None), vec![0u8; 8]);
    }
}

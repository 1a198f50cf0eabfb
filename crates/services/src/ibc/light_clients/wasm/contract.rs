// Path: crates/services/src/ibc/light_clients/wasm/contract.rs
//! The contract call protocol.
//!
//! Every call builds an `Env` from the block header, charges an up-front cost
//! to the host meter, runs the engine under a derived sandbox gas limit,
//! charges the sandbox usage back (also on failure), and finally decodes the
//! JSON response. `instantiate` and `sudo` writes are staged in a
//! [`CacheStore`] and reach the client store only when the contract reports a
//! valid result.

use super::gas::GasRegister;
use super::msgs::{decode_payload, encode_payload, ContractResult, ContractResultEnvelope, QueryMsg, SudoMsg};
use ioi_api::context::{BlockHeader, CallCtx};
use ioi_api::gas::VmGasMeter;
use ioi_api::state::KvStore;
use ioi_api::vm::{BlockInfo, ContractInfo, Env, ExecutionOutput, MessageInfo, WasmEngine};
use ioi_storage::{CacheStore, ReadOnlyStoreAdapter, StoreAdapter};
use ioi_telemetry::time::Timer;
use ioi_telemetry::{error_metrics, wasm_metrics};
use ioi_types::error::{ErrorCode, VmError, WasmError};
use ioi_types::ibc::Checksum;
use std::sync::Arc;

/// The engine handle and gas register shared by every contract call.
#[derive(Clone)]
pub struct WasmContext {
    engine: Arc<dyn WasmEngine>,
    gas_register: GasRegister,
}

impl std::fmt::Debug for WasmContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmContext")
            .field("gas_register", &self.gas_register)
            .finish_non_exhaustive()
    }
}

/// Builds the contract environment from the host block header.
pub fn contract_env(header: &BlockHeader) -> Result<Env, WasmError> {
    let height = u64::try_from(header.height).map_err(|_| {
        WasmError::InvariantViolation(format!("block height must never be negative: {}", header.height))
    })?;
    let time = u64::try_from(header.time_unix_nanos).map_err(|_| {
        WasmError::InvariantViolation(format!(
            "block (unix) time must never be negative: {}",
            header.time_unix_nanos
        ))
    })?;
    Ok(Env {
        block: BlockInfo {
            height,
            time,
            chain_id: header.chain_id.clone(),
        },
        contract: ContractInfo::default(),
    })
}

impl WasmContext {
    pub fn new(engine: Arc<dyn WasmEngine>, gas_register: GasRegister) -> Self {
        Self {
            engine,
            gas_register,
        }
    }

    pub fn engine(&self) -> &dyn WasmEngine {
        self.engine.as_ref()
    }

    pub fn gas_register(&self) -> &GasRegister {
        &self.gas_register
    }

    /// Charges the up-front cost and returns the sandbox gas limit.
    fn prepare(&self, ctx: &mut CallCtx, cost: u64, descriptor: &str) -> Result<u64, WasmError> {
        ctx.gas_meter.consume_gas(cost, descriptor)?;
        let limit = self.gas_register.runtime_gas_for_contract(ctx.gas_meter.as_ref());
        tracing::trace!(
            target: "ibc",
            vm_gas_consumed = self.gas_register.multiplied_meter(ctx.gas_meter.as_ref()).gas_consumed(),
            vm_gas_limit = limit,
            "{descriptor}"
        );
        Ok(limit)
    }

    /// Charges the sandbox usage of a finished call, failed or not, then
    /// wraps engine errors with `wrap`.
    fn settle(
        &self,
        ctx: &mut CallCtx,
        entry: &'static str,
        result: Result<ExecutionOutput, VmError>,
        wrap: fn(String) -> WasmError,
    ) -> Result<ExecutionOutput, WasmError> {
        let gas_used = match &result {
            Ok(out) => out.gas_used,
            Err(e) => e.gas_used(),
        };
        wasm_metrics().observe_contract_gas(entry, gas_used);
        self.gas_register
            .consume_runtime_gas(ctx.gas_meter.as_mut(), gas_used)?;
        let output = result.map_err(|e| {
            tracing::warn!(target: "ibc", entry, error = %e, gas_used, "contract call failed");
            wrap(e.to_string())
        })?;
        ctx.gas_meter.consume_gas(
            self.gas_register.deserialization_costs(output.return_data.len()),
            "wasm response deserialization",
        )?;
        Ok(output)
    }

    fn record(entry: &'static str, outcome: Result<(), &WasmError>) {
        match outcome {
            Ok(()) => wasm_metrics().inc_contract_calls(entry, "ok"),
            Err(e) => {
                wasm_metrics().inc_contract_calls(entry, "error");
                error_metrics().inc_error("wasm_contract", e.code());
            }
        }
    }

    /// Runs `instantiate` with an empty JSON message.
    pub fn instantiate(
        &self,
        ctx: &mut CallCtx,
        checksum: &Checksum,
        store: &mut dyn KvStore,
    ) -> Result<ContractResult, WasmError> {
        const ENTRY: &str = "instantiate";
        let _timer = Timer::new(wasm_metrics(), ENTRY);
        let result = self.run_instantiate(ctx, checksum, store);
        Self::record(ENTRY, result.as_ref().map(|_| ()));
        result
    }

    fn run_instantiate(
        &self,
        ctx: &mut CallCtx,
        checksum: &Checksum,
        store: &mut dyn KvStore,
    ) -> Result<ContractResult, WasmError> {
        let env = contract_env(&ctx.header)?;
        let msg = b"{}";
        let limit = self.prepare(
            ctx,
            self.gas_register.new_contract_instance_costs(msg.len()),
            "Loading wasm module: instantiate",
        )?;

        let mut cache = CacheStore::new(store);
        let output = {
            let mut adapter = StoreAdapter::new(Some(&mut cache))?;
            self.engine.instantiate(
                checksum,
                &env,
                &MessageInfo::default(),
                msg,
                &mut adapter,
                limit,
            )
        };
        let output = self.settle(ctx, "instantiate", output, WasmError::UnableToInit)?;

        let result = if output.return_data.is_empty() {
            ContractResult::Valid {
                data: Vec::new(),
                found_misbehaviour: false,
            }
        } else {
            ContractResult::decode(&output.return_data)?
        };
        if let ContractResult::Valid { .. } = result {
            let written = cache.write()?;
            tracing::debug!(target: "ibc", %checksum, written, "contract instantiated");
        }
        Ok(result)
    }

    /// Runs a state-mutating request through `sudo`. Returns the contract's
    /// `(data, found_misbehaviour)` on a valid result; nothing is written to
    /// `store` otherwise.
    pub fn sudo(
        &self,
        ctx: &mut CallCtx,
        checksum: &Checksum,
        store: &mut dyn KvStore,
        msg: &SudoMsg,
    ) -> Result<(Vec<u8>, bool), WasmError> {
        let entry = msg.name();
        let _timer = Timer::new(wasm_metrics(), entry);
        let result = self.run_sudo(ctx, checksum, store, msg);
        Self::record(entry, result.as_ref().map(|_| ()));
        result
    }

    fn run_sudo(
        &self,
        ctx: &mut CallCtx,
        checksum: &Checksum,
        store: &mut dyn KvStore,
        msg: &SudoMsg,
    ) -> Result<(Vec<u8>, bool), WasmError> {
        let env = contract_env(&ctx.header)?;
        let payload = encode_payload(msg)?;
        let limit = self.prepare(
            ctx,
            self.gas_register.instantiate_contract_costs(payload.len()),
            "Loading wasm module: sudo",
        )?;

        let mut cache = CacheStore::new(store);
        let output = {
            let mut adapter = StoreAdapter::new(Some(&mut cache))?;
            self.engine.sudo(checksum, &env, &payload, &mut adapter, limit)
        };
        let output = self.settle(ctx, msg.name(), output, WasmError::UnableToCall)?;

        let (data, found_misbehaviour) = ContractResult::decode(&output.return_data)?.into_valid()?;
        let written = cache.write()?;
        tracing::debug!(target: "ibc", %checksum, call = msg.name(), written, "sudo call succeeded");
        Ok((data, found_misbehaviour))
    }

    /// Runs a read-only request through `query` and returns the raw response.
    pub fn query(
        &self,
        ctx: &mut CallCtx,
        checksum: &Checksum,
        store: &dyn KvStore,
        msg: &QueryMsg,
    ) -> Result<Vec<u8>, WasmError> {
        let entry = msg.name();
        let _timer = Timer::new(wasm_metrics(), entry);
        let result = self.run_query(ctx, checksum, store, msg);
        Self::record(entry, result.as_ref().map(|_| ()));
        result
    }

    fn run_query(
        &self,
        ctx: &mut CallCtx,
        checksum: &Checksum,
        store: &dyn KvStore,
        msg: &QueryMsg,
    ) -> Result<Vec<u8>, WasmError> {
        let env = contract_env(&ctx.header)?;
        let payload = encode_payload(msg)?;
        let limit = self.prepare(
            ctx,
            self.gas_register.instantiate_contract_costs(payload.len()),
            "Loading wasm module: query",
        )?;
        let adapter = ReadOnlyStoreAdapter::new(Some(store))?;
        let output = self.engine.query(checksum, &env, &payload, &adapter, limit);
        let output = self.settle(ctx, msg.name(), output, WasmError::UnableToQuery)?;
        Ok(output.return_data)
    }

    /// Runs a query answered with the generic result envelope.
    pub fn query_result(
        &self,
        ctx: &mut CallCtx,
        checksum: &Checksum,
        store: &dyn KvStore,
        msg: &QueryMsg,
    ) -> Result<(Vec<u8>, bool), WasmError> {
        let raw = self.query(ctx, checksum, store, msg)?;
        let envelope: ContractResultEnvelope = decode_payload(&raw)?;
        ContractResult::from(envelope).into_valid()
    }
}

// Path: crates/services/src/ibc/light_clients/wasm/keeper.rs
//! The module keeper: code storage, code queries, and startup pinning.

use super::checksums::{add_checksum, all_checksums, has_checksum, paginate_checksums, PageRequest, PageResponse};
use super::client_state::WasmLightClient;
use super::compression::{is_gzip, uncompress};
use super::contract::WasmContext;
use super::gas::GasRegister;
use ioi_api::context::CallCtx;
use ioi_api::state::KvStore;
use ioi_api::vm::WasmEngine;
use ioi_telemetry::wasm_metrics;
use ioi_types::config::WasmConfig;
use ioi_types::error::{VmError, WasmError};
use ioi_types::ibc::{Checksum, ClientState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Rejects empty or oversized bytecode.
pub fn validate_wasm_code(code: &[u8], max_size: usize) -> Result<(), WasmError> {
    if code.is_empty() {
        return Err(WasmError::EmptyCode);
    }
    if code.len() > max_size {
        return Err(WasmError::CodeTooLarge {
            size: code.len(),
            max: max_size,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StoreMode {
    Checked,
    Unchecked,
}

impl StoreMode {
    fn label(self) -> &'static str {
        match self {
            Self::Checked => "checked",
            Self::Unchecked => "unchecked",
        }
    }
}

/// One page of the checksum listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecksumsResponse {
    /// Hex-encoded checksums.
    pub checksums: Vec<String>,
    pub pagination: PageResponse,
}

/// Owns the module's engine context and policy.
#[derive(Debug, Clone)]
pub struct WasmKeeper {
    wasm: WasmContext,
    max_wasm_size: usize,
    authority: String,
}

impl WasmKeeper {
    pub fn new(engine: Arc<dyn WasmEngine>, config: &WasmConfig) -> Self {
        Self {
            wasm: WasmContext::new(engine, GasRegister::new(config.gas.clone())),
            max_wasm_size: config.max_wasm_size,
            authority: config.authority.clone(),
        }
    }

    pub fn context(&self) -> &WasmContext {
        &self.wasm
    }

    pub fn authority(&self) -> &str {
        &self.authority
    }

    pub fn max_wasm_size(&self) -> usize {
        self.max_wasm_size
    }

    /// Binds `client_state` to this keeper's engine context.
    pub fn light_client<'a>(&'a self, client_state: &'a ClientState) -> WasmLightClient<'a> {
        WasmLightClient::new(&self.wasm, client_state)
    }

    /// Validates, compiles, pins, and registers `code`, which may be gzipped.
    pub fn store_code(
        &self,
        ctx: &mut CallCtx,
        module_store: &mut dyn KvStore,
        code: &[u8],
    ) -> Result<Checksum, WasmError> {
        self.store_wasm_code(ctx, module_store, code, StoreMode::Checked)
    }

    /// Like [`store_code`](Self::store_code) but skips the engine's interface
    /// checks. Used for genesis import.
    pub fn store_code_unchecked(
        &self,
        ctx: &mut CallCtx,
        module_store: &mut dyn KvStore,
        code: &[u8],
    ) -> Result<Checksum, WasmError> {
        self.store_wasm_code(ctx, module_store, code, StoreMode::Unchecked)
    }

    fn store_wasm_code(
        &self,
        ctx: &mut CallCtx,
        module_store: &mut dyn KvStore,
        code: &[u8],
        mode: StoreMode,
    ) -> Result<Checksum, WasmError> {
        let gas = self.wasm.gas_register();
        let decompressed;
        let code = if is_gzip(code) {
            ctx.gas_meter
                .consume_gas(gas.uncompress_costs(code.len()), "Uncompress gzip bytecode")?;
            decompressed = uncompress(code, self.max_wasm_size).map_err(|e| match e {
                WasmError::CodeTooLarge { .. } => e,
                other => WasmError::CreateFailed(other.to_string()),
            })?;
            decompressed.as_slice()
        } else {
            code
        };

        let checksum = Checksum::of(code);
        if has_checksum(module_store, &checksum)? {
            return Err(WasmError::CodeAlreadyExists(checksum.to_hex()));
        }
        validate_wasm_code(code, self.max_wasm_size)?;

        ctx.gas_meter
            .consume_gas(gas.compile_costs(code.len()), "Compiling wasm bytecode")?;
        let engine = self.wasm.engine();
        let stored = match mode {
            StoreMode::Checked => engine.store_code(code),
            StoreMode::Unchecked => engine.store_code_unchecked(code),
        }
        .map_err(|e| WasmError::InvalidCode(format!("unable to compile wasm code: {e}")))?;
        if stored != checksum {
            return Err(WasmError::CodeIdMismatch {
                expected: checksum.to_hex(),
                got: stored.to_hex(),
            });
        }
        engine.pin(&stored).map_err(|e| {
            WasmError::PinFailed(format!("checksum {}: {e}", stored.to_hex()))
        })?;
        add_checksum(module_store, &checksum)?;

        wasm_metrics().inc_codes_stored(mode.label());
        tracing::info!(
            target: "ibc",
            %checksum,
            size = code.len(),
            mode = mode.label(),
            "stored wasm light client code"
        );
        Ok(checksum)
    }

    /// Returns the bytecode of a registered checksum given in hex.
    pub fn code(&self, module_store: &dyn KvStore, checksum_hex: &str) -> Result<Vec<u8>, WasmError> {
        let checksum = Checksum::from_hex(checksum_hex)?;
        if !has_checksum(module_store, &checksum)? {
            return Err(WasmError::ChecksumNotFound(checksum_hex.to_string()));
        }
        self.wasm.engine().get_code(&checksum).map_err(|e| match e {
            VmError::ChecksumNotFound(hex) => WasmError::ChecksumNotFound(hex),
            other => WasmError::Vm(other),
        })
    }

    /// Lists registered checksums, one page at a time.
    pub fn checksums(
        &self,
        module_store: &dyn KvStore,
        page: &PageRequest,
    ) -> Result<ChecksumsResponse, WasmError> {
        let (checksums, pagination) = paginate_checksums(module_store, page)?;
        Ok(ChecksumsResponse {
            checksums: checksums.iter().map(Checksum::to_hex).collect(),
            pagination,
        })
    }

    /// Pins every registered checksum. Run once at node startup.
    pub fn initialize_pinned_codes(&self, module_store: &dyn KvStore) -> Result<(), WasmError> {
        let checksums = all_checksums(module_store)?;
        for checksum in &checksums {
            self.wasm
                .engine()
                .pin(checksum)
                .map_err(|e| WasmError::PinFailed(format!("checksum {}: {e}", checksum.to_hex())))?;
        }
        tracing::info!(target: "ibc", count = checksums.len(), "pinned wasm light client codes");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::compression::gzip_it;
    use super::super::test_support::{call_ctx, MockEngine, MOCK_CODE};
    use super::*;
    use ioi_api::gas::GasMeter;
    use ioi_storage::MemoryStore;

    fn keeper(engine: MockEngine) -> (Arc<MockEngine>, WasmKeeper) {
        let engine = Arc::new(engine);
        let keeper = WasmKeeper::new(engine.clone(), &WasmConfig::default());
        (engine, keeper)
    }

    #[test]
    fn test_store_code_registers_and_pins() {
        let (engine, keeper) = keeper(MockEngine::new());
        let mut store = MemoryStore::new();
        let mut ctx = call_ctx();
        let checksum = keeper.store_code(&mut ctx, &mut store, MOCK_CODE).unwrap();
        assert_eq!(checksum, Checksum::of(MOCK_CODE));
        assert!(has_checksum(&store, &checksum).unwrap());
        assert!(engine.is_pinned(&checksum));
        assert_eq!(ctx.gas_meter.gas_consumed(), 3 * MOCK_CODE.len() as u64);
    }

    #[test]
    fn test_duplicate_code_is_rejected() {
        let (_, keeper) = keeper(MockEngine::new());
        let mut store = MemoryStore::new();
        keeper.store_code(&mut call_ctx(), &mut store, MOCK_CODE).unwrap();
        let err = keeper
            .store_code(&mut call_ctx(), &mut store, MOCK_CODE)
            .unwrap_err();
        assert!(matches!(err, WasmError::CodeAlreadyExists(_)));
        assert_eq!(all_checksums(&store).unwrap().len(), 1);
    }

    #[test]
    fn test_non_wasm_bytes_are_not_registered() {
        let (_, keeper) = keeper(MockEngine::new());
        let mut store = MemoryStore::new();
        let err = keeper
            .store_code(&mut call_ctx(), &mut store, b"0123456789")
            .unwrap_err();
        assert!(matches!(err, WasmError::InvalidCode(_)));
        assert!(all_checksums(&store).unwrap().is_empty());
    }

    #[test]
    fn test_size_validation() {
        let (_, keeper) = keeper(MockEngine::new());
        let mut store = MemoryStore::new();
        assert!(matches!(
            keeper.store_code(&mut call_ctx(), &mut store, b""),
            Err(WasmError::EmptyCode)
        ));

        let mut big = MOCK_CODE.to_vec();
        big.resize(keeper.max_wasm_size() + 1, 0);
        assert!(matches!(
            keeper.store_code(&mut call_ctx(), &mut store, &big),
            Err(WasmError::CodeTooLarge { .. })
        ));
        // oversized after decompression, even though the gzip itself is small
        let zipped = gzip_it(&big).unwrap();
        assert!(zipped.len() < keeper.max_wasm_size());
        assert!(matches!(
            keeper.store_code(&mut call_ctx(), &mut store, &zipped),
            Err(WasmError::CodeTooLarge { .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_gzip_code_is_stored_decompressed() {
        let (engine, keeper) = keeper(MockEngine::new());
        let mut store = MemoryStore::new();
        let zipped = gzip_it(MOCK_CODE).unwrap();
        let mut ctx = call_ctx();
        let checksum = keeper.store_code(&mut ctx, &mut store, &zipped).unwrap();
        assert_eq!(checksum, Checksum::of(MOCK_CODE));
        assert_eq!(engine.get_code(&checksum).unwrap(), MOCK_CODE.to_vec());
        let expected = zipped.len() as u64 * 15 / 100 + 3 * MOCK_CODE.len() as u64;
        assert_eq!(ctx.gas_meter.gas_consumed(), expected);
    }

    #[test]
    fn test_engine_id_mismatch_is_fatal() {
        let mut engine = MockEngine::new();
        engine.id_override = Some(Checksum([7; 32]));
        let (_, keeper) = keeper(engine);
        let mut store = MemoryStore::new();
        let err = keeper
            .store_code(&mut call_ctx(), &mut store, MOCK_CODE)
            .unwrap_err();
        assert!(matches!(err, WasmError::CodeIdMismatch { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_code_query() {
        let (_, keeper) = keeper(MockEngine::new());
        let mut store = MemoryStore::new();
        let checksum = keeper.store_code(&mut call_ctx(), &mut store, MOCK_CODE).unwrap();

        assert_eq!(keeper.code(&store, &checksum.to_hex()).unwrap(), MOCK_CODE.to_vec());
        assert!(matches!(keeper.code(&store, "xyz"), Err(WasmError::InvalidData(_))));
        assert!(matches!(
            keeper.code(&store, "abcd"),
            Err(WasmError::InvalidChecksumLength(2))
        ));
        assert!(matches!(
            keeper.code(&store, &Checksum([1; 32]).to_hex()),
            Err(WasmError::ChecksumNotFound(_))
        ));
    }

    #[test]
    fn test_checksums_listing_and_pinning() {
        let (engine, keeper) = keeper(MockEngine::new());
        let mut store = MemoryStore::new();
        let a = keeper.store_code(&mut call_ctx(), &mut store, MOCK_CODE).unwrap();
        let other = [MOCK_CODE, b"x"].concat();
        let b = keeper.store_code(&mut call_ctx(), &mut store, &other).unwrap();

        let page = keeper.checksums(&store, &PageRequest::default()).unwrap();
        let mut expected = vec![a.to_hex(), b.to_hex()];
        expected.sort();
        assert_eq!(page.checksums, expected);
        assert_eq!(page.pagination.total, 2);

        keeper.initialize_pinned_codes(&store).unwrap();
        assert!(engine.is_pinned(&a) && engine.is_pinned(&b));
    }
}

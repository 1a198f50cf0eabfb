// Path: crates/vm/wasm/src/lib.rs
#![cfg_attr(
    not(test),
    deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)
)]
//! A wasmtime-backed sandbox for light client contracts.
//!
//! Contracts are plain core wasm modules exporting `memory`, `allocate`,
//! `deallocate` and the entry points `instantiate`, `sudo` and `query`. All
//! buffers crossing the boundary are passed as [`region`]s. State access goes
//! through the host imports in [`host::ALLOWED_IMPORTS`].

mod host;
mod region;

pub use host::{HostTrap, ALLOWED_IMPORTS};

use host::HostState;
use ioi_api::state::VmStore;
use ioi_api::vm::{Env, ExecutionOutput, MessageInfo, WasmEngine};
use ioi_types::config::{VmFuelCosts, WasmConfig};
use ioi_types::error::VmError;
use ioi_types::ibc::{base64_bytes, Checksum};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use region::{read_region, write_region};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroUsize;
use std::sync::Arc;
use wasmtime::{Config, Engine, Linker, Module, Store, StoreLimitsBuilder, Trap};

const WASM_MAGIC: &[u8; 4] = b"\0asm";
const REQUIRED_EXPORTS: &[&str] = &["memory", "allocate", "deallocate"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    Instantiate,
    Sudo,
    Query,
}

impl Entry {
    fn name(self) -> &'static str {
        match self {
            Self::Instantiate => "instantiate",
            Self::Sudo => "sudo",
            Self::Query => "query",
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum ContractResponse<T> {
    Ok(T),
    Error(String),
}

#[derive(Deserialize)]
struct Response {
    #[serde(default, with = "base64_bytes")]
    data: Vec<u8>,
}

#[derive(Deserialize)]
struct Binary(#[serde(with = "base64_bytes")] Vec<u8>);

/// The wasmtime implementation of [`WasmEngine`].
pub struct WasmtimeEngine {
    engine: Engine,
    linker: Linker<HostState>,
    memory_limit: usize,
    print_debug: bool,
    gas_per_fuel: u64,
    fuel_costs: VmFuelCosts,
    codes: RwLock<BTreeMap<Checksum, Arc<Vec<u8>>>>,
    pinned: RwLock<HashMap<Checksum, Module>>,
    cache: Mutex<LruCache<Checksum, Module>>,
}

impl WasmtimeEngine {
    pub fn new(config: &WasmConfig) -> Result<Self, VmError> {
        let mut wasm_config = Config::new();
        wasm_config.consume_fuel(true);
        wasm_config.cranelift_nan_canonicalization(true);
        wasm_config.wasm_relaxed_simd(false);

        let engine =
            Engine::new(&wasm_config).map_err(|e| VmError::Initialization(e.to_string()))?;
        let mut linker = Linker::new(&engine);
        host::link(&mut linker).map_err(|e| VmError::Initialization(e.to_string()))?;

        let cache_size = NonZeroUsize::new(config.cache_size).unwrap_or(NonZeroUsize::MIN);
        Ok(Self {
            engine,
            linker,
            memory_limit: (config.memory_limit_mb as usize).saturating_mul(1024 * 1024),
            print_debug: config.print_debug,
            gas_per_fuel: config.gas_per_fuel.max(1),
            fuel_costs: config.fuel_costs.clone(),
            codes: RwLock::new(BTreeMap::new()),
            pinned: RwLock::new(HashMap::new()),
            cache: Mutex::new(LruCache::new(cache_size)),
        })
    }

    #[cfg(test)]
    fn code_count(&self) -> usize {
        self.codes.read().len()
    }

    fn compile(&self, code: &[u8]) -> Result<Module, VmError> {
        if !code.starts_with(WASM_MAGIC) {
            return Err(VmError::InvalidBytecode("missing wasm magic header".into()));
        }
        Module::new(&self.engine, code).map_err(|e| VmError::InvalidBytecode(e.to_string()))
    }

    fn check_interface(module: &Module) -> Result<(), VmError> {
        for required in REQUIRED_EXPORTS {
            if module.get_export(required).is_none() {
                return Err(VmError::InvalidBytecode(format!(
                    "missing required export `{required}`"
                )));
            }
        }
        for import in module.imports() {
            if import.module() != "env" || !ALLOWED_IMPORTS.contains(&import.name()) {
                return Err(VmError::InvalidBytecode(format!(
                    "unsupported import `{}::{}`",
                    import.module(),
                    import.name()
                )));
            }
        }
        Ok(())
    }

    fn insert(&self, code: &[u8], module: Module) -> Checksum {
        let checksum = Checksum::of(code);
        self.codes
            .write()
            .entry(checksum)
            .or_insert_with(|| Arc::new(code.to_vec()));
        if !self.pinned.read().contains_key(&checksum) {
            self.cache.lock().put(checksum, module);
        }
        checksum
    }

    fn module_for(&self, checksum: &Checksum) -> Result<Module, VmError> {
        if let Some(module) = self.pinned.read().get(checksum) {
            return Ok(module.clone());
        }
        if let Some(module) = self.cache.lock().get(checksum) {
            return Ok(module.clone());
        }
        let code = self
            .codes
            .read()
            .get(checksum)
            .cloned()
            .ok_or_else(|| VmError::ChecksumNotFound(checksum.to_hex()))?;
        tracing::debug!(target: "wasm", %checksum, "compiling module on cache miss");
        let module = self.compile(&code)?;
        self.cache.lock().put(*checksum, module.clone());
        Ok(module)
    }

    fn run(
        &self,
        checksum: &Checksum,
        entry: Entry,
        args: &[&[u8]],
        store_ptr: *mut (dyn VmStore + 'static),
        read_only: bool,
        gas_limit: u64,
    ) -> Result<ExecutionOutput, VmError> {
        let module = self.module_for(checksum)?;
        let limits = StoreLimitsBuilder::new()
            .memory_size(self.memory_limit)
            .build();
        // SAFETY: `store_ptr` comes from a borrow held by our caller for the
        // whole call, and the wasmtime `Store` owning this state is dropped
        // before `run` returns.
        let state = unsafe {
            HostState::new(
                store_ptr,
                read_only,
                self.fuel_costs.clone(),
                self.print_debug,
                limits,
            )
        };
        let mut store = Store::new(&self.engine, state);
        store.limiter(|s| &mut s.limits);

        let fuel = gas_limit / self.gas_per_fuel;
        store
            .set_fuel(fuel)
            .map_err(|e| VmError::Initialization(e.to_string()))?;

        let result = self.invoke(&mut store, &module, entry, args);

        let remaining = store.get_fuel().unwrap_or(0);
        let gas_used = fuel
            .saturating_sub(remaining)
            .saturating_mul(self.gas_per_fuel)
            .min(gas_limit);

        match result {
            Ok(data) => {
                tracing::debug!(
                    target: "wasm",
                    entry = entry.name(),
                    %checksum,
                    gas_used,
                    "contract call finished"
                );
                parse_response(entry, &data, gas_used)
            }
            Err(e) => {
                let out_of_fuel = matches!(e.downcast_ref::<Trap>(), Some(Trap::OutOfFuel));
                if out_of_fuel || (remaining == 0 && fuel > 0) {
                    tracing::warn!(target: "wasm", entry = entry.name(), %checksum, gas_limit, "contract ran out of gas");
                    return Err(VmError::OutOfGas { gas_used });
                }
                tracing::warn!(target: "wasm", entry = entry.name(), %checksum, error = %e, "contract trapped");
                Err(VmError::ExecutionTrap {
                    reason: format!("{e:#}"),
                    gas_used,
                })
            }
        }
    }

    fn invoke(
        &self,
        store: &mut Store<HostState>,
        module: &Module,
        entry: Entry,
        args: &[&[u8]],
    ) -> anyhow::Result<Vec<u8>> {
        let instance = self.linker.instantiate(&mut *store, module)?;
        let memory = instance
            .get_memory(&mut *store, "memory")
            .ok_or(HostTrap::MissingExport("memory"))?;
        let allocate = instance.get_typed_func::<u32, u32>(&mut *store, "allocate")?;

        let mut ptrs = Vec::with_capacity(args.len());
        for arg in args {
            ptrs.push(write_region(&mut *store, &memory, &allocate, arg)?);
        }

        let result_ptr = match (entry, ptrs.as_slice()) {
            (Entry::Instantiate, &[env, info, msg]) => instance
                .get_typed_func::<(u32, u32, u32), u32>(&mut *store, entry.name())?
                .call(&mut *store, (env, info, msg))?,
            (Entry::Sudo | Entry::Query, &[env, msg]) => instance
                .get_typed_func::<(u32, u32), u32>(&mut *store, entry.name())?
                .call(&mut *store, (env, msg))?,
            _ => anyhow::bail!("wrong argument count for `{}`", entry.name()),
        };
        Ok(read_region(&*store, &memory, result_ptr)?)
    }
}

fn parse_response(entry: Entry, raw: &[u8], gas_used: u64) -> Result<ExecutionOutput, VmError> {
    let malformed = |e: serde_json::Error| VmError::ExecutionTrap {
        reason: format!("malformed `{}` response: {e}", entry.name()),
        gas_used,
    };
    let data = match entry {
        Entry::Query => match serde_json::from_slice::<ContractResponse<Binary>>(raw) {
            Ok(ContractResponse::Ok(bin)) => Ok(bin.0),
            Ok(ContractResponse::Error(msg)) => Err(msg),
            Err(e) => return Err(malformed(e)),
        },
        Entry::Instantiate | Entry::Sudo => {
            match serde_json::from_slice::<ContractResponse<Response>>(raw) {
                Ok(ContractResponse::Ok(resp)) => Ok(resp.data),
                Ok(ContractResponse::Error(msg)) => Err(msg),
                Err(e) => return Err(malformed(e)),
            }
        }
    };
    match data {
        Ok(return_data) => Ok(ExecutionOutput {
            gas_used,
            return_data,
        }),
        Err(msg) => Err(VmError::ContractError { msg, gas_used }),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Vec<u8>, VmError> {
    serde_json::to_vec(value).map_err(|e| VmError::HostError(e.to_string()))
}

fn erase_mut<'b>(store: &mut (dyn VmStore + 'b)) -> *mut (dyn VmStore + 'static) {
    let ptr: *mut (dyn VmStore + 'b) = store;
    // SAFETY: only the trait-object lifetime bound changes. The pointer is never
    // dereferenced after the borrow it came from ends; see `WasmtimeEngine::run`.
    unsafe { std::mem::transmute::<*mut (dyn VmStore + 'b), *mut (dyn VmStore + 'static)>(ptr) }
}

fn erase_ref<'b>(store: &(dyn VmStore + 'b)) -> *mut (dyn VmStore + 'static) {
    let ptr = store as *const (dyn VmStore + 'b) as *mut (dyn VmStore + 'b);
    // SAFETY: as in `erase_mut`. Callers pass `read_only`, so the host never
    // writes through this pointer.
    unsafe { std::mem::transmute::<*mut (dyn VmStore + 'b), *mut (dyn VmStore + 'static)>(ptr) }
}

impl WasmEngine for WasmtimeEngine {
    fn store_code(&self, code: &[u8]) -> Result<Checksum, VmError> {
        let module = self.compile(code)?;
        Self::check_interface(&module)?;
        let checksum = self.insert(code, module);
        tracing::info!(target: "wasm", %checksum, size = code.len(), "stored contract code");
        Ok(checksum)
    }

    fn store_code_unchecked(&self, code: &[u8]) -> Result<Checksum, VmError> {
        let module = self.compile(code)?;
        Ok(self.insert(code, module))
    }

    fn get_code(&self, checksum: &Checksum) -> Result<Vec<u8>, VmError> {
        self.codes
            .read()
            .get(checksum)
            .map(|c| c.as_ref().clone())
            .ok_or_else(|| VmError::ChecksumNotFound(checksum.to_hex()))
    }

    fn pin(&self, checksum: &Checksum) -> Result<(), VmError> {
        let module = self.module_for(checksum)?;
        self.cache.lock().pop(checksum);
        self.pinned.write().insert(*checksum, module);
        Ok(())
    }

    fn instantiate(
        &self,
        checksum: &Checksum,
        env: &Env,
        info: &MessageInfo,
        msg: &[u8],
        store: &mut dyn VmStore,
        gas_limit: u64,
    ) -> Result<ExecutionOutput, VmError> {
        let env = to_json(env)?;
        let info = to_json(info)?;
        let ptr = erase_mut(store);
        self.run(
            checksum,
            Entry::Instantiate,
            &[&env, &info, msg],
            ptr,
            false,
            gas_limit,
        )
    }

    fn sudo(
        &self,
        checksum: &Checksum,
        env: &Env,
        msg: &[u8],
        store: &mut dyn VmStore,
        gas_limit: u64,
    ) -> Result<ExecutionOutput, VmError> {
        let env = to_json(env)?;
        let ptr = erase_mut(store);
        self.run(checksum, Entry::Sudo, &[&env, msg], ptr, false, gas_limit)
    }

    fn query(
        &self,
        checksum: &Checksum,
        env: &Env,
        msg: &[u8],
        store: &dyn VmStore,
        gas_limit: u64,
    ) -> Result<ExecutionOutput, VmError> {
        let env = to_json(env)?;
        let ptr = erase_ref(store);
        self.run(checksum, Entry::Query, &[&env, msg], ptr, true, gas_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ioi_api::state::KvStore;
    use ioi_api::vm::{BlockInfo, ContractInfo};
    use ioi_storage::{MemoryStore, ReadOnlyStoreAdapter, StoreAdapter};

    fn escape(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("\\{b:02x}")).collect()
    }

    fn region(offset: u32, len: u32) -> String {
        let mut raw = Vec::new();
        for w in [offset, len, len] {
            raw.extend_from_slice(&w.to_le_bytes());
        }
        escape(&raw)
    }

    /// A guest whose `sudo` writes `k => v` and whose entry points all return
    /// the region at 16, which holds `response`.
    fn guest(response: &str, sudo_body: &str, query_body: &str) -> Vec<u8> {
        let wat = format!(
            r#"(module
  (import "env" "db_write" (func $db_write (param i32 i32)))
  (import "env" "db_read" (func $db_read (param i32) (result i32)))
  (memory (export "memory") 1)
  (global $heap (mut i32) (i32.const 4096))
  (func (export "allocate") (param $len i32) (result i32)
    (local $r i32)
    (local.set $r (global.get $heap))
    (i32.store (local.get $r) (i32.add (local.get $r) (i32.const 12)))
    (i32.store offset=4 (local.get $r) (local.get $len))
    (i32.store offset=8 (local.get $r) (i32.const 0))
    (global.set $heap (i32.add (global.get $heap) (i32.add (local.get $len) (i32.const 12))))
    (local.get $r))
  (func (export "deallocate") (param i32))
  (func (export "instantiate") (param i32 i32 i32) (result i32) (i32.const 16))
  (func (export "sudo") (param i32 i32) (result i32) {sudo_body} (i32.const 16))
  (func (export "query") (param i32 i32) (result i32) {query_body} (i32.const 16))
  (data (i32.const 16) "{resp_region}")
  (data (i32.const 32) "{key_region}")
  (data (i32.const 48) "{value_region}")
  (data (i32.const 200) "k")
  (data (i32.const 210) "v")
  (data (i32.const 256) "{resp}"))"#,
            resp_region = region(256, response.len() as u32),
            key_region = region(200, 1),
            value_region = region(210, 1),
            resp = escape(response.as_bytes()),
        );
        wat::parse_str(wat).unwrap()
    }

    const WRITE_KV: &str = "(call $db_write (i32.const 32) (i32.const 48))";

    fn engine() -> WasmtimeEngine {
        WasmtimeEngine::new(&WasmConfig::default()).unwrap()
    }

    fn env() -> Env {
        Env {
            block: BlockInfo {
                height: 10,
                time: 1_700_000_000_000_000_000,
                chain_id: "test-1".into(),
            },
            contract: ContractInfo {
                address: String::new(),
            },
        }
    }

    #[test]
    fn test_rejects_non_wasm_bytes() {
        let err = engine().store_code(b"(module)").unwrap_err();
        assert!(matches!(err, VmError::InvalidBytecode(_)));
    }

    #[test]
    fn test_rejects_missing_exports_but_unchecked_accepts() {
        let code = wat::parse_str("(module (memory (export \"memory\") 1))").unwrap();
        let engine = engine();
        assert!(matches!(
            engine.store_code(&code),
            Err(VmError::InvalidBytecode(_))
        ));
        let checksum = engine.store_code_unchecked(&code).unwrap();
        assert_eq!(checksum, Checksum::of(&code));
    }

    #[test]
    fn test_rejects_unknown_import() {
        let code = wat::parse_str(
            r#"(module
                (import "wasi" "fd_write" (func (param i32)))
                (memory (export "memory") 1)
                (func (export "allocate") (param i32) (result i32) (i32.const 0))
                (func (export "deallocate") (param i32)))"#,
        )
        .unwrap();
        assert!(matches!(
            engine().store_code(&code),
            Err(VmError::InvalidBytecode(_))
        ));
    }

    #[test]
    fn test_store_get_and_pin() {
        let engine = engine();
        let code = guest(r#"{"ok":{"data":null}}"#, "", "");
        let checksum = engine.store_code(&code).unwrap();
        assert_eq!(checksum, Checksum::of(&code));
        assert_eq!(engine.store_code(&code).unwrap(), checksum);
        assert_eq!(engine.code_count(), 1);
        assert_eq!(engine.get_code(&checksum).unwrap(), code);
        engine.pin(&checksum).unwrap();
        assert!(matches!(
            engine.pin(&Checksum([9; 32])),
            Err(VmError::ChecksumNotFound(_))
        ));
    }

    #[test]
    fn test_sudo_writes_through_adapter() {
        let engine = engine();
        // base64("hello") = aGVsbG8=
        let code = guest(r#"{"ok":{"data":"aGVsbG8="}}"#, WRITE_KV, "");
        let checksum = engine.store_code(&code).unwrap();

        let mut backing = MemoryStore::new();
        let out = {
            let mut adapter = StoreAdapter::new(Some(&mut backing)).unwrap();
            engine
                .sudo(&checksum, &env(), b"{}", &mut adapter, 1_000_000_000)
                .unwrap()
        };
        assert_eq!(out.return_data, b"hello".to_vec());
        assert!(out.gas_used > 0 && out.gas_used <= 1_000_000_000);
        assert_eq!(backing.get(b"k").unwrap(), Some(b"v".to_vec()));
    }

    #[test]
    fn test_query_cannot_write() {
        let engine = engine();
        let code = guest(r#"{"ok":"e30="}"#, "", WRITE_KV);
        let checksum = engine.store_code(&code).unwrap();
        let backing = MemoryStore::new();
        let adapter = ReadOnlyStoreAdapter::new(Some(&backing)).unwrap();
        let err = engine
            .query(&checksum, &env(), b"{}", &adapter, 1_000_000_000)
            .unwrap_err();
        assert!(matches!(err, VmError::ExecutionTrap { .. }), "{err:?}");
        assert!(backing.is_empty());
    }

    #[test]
    fn test_query_returns_binary() {
        let engine = engine();
        let code = guest(r#"{"ok":"e30="}"#, "", "");
        let checksum = engine.store_code(&code).unwrap();
        let backing = MemoryStore::new();
        let adapter = ReadOnlyStoreAdapter::new(Some(&backing)).unwrap();
        let out = engine
            .query(&checksum, &env(), b"{}", &adapter, 1_000_000_000)
            .unwrap();
        assert_eq!(out.return_data, b"{}".to_vec());
    }

    #[test]
    fn test_out_of_gas_reports_usage() {
        let engine = engine();
        let code = guest(r#"{"ok":{}}"#, "(loop $spin (br $spin))", "");
        let checksum = engine.store_code(&code).unwrap();
        let mut backing = MemoryStore::new();
        let mut adapter = StoreAdapter::new(Some(&mut backing)).unwrap();
        let err = engine
            .sudo(&checksum, &env(), b"{}", &mut adapter, 1_000_000)
            .unwrap_err();
        match err {
            VmError::OutOfGas { gas_used } => assert!(gas_used > 0 && gas_used <= 1_000_000),
            other => panic!("expected out of gas, got {other:?}"),
        }
    }

    #[test]
    fn test_contract_error_response() {
        let engine = engine();
        let code = guest(r#"{"error":"boom"}"#, WRITE_KV, "");
        let checksum = engine.store_code(&code).unwrap();
        let mut backing = MemoryStore::new();
        let mut adapter = StoreAdapter::new(Some(&mut backing)).unwrap();
        let err = engine
            .instantiate(
                &checksum,
                &env(),
                &MessageInfo::default(),
                b"{}",
                &mut adapter,
                1_000_000_000,
            )
            .unwrap_err();
        match err {
            VmError::ContractError { msg, gas_used } => {
                assert_eq!(msg, "boom");
                assert!(gas_used > 0);
            }
            other => panic!("expected contract error, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_checksum() {
        let mut backing = MemoryStore::new();
        let mut adapter = StoreAdapter::new(Some(&mut backing)).unwrap();
        let err = engine()
            .sudo(&Checksum([1; 32]), &env(), b"{}", &mut adapter, 100)
            .unwrap_err();
        assert!(matches!(err, VmError::ChecksumNotFound(_)));
    }
}

// Path: crates/services/src/ibc/light_clients/wasm/test_support.rs
//! A scripted engine for exercising the module without a sandbox.

use ioi_api::context::{BlockHeader, CallCtx};
use ioi_api::gas::BasicGasMeter;
use ioi_api::state::VmStore;
use ioi_api::vm::{Env, ExecutionOutput, MessageInfo, WasmEngine};
use ioi_types::error::VmError;
use ioi_types::ibc::Checksum;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::Mutex;

/// Smallest module the mock accepts: the wasm magic and version.
pub const MOCK_CODE: &[u8] = b"\0asm\x01\x00\x00\x00";

/// One scripted engine reply.
#[derive(Debug, Clone)]
pub struct Reply {
    pub writes: Vec<(Vec<u8>, Vec<u8>)>,
    pub result: Result<Vec<u8>, VmError>,
    pub gas_used: u64,
}

impl Reply {
    pub fn ok(data: impl Into<Vec<u8>>) -> Self {
        Self {
            writes: Vec::new(),
            result: Ok(data.into()),
            gas_used: 0,
        }
    }

    pub fn json(value: serde_json::Value) -> Self {
        Self::ok(value.to_string())
    }

    pub fn err(err: VmError) -> Self {
        Self {
            writes: Vec::new(),
            result: Err(err),
            gas_used: 0,
        }
    }

    pub fn writing(mut self, key: &[u8], value: &[u8]) -> Self {
        self.writes.push((key.to_vec(), value.to_vec()));
        self
    }

    pub fn gas(mut self, gas_used: u64) -> Self {
        self.gas_used = gas_used;
        self
    }
}

#[derive(Debug, Default)]
pub struct MockEngine {
    codes: Mutex<BTreeMap<Checksum, Vec<u8>>>,
    pinned: Mutex<BTreeSet<Checksum>>,
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<(&'static str, Vec<u8>)>>,
    /// When set, `store_code` reports this id instead of the real checksum.
    pub id_override: Option<Checksum>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// `(entry, message)` of every call so far.
    pub fn calls(&self) -> Vec<(&'static str, Vec<u8>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn is_pinned(&self, checksum: &Checksum) -> bool {
        self.pinned.lock().unwrap().contains(checksum)
    }

    fn store(&self, code: &[u8]) -> Result<Checksum, VmError> {
        if !code.starts_with(b"\0asm") {
            return Err(VmError::InvalidBytecode("missing wasm magic header".into()));
        }
        let checksum = Checksum::of(code);
        self.codes.lock().unwrap().insert(checksum, code.to_vec());
        Ok(self.id_override.unwrap_or(checksum))
    }

    fn next(
        &self,
        entry: &'static str,
        checksum: &Checksum,
        msg: &[u8],
        mut store: Option<&mut dyn VmStore>,
    ) -> Result<ExecutionOutput, VmError> {
        self.calls.lock().unwrap().push((entry, msg.to_vec()));
        if !self.codes.lock().unwrap().contains_key(checksum) {
            return Err(VmError::ChecksumNotFound(checksum.to_hex()));
        }
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted reply for {entry}"));
        for (k, v) in &reply.writes {
            match store.as_deref_mut() {
                Some(s) => s
                    .set(k, v)
                    .map_err(|e| VmError::HostError(e.to_string()))?,
                None => {
                    return Err(VmError::ExecutionTrap {
                        reason: "write attempted in read-only query context".into(),
                        gas_used: reply.gas_used,
                    })
                }
            }
        }
        reply.result.map(|return_data| ExecutionOutput {
            gas_used: reply.gas_used,
            return_data,
        })
    }
}

impl WasmEngine for MockEngine {
    fn store_code(&self, code: &[u8]) -> Result<Checksum, VmError> {
        self.store(code)
    }

    fn store_code_unchecked(&self, code: &[u8]) -> Result<Checksum, VmError> {
        self.store(code)
    }

    fn get_code(&self, checksum: &Checksum) -> Result<Vec<u8>, VmError> {
        self.codes
            .lock()
            .unwrap()
            .get(checksum)
            .cloned()
            .ok_or_else(|| VmError::ChecksumNotFound(checksum.to_hex()))
    }

    fn pin(&self, checksum: &Checksum) -> Result<(), VmError> {
        if !self.codes.lock().unwrap().contains_key(checksum) {
            return Err(VmError::ChecksumNotFound(checksum.to_hex()));
        }
        self.pinned.lock().unwrap().insert(*checksum);
        Ok(())
    }

    fn instantiate(
        &self,
        checksum: &Checksum,
        _env: &Env,
        _info: &MessageInfo,
        msg: &[u8],
        store: &mut dyn VmStore,
        _gas_limit: u64,
    ) -> Result<ExecutionOutput, VmError> {
        self.next("instantiate", checksum, msg, Some(store))
    }

    fn sudo(
        &self,
        checksum: &Checksum,
        _env: &Env,
        msg: &[u8],
        store: &mut dyn VmStore,
        _gas_limit: u64,
    ) -> Result<ExecutionOutput, VmError> {
        self.next("sudo", checksum, msg, Some(store))
    }

    fn query(
        &self,
        checksum: &Checksum,
        _env: &Env,
        msg: &[u8],
        _store: &dyn VmStore,
        _gas_limit: u64,
    ) -> Result<ExecutionOutput, VmError> {
        self.next("query", checksum, msg, None)
    }
}

/// A call context at height 10 with a generous gas limit.
pub fn call_ctx() -> CallCtx {
    CallCtx::new(
        BlockHeader {
            height: 10,
            time_unix_nanos: 1_700_000_000_000_000_000,
            chain_id: "host-1".into(),
        },
        Box::new(BasicGasMeter::new(10_000_000)),
    )
}

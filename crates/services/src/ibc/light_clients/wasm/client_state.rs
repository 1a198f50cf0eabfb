// Path: crates/services/src/ibc/light_clients/wasm/client_state.rs
//! Light client operations of a wasm client.
//!
//! Parameter shape and bookkeeping (height ordering, concrete types, stored
//! consensus states) are checked here before any contract call. Everything
//! past that is the contract's verdict.

use super::checksums::has_checksum;
use super::contract::WasmContext;
use super::msgs::{
    decode_payload, CheckForMisbehaviourMsg, ClientMessage, ContractResult, ExportMetadataMsg,
    QueryMsg, QueryResponse, StatusMsg, SudoMsg, UpdateStateMsg, UpdateStateOnMisbehaviourMsg,
    UpdateStateResult, VerifyClientMessageMsg, VerifyMembershipMsg, VerifyNonMembershipMsg,
};
use ioi_api::context::{BlockHeader, CallCtx};
use ioi_api::gas::InfiniteGasMeter;
use ioi_api::ibc::{AnyConsensusState, CommitmentPath};
use ioi_api::state::KvStore;
use ioi_types::codec;
use ioi_types::error::WasmError;
use ioi_types::ibc::{ClientState, ConsensusState, GenesisMetadata, Height, MerklePath, Status};
use ioi_types::keys::{consensus_state_key, CLIENT_STATE_KEY};
use std::time::{SystemTime, UNIX_EPOCH};

/// Reads the client state of a client store.
pub fn get_client_state(store: &dyn KvStore) -> Result<Option<ClientState>, WasmError> {
    store
        .get(CLIENT_STATE_KEY)?
        .map(|raw| codec::from_bytes_canonical(&raw).map_err(WasmError::from))
        .transpose()
}

pub fn set_client_state(store: &mut dyn KvStore, client_state: &ClientState) -> Result<(), WasmError> {
    store.set(CLIENT_STATE_KEY, &codec::to_bytes_canonical(client_state))?;
    Ok(())
}

/// Reads the consensus state stored at `height`.
pub fn get_consensus_state(
    store: &dyn KvStore,
    height: &Height,
) -> Result<Option<ConsensusState>, WasmError> {
    store
        .get(&consensus_state_key(height))?
        .map(|raw| {
            codec::from_bytes_canonical(&raw)
                .map_err(|e| WasmError::InvalidConsensus(format!("at height {height}: {e}")))
        })
        .transpose()
}

pub fn set_consensus_state(
    store: &mut dyn KvStore,
    height: &Height,
    consensus_state: &ConsensusState,
) -> Result<(), WasmError> {
    store.set(
        &consensus_state_key(height),
        &codec::to_bytes_canonical(consensus_state),
    )?;
    Ok(())
}

/// A wasm client state bound to the engine context.
#[derive(Debug, Clone, Copy)]
pub struct WasmLightClient<'a> {
    pub(crate) wasm: &'a WasmContext,
    pub(crate) client_state: &'a ClientState,
}

impl<'a> WasmLightClient<'a> {
    pub fn new(wasm: &'a WasmContext, client_state: &'a ClientState) -> Self {
        Self { wasm, client_state }
    }

    pub fn client_state(&self) -> &ClientState {
        self.client_state
    }

    /// Persists the client and its initial consensus state, then runs the
    /// contract's `instantiate`.
    pub fn initialize(
        &self,
        ctx: &mut CallCtx,
        module_store: &dyn KvStore,
        client_store: &mut dyn KvStore,
        consensus_state: &dyn AnyConsensusState,
    ) -> Result<(), WasmError> {
        let consensus_state = consensus_state
            .as_any()
            .downcast_ref::<ConsensusState>()
            .ok_or_else(|| {
                WasmError::InvalidConsensus(format!(
                    "invalid initial consensus state, expected a {} consensus state",
                    self.client_state.client_type()
                ))
            })?;
        let code_id = &self.client_state.code_id;
        if !has_checksum(module_store, code_id)? {
            return Err(WasmError::ChecksumNotFound(code_id.to_hex()));
        }

        set_client_state(client_store, self.client_state)?;
        set_consensus_state(client_store, &self.client_state.latest_height, consensus_state)?;

        match self.wasm.instantiate(ctx, code_id, client_store) {
            Ok(ContractResult::Valid { .. }) => {
                tracing::info!(target: "ibc", %code_id, height = %self.client_state.latest_height, "initialized wasm client");
                Ok(())
            }
            Ok(ContractResult::Invalid(msg)) => Err(WasmError::UnableToInit(msg)),
            Err(e @ WasmError::UnableToInit(_)) => Err(e),
            Err(e) => Err(WasmError::UnableToInit(e.to_string())),
        }
    }

    /// Asks the contract for the client status. Any failure reads as `Unknown`.
    pub fn status(&self, ctx: &mut CallCtx, client_store: &dyn KvStore) -> Status {
        let msg = QueryMsg::Status(StatusMsg {});
        let status = self
            .wasm
            .query(ctx, &self.client_state.code_id, client_store, &msg)
            .and_then(|raw| decode_payload::<QueryResponse>(&raw));
        match status {
            Ok(QueryResponse {
                status: Some(status),
                ..
            }) => status,
            Ok(_) => Status::Unknown,
            Err(e) => {
                tracing::debug!(target: "ibc", error = %e, "status query failed");
                Status::Unknown
            }
        }
    }

    /// Timestamp of the consensus state stored at `height`.
    pub fn get_timestamp_at_height(
        &self,
        client_store: &dyn KvStore,
        height: &Height,
    ) -> Result<u64, WasmError> {
        get_consensus_state(client_store, height)?
            .map(|cs| cs.timestamp)
            .ok_or_else(|| WasmError::ConsensusStateNotFound(format!("height ({height})")))
    }

    /// Host-side checks shared by membership and non-membership proofs.
    fn check_proof_target(
        &self,
        client_store: &dyn KvStore,
        height: &Height,
        path: &dyn CommitmentPath,
    ) -> Result<MerklePath, WasmError> {
        let latest = &self.client_state.latest_height;
        if latest < height {
            return Err(WasmError::InvalidHeight(format!(
                "client state height < proof height ({latest} < {height}), please ensure the client has been updated"
            )));
        }
        let path = path
            .as_any()
            .downcast_ref::<MerklePath>()
            .ok_or_else(|| WasmError::InvalidType(format!("expected MerklePath, got {path:?}")))?;
        if get_consensus_state(client_store, height)?.is_none() {
            return Err(WasmError::ConsensusStateNotFound(
                "please ensure the proof was constructed against a height that exists on the client".into(),
            ));
        }
        Ok(path.clone())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn verify_membership(
        &self,
        ctx: &mut CallCtx,
        client_store: &mut dyn KvStore,
        height: &Height,
        delay_time_period: u64,
        delay_block_period: u64,
        proof: &[u8],
        path: &dyn CommitmentPath,
        value: &[u8],
    ) -> Result<(), WasmError> {
        let path = self.check_proof_target(client_store, height, path)?;
        let msg = SudoMsg::VerifyMembership(VerifyMembershipMsg {
            height: *height,
            delay_time_period,
            delay_block_period,
            proof: proof.to_vec(),
            path,
            value: value.to_vec(),
        });
        self.wasm
            .sudo(ctx, &self.client_state.code_id, client_store, &msg)?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub fn verify_non_membership(
        &self,
        ctx: &mut CallCtx,
        client_store: &mut dyn KvStore,
        height: &Height,
        delay_time_period: u64,
        delay_block_period: u64,
        proof: &[u8],
        path: &dyn CommitmentPath,
    ) -> Result<(), WasmError> {
        let path = self.check_proof_target(client_store, height, path)?;
        let msg = SudoMsg::VerifyNonMembership(VerifyNonMembershipMsg {
            height: *height,
            delay_time_period,
            delay_block_period,
            proof: proof.to_vec(),
            path,
        });
        self.wasm
            .sudo(ctx, &self.client_state.code_id, client_store, &msg)?;
        Ok(())
    }

    /// Has the contract validate a header or misbehaviour against its trusted state.
    pub fn verify_client_message(
        &self,
        ctx: &mut CallCtx,
        client_store: &dyn KvStore,
        client_message: &ClientMessage,
    ) -> Result<(), WasmError> {
        client_message.validate_basic()?;
        let msg = QueryMsg::VerifyClientMessage(VerifyClientMessageMsg {
            client_message: client_message.clone(),
        });
        self.wasm
            .query_result(ctx, &self.client_state.code_id, client_store, &msg)?;
        Ok(())
    }

    /// Reports whether the contract found misbehaviour. Errors read as `false`.
    pub fn check_for_misbehaviour(
        &self,
        ctx: &mut CallCtx,
        client_store: &dyn KvStore,
        client_message: &ClientMessage,
    ) -> bool {
        let msg = QueryMsg::CheckForMisbehaviour(CheckForMisbehaviourMsg {
            client_message: client_message.clone(),
        });
        match self
            .wasm
            .query_result(ctx, &self.client_state.code_id, client_store, &msg)
        {
            Ok((_, found_misbehaviour)) => found_misbehaviour,
            Err(e) => {
                tracing::debug!(target: "ibc", error = %e, "misbehaviour check failed");
                false
            }
        }
    }

    /// Applies a verified header. Returns the consensus heights the contract wrote.
    pub fn update_state(
        &self,
        ctx: &mut CallCtx,
        client_store: &mut dyn KvStore,
        client_message: &ClientMessage,
    ) -> Result<Vec<Height>, WasmError> {
        let msg = SudoMsg::UpdateState(UpdateStateMsg {
            client_message: client_message.clone(),
        });
        let (data, _) = self
            .wasm
            .sudo(ctx, &self.client_state.code_id, client_store, &msg)?;
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let result: UpdateStateResult = decode_payload(&data)?;
        Ok(result.heights)
    }

    /// Freezes the client after verified misbehaviour.
    pub fn update_state_on_misbehaviour(
        &self,
        ctx: &mut CallCtx,
        client_store: &mut dyn KvStore,
        client_message: &ClientMessage,
    ) -> Result<(), WasmError> {
        let msg = SudoMsg::UpdateStateOnMisbehaviour(UpdateStateOnMisbehaviourMsg {
            client_message: client_message.clone(),
        });
        self.wasm
            .sudo(ctx, &self.client_state.code_id, client_store, &msg)?;
        Ok(())
    }

    /// Collects the contract's genesis metadata. Runs outside block execution
    /// with an unmetered context.
    pub fn export_metadata(&self, client_store: &dyn KvStore) -> Result<Vec<GenesisMetadata>, WasmError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        let mut ctx = CallCtx::new(
            BlockHeader {
                height: 1,
                time_unix_nanos: now,
                chain_id: String::new(),
            },
            Box::new(InfiniteGasMeter::new()),
        );
        let msg = QueryMsg::ExportMetadata(ExportMetadataMsg {});
        let raw = self
            .wasm
            .query(&mut ctx, &self.client_state.code_id, client_store, &msg)?;
        let response: QueryResponse = decode_payload(&raw)?;
        Ok(response.genesis_metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::super::checksums::add_checksum;
    use super::super::gas::GasRegister;
    use super::super::test_support::{call_ctx, MockEngine, Reply, MOCK_CODE};
    use super::*;
    use ioi_api::vm::WasmEngine;
    use ioi_storage::MemoryStore;
    use ioi_types::ibc::{Header, Misbehaviour};
    use serde_json::json;
    use std::any::Any;
    use std::sync::Arc;

    #[derive(Debug)]
    struct ForeignConsensus;

    impl AnyConsensusState for ForeignConsensus {
        fn timestamp(&self) -> u64 {
            1
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Debug)]
    struct RawPath;

    impl CommitmentPath for RawPath {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Fixture {
        engine: Arc<MockEngine>,
        wasm: WasmContext,
        cs: ClientState,
        store: MemoryStore,
    }

    /// A client at height 0-5 with a consensus state stored at that height.
    fn fixture() -> Fixture {
        let engine = Arc::new(MockEngine::new());
        let checksum = engine.store_code(MOCK_CODE).unwrap();
        let wasm = WasmContext::new(engine.clone(), GasRegister::default());
        let cs = ClientState::new(vec![1], checksum, Height::new(0, 5));
        let mut store = MemoryStore::new();
        set_client_state(&mut store, &cs).unwrap();
        set_consensus_state(&mut store, &cs.latest_height, &ConsensusState::new(vec![2], 99)).unwrap();
        Fixture {
            engine,
            wasm,
            cs,
            store,
        }
    }

    fn header() -> ClientMessage {
        ClientMessage::Header(Header {
            data: vec![7],
            height: Height::new(0, 6),
        })
    }

    #[test]
    fn test_initialize_persists_and_instantiates() {
        let f = fixture();
        let mut module_store = MemoryStore::new();
        add_checksum(&mut module_store, &f.cs.code_id).unwrap();
        let mut client_store = MemoryStore::new();
        f.engine.push(Reply::ok(Vec::new()));

        let consensus = ConsensusState::new(vec![3], 42);
        WasmLightClient::new(&f.wasm, &f.cs)
            .initialize(&mut call_ctx(), &module_store, &mut client_store, &consensus)
            .unwrap();
        assert_eq!(get_client_state(&client_store).unwrap(), Some(f.cs.clone()));
        assert_eq!(
            get_consensus_state(&client_store, &Height::new(0, 5)).unwrap(),
            Some(consensus)
        );
        assert_eq!(f.engine.calls(), vec![("instantiate", b"{}".to_vec())]);
    }

    #[test]
    fn test_initialize_rejects_bad_input_before_calling() {
        let f = fixture();
        let client = WasmLightClient::new(&f.wasm, &f.cs);
        let mut module_store = MemoryStore::new();

        let err = client
            .initialize(&mut call_ctx(), &module_store, &mut MemoryStore::new(), &ForeignConsensus)
            .unwrap_err();
        assert!(matches!(err, WasmError::InvalidConsensus(_)));

        let consensus = ConsensusState::new(vec![3], 42);
        let err = client
            .initialize(&mut call_ctx(), &module_store, &mut MemoryStore::new(), &consensus)
            .unwrap_err();
        assert!(matches!(err, WasmError::ChecksumNotFound(_)));

        add_checksum(&mut module_store, &f.cs.code_id).unwrap();
        f.engine.push(Reply::json(json!({"is_valid": false, "error_msg": "bad genesis"})));
        let err = client
            .initialize(&mut call_ctx(), &module_store, &mut MemoryStore::new(), &consensus)
            .unwrap_err();
        assert!(matches!(err, WasmError::UnableToInit(m) if m == "bad genesis"));
        assert_eq!(f.engine.call_count(), 1);
    }

    #[test]
    fn test_verify_membership_checks_before_calling() {
        let mut f = fixture();
        let client = WasmLightClient::new(&f.wasm, &f.cs);
        let path = MerklePath::new(["ibc", "commitments/1"]);

        let err = client
            .verify_membership(&mut call_ctx(), &mut f.store, &Height::new(0, 6), 0, 0, b"p", &path, b"v")
            .unwrap_err();
        assert!(matches!(err, WasmError::InvalidHeight(_)));

        let err = client
            .verify_membership(&mut call_ctx(), &mut f.store, &Height::new(0, 5), 0, 0, b"p", &RawPath, b"v")
            .unwrap_err();
        assert!(matches!(err, WasmError::InvalidType(_)));

        let err = client
            .verify_non_membership(&mut call_ctx(), &mut f.store, &Height::new(0, 4), 0, 0, b"p", &path)
            .unwrap_err();
        assert!(matches!(err, WasmError::ConsensusStateNotFound(_)));

        assert_eq!(f.engine.call_count(), 0);
    }

    #[test]
    fn test_verify_membership_delegates_verdict() {
        let mut f = fixture();
        let client = WasmLightClient::new(&f.wasm, &f.cs);
        let path = MerklePath::new(["ibc", "commitments/1"]);

        f.engine.push(Reply::json(json!({"is_valid": true})));
        client
            .verify_membership(&mut call_ctx(), &mut f.store, &Height::new(0, 5), 1, 2, b"p", &path, b"v")
            .unwrap();
        let (entry, msg) = f.engine.calls().remove(0);
        assert_eq!(entry, "sudo");
        let msg: serde_json::Value = serde_json::from_slice(&msg).unwrap();
        assert_eq!(msg["verify_membership"]["delay_block_period"], 2);
        assert_eq!(msg["verify_membership"]["value"], "dg==");

        f.engine.push(Reply::json(json!({"is_valid": false, "error_msg": "proof mismatch"})));
        let err = client
            .verify_non_membership(&mut call_ctx(), &mut f.store, &Height::new(0, 5), 0, 0, b"p", &path)
            .unwrap_err();
        assert!(matches!(err, WasmError::ContractRejected(_)));
    }

    #[test]
    fn test_status_falls_back_to_unknown() {
        let f = fixture();
        let client = WasmLightClient::new(&f.wasm, &f.cs);
        f.engine.push(Reply::json(json!({"status": "Frozen"})));
        assert_eq!(client.status(&mut call_ctx(), &f.store), Status::Frozen);

        f.engine.push(Reply::ok(b"not json".to_vec()));
        assert_eq!(client.status(&mut call_ctx(), &f.store), Status::Unknown);

        f.engine.push(Reply::err(ioi_types::error::VmError::OutOfGas { gas_used: 1 }));
        assert_eq!(client.status(&mut call_ctx(), &f.store), Status::Unknown);
    }

    #[test]
    fn test_timestamp_at_height() {
        let f = fixture();
        let client = WasmLightClient::new(&f.wasm, &f.cs);
        assert_eq!(client.get_timestamp_at_height(&f.store, &Height::new(0, 5)).unwrap(), 99);
        assert!(matches!(
            client.get_timestamp_at_height(&f.store, &Height::new(0, 1)),
            Err(WasmError::ConsensusStateNotFound(_))
        ));
    }

    #[test]
    fn test_client_message_checks() {
        let f = fixture();
        let client = WasmLightClient::new(&f.wasm, &f.cs);

        let empty = ClientMessage::Misbehaviour(Misbehaviour { data: vec![] });
        assert!(client.verify_client_message(&mut call_ctx(), &f.store, &empty).is_err());
        assert_eq!(f.engine.call_count(), 0);

        f.engine.push(Reply::json(json!({"is_valid": true})));
        client.verify_client_message(&mut call_ctx(), &f.store, &header()).unwrap();

        f.engine.push(Reply::json(json!({"is_valid": true, "found_misbehaviour": true})));
        assert!(client.check_for_misbehaviour(&mut call_ctx(), &f.store, &header()));

        f.engine.push(Reply::json(json!({"is_valid": false, "error_msg": "x", "found_misbehaviour": true})));
        assert!(!client.check_for_misbehaviour(&mut call_ctx(), &f.store, &header()));
    }

    #[test]
    fn test_update_state_returns_heights() {
        let mut f = fixture();
        let client = WasmLightClient::new(&f.wasm, &f.cs);
        // base64 of {"heights":[{"revision_number":0,"revision_height":6}]}
        let data = "eyJoZWlnaHRzIjpbeyJyZXZpc2lvbl9udW1iZXIiOjAsInJldmlzaW9uX2hlaWdodCI6Nn1dfQ==";
        f.engine.push(Reply::json(json!({"is_valid": true, "data": data})).writing(b"consensusStates/0-6", b"cs"));
        let heights = client.update_state(&mut call_ctx(), &mut f.store, &header()).unwrap();
        assert_eq!(heights, vec![Height::new(0, 6)]);
        assert_eq!(f.store.get(b"consensusStates/0-6").unwrap(), Some(b"cs".to_vec()));

        f.engine.push(Reply::json(json!({"is_valid": true})));
        client
            .update_state_on_misbehaviour(&mut call_ctx(), &mut f.store, &header())
            .unwrap();
    }

    #[test]
    fn test_export_metadata_is_unmetered_query() {
        let f = fixture();
        let client = WasmLightClient::new(&f.wasm, &f.cs);
        f.engine.push(Reply::json(json!({"genesis_metadata": [{"key": "AQ==", "value": "Ag=="}]})));
        let metadata = client.export_metadata(&f.store).unwrap();
        assert_eq!(
            metadata,
            vec![GenesisMetadata {
                key: vec![1],
                value: vec![2]
            }]
        );
        assert_eq!(f.engine.calls()[0].1, br#"{"export_metadata":{}}"#.to_vec());
    }
}

// Path: crates/services/src/ibc/light_clients/wasm/recovery.rs
//! Client recovery: replacing a subject client's state from a substitute.

use super::client_state::WasmLightClient;
use super::msgs::{CheckSubstituteAndUpdateStateMsg, SudoMsg};
use ioi_api::context::CallCtx;
use ioi_api::ibc::AnyClientState;
use ioi_api::state::KvStore;
use ioi_storage::{CacheStore, StoreSide, WrappedStore};
use ioi_types::error::WasmError;
use ioi_types::ibc::ClientState;
use ioi_types::keys::{SUBJECT_PREFIX, SUBSTITUTE_PREFIX};

impl WasmLightClient<'_> {
    /// Lets the contract copy what it needs from the substitute's store into
    /// the subject's. The contract addresses the subject under `subject/` and
    /// the substitute, read-only, under `substitute/`. The subject store is
    /// left untouched unless the whole call succeeds.
    pub fn check_substitute_and_update_state(
        &self,
        ctx: &mut CallCtx,
        subject_store: &mut dyn KvStore,
        substitute_store: &dyn KvStore,
        substitute_client: &dyn AnyClientState,
    ) -> Result<(), WasmError> {
        if substitute_client
            .as_any()
            .downcast_ref::<ClientState>()
            .is_none()
        {
            return Err(WasmError::UnableToCall(format!(
                "substitute client state, expected a {} client state, got {}",
                self.client_state.client_type(),
                substitute_client.client_type()
            )));
        }

        let mut subject = CacheStore::new(subject_store);
        {
            let mut wrapped = WrappedStore::new(
                StoreSide::ReadWrite(&mut subject),
                StoreSide::ReadOnly(substitute_store),
                SUBJECT_PREFIX,
                SUBSTITUTE_PREFIX,
            );
            let msg = SudoMsg::CheckSubstituteAndUpdateState(CheckSubstituteAndUpdateStateMsg {});
            self.wasm
                .sudo(ctx, &self.client_state.code_id, &mut wrapped, &msg)?;
        }
        let written = subject.write()?;
        tracing::info!(target: "ibc", code_id = %self.client_state.code_id, written, "subject client updated from substitute");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::contract::WasmContext;
    use super::super::gas::GasRegister;
    use super::super::test_support::{call_ctx, MockEngine, Reply, MOCK_CODE};
    use super::*;
    use ioi_api::vm::WasmEngine;
    use ioi_storage::MemoryStore;
    use ioi_types::ibc::{Checksum, Height};
    use serde_json::json;
    use std::any::Any;
    use std::sync::Arc;

    #[derive(Debug)]
    struct OtherClient;

    impl AnyClientState for OtherClient {
        fn client_type(&self) -> &str {
            "07-tendermint"
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn setup() -> (Arc<MockEngine>, WasmContext, ClientState) {
        let engine = Arc::new(MockEngine::new());
        let checksum: Checksum = engine.store_code(MOCK_CODE).unwrap();
        let wasm = WasmContext::new(engine.clone(), GasRegister::default());
        let cs = ClientState::new(vec![1], checksum, Height::new(0, 5));
        (engine, wasm, cs)
    }

    #[test]
    fn test_substitute_must_be_wasm_client() {
        let (engine, wasm, cs) = setup();
        let err = WasmLightClient::new(&wasm, &cs)
            .check_substitute_and_update_state(
                &mut call_ctx(),
                &mut MemoryStore::new(),
                &MemoryStore::new(),
                &OtherClient,
            )
            .unwrap_err();
        assert!(matches!(err, WasmError::UnableToCall(_)));
        assert_eq!(engine.call_count(), 0);
    }

    #[test]
    fn test_writes_land_in_subject_without_prefix() {
        let (engine, wasm, cs) = setup();
        engine.push(
            Reply::json(json!({"is_valid": true}))
                .writing(b"subject/consensusStates/0-9", b"cs9")
                .writing(b"subject/clientState", b"new"),
        );
        let mut subject = MemoryStore::new();
        let mut substitute = MemoryStore::new();
        substitute.set(b"consensusStates/0-9", b"cs9").unwrap();

        WasmLightClient::new(&wasm, &cs)
            .check_substitute_and_update_state(&mut call_ctx(), &mut subject, &substitute, &cs)
            .unwrap();
        assert_eq!(subject.get(b"consensusStates/0-9").unwrap(), Some(b"cs9".to_vec()));
        assert_eq!(subject.get(b"clientState").unwrap(), Some(b"new".to_vec()));
        assert_eq!(substitute.len(), 1);
    }

    #[test]
    fn test_failed_recovery_leaves_subject_untouched() {
        let (engine, wasm, cs) = setup();
        let mut subject = MemoryStore::new();
        subject.set(b"clientState", b"old").unwrap();
        let substitute = MemoryStore::new();
        let client = WasmLightClient::new(&wasm, &cs);

        engine.push(
            Reply::json(json!({"is_valid": false, "error_msg": "heights differ"}))
                .writing(b"subject/clientState", b"new"),
        );
        assert!(client
            .check_substitute_and_update_state(&mut call_ctx(), &mut subject, &substitute, &cs)
            .is_err());

        // a valid result that also writes to the read-only side fails at flush
        engine.push(
            Reply::json(json!({"is_valid": true}))
                .writing(b"subject/clientState", b"new")
                .writing(b"substitute/clientState", b"evil"),
        );
        let err = client
            .check_substitute_and_update_state(&mut call_ctx(), &mut subject, &substitute, &cs)
            .unwrap_err();
        assert!(matches!(err, WasmError::State(_)));

        assert_eq!(subject.len(), 1);
        assert_eq!(subject.get(b"clientState").unwrap(), Some(b"old".to_vec()));
        assert!(substitute.is_empty());
    }
}

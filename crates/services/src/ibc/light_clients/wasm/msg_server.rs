// Path: crates/services/src/ibc/light_clients/wasm/msg_server.rs
//! Authority-gated transaction handlers.

use super::checksums::has_checksum;
use super::keeper::WasmKeeper;
use ioi_api::context::CallCtx;
use ioi_api::ibc::ClientKeeper;
use ioi_api::state::KvStore;
use ioi_types::error::WasmError;
use ioi_types::ibc::{base64_bytes, Checksum, ClientState, Event};
use serde::{Deserialize, Serialize};

pub const EVENT_TYPE_PUSH_WASM_CODE: &str = "push_wasm_code";
pub const EVENT_TYPE_UPDATE_WASM_CODE_ID: &str = "update_wasm_code_id";
pub const ATTRIBUTE_KEY_WASM_CODE_ID: &str = "wasm_code_id";
pub const ATTRIBUTE_KEY_CLIENT_ID: &str = "client_id";

const EVENT_TYPE_MESSAGE: &str = "message";
const ATTRIBUTE_VALUE_CATEGORY: &str = "ibc_client";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgPushNewWasmCode {
    pub signer: String,
    /// Raw or gzip-compressed bytecode.
    #[serde(with = "base64_bytes")]
    pub code: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgPushNewWasmCodeResponse {
    pub checksum: Checksum,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateWasmCodeId {
    pub signer: String,
    pub client_id: String,
    pub code_id: Checksum,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateWasmCodeIdResponse {
    pub client_id: String,
    pub code_id: Checksum,
}

fn message_event() -> Event {
    Event::new(EVENT_TYPE_MESSAGE).with_attribute("module", ATTRIBUTE_VALUE_CATEGORY)
}

impl WasmKeeper {
    fn check_signer(&self, signer: &str) -> Result<(), WasmError> {
        if signer != self.authority() {
            return Err(WasmError::InvalidSigner {
                expected: self.authority().to_string(),
                got: signer.to_string(),
            });
        }
        Ok(())
    }

    /// Handles [`MsgPushNewWasmCode`].
    pub fn push_new_code(
        &self,
        ctx: &mut CallCtx,
        module_store: &mut dyn KvStore,
        msg: &MsgPushNewWasmCode,
    ) -> Result<MsgPushNewWasmCodeResponse, WasmError> {
        self.check_signer(&msg.signer)?;
        let checksum = self.store_code(ctx, module_store, &msg.code)?;

        ctx.emit(
            Event::new(EVENT_TYPE_PUSH_WASM_CODE)
                .with_attribute(ATTRIBUTE_KEY_WASM_CODE_ID, checksum.to_hex()),
        );
        ctx.emit(message_event());
        Ok(MsgPushNewWasmCodeResponse { checksum })
    }

    /// Handles [`MsgUpdateWasmCodeId`], migrating a client to other registered code.
    pub fn update_code_id(
        &self,
        ctx: &mut CallCtx,
        module_store: &dyn KvStore,
        clients: &mut dyn ClientKeeper,
        msg: &MsgUpdateWasmCodeId,
    ) -> Result<MsgUpdateWasmCodeIdResponse, WasmError> {
        self.check_signer(&msg.signer)?;
        if !has_checksum(module_store, &msg.code_id)? {
            return Err(WasmError::InvalidCodeId(format!(
                "code id {} does not exist",
                msg.code_id.to_hex()
            )));
        }
        let any = clients
            .client_state(&msg.client_id)?
            .ok_or_else(|| {
                WasmError::ClientNotFound(format!("cannot update client with ID {}", msg.client_id))
            })?;
        let mut client_state = any
            .as_any()
            .downcast_ref::<ClientState>()
            .cloned()
            .ok_or_else(|| {
                WasmError::Invalid(format!(
                    "client state type {}, expected wasm client state",
                    any.client_type()
                ))
            })?;

        client_state.code_id = msg.code_id;
        clients.set_client_state(&msg.client_id, Box::new(client_state))?;

        tracing::info!(
            target: "ibc",
            client_id = %msg.client_id,
            code_id = %msg.code_id,
            "migrated wasm client code id"
        );
        ctx.emit(
            Event::new(EVENT_TYPE_UPDATE_WASM_CODE_ID)
                .with_attribute(ATTRIBUTE_KEY_CLIENT_ID, msg.client_id.clone())
                .with_attribute(ATTRIBUTE_KEY_WASM_CODE_ID, msg.code_id.to_hex()),
        );
        ctx.emit(message_event());
        Ok(MsgUpdateWasmCodeIdResponse {
            client_id: msg.client_id.clone(),
            code_id: msg.code_id,
        })
    }
}

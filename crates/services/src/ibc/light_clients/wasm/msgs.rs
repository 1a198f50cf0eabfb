// Path: crates/services/src/ibc/light_clients/wasm/msgs.rs
//! The JSON wire contract between the light client module and its contracts.
//!
//! Requests are externally tagged by call kind, e.g.
//! `{"verify_membership": {...}}`. Byte fields travel as base64 strings.

use ioi_types::error::WasmError;
use ioi_types::ibc::{base64_bytes, GenesisMetadata, Header, Height, MerklePath, Misbehaviour, Status};
use serde::{Deserialize, Serialize};

/// A client message as seen by a contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMessage {
    Header(Header),
    Misbehaviour(Misbehaviour),
}

impl ClientMessage {
    pub fn validate_basic(&self) -> Result<(), WasmError> {
        match self {
            Self::Header(h) => h.validate_basic(),
            Self::Misbehaviour(m) => m.validate_basic(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyMembershipMsg {
    pub height: Height,
    pub delay_time_period: u64,
    pub delay_block_period: u64,
    #[serde(with = "base64_bytes")]
    pub proof: Vec<u8>,
    pub path: MerklePath,
    #[serde(with = "base64_bytes")]
    pub value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyNonMembershipMsg {
    pub height: Height,
    pub delay_time_period: u64,
    pub delay_block_period: u64,
    #[serde(with = "base64_bytes")]
    pub proof: Vec<u8>,
    pub path: MerklePath,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateStateMsg {
    pub client_message: ClientMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateStateOnMisbehaviourMsg {
    pub client_message: ClientMessage,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckSubstituteAndUpdateStateMsg {}

/// State-mutating requests, run through the `sudo` entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SudoMsg {
    VerifyMembership(VerifyMembershipMsg),
    VerifyNonMembership(VerifyNonMembershipMsg),
    UpdateState(UpdateStateMsg),
    UpdateStateOnMisbehaviour(UpdateStateOnMisbehaviourMsg),
    CheckSubstituteAndUpdateState(CheckSubstituteAndUpdateStateMsg),
}

impl SudoMsg {
    /// The request tag, also used as a metrics label.
    pub fn name(&self) -> &'static str {
        match self {
            Self::VerifyMembership(_) => "verify_membership",
            Self::VerifyNonMembership(_) => "verify_non_membership",
            Self::UpdateState(_) => "update_state",
            Self::UpdateStateOnMisbehaviour(_) => "update_state_on_misbehaviour",
            Self::CheckSubstituteAndUpdateState(_) => "check_substitute_and_update_state",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusMsg {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExportMetadataMsg {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyClientMessageMsg {
    pub client_message: ClientMessage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckForMisbehaviourMsg {
    pub client_message: ClientMessage,
}

/// Read-only requests, run through the `query` entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMsg {
    Status(StatusMsg),
    ExportMetadata(ExportMetadataMsg),
    VerifyClientMessage(VerifyClientMessageMsg),
    CheckForMisbehaviour(CheckForMisbehaviourMsg),
}

impl QueryMsg {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::ExportMetadata(_) => "export_metadata",
            Self::VerifyClientMessage(_) => "verify_client_message",
            Self::CheckForMisbehaviour(_) => "check_for_misbehaviour",
        }
    }
}

/// The generic result envelope returned by contracts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractResultEnvelope {
    #[serde(default)]
    pub is_valid: bool,
    #[serde(default)]
    pub error_msg: String,
    #[serde(default, with = "base64_bytes")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub found_misbehaviour: bool,
}

/// A decoded contract verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractResult {
    Valid {
        data: Vec<u8>,
        found_misbehaviour: bool,
    },
    Invalid(String),
}

impl From<ContractResultEnvelope> for ContractResult {
    fn from(env: ContractResultEnvelope) -> Self {
        if env.is_valid {
            Self::Valid {
                data: env.data,
                found_misbehaviour: env.found_misbehaviour,
            }
        } else {
            Self::Invalid(env.error_msg)
        }
    }
}

impl ContractResult {
    /// Parses a raw envelope.
    pub fn decode(raw: &[u8]) -> Result<Self, WasmError> {
        let env: ContractResultEnvelope = decode_payload(raw)?;
        Ok(env.into())
    }

    /// Returns `(data, found_misbehaviour)` of a valid result, or the
    /// contract's error message as `ContractRejected`.
    pub fn into_valid(self) -> Result<(Vec<u8>, bool), WasmError> {
        match self {
            Self::Valid {
                data,
                found_misbehaviour,
            } => Ok((data, found_misbehaviour)),
            Self::Invalid(msg) => Err(WasmError::ContractRejected(msg)),
        }
    }
}

/// The response of `status` and `export_metadata` queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub genesis_metadata: Vec<GenesisMetadata>,
}

/// The `data` payload of a valid `update_state` result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStateResult {
    #[serde(default)]
    pub heights: Vec<Height>,
}

/// Serializes a request.
pub fn encode_payload<T: Serialize>(msg: &T) -> Result<Vec<u8>, WasmError> {
    serde_json::to_vec(msg).map_err(|e| WasmError::UnableToMarshalPayload(e.to_string()))
}

/// Deserializes a response.
pub fn decode_payload<'de, T: Deserialize<'de>>(raw: &'de [u8]) -> Result<T, WasmError> {
    serde_json::from_slice(raw).map_err(|e| WasmError::UnableToUnmarshalPayload(e.to_string()))
}

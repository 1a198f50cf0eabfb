// Path: crates/types/src/ibc/mod.rs
//! Core data structures for the wasm light client.

use crate::error::WasmError;
use crate::CHECKSUM_LEN;
use parity_scale_codec::{Decode, Encode};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// The client type string of wasm light clients.
pub const WASM_CLIENT_TYPE: &str = "08-wasm";

/// Serde helper that encodes byte vectors as standard base64 strings,
/// which is how contracts expect binary fields in JSON payloads.
pub mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serializes bytes as base64.
    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    /// Deserializes base64 into bytes. `null` decodes as empty.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s: Option<String> = Option::deserialize(d)?;
        match s {
            Some(s) => STANDARD.decode(s).map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}

/// The content-hash identity of a registered bytecode module: the SHA-256 of
/// the decompressed bytecode.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode)]
pub struct Checksum(pub [u8; CHECKSUM_LEN]);

impl Checksum {
    /// Computes the checksum of `code`.
    pub fn of(code: &[u8]) -> Self {
        Self(Sha256::digest(code).into())
    }

    /// Parses a hex-encoded checksum.
    pub fn from_hex(s: &str) -> Result<Self, WasmError> {
        let bytes = hex::decode(s).map_err(|e| WasmError::InvalidData(format!("invalid hex checksum: {e}")))?;
        Self::try_from(bytes.as_slice())
    }

    /// Returns the lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns the raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Checksum {
    type Error = WasmError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; CHECKSUM_LEN] = bytes
            .try_into()
            .map_err(|_| WasmError::InvalidChecksumLength(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({})", self.to_hex())
    }
}

impl Serialize for Checksum {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Checksum {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// A counterparty height. Ordering is lexicographic on (revision number, revision height).
#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Encode, Decode,
)]
pub struct Height {
    /// The counterparty's revision (fork) number.
    #[serde(default)]
    pub revision_number: u64,
    /// The block height within the revision.
    #[serde(default)]
    pub revision_height: u64,
}

impl Height {
    /// Creates a new height.
    pub fn new(revision_number: u64, revision_height: u64) -> Self {
        Self {
            revision_number,
            revision_height,
        }
    }

    /// Returns true for the zero height.
    pub fn is_zero(&self) -> bool {
        self.revision_number == 0 && self.revision_height == 0
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.revision_number, self.revision_height)
    }
}

/// A commitment path made of ordered key segments, the only path shape wasm clients accept.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct MerklePath {
    /// Path segments, outermost store key first.
    pub key_path: Vec<String>,
}

impl MerklePath {
    /// Builds a path from segments.
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key_path: segments.into_iter().map(Into::into).collect(),
        }
    }
}

/// The client state of a wasm light client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ClientState {
    /// Contract-defined encoding of the counterparty consensus parameters.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    /// Checksum of the contract that implements this client.
    #[serde(rename = "checksum")]
    pub code_id: Checksum,
    /// The latest height the client has verified.
    pub latest_height: Height,
}

impl ClientState {
    /// Creates a new client state.
    pub fn new(data: Vec<u8>, code_id: Checksum, latest_height: Height) -> Self {
        Self {
            data,
            code_id,
            latest_height,
        }
    }

    /// Returns the client type.
    pub fn client_type(&self) -> &'static str {
        WASM_CLIENT_TYPE
    }

    /// Performs stateless validation.
    pub fn validate(&self) -> Result<(), WasmError> {
        if self.data.is_empty() {
            return Err(WasmError::InvalidData("data cannot be empty".into()));
        }
        Ok(())
    }

    /// Returns a copy with all client-specific fields cleared, as committed for upgrades.
    pub fn zero_custom_fields(&self) -> Self {
        Self {
            data: Vec::new(),
            code_id: self.code_id,
            latest_height: self.latest_height,
        }
    }
}

/// A consensus state of a wasm light client.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct ConsensusState {
    /// Contract-defined encoding of the counterparty consensus state.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    /// Counterparty timestamp in unix nanoseconds.
    pub timestamp: u64,
}

impl ConsensusState {
    /// Creates a new consensus state.
    pub fn new(data: Vec<u8>, timestamp: u64) -> Self {
        Self { data, timestamp }
    }

    /// Performs stateless validation.
    pub fn validate_basic(&self) -> Result<(), WasmError> {
        if self.timestamp == 0 {
            return Err(WasmError::InvalidConsensus("timestamp cannot be zero Unix time".into()));
        }
        if self.data.is_empty() {
            return Err(WasmError::InvalidData("data cannot be empty".into()));
        }
        Ok(())
    }
}

/// A wrapped counterparty header.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Header {
    /// Contract-defined header encoding.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    /// The height the header attests to.
    pub height: Height,
}

impl Header {
    /// Performs stateless validation.
    pub fn validate_basic(&self) -> Result<(), WasmError> {
        if self.data.is_empty() {
            return Err(WasmError::InvalidData("data cannot be empty".into()));
        }
        Ok(())
    }
}

/// A wrapped misbehaviour report.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct Misbehaviour {
    /// Contract-defined misbehaviour encoding.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl Misbehaviour {
    /// Performs stateless validation.
    pub fn validate_basic(&self) -> Result<(), WasmError> {
        if self.data.is_empty() {
            return Err(WasmError::InvalidData("data cannot be empty".into()));
        }
        Ok(())
    }
}

/// The status of a light client, as reported by its contract.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The client can be used.
    Active,
    /// Misbehaviour was detected.
    Frozen,
    /// The trusting period elapsed.
    Expired,
    /// The status could not be determined.
    Unknown,
    /// The client type is not allowed by the host.
    Unauthorized,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Active => "Active",
            Self::Frozen => "Frozen",
            Self::Expired => "Expired",
            Self::Unknown => "Unknown",
            Self::Unauthorized => "Unauthorized",
        };
        f.write_str(s)
    }
}

/// A key/value pair a client exports into genesis.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GenesisMetadata {
    /// Store key.
    #[serde(with = "base64_bytes")]
    pub key: Vec<u8>,
    /// Store value.
    #[serde(with = "base64_bytes")]
    pub value: Vec<u8>,
}

/// A typed event emitted by a module operation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Event type, e.g. `push_wasm_code`.
    pub kind: String,
    /// Ordered key/value attributes.
    pub attributes: Vec<(String, String)>,
}

impl Event {
    /// Creates an event with no attributes.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: Vec::new(),
        }
    }

    /// Appends an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Looks up an attribute value by key.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_checksum_hex_roundtrip_and_length() {
        let c = Checksum::of(b"hello");
        assert_eq!(Checksum::from_hex(&c.to_hex()).unwrap(), c);
        assert!(matches!(
            Checksum::try_from(&[0u8; 31][..]),
            Err(WasmError::InvalidChecksumLength(31))
        ));
        assert!(matches!(Checksum::from_hex("zz"), Err(WasmError::InvalidData(_))));
    }

    #[test]
    fn test_checksum_is_sha256() {
        // sha256("")
        assert_eq!(
            Checksum::of(b"").to_hex(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_entity_validation() {
        let code_id = Checksum::of(b"c");
        assert!(ClientState::new(vec![], code_id, Height::new(0, 1)).validate().is_err());
        assert!(ClientState::new(vec![1], code_id, Height::new(0, 1)).validate().is_ok());

        assert!(ConsensusState::new(vec![1], 0).validate_basic().is_err());
        assert!(ConsensusState::new(vec![], 1).validate_basic().is_err());
        assert!(ConsensusState::new(vec![1], 1).validate_basic().is_ok());

        assert!(Header { data: vec![], height: Height::default() }.validate_basic().is_err());
        assert!(Misbehaviour { data: vec![] }.validate_basic().is_err());
    }

    #[test]
    fn test_zero_custom_fields_clears_data() {
        let cs = ClientState::new(vec![9; 4], Checksum::of(b"c"), Height::new(2, 3));
        let zeroed = cs.zero_custom_fields();
        assert!(zeroed.data.is_empty());
        assert_eq!(zeroed.code_id, cs.code_id);
        assert_eq!(zeroed.latest_height, cs.latest_height);
    }

    #[test]
    fn test_height_json_shape() {
        let json = serde_json::to_string(&Height::new(1, 2)).unwrap();
        assert_eq!(json, r#"{"revision_number":1,"revision_height":2}"#);
    }

    proptest! {
        #[test]
        fn test_height_order_is_lexicographic(a in any::<(u64, u64)>(), b in any::<(u64, u64)>()) {
            let ha = Height::new(a.0, a.1);
            let hb = Height::new(b.0, b.1);
            prop_assert_eq!(ha.cmp(&hb), a.cmp(&b));
        }
    }
}

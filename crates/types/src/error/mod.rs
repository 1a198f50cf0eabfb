// Path: crates/types/src/error/mod.rs
//! Core error types for the wasm light client.

use thiserror::Error;

/// A trait for assigning a stable, machine-readable string code to an error.
pub trait ErrorCode {
    /// Returns the unique, stable string identifier for this error variant.
    fn code(&self) -> &'static str;
}

/// Errors related to the key-value stores backing a client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The requested key was not found in the state.
    #[error("Key not found in state")]
    KeyNotFound,
    /// An error occurred in the state backend.
    #[error("State backend error: {0}")]
    Backend(String),
    /// An error occurred while writing to the state.
    #[error("State write error: {0}")]
    WriteError(String),
    /// The provided value was invalid.
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    /// An error occurred during state deserialization.
    #[error("Decode error: {0}")]
    Decode(String),
    /// The operation was denied due to insufficient permissions on a state key.
    #[error("Permission denied for state key: {0}")]
    PermissionDenied(String),
    /// An iteration range crossed a routing boundary and cannot be served by one store.
    #[error("Invalid iteration range: {0}")]
    InvalidRange(String),
    /// A store was constructed without its required backing store.
    #[error("Store misconfigured: {0}")]
    Misconfigured(String),
}

impl ErrorCode for StateError {
    fn code(&self) -> &'static str {
        match self {
            Self::KeyNotFound => "STATE_KEY_NOT_FOUND",
            Self::Backend(_) => "STATE_BACKEND_ERROR",
            Self::WriteError(_) => "STATE_WRITE_ERROR",
            Self::InvalidValue(_) => "STATE_INVALID_VALUE",
            Self::Decode(_) => "STATE_DECODE_ERROR",
            Self::PermissionDenied(_) => "STATE_PERMISSION_DENIED",
            Self::InvalidRange(_) => "STATE_INVALID_RANGE",
            Self::Misconfigured(_) => "STATE_MISCONFIGURED",
        }
    }
}

/// Errors raised by host gas meters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GasError {
    /// The meter's limit was exceeded.
    #[error("out of gas in location: {descriptor}; gasWanted: {limit}, gasUsed: {consumed}")]
    OutOfGas {
        /// What the gas was being charged for.
        descriptor: String,
        /// The meter's limit.
        limit: u64,
        /// The amount consumed when the limit was hit.
        consumed: u64,
    },
    /// Adding to the meter overflowed a u64.
    #[error("gas overflow: {0}")]
    Overflow(String),
}

impl ErrorCode for GasError {
    fn code(&self) -> &'static str {
        match self {
            Self::OutOfGas { .. } => "GAS_OUT_OF_GAS",
            Self::Overflow(_) => "GAS_OVERFLOW",
        }
    }
}

/// Errors from the sandboxed wasm engine.
///
/// Execution failures carry the gas the sandbox burned before failing so the
/// host can still charge for it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    /// The engine or an instance could not be set up.
    #[error("VM initialization error: {0}")]
    Initialization(String),
    /// The bytecode failed static validation or compilation.
    #[error("Invalid bytecode: {0}")]
    InvalidBytecode(String),
    /// The guest trapped.
    #[error("Execution trapped: {reason}")]
    ExecutionTrap {
        /// The trap message.
        reason: String,
        /// Gas consumed before the trap.
        gas_used: u64,
    },
    /// The guest returned an error response.
    #[error("Contract returned an error: {msg}")]
    ContractError {
        /// The guest-supplied message.
        msg: String,
        /// Gas consumed by the call.
        gas_used: u64,
    },
    /// The call exhausted its gas limit.
    #[error("Ran out of gas")]
    OutOfGas {
        /// Gas consumed, equal to the limit.
        gas_used: u64,
    },
    /// The engine has no code under the requested checksum.
    #[error("Code not found for checksum {0}")]
    ChecksumNotFound(String),
    /// A host function failed.
    #[error("Host function error: {0}")]
    HostError(String),
    /// Guest memory was accessed out of bounds or is missing.
    #[error("Memory access error: {0}")]
    MemoryError(String),
}

impl VmError {
    /// Returns the sandbox gas consumed before this error, or zero if execution never started.
    pub fn gas_used(&self) -> u64 {
        match self {
            Self::ExecutionTrap { gas_used, .. }
            | Self::ContractError { gas_used, .. }
            | Self::OutOfGas { gas_used } => *gas_used,
            _ => 0,
        }
    }
}

impl ErrorCode for VmError {
    fn code(&self) -> &'static str {
        match self {
            Self::Initialization(_) => "VM_INITIALIZATION_FAILED",
            Self::InvalidBytecode(_) => "VM_INVALID_BYTECODE",
            Self::ExecutionTrap { .. } => "VM_EXECUTION_TRAP",
            Self::ContractError { .. } => "VM_CONTRACT_ERROR",
            Self::OutOfGas { .. } => "VM_OUT_OF_GAS",
            Self::ChecksumNotFound(_) => "VM_CHECKSUM_NOT_FOUND",
            Self::HostError(_) => "VM_HOST_ERROR",
            Self::MemoryError(_) => "VM_MEMORY_ERROR",
        }
    }
}

/// Errors of the wasm light client module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WasmError {
    /// The bytecode is empty.
    #[error("wasm bytecode validation failed: empty wasm code")]
    EmptyCode,
    /// The bytecode exceeds the maximum module size.
    #[error("wasm bytecode validation failed: code size {size} exceeds maximum of {max}")]
    CodeTooLarge {
        /// Observed size in bytes.
        size: usize,
        /// Configured maximum in bytes.
        max: usize,
    },
    /// A checksum was not exactly 32 bytes.
    #[error("invalid checksum length: expected 32 bytes, got {0}")]
    InvalidChecksumLength(usize),
    /// Malformed input data.
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// The code id does not name a registered checksum.
    #[error("invalid code id: {0}")]
    InvalidCodeId(String),
    /// A client message header is malformed.
    #[error("invalid header: {0}")]
    InvalidHeader(String),
    /// The checksum is already registered.
    #[error("wasm code already exists: {0}")]
    CodeAlreadyExists(String),
    /// The checksum is not registered.
    #[error("wasm checksum not found: {0}")]
    ChecksumNotFound(String),
    /// The engine rejected the bytecode.
    #[error("invalid wasm code: {0}")]
    InvalidCode(String),
    /// The engine returned a code id different from the locally computed checksum.
    #[error("invalid code id returned by engine: expected {expected}, got {got}")]
    CodeIdMismatch {
        /// The locally computed checksum (hex).
        expected: String,
        /// The engine's code id (hex).
        got: String,
    },
    /// The instantiate call failed.
    #[error("unable to initialize wasm contract: {0}")]
    UnableToInit(String),
    /// An execute-phase call failed.
    #[error("unable to call wasm contract: {0}")]
    UnableToCall(String),
    /// A query-phase call failed.
    #[error("unable to query wasm contract: {0}")]
    UnableToQuery(String),
    /// The engine could not pin a module.
    #[error("failed to pin wasm code: {0}")]
    PinFailed(String),
    /// A request payload could not be encoded.
    #[error("unable to marshal payload: {0}")]
    UnableToMarshalPayload(String),
    /// A response payload could not be decoded.
    #[error("unable to unmarshal payload: {0}")]
    UnableToUnmarshalPayload(String),
    /// The contract returned an invalid result.
    #[error("contract rejected the call: {0}")]
    ContractRejected(String),
    /// A proof height is beyond the client's latest height.
    #[error("invalid height: {0}")]
    InvalidHeight(String),
    /// No consensus state exists at the requested height.
    #[error("consensus state not found: {0}")]
    ConsensusStateNotFound(String),
    /// A stored consensus state could not be decoded.
    #[error("invalid consensus state: {0}")]
    InvalidConsensus(String),
    /// An argument had the wrong concrete type.
    #[error("invalid type: {0}")]
    InvalidType(String),
    /// The message signer is not the module authority.
    #[error("invalid signer: expected {expected}, got {got}")]
    InvalidSigner {
        /// The configured authority.
        expected: String,
        /// The message signer.
        got: String,
    },
    /// The referenced client does not exist.
    #[error("client not found: {0}")]
    ClientNotFound(String),
    /// The referenced client is not a wasm client.
    #[error("invalid: {0}")]
    Invalid(String),
    /// Client creation failed.
    #[error("create failed: {0}")]
    CreateFailed(String),
    /// A host invariant was violated, such as a negative block height.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    /// A gas meter error.
    #[error(transparent)]
    Gas(#[from] GasError),
    /// A store error.
    #[error(transparent)]
    State(#[from] StateError),
    /// An engine error.
    #[error(transparent)]
    Vm(#[from] VmError),
}

impl ErrorCode for WasmError {
    fn code(&self) -> &'static str {
        match self {
            Self::EmptyCode => "WASM_EMPTY_CODE",
            Self::CodeTooLarge { .. } => "WASM_CODE_TOO_LARGE",
            Self::InvalidChecksumLength(_) => "WASM_INVALID_CHECKSUM_LENGTH",
            Self::InvalidData(_) => "WASM_INVALID_DATA",
            Self::InvalidCodeId(_) => "WASM_INVALID_CODE_ID",
            Self::InvalidHeader(_) => "WASM_INVALID_HEADER",
            Self::CodeAlreadyExists(_) => "WASM_CODE_EXISTS",
            Self::ChecksumNotFound(_) => "WASM_CHECKSUM_NOT_FOUND",
            Self::InvalidCode(_) => "WASM_INVALID_CODE",
            Self::CodeIdMismatch { .. } => "WASM_INVALID_CODE_ID_RETURNED",
            Self::UnableToInit(_) => "WASM_UNABLE_TO_INIT",
            Self::UnableToCall(_) => "WASM_UNABLE_TO_CALL",
            Self::UnableToQuery(_) => "WASM_UNABLE_TO_QUERY",
            Self::PinFailed(_) => "WASM_PIN_FAILED",
            Self::UnableToMarshalPayload(_) => "WASM_UNABLE_TO_MARSHAL_PAYLOAD",
            Self::UnableToUnmarshalPayload(_) => "WASM_UNABLE_TO_UNMARSHAL_PAYLOAD",
            Self::ContractRejected(_) => "WASM_CONTRACT_REJECTED",
            Self::InvalidHeight(_) => "WASM_INVALID_HEIGHT",
            Self::ConsensusStateNotFound(_) => "WASM_CONSENSUS_STATE_NOT_FOUND",
            Self::InvalidConsensus(_) => "WASM_INVALID_CONSENSUS",
            Self::InvalidType(_) => "WASM_INVALID_TYPE",
            Self::InvalidSigner { .. } => "WASM_INVALID_SIGNER",
            Self::ClientNotFound(_) => "WASM_CLIENT_NOT_FOUND",
            Self::Invalid(_) => "WASM_INVALID",
            Self::CreateFailed(_) => "WASM_CREATE_FAILED",
            Self::InvariantViolation(_) => "WASM_INVARIANT_VIOLATION",
            Self::Gas(e) => e.code(),
            Self::State(e) => e.code(),
            Self::Vm(e) => e.code(),
        }
    }
}

/// Errors from exporting or restoring the bytecode snapshot extension.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// The snapshot format is not supported by this extension.
    #[error("unknown snapshot format: {0}")]
    UnknownFormat(u32),
    /// A checksum-tagged item does not match its bytecode.
    #[error("snapshot checksum mismatch: tagged {expected}, computed {got}")]
    ChecksumMismatch {
        /// The tag carried by the item (hex).
        expected: String,
        /// The checksum of the restored bytecode (hex).
        got: String,
    },
    /// An item is malformed.
    #[error("malformed snapshot item: {0}")]
    Malformed(String),
    /// Gzip encoding or decoding failed.
    #[error("snapshot compression error: {0}")]
    Compression(String),
    /// The writer or reader callback failed.
    #[error("snapshot I/O error: {0}")]
    Io(String),
    /// A module error while reading or storing code.
    #[error(transparent)]
    Wasm(#[from] WasmError),
}

impl ErrorCode for SnapshotError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownFormat(_) => "SNAPSHOT_UNKNOWN_FORMAT",
            Self::ChecksumMismatch { .. } => "SNAPSHOT_CHECKSUM_MISMATCH",
            Self::Malformed(_) => "SNAPSHOT_MALFORMED",
            Self::Compression(_) => "SNAPSHOT_COMPRESSION",
            Self::Io(_) => "SNAPSHOT_IO",
            Self::Wasm(e) => e.code(),
        }
    }
}

/// Errors from loading configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    /// The TOML could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A parsed value is out of range.
    #[error("invalid config value: {0}")]
    Invalid(String),
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "CONFIG_IO",
            Self::Parse(_) => "CONFIG_PARSE",
            Self::Invalid(_) => "CONFIG_INVALID",
        }
    }
}

// Path: crates/api/src/ibc/mod.rs
//! Type-erased light client traits.
//!
//! The host routes client states, consensus states, and commitment paths of
//! every client family through these traits. A light client module downcasts
//! through `as_any` to check that it was handed its own concrete types.

use ioi_types::error::StateError;
use ioi_types::ibc::{ClientState, ConsensusState, MerklePath};
use std::any::Any;

/// A client state of any client family.
pub trait AnyClientState: Send + Sync + std::fmt::Debug {
    /// The client type, e.g. `08-wasm`.
    fn client_type(&self) -> &str;
    /// Allows downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// A consensus state of any client family.
pub trait AnyConsensusState: Send + Sync + std::fmt::Debug {
    /// The counterparty timestamp in unix nanoseconds.
    fn timestamp(&self) -> u64;
    /// Allows downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

/// A commitment path of any shape.
pub trait CommitmentPath: Send + Sync + std::fmt::Debug {
    /// Allows downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

impl AnyClientState for ClientState {
    fn client_type(&self) -> &str {
        ClientState::client_type(self)
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl AnyConsensusState for ConsensusState {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl CommitmentPath for MerklePath {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// The host's registry of client states, addressed by client id.
pub trait ClientKeeper: Send {
    /// Looks up the client state of `client_id`.
    fn client_state(&self, client_id: &str) -> Result<Option<Box<dyn AnyClientState>>, StateError>;

    /// Replaces the client state of `client_id`.
    fn set_client_state(
        &mut self,
        client_id: &str,
        state: Box<dyn AnyClientState>,
    ) -> Result<(), StateError>;
}

use thiserror::Error;

use crate::register::RegisterSpace;

/// A register list that cannot be turned into a read plan.
///
/// These are static definition defects, surfaced when a model is registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("Invalid register at {address}: {reason}")]
    InvalidRegister { address: u16, reason: String },

    #[error("Register at {space} {address} overlaps the register at {previous}")]
    Overlap {
        space: RegisterSpace,
        address: u16,
        previous: u16,
    },

    #[error("Block size limit must be at least 1 word")]
    ZeroBlockLimit,
}

/// Failure of a single register read on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Device exception: {0}")]
    Exception(String),

    #[error("Request timed out")]
    Timeout,
}

impl TransportError {
    /// Whether the underlying connection should be considered lost.
    pub fn is_connection_lost(&self) -> bool {
        matches!(self, TransportError::Connection(_) | TransportError::Timeout)
    }
}

/// The word buffer returned for a block does not match what was requested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Expected {expected} words for block at {start}, got {actual}")]
pub struct DecodeError {
    pub start: u16,
    pub expected: usize,
    pub actual: usize,
}

/// Why a planned block contributed no values to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl BlockError {
    /// Whether the connection can no longer be trusted to pair responses
    /// with requests.
    ///
    /// A timed-out request may still be answered later, and a response of the
    /// wrong length most likely belongs to an earlier request.
    pub fn requires_reconnect(&self) -> bool {
        match self {
            BlockError::Transport(e) => e.is_connection_lost(),
            BlockError::Decode(_) => true,
        }
    }
}

/// Errors raised while building a [`ModelRegistry`](crate::models::ModelRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Identity code {0:#06x} is already registered")]
    DuplicateCode(u16),

    #[error("Model {model} defines address {address} in both register spaces")]
    AddressCollision { model: String, address: u16 },

    #[error("Model {model} has an invalid register map: {source}")]
    InvalidModel {
        model: String,
        #[source]
        source: PlanError,
    },
}

/// A poll cycle that ended in the `Failed` state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("Failed to read identity code: {0}")]
    Identity(#[source] TransportError),

    #[error("Identity read returned {0} words, expected 1")]
    IdentityWordCount(usize),

    #[error("Unsupported model: {0:#06x}")]
    UnsupportedModel(u16),

    #[error("Failed to plan register reads: {0}")]
    Plan(#[from] PlanError),
}

impl PollError {
    /// Whether the next scheduled cycle may succeed without operator action.
    pub fn is_retryable(&self) -> bool {
        match self {
            PollError::Identity(_) | PollError::IdentityWordCount(_) => true,
            PollError::UnsupportedModel(_) | PollError::Plan(_) => false,
        }
    }
}

/// Result type alias for poll cycles.
pub type Result<T> = std::result::Result<T, PollError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_model_message() {
        let err = PollError::UnsupportedModel(0xFFFF);
        assert_eq!(err.to_string(), "Unsupported model: 0xffff");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_identity_failure_is_retryable() {
        let err = PollError::Identity(TransportError::Timeout);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_block_error_reconnect() {
        assert!(BlockError::from(TransportError::Timeout).requires_reconnect());
        assert!(
            !BlockError::from(TransportError::Exception("IllegalDataAddress".into()))
                .requires_reconnect()
        );
        let short = DecodeError {
            start: 5010,
            expected: 4,
            actual: 1,
        };
        assert!(BlockError::from(short).requires_reconnect());
    }

    #[test]
    fn test_connection_lost() {
        assert!(TransportError::Timeout.is_connection_lost());
        assert!(TransportError::Connection("reset".into()).is_connection_lost());
        assert!(!TransportError::Exception("IllegalDataAddress".into()).is_connection_lost());
    }
}

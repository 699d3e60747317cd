//! Error taxonomy for trade coordination.
//!
//! Every failure surfaces synchronously to the initiating actor; nothing is
//! retried automatically. The variants split into recoverable signer/RPC
//! failures, pre-write validation rejections, and data-integrity faults.

use thiserror::Error;

use crate::types::{CommandKind, TradeStatus};

/// Errors that can occur while driving a trade through its lifecycle.
#[derive(Error, Debug)]
pub enum Error {
    /// The signer declined the transaction. Recoverable; no state changed.
    #[error("Transaction rejected by wallet signer")]
    UserRejection,

    /// Submission or RPC failure before a transaction hash was obtained.
    /// Recoverable; no state changed.
    #[error("Contract call failed: {0}")]
    ContractCallFailure(String),

    /// Neither the listing nor the trade carries a contract trade id where
    /// one is required. A data-integrity fault, never papered over with a
    /// guessed id.
    #[error("No contract trade id on listing or trade")]
    MissingContractTradeId,

    /// The acting address does not hold the role the transition requires.
    /// Rejected before any write.
    #[error("Address {actor} is not authorized to {command}")]
    UnauthorizedTransition {
        actor: String,
        command: CommandKind,
    },

    /// The requested transition is not reachable from the current state,
    /// including any attempt out of a terminal state. Rejected before any
    /// write.
    #[error("Cannot {command} from status {from:?}")]
    InvalidStateTransition {
        from: TradeStatus,
        command: CommandKind,
    },

    /// Referenced listing, trade, or message does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Record store failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Malformed caller input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unexpected internal state, including integrity violations detected by
    /// the reconciliation read.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True when the actor may simply retry the same command.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::UserRejection | Error::ContractCallFailure(_))
    }

    /// True when the failure indicates corrupted or inconsistent records
    /// rather than a bad request.
    pub fn is_integrity_fault(&self) -> bool {
        matches!(self, Error::MissingContractTradeId | Error::Internal(_))
    }

    /// True when the command was rejected before any write happened.
    pub fn rejected_before_write(&self) -> bool {
        matches!(
            self,
            Error::UnauthorizedTransition { .. }
                | Error::InvalidStateTransition { .. }
                | Error::MissingContractTradeId
                | Error::InvalidInput(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(Error::UserRejection.is_recoverable());
        assert!(Error::ContractCallFailure("rpc timeout".into()).is_recoverable());
        assert!(!Error::MissingContractTradeId.is_recoverable());
        assert!(!Error::InvalidStateTransition {
            from: TradeStatus::Completed,
            command: CommandKind::ConfirmReceived,
        }
        .is_recoverable());
    }

    #[test]
    fn test_integrity_classification() {
        assert!(Error::MissingContractTradeId.is_integrity_fault());
        assert!(Error::Internal("amount mismatch".into()).is_integrity_fault());
        assert!(!Error::UserRejection.is_integrity_fault());
    }

    #[test]
    fn test_rejected_before_write() {
        assert!(Error::UnauthorizedTransition {
            actor: "0xabc".into(),
            command: CommandKind::Cancel,
        }
        .rejected_before_write());
        assert!(!Error::ContractCallFailure("boom".into()).rejected_before_write());
    }
}

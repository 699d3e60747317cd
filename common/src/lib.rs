//! Shared domain types for the Kaspa P2P escrow trade coordinator.
//!
//! This crate holds the vocabulary both the server and any future client
//! tooling agree on: trade lifecycle states, validated trade commands, roles,
//! and the error taxonomy. It performs no I/O.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{
    addresses_equal, CommandKind, SettlementState, TradeCommand, TradeRole, TradeStatus,
};

//! Trade lifecycle states, commands, and roles.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Lifecycle status shared by listings and trades.
///
/// Stored as lowercase snake_case strings in the record store. Status is
/// monotonic along the transition graph; `completed`, `cancelled` and
/// `disputed` are terminal and admit no further transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeStatus {
    /// Listing is funded and waiting for a buyer.
    Open,
    /// A buyer accepted; fiat hand-off is being arranged.
    InProgress,
    /// Buyer asserts the fiat payment was sent.
    PaymentSent,
    /// Seller confirmed receipt and the release call was submitted.
    Completed,
    /// Either party cancelled; refund call was submitted.
    Cancelled,
    /// Either party raised a dispute; arbitration is external.
    Disputed,
}

impl TradeStatus {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "open" => Ok(TradeStatus::Open),
            "in_progress" => Ok(TradeStatus::InProgress),
            "payment_sent" => Ok(TradeStatus::PaymentSent),
            "completed" => Ok(TradeStatus::Completed),
            "cancelled" => Ok(TradeStatus::Cancelled),
            "disputed" => Ok(TradeStatus::Disputed),
            _ => Err(Error::InvalidInput(format!("unknown trade status: {}", s))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Open => "open",
            TradeStatus::InProgress => "in_progress",
            TradeStatus::PaymentSent => "payment_sent",
            TradeStatus::Completed => "completed",
            TradeStatus::Cancelled => "cancelled",
            TradeStatus::Disputed => "disputed",
        }
    }

    /// Terminal states are immutable: no command is accepted out of them.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TradeStatus::Completed | TradeStatus::Cancelled | TradeStatus::Disputed
        )
    }

    /// Whether `kind` is a legal trigger out of this state.
    ///
    /// Authorization (who may trigger it) is enforced separately by the
    /// coordinator; this answers reachability only.
    pub fn permits(&self, kind: CommandKind) -> bool {
        match (self, kind) {
            (TradeStatus::Open, CommandKind::Accept) => true,
            (TradeStatus::InProgress, CommandKind::ConfirmSent) => true,
            (TradeStatus::PaymentSent, CommandKind::ConfirmReceived) => true,
            (TradeStatus::InProgress | TradeStatus::PaymentSent, CommandKind::Cancel) => true,
            (TradeStatus::InProgress | TradeStatus::PaymentSent, CommandKind::Dispute) => true,
            _ => false,
        }
    }
}

/// The five validated trade triggers.
///
/// Every transition enters the coordinator as one of these variants; there is
/// no ad hoc branching on request paths. `Accept` addresses a listing, the
/// rest address an existing trade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum TradeCommand {
    Accept { listing_id: String },
    ConfirmSent { trade_id: String },
    ConfirmReceived { trade_id: String },
    Cancel { trade_id: String },
    Dispute { trade_id: String },
}

/// Discriminant of [`TradeCommand`], used for legality checks and error
/// reporting without cloning the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Accept,
    ConfirmSent,
    ConfirmReceived,
    Cancel,
    Dispute,
}

impl TradeCommand {
    pub fn kind(&self) -> CommandKind {
        match self {
            TradeCommand::Accept { .. } => CommandKind::Accept,
            TradeCommand::ConfirmSent { .. } => CommandKind::ConfirmSent,
            TradeCommand::ConfirmReceived { .. } => CommandKind::ConfirmReceived,
            TradeCommand::Cancel { .. } => CommandKind::Cancel,
            TradeCommand::Dispute { .. } => CommandKind::Dispute,
        }
    }
}

impl CommandKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::Accept => "accept",
            CommandKind::ConfirmSent => "confirm_sent",
            CommandKind::ConfirmReceived => "confirm_received",
            CommandKind::Cancel => "cancel",
            CommandKind::Dispute => "dispute",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a party within one trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeRole {
    Buyer,
    Seller,
}

impl TradeRole {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "buyer" => Ok(TradeRole::Buyer),
            "seller" => Ok(TradeRole::Seller),
            _ => Err(Error::InvalidInput(format!("unknown trade role: {}", s))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeRole::Buyer => "buyer",
            TradeRole::Seller => "seller",
        }
    }
}

/// Chain-truth overlay for a trade's most recent on-chain submission.
///
/// Distinct from [`TradeStatus`]: the lifecycle status moves when a
/// submission succeeds, while the settlement state tracks whether that
/// submission was actually mined. `Submitted` is advanced to `Confirmed` or
/// `Failed` by the settlement monitor, never by the submitting actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettlementState {
    /// No on-chain call has been submitted for this trade.
    NotSubmitted,
    /// A call was handed to the signer and a transaction hash returned.
    Submitted,
    /// The transaction was mined with a success status.
    Confirmed,
    /// The transaction reverted or was never mined within the deadline.
    Failed,
}

impl SettlementState {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "not_submitted" => Ok(SettlementState::NotSubmitted),
            "submitted" => Ok(SettlementState::Submitted),
            "confirmed" => Ok(SettlementState::Confirmed),
            "failed" => Ok(SettlementState::Failed),
            _ => Err(Error::InvalidInput(format!(
                "unknown settlement state: {}",
                s
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SettlementState::NotSubmitted => "not_submitted",
            SettlementState::Submitted => "submitted",
            SettlementState::Confirmed => "confirmed",
            SettlementState::Failed => "failed",
        }
    }
}

/// Case-insensitive address equality.
///
/// Wallet extensions report addresses with mixed checksum casing; every
/// comparison in the coordinator goes through here.
pub fn addresses_equal(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

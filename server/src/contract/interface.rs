//! The escrow contract's call interface.
//!
//! This module is the single description of the on-chain surface the
//! coordinator talks to. Selectors are derived here from the canonical
//! function signatures via Keccak-256; nothing else in the codebase carries
//! a selector literal, so a signature change cannot drift silently.

use std::sync::OnceLock;

use tiny_keccak::{Hasher, Keccak};

/// The four functions the settlement contract exposes to the coordinator.
///
/// Every function takes the numeric contract trade id as its only argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EscrowFunction {
    /// Lock in the buyer on-chain when an offer is taken.
    AcceptTrade,
    /// Release escrowed funds to the buyer after the seller confirms fiat
    /// receipt.
    ConfirmPaymentReceived,
    /// Refund escrowed funds to the seller.
    CancelTrade,
    /// Flag the escrow for external arbitration.
    RaiseDispute,
}

impl EscrowFunction {
    pub const ALL: [EscrowFunction; 4] = [
        EscrowFunction::AcceptTrade,
        EscrowFunction::ConfirmPaymentReceived,
        EscrowFunction::CancelTrade,
        EscrowFunction::RaiseDispute,
    ];

    /// Canonical ABI signature, the sole input to selector derivation.
    pub fn signature(&self) -> &'static str {
        match self {
            EscrowFunction::AcceptTrade => "acceptTrade(uint256)",
            EscrowFunction::ConfirmPaymentReceived => "confirmPaymentReceived(uint256)",
            EscrowFunction::CancelTrade => "cancelTrade(uint256)",
            EscrowFunction::RaiseDispute => "raiseDispute(uint256)",
        }
    }

    /// First four bytes of `keccak256(signature)`.
    pub fn selector(&self) -> [u8; 4] {
        static SELECTORS: OnceLock<[[u8; 4]; 4]> = OnceLock::new();
        let table = SELECTORS.get_or_init(|| {
            let mut table = [[0u8; 4]; 4];
            for function in EscrowFunction::ALL {
                let digest = keccak256(function.signature().as_bytes());
                table[function.index()].copy_from_slice(&digest[..4]);
            }
            table
        });
        table[self.index()]
    }

    fn index(&self) -> usize {
        match self {
            EscrowFunction::AcceptTrade => 0,
            EscrowFunction::ConfirmPaymentReceived => 1,
            EscrowFunction::CancelTrade => 2,
            EscrowFunction::RaiseDispute => 3,
        }
    }
}

fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    let mut output = [0u8; 32];
    hasher.update(data);
    hasher.finalize(&mut output);
    output
}

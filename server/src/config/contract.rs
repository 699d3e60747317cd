//! Escrow contract and chain endpoint configuration.
//!
//! The settlement contract address normally travels on each listing; the
//! well-known deployment below is the fallback when a listing omits it.

use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

/// Well-known escrow contract deployment on the Kasplex EVM layer.
pub const DEFAULT_ESCROW_CONTRACT: &str = "0x7a8bcb6f20b4c3e82bb51c8a42c1c16229e47c40";

/// Default signer/node JSON-RPC endpoint.
pub const DEFAULT_RPC_ENDPOINT: &str = "http://127.0.0.1:8545";

/// Contract-facing configuration.
#[derive(Debug, Clone)]
pub struct ContractConfig {
    /// Fallback contract address when a listing carries none.
    pub fallback_address: String,
    /// JSON-RPC endpoint of the signer/node.
    pub rpc_endpoint: String,
}

impl ContractConfig {
    /// Load from environment, falling back to the well-known deployment.
    ///
    /// `ESCROW_CONTRACT_ADDRESS` and `ESCROW_RPC_ENDPOINT` override the
    /// defaults.
    pub fn from_env() -> Result<Self> {
        let fallback_address = env::var("ESCROW_CONTRACT_ADDRESS")
            .unwrap_or_else(|_| DEFAULT_ESCROW_CONTRACT.to_string());
        validate_contract_address(&fallback_address)
            .context("ESCROW_CONTRACT_ADDRESS is invalid")?;

        let rpc_endpoint =
            env::var("ESCROW_RPC_ENDPOINT").unwrap_or_else(|_| DEFAULT_RPC_ENDPOINT.to_string());

        info!(
            "Escrow contract configured: fallback={}",
            crate::logging::sanitize::sanitize_address(&fallback_address)
        );

        Ok(Self {
            fallback_address,
            rpc_endpoint,
        })
    }
}

/// Settlement monitor timing.
#[derive(Debug, Clone)]
pub struct SettlementConfig {
    /// Seconds between receipt polls.
    pub poll_interval_secs: u64,
    /// Seconds a submission may stay unconfirmed before it is flagged.
    pub confirm_timeout_secs: i64,
}

impl SettlementConfig {
    pub fn from_env() -> Self {
        let poll_interval_secs = env::var("SETTLEMENT_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(15);
        let confirm_timeout_secs = env::var("SETTLEMENT_CONFIRM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1800);
        Self {
            poll_interval_secs,
            confirm_timeout_secs,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 15,
            confirm_timeout_secs: 1800,
        }
    }
}

/// Shape check for an EVM-style contract address: 0x + 40 hex chars.
pub fn validate_contract_address(address: &str) -> Result<()> {
    let stripped = match address.strip_prefix("0x") {
        Some(s) => s,
        None => bail!("contract address must start with 0x"),
    };
    if stripped.len() != 40 {
        bail!("contract address must be 20 bytes, got {}", stripped.len());
    }
    if !stripped.chars().all(|c| c.is_ascii_hexdigit()) {
        bail!("contract address contains non-hex characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_contract_address_is_valid() {
        assert!(validate_contract_address(DEFAULT_ESCROW_CONTRACT).is_ok());
    }

    #[test]
    fn test_validate_contract_address_rejects_garbage() {
        assert!(validate_contract_address("7a8b").is_err());
        assert!(validate_contract_address("0x1234").is_err());
        assert!(validate_contract_address(
            "0xzz8bcb6f20b4c3e82bb51c8a42c1c16229e47c40"
        )
        .is_err());
    }
}

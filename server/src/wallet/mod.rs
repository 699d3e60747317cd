//! Wallet provider boundary.
//!
//! The coordinator depends on a minimal surface: request an account, submit
//! a prepared transaction, and look up a receipt. Submission may suspend
//! indefinitely while the user decides in their signer, and resolves with a
//! transaction hash or rejects; there is no mid-flight cancellation. A hash
//! is not finality; the settlement monitor checks receipts separately.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::warn;

use kas_marketplace_common::{Error, Result};

/// Outcome reported by a mined transaction's receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Succeeded,
    Reverted,
}

/// Minimal signer/chain surface the coordinator needs.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Address of the connected account.
    async fn request_account(&self) -> Result<String>;

    /// Hand a transaction to the signer. Resolves with the transaction hash
    /// once signed and broadcast, or rejects on user decline / RPC failure.
    async fn submit_transaction(&self, from: &str, to: &str, data: &[u8]) -> Result<String>;

    /// Receipt for a previously submitted transaction, `None` while pending.
    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<ReceiptStatus>>;
}

/// EIP-1193 code for a user-declined request.
const CODE_USER_REJECTED: i64 = 4001;

/// JSON-RPC wallet provider backed by a node/signer endpoint.
pub struct RpcWalletProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl RpcWalletProvider {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::ContractCallFailure(format!("{} request failed: {}", method, e)))?;

        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::ContractCallFailure(format!("{} bad response: {}", method, e)))?;

        if let Some(error) = payload.get("error") {
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown RPC error");
            if code == CODE_USER_REJECTED {
                return Err(Error::UserRejection);
            }
            return Err(Error::ContractCallFailure(format!(
                "{} rejected ({}): {}",
                method, code, message
            )));
        }

        payload
            .get("result")
            .cloned()
            .ok_or_else(|| Error::ContractCallFailure(format!("{}: missing result", method)))
    }
}

#[async_trait]
impl WalletProvider for RpcWalletProvider {
    async fn request_account(&self) -> Result<String> {
        let result = self.call("eth_accounts", json!([])).await?;
        result
            .as_array()
            .and_then(|accounts| accounts.first())
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| Error::ContractCallFailure("no account available".to_string()))
    }

    async fn submit_transaction(&self, from: &str, to: &str, data: &[u8]) -> Result<String> {
        let params = json!([{
            "from": from,
            "to": to,
            "data": format!("0x{}", hex::encode(data)),
        }]);
        let result = self.call("eth_sendTransaction", params).await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::ContractCallFailure("malformed transaction hash".to_string()))
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<ReceiptStatus>> {
        let result = self
            .call("eth_getTransactionReceipt", json!([tx_hash]))
            .await?;

        if result.is_null() {
            return Ok(None);
        }

        match result.get("status").and_then(Value::as_str) {
            Some("0x1") => Ok(Some(ReceiptStatus::Succeeded)),
            Some("0x0") => Ok(Some(ReceiptStatus::Reverted)),
            other => {
                warn!("Unrecognized receipt status {:?} for {}", other, tx_hash);
                Ok(None)
            }
        }
    }
}

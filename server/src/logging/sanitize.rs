//! Log sanitization.
//!
//! Full wallet addresses and transaction hashes allow chain correlation;
//! every value that reaches a log line goes through here first.

/// Sanitize a wallet address for logs.
///
/// Format: "0xAb...f01" (first 4 + last 3 chars).
pub fn sanitize_address(address: &str) -> String {
    if address.len() < 8 {
        return "<invalid-address>".to_string();
    }
    format!("{}...{}", &address[..4], &address[address.len() - 3..])
}

/// Sanitize a transaction hash for logs.
///
/// Format: "0xabc123...90ef" (first 8 + last 4 chars).
pub fn sanitize_txid(txid: &str) -> String {
    if txid.len() < 16 {
        return "<invalid-txid>".to_string();
    }
    format!("{}...{}", &txid[..8], &txid[txid.len() - 4..])
}

/// Sanitize a listing/trade record id for logs.
///
/// Record ids are UUIDs; the first 8 chars are enough to correlate while
/// debugging.
pub fn sanitize_id(id: &str) -> String {
    if id.len() < 12 {
        return id.to_string();
    }
    format!("{}...", &id[..8])
}

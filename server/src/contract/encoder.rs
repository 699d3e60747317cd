//! Contract call payload encoding.
//!
//! Pure and side-effect free: a trade-state intent plus the numeric contract
//! trade id becomes the exact byte payload the settlement contract expects.
//! Submission happens elsewhere, and a returned transaction hash is not
//! proof of success.

use super::interface::EscrowFunction;

/// Selector (4 bytes) plus one uint256 argument (32 bytes).
pub const CALL_DATA_LEN: usize = 36;

/// Encode `selector || uint256(trade_id)`.
///
/// The trade id is big-endian, left-padded to 32 bytes. Deterministic:
/// encoding the same input twice yields byte-identical output.
pub fn encode_call(function: EscrowFunction, contract_trade_id: u64) -> [u8; CALL_DATA_LEN] {
    let mut data = [0u8; CALL_DATA_LEN];
    data[..4].copy_from_slice(&function.selector());
    data[CALL_DATA_LEN - 8..].copy_from_slice(&contract_trade_id.to_be_bytes());
    data
}

/// The contract address a call targets: the listing's own address when
/// present, otherwise the well-known deployment.
pub fn resolve_target<'a>(listing_contract: Option<&'a str>, fallback: &'a str) -> &'a str {
    match listing_contract {
        Some(address) if !address.is_empty() => address,
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_length_and_layout() {
        let data = encode_call(EscrowFunction::ConfirmPaymentReceived, 5);
        assert_eq!(data.len(), CALL_DATA_LEN);
        assert_eq!(
            hex::encode(data),
            "e3406ff60000000000000000000000000000000000000000000000000000000000000005"
        );
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let first = encode_call(EscrowFunction::ConfirmPaymentReceived, 5);
        let second = encode_call(EscrowFunction::ConfirmPaymentReceived, 5);
        assert_eq!(first, second);
    }

    #[test]
    fn test_big_endian_left_padding() {
        let data = encode_call(EscrowFunction::CancelTrade, u64::MAX);
        assert_eq!(&data[..4], &EscrowFunction::CancelTrade.selector());
        // 24 zero bytes of padding, then the 8-byte big-endian id
        assert!(data[4..28].iter().all(|b| *b == 0));
        assert_eq!(&data[28..], &u64::MAX.to_be_bytes());

        let zero = encode_call(EscrowFunction::RaiseDispute, 0);
        assert!(zero[4..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_resolve_target_prefers_listing() {
        assert_eq!(resolve_target(Some("0xabc"), "0xdef"), "0xabc");
        assert_eq!(resolve_target(None, "0xdef"), "0xdef");
        assert_eq!(resolve_target(Some(""), "0xdef"), "0xdef");
    }
}

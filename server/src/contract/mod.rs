//! On-chain escrow contract surface: interface description and call
//! encoding. The contract's internal logic is external; only its call
//! interface lives here.

pub mod encoder;
pub mod interface;

pub use encoder::{encode_call, resolve_target, CALL_DATA_LEN};
pub use interface::EscrowFunction;

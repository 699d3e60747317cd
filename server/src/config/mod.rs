//! Configuration modules for the trade coordinator server.

pub mod contract;

pub use contract::{
    validate_contract_address, ContractConfig, SettlementConfig, DEFAULT_ESCROW_CONTRACT,
    DEFAULT_RPC_ENDPOINT,
};

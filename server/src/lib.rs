//! Kaspa P2P escrow trade coordinator.
//!
//! Keeps two sources of truth consistent: the off-chain Listing/Trade record
//! store and the on-chain, irreversible settlement contract. The coordinator
//! validates every transition server-side, encodes contract calls from a
//! single interface description, and reconciles submitted transactions
//! against chain receipts in the background.

pub mod config;
pub mod contract;
pub mod db;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod schema;
pub mod services;
pub mod wallet;

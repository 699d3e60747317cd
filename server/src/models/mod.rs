//! Record-store models.

pub mod listing;
pub mod trade;
pub mod trade_message;

pub use listing::{Listing, NewListing};
pub use trade::{NewTrade, Trade};
pub use trade_message::{NewTradeMessage, TradeMessage};

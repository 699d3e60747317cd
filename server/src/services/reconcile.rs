//! Reconciliation between off-chain records and on-chain truth.
//!
//! Off-chain writes after a successful submission are not transactional with
//! the chain write; a crash in between leaves the record understating
//! progress. The contract here: every page/session load re-reads the
//! authoritative Listing/Trade rows instead of trusting any client-held
//! cache, and a further financial transition is only evaluated against that
//! fresh read. A missing contract trade id where one is expected is a
//! data-integrity fault, never "no trade yet".

use diesel::SqliteConnection;
use tracing::error;

use kas_marketplace_common::{Error, Result, SettlementState, TradeStatus};

use crate::db::DbPool;
use crate::logging::sanitize::sanitize_id;
use crate::models::{Listing, Trade};

/// Fresh, invariant-checked view of one trade and its listing.
#[derive(Debug, Clone)]
pub struct TradeContext {
    pub trade: Trade,
    pub listing: Listing,
    pub trade_status: TradeStatus,
    pub listing_status: TradeStatus,
    pub settlement_state: SettlementState,
}

impl TradeContext {
    /// Re-read both records from the store and verify their invariants.
    pub fn load(conn: &mut SqliteConnection, trade_id: &str) -> Result<TradeContext> {
        let trade = Trade::find_by_id(conn, trade_id)
            .map_err(|e| Error::Database(format!("{:#}", e)))?
            .ok_or_else(|| Error::NotFound(format!("Trade {}", trade_id)))?;

        let listing = Listing::find_by_id(conn, &trade.listing_id)
            .map_err(|e| Error::Database(format!("{:#}", e)))?
            .ok_or_else(|| Error::NotFound(format!("Listing {}", trade.listing_id)))?;

        let trade_status = TradeStatus::parse(&trade.status)?;
        let listing_status = TradeStatus::parse(&listing.status)?;
        let settlement_state = SettlementState::parse(&trade.settlement_state)?;

        verify_amount_invariant(&listing, &trade)?;

        Ok(TradeContext {
            trade,
            listing,
            trade_status,
            listing_status,
            settlement_state,
        })
    }

    /// True while the last submission has neither confirmed nor been
    /// flagged; callers rendering financial state should surface this.
    pub fn settlement_pending(&self) -> bool {
        self.settlement_state == SettlementState::Submitted
    }
}

/// `trade.kas_amount == listing.kas_amount` holds at creation and for the
/// trade's lifetime; a mismatch means the records were tampered with or
/// corrupted.
pub fn verify_amount_invariant(listing: &Listing, trade: &Trade) -> Result<()> {
    if listing.kas_amount != trade.kas_amount {
        error!(
            "Amount invariant violated: listing {} has {} but trade {} has {}",
            sanitize_id(&listing.id),
            listing.kas_amount,
            sanitize_id(&trade.id),
            trade.kas_amount
        );
        return Err(Error::Internal(format!(
            "kas_amount mismatch between listing {} and trade {}",
            listing.id, trade.id
        )));
    }
    Ok(())
}

/// Resolve the numeric id the contract uses to address this escrow: the
/// listing's value, else the trade's value. If neither record carries one
/// the transition fails; the id is never guessed.
pub fn resolve_contract_trade_id(listing: &Listing, trade: &Trade) -> Result<u64> {
    let raw = listing
        .contract_trade_id
        .or(trade.contract_trade_id)
        .ok_or(Error::MissingContractTradeId)?;

    u64::try_from(raw).map_err(|_| {
        error!(
            "Negative contract trade id {} on listing {}",
            raw,
            sanitize_id(&listing.id)
        );
        Error::Internal(format!("corrupt contract trade id {}", raw))
    })
}

/// Session-load reconciliation entry point for read paths.
pub struct ConsistencyManager {
    db: DbPool,
}

impl ConsistencyManager {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Authoritative trade view for a page/session load.
    pub async fn trade_context(&self, trade_id: &str) -> Result<TradeContext> {
        let db = self.db.clone();
        let trade_id = trade_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .get()
                .map_err(|e| Error::Database(format!("DB connection failed: {}", e)))?;
            TradeContext::load(&mut conn, &trade_id)
        })
        .await
        .map_err(|e| Error::Internal(format!("database task panicked: {}", e)))?
    }

    /// Authoritative listing view, with its trade when one exists.
    pub async fn listing_view(&self, listing_id: &str) -> Result<(Listing, Option<Trade>)> {
        let db = self.db.clone();
        let listing_id = listing_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .get()
                .map_err(|e| Error::Database(format!("DB connection failed: {}", e)))?;

            let listing = Listing::find_by_id(&mut conn, &listing_id)
                .map_err(|e| Error::Database(format!("{:#}", e)))?
                .ok_or_else(|| Error::NotFound(format!("Listing {}", listing_id)))?;

            let trade = Trade::find_by_listing(&mut conn, &listing_id)
                .map_err(|e| Error::Database(format!("{:#}", e)))?;

            if let Some(ref trade) = trade {
                verify_amount_invariant(&listing, trade)?;
            }

            Ok((listing, trade))
        })
        .await
        .map_err(|e| Error::Internal(format!("database task panicked: {}", e)))?
    }
}

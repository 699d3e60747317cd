//! Trade model and record-store operations.
//!
//! A trade is the off-chain mirror of one escrow lifecycle, tied to exactly
//! one listing (`listing_id` is UNIQUE). It is created on acceptance with the
//! listing's amounts copied verbatim, updated at each confirmation, and never
//! deleted. Once in a terminal status the row is immutable; the coordinator
//! enforces that before issuing any update here.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use kas_marketplace_common::{SettlementState, TradeStatus};

use crate::schema::trades;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = trades)]
pub struct Trade {
    pub id: String,
    pub listing_id: String,
    pub seller_address: String,
    pub buyer_address: String,
    pub kas_amount: i64,
    pub fiat_amount: i64,
    pub status: String,
    pub buyer_confirmed: bool,
    pub seller_confirmed: bool,
    pub tx_hash: Option<String>,
    pub contract_trade_id: Option<i64>,
    pub settlement_state: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = trades)]
pub struct NewTrade {
    pub id: String,
    pub listing_id: String,
    pub seller_address: String,
    pub buyer_address: String,
    pub kas_amount: i64,
    pub fiat_amount: i64,
    pub status: String,
    pub buyer_confirmed: bool,
    pub seller_confirmed: bool,
    pub contract_trade_id: Option<i64>,
    pub settlement_state: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Trade {
    pub fn create(conn: &mut SqliteConnection, new_trade: NewTrade) -> Result<Trade> {
        let trade_id = new_trade.id.clone();

        diesel::insert_into(trades::table)
            .values(&new_trade)
            .execute(conn)
            .context("Failed to insert trade")?;

        trades::table
            .filter(trades::id.eq(trade_id))
            .first(conn)
            .context("Failed to retrieve created trade")
    }

    pub fn find_by_id(conn: &mut SqliteConnection, trade_id: &str) -> Result<Option<Trade>> {
        trades::table
            .filter(trades::id.eq(trade_id))
            .first(conn)
            .optional()
            .context(format!("Failed to query trade {}", trade_id))
    }

    pub fn find_by_listing(conn: &mut SqliteConnection, listing_id: &str) -> Result<Option<Trade>> {
        trades::table
            .filter(trades::listing_id.eq(listing_id))
            .first(conn)
            .optional()
            .context(format!("Failed to query trade for listing {}", listing_id))
    }

    /// Buyer asserts the fiat payment was sent.
    pub fn mark_payment_sent(conn: &mut SqliteConnection, trade_id: &str) -> Result<()> {
        diesel::update(trades::table.filter(trades::id.eq(trade_id)))
            .set((
                trades::buyer_confirmed.eq(true),
                trades::status.eq(TradeStatus::PaymentSent.as_str()),
                trades::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .context(format!("Failed to mark payment sent on trade {}", trade_id))?;
        Ok(())
    }

    /// Record the outcome of a successful on-chain submission: the new
    /// lifecycle status, the transaction hash, and the `submitted`
    /// settlement overlay in one write.
    pub fn record_submission(
        conn: &mut SqliteConnection,
        trade_id: &str,
        new_status: TradeStatus,
        seller_confirmed: Option<bool>,
        tx_hash: &str,
    ) -> Result<()> {
        match seller_confirmed {
            Some(confirmed) => diesel::update(trades::table.filter(trades::id.eq(trade_id)))
                .set((
                    trades::status.eq(new_status.as_str()),
                    trades::seller_confirmed.eq(confirmed),
                    trades::tx_hash.eq(tx_hash),
                    trades::settlement_state.eq(SettlementState::Submitted.as_str()),
                    trades::updated_at.eq(diesel::dsl::now),
                ))
                .execute(conn),
            None => diesel::update(trades::table.filter(trades::id.eq(trade_id)))
                .set((
                    trades::status.eq(new_status.as_str()),
                    trades::tx_hash.eq(tx_hash),
                    trades::settlement_state.eq(SettlementState::Submitted.as_str()),
                    trades::updated_at.eq(diesel::dsl::now),
                ))
                .execute(conn),
        }
        .context(format!("Failed to record submission on trade {}", trade_id))?;
        Ok(())
    }

    /// Advance the settlement overlay; only the settlement monitor calls
    /// this, never the submitting actor.
    pub fn update_settlement_state(
        conn: &mut SqliteConnection,
        trade_id: &str,
        state: SettlementState,
    ) -> Result<()> {
        diesel::update(trades::table.filter(trades::id.eq(trade_id)))
            .set((
                trades::settlement_state.eq(state.as_str()),
                trades::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .context(format!(
                "Failed to update settlement state on trade {}",
                trade_id
            ))?;
        Ok(())
    }

    /// Trades whose last submission has not been confirmed or flagged yet.
    pub fn find_awaiting_settlement(conn: &mut SqliteConnection) -> Result<Vec<Trade>> {
        trades::table
            .filter(trades::settlement_state.eq(SettlementState::Submitted.as_str()))
            .load(conn)
            .context("Failed to load trades awaiting settlement")
    }
}

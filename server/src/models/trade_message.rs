//! Append-only per-trade message log.
//!
//! Messages have no update or delete path. Summaries read newest-first,
//! conversation rendering reads chronologically.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::trade_messages;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = trade_messages)]
pub struct TradeMessage {
    pub id: String,
    pub trade_id: String,
    pub sender_address: String,
    pub message: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = trade_messages)]
pub struct NewTradeMessage {
    pub id: String,
    pub trade_id: String,
    pub sender_address: String,
    pub message: String,
    pub created_at: NaiveDateTime,
}

impl NewTradeMessage {
    pub fn new(trade_id: String, sender_address: String, message: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            trade_id,
            sender_address,
            message,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

impl TradeMessage {
    pub fn create(conn: &mut SqliteConnection, new_message: NewTradeMessage) -> Result<Self> {
        diesel::insert_into(trade_messages::table)
            .values(&new_message)
            .execute(conn)
            .context("Failed to insert trade message")?;

        trade_messages::table
            .filter(trade_messages::id.eq(&new_message.id))
            .first(conn)
            .context("Failed to retrieve created trade message")
    }

    /// Full conversation in chronological order.
    pub fn find_by_trade(conn: &mut SqliteConnection, trade_id: &str) -> Result<Vec<Self>> {
        trade_messages::table
            .filter(trade_messages::trade_id.eq(trade_id))
            .order(trade_messages::created_at.asc())
            .load(conn)
            .context(format!("Failed to load messages for trade {}", trade_id))
    }

    /// Newest messages first, for trade list summaries.
    pub fn find_recent(
        conn: &mut SqliteConnection,
        trade_id: &str,
        limit: i64,
    ) -> Result<Vec<Self>> {
        trade_messages::table
            .filter(trade_messages::trade_id.eq(trade_id))
            .order(trade_messages::created_at.desc())
            .limit(limit)
            .load(conn)
            .context(format!(
                "Failed to load recent messages for trade {}",
                trade_id
            ))
    }

    pub fn count_for_trade(conn: &mut SqliteConnection, trade_id: &str) -> Result<i64> {
        trade_messages::table
            .filter(trade_messages::trade_id.eq(trade_id))
            .count()
            .get_result(conn)
            .context(format!("Failed to count messages for trade {}", trade_id))
    }
}

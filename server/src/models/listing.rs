//! Listing model and record-store operations.
//!
//! A listing is a seller's open offer: a fixed KAS amount already locked in
//! the escrow contract against a fixed fiat price. Listings are never
//! deleted, only transitioned; `kas_amount` and `contract_trade_id` are
//! immutable once set, so no update path touches them.

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use kas_marketplace_common::TradeStatus;

use crate::schema::listings;

#[derive(Debug, Clone, Serialize, Deserialize, Queryable, Identifiable)]
#[diesel(table_name = listings)]
pub struct Listing {
    pub id: String,
    pub seller_address: String,
    pub buyer_address: Option<String>,
    pub kas_amount: i64,
    pub fiat_amount: i64,
    pub status: String,
    pub contract_address: Option<String>,
    pub contract_trade_id: Option<i64>,
    pub location: Option<String>,
    pub meeting_notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = listings)]
pub struct NewListing {
    pub id: String,
    pub seller_address: String,
    pub kas_amount: i64,
    pub fiat_amount: i64,
    pub status: String,
    pub contract_address: Option<String>,
    pub contract_trade_id: Option<i64>,
    pub location: Option<String>,
    pub meeting_notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Listing {
    /// Insert a new listing and return the stored row.
    ///
    /// Listing creation itself (escrow funding) is driven by an external
    /// collaborator; the coordinator only ever reads and transitions them.
    /// This exists for that collaborator and for tests.
    pub fn create(conn: &mut SqliteConnection, new_listing: NewListing) -> Result<Listing> {
        let listing_id = new_listing.id.clone();

        diesel::insert_into(listings::table)
            .values(&new_listing)
            .execute(conn)
            .context("Failed to insert listing")?;

        listings::table
            .filter(listings::id.eq(listing_id))
            .first(conn)
            .context("Failed to retrieve created listing")
    }

    pub fn find_by_id(conn: &mut SqliteConnection, listing_id: &str) -> Result<Option<Listing>> {
        listings::table
            .filter(listings::id.eq(listing_id))
            .first(conn)
            .optional()
            .context(format!("Failed to query listing {}", listing_id))
    }

    /// All listings currently open for acceptance, newest first.
    pub fn find_open(conn: &mut SqliteConnection) -> Result<Vec<Listing>> {
        listings::table
            .filter(listings::status.eq(TradeStatus::Open.as_str()))
            .order(listings::created_at.desc())
            .load(conn)
            .context("Failed to load open listings")
    }

    /// Atomic compare-and-set for the accept race.
    ///
    /// The status predicate rides in the same UPDATE as the transition, so
    /// two near-simultaneous accepts can never both win: exactly one UPDATE
    /// matches `status = 'open'`. Returns whether this caller won.
    pub fn try_accept(
        conn: &mut SqliteConnection,
        listing_id: &str,
        buyer_address: &str,
    ) -> Result<bool> {
        let updated = diesel::update(
            listings::table
                .filter(listings::id.eq(listing_id))
                .filter(listings::status.eq(TradeStatus::Open.as_str())),
        )
        .set((
            listings::buyer_address.eq(buyer_address),
            listings::status.eq(TradeStatus::InProgress.as_str()),
            listings::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .context(format!("Failed to accept listing {}", listing_id))?;

        Ok(updated == 1)
    }

    /// Move the listing to a new lifecycle status.
    pub fn update_status(
        conn: &mut SqliteConnection,
        listing_id: &str,
        new_status: TradeStatus,
    ) -> Result<()> {
        diesel::update(listings::table.filter(listings::id.eq(listing_id)))
            .set((
                listings::status.eq(new_status.as_str()),
                listings::updated_at.eq(diesel::dsl::now),
            ))
            .execute(conn)
            .context(format!("Failed to update status for listing {}", listing_id))?;
        Ok(())
    }
}

//! Database pool and schema bootstrap.
//!
//! SQLite via diesel + r2d2. Every pooled connection gets the same pragma
//! set applied on acquire; the schema is created idempotently at startup so
//! a fresh deployment needs no external migration step.

use anyhow::{Context, Result};
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use diesel::sql_query;

pub type DbPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

/// Applies connection pragmas on every acquire.
#[derive(Debug, Clone)]
struct SqlitePragmaCustomizer;

impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmaCustomizer {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> std::result::Result<(), diesel::r2d2::Error> {
        // Wait up to 5 seconds for locks instead of failing immediately
        sql_query("PRAGMA busy_timeout = 5000;")
            .execute(conn)
            .map_err(diesel::r2d2::Error::QueryError)?;

        sql_query("PRAGMA journal_mode = WAL;")
            .execute(conn)
            .map_err(diesel::r2d2::Error::QueryError)?;

        sql_query("PRAGMA synchronous = NORMAL;")
            .execute(conn)
            .map_err(diesel::r2d2::Error::QueryError)?;

        sql_query("PRAGMA foreign_keys = ON;")
            .execute(conn)
            .map_err(diesel::r2d2::Error::QueryError)?;

        Ok(())
    }
}

/// Create a database connection pool.
pub fn create_pool(database_url: &str) -> Result<DbPool> {
    create_pool_sized(database_url, 10)
}

/// Create a pool with an explicit size.
///
/// Tests use a single-connection pool on `:memory:` so every checkout sees
/// the same database.
pub fn create_pool_sized(database_url: &str, max_size: u32) -> Result<DbPool> {
    let manager = ConnectionManager::<SqliteConnection>::new(database_url);
    let pool = r2d2::Pool::builder()
        .max_size(max_size)
        .connection_customizer(Box::new(SqlitePragmaCustomizer))
        .build(manager)
        .context("Failed to create database pool")?;
    Ok(pool)
}

/// Create all tables and indexes if they do not exist yet.
pub fn init_schema(pool: &DbPool) -> Result<()> {
    let mut conn = pool.get().context("Failed to get DB connection")?;

    sql_query(
        "CREATE TABLE IF NOT EXISTS listings (
            id TEXT PRIMARY KEY NOT NULL,
            seller_address TEXT NOT NULL,
            buyer_address TEXT,
            kas_amount BIGINT NOT NULL,
            fiat_amount BIGINT NOT NULL,
            status TEXT NOT NULL,
            contract_address TEXT,
            contract_trade_id BIGINT,
            location TEXT,
            meeting_notes TEXT,
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        );",
    )
    .execute(&mut conn)
    .context("Failed to create listings table")?;

    sql_query(
        "CREATE TABLE IF NOT EXISTS trades (
            id TEXT PRIMARY KEY NOT NULL,
            listing_id TEXT NOT NULL UNIQUE REFERENCES listings(id),
            seller_address TEXT NOT NULL,
            buyer_address TEXT NOT NULL,
            kas_amount BIGINT NOT NULL,
            fiat_amount BIGINT NOT NULL,
            status TEXT NOT NULL,
            buyer_confirmed BOOLEAN NOT NULL DEFAULT 0,
            seller_confirmed BOOLEAN NOT NULL DEFAULT 0,
            tx_hash TEXT,
            contract_trade_id BIGINT,
            settlement_state TEXT NOT NULL DEFAULT 'not_submitted',
            created_at TIMESTAMP NOT NULL,
            updated_at TIMESTAMP NOT NULL
        );",
    )
    .execute(&mut conn)
    .context("Failed to create trades table")?;

    sql_query(
        "CREATE TABLE IF NOT EXISTS trade_messages (
            id TEXT PRIMARY KEY NOT NULL,
            trade_id TEXT NOT NULL REFERENCES trades(id),
            sender_address TEXT NOT NULL,
            message TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL
        );",
    )
    .execute(&mut conn)
    .context("Failed to create trade_messages table")?;

    sql_query("CREATE INDEX IF NOT EXISTS idx_listings_status ON listings(status);")
        .execute(&mut conn)
        .context("Failed to create listings status index")?;

    sql_query("CREATE INDEX IF NOT EXISTS idx_trades_settlement ON trades(settlement_state);")
        .execute(&mut conn)
        .context("Failed to create trades settlement index")?;

    sql_query(
        "CREATE INDEX IF NOT EXISTS idx_trade_messages_trade ON trade_messages(trade_id, created_at);",
    )
    .execute(&mut conn)
    .context("Failed to create trade_messages index")?;

    Ok(())
}

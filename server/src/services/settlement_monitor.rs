//! Settlement monitoring service.
//!
//! A transaction hash returned by the signer is not finality. This service
//! runs in the background and periodically polls receipts for every trade
//! whose last submission is still in the `submitted` overlay, advancing it
//! to `confirmed` on a mined success, or flagging `failed` on a revert or
//! when the confirmation deadline passes. It never touches the lifecycle
//! status and never retries a submission.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::time::interval;
use tracing::{error, info, warn};

use kas_marketplace_common::SettlementState;

use crate::config::SettlementConfig;
use crate::db::DbPool;
use crate::logging::sanitize::{sanitize_id, sanitize_txid};
use crate::models::Trade;
use crate::wallet::{ReceiptStatus, WalletProvider};

pub struct SettlementMonitor {
    db: DbPool,
    wallet: Arc<dyn WalletProvider>,
    config: SettlementConfig,
}

impl SettlementMonitor {
    pub fn new(db: DbPool, wallet: Arc<dyn WalletProvider>, config: SettlementConfig) -> Self {
        info!(
            "SettlementMonitor initialized with poll_interval={}s, confirm_timeout={}s",
            config.poll_interval_secs, config.confirm_timeout_secs
        );
        Self { db, wallet, config }
    }

    /// Poll loop; runs until the server shuts down.
    pub async fn start(self: Arc<Self>) {
        let mut poll_timer = interval(self.config.poll_interval());

        info!("Starting settlement monitoring loop");

        loop {
            poll_timer.tick().await;

            if let Err(e) = self.check_submitted_trades().await {
                error!("Error checking submitted trades: {:#}", e);
            }
        }
    }

    /// One reconciliation pass over every trade awaiting settlement.
    pub async fn check_submitted_trades(&self) -> Result<()> {
        let db = self.db.clone();
        let pending = tokio::task::spawn_blocking(move || {
            let mut conn = db.get().context("Failed to get DB connection")?;
            Trade::find_awaiting_settlement(&mut conn)
        })
        .await
        .context("Task join error")??;

        if pending.is_empty() {
            return Ok(());
        }

        info!("Checking {} trades awaiting settlement", pending.len());

        for trade in pending {
            if let Err(e) = self.check_trade(&trade).await {
                error!(
                    "Settlement check failed for trade {}: {:#}",
                    sanitize_id(&trade.id),
                    e
                );
            }
        }

        Ok(())
    }

    async fn check_trade(&self, trade: &Trade) -> Result<()> {
        let tx_hash = match trade.tx_hash.as_deref() {
            Some(hash) => hash,
            None => {
                // Submitted overlay without a hash means the confirmation
                // write was corrupted; flag it rather than poll forever.
                warn!(
                    "Trade {} marked submitted but has no tx hash; flagging failed",
                    sanitize_id(&trade.id)
                );
                return self
                    .set_settlement_state(&trade.id, SettlementState::Failed)
                    .await;
            }
        };

        match self.wallet.transaction_receipt(tx_hash).await {
            Ok(Some(ReceiptStatus::Succeeded)) => {
                info!(
                    "Settlement confirmed: trade={}, tx={}",
                    sanitize_id(&trade.id),
                    sanitize_txid(tx_hash)
                );
                self.set_settlement_state(&trade.id, SettlementState::Confirmed)
                    .await
            }
            Ok(Some(ReceiptStatus::Reverted)) => {
                error!(
                    "Settlement transaction reverted: trade={}, tx={}",
                    sanitize_id(&trade.id),
                    sanitize_txid(tx_hash)
                );
                self.set_settlement_state(&trade.id, SettlementState::Failed)
                    .await
            }
            Ok(None) => {
                if self.past_deadline(trade) {
                    warn!(
                        "Settlement unconfirmed past deadline: trade={}, tx={}",
                        sanitize_id(&trade.id),
                        sanitize_txid(tx_hash)
                    );
                    self.set_settlement_state(&trade.id, SettlementState::Failed)
                        .await
                } else {
                    Ok(())
                }
            }
            // RPC trouble: leave the overlay alone and retry next tick.
            Err(e) => {
                warn!(
                    "Receipt lookup failed for trade {}: {}",
                    sanitize_id(&trade.id),
                    e
                );
                Ok(())
            }
        }
    }

    fn past_deadline(&self, trade: &Trade) -> bool {
        let age = chrono::Utc::now()
            .naive_utc()
            .signed_duration_since(trade.updated_at);
        age.num_seconds() > self.config.confirm_timeout_secs
    }

    async fn set_settlement_state(&self, trade_id: &str, state: SettlementState) -> Result<()> {
        let db = self.db.clone();
        let trade_id = trade_id.to_string();
        tokio::task::spawn_blocking(move || {
            let mut conn = db.get().context("Failed to get DB connection")?;
            Trade::update_settlement_state(&mut conn, &trade_id, state)
        })
        .await
        .context("Task join error")?
    }
}

//! Trade coordination service.
//!
//! The authority on which transitions are legal, who may trigger them, and
//! what each one writes and submits. Every trigger enters as a validated
//! [`TradeCommand`]; authorization and reachability are enforced here,
//! server-side, before any persisted write, never assumed from UI state.
//!
//! Ordering within one chain-backed transition: validate, resolve the
//! contract trade id, encode, submit via the wallet provider, and only on a
//! returned transaction hash write the confirmation records. A rejected or
//! failed submission leaves persisted state untouched.

use std::sync::Arc;

use anyhow::anyhow;
use diesel::prelude::*;
use tracing::{info, warn};
use uuid::Uuid;

use kas_marketplace_common::{
    addresses_equal, CommandKind, Error, Result, SettlementState, TradeCommand, TradeStatus,
};

use crate::config::ContractConfig;
use crate::contract::{self, EscrowFunction};
use crate::db::DbPool;
use crate::logging::sanitize::{sanitize_address, sanitize_id, sanitize_txid};
use crate::models::{Listing, NewTrade, Trade};
use crate::services::reconcile::{self, TradeContext};
use crate::wallet::WalletProvider;

/// Result of a successfully executed command: the fresh post-transition
/// records, plus the transaction hash when the transition submitted a call.
#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub trade: Trade,
    pub listing: Listing,
    pub tx_hash: Option<String>,
}

/// Drives trades through the lifecycle state machine.
pub struct TradeCoordinator {
    db: DbPool,
    wallet: Arc<dyn WalletProvider>,
    contract: ContractConfig,
}

impl TradeCoordinator {
    pub fn new(db: DbPool, wallet: Arc<dyn WalletProvider>, contract: ContractConfig) -> Self {
        Self {
            db,
            wallet,
            contract,
        }
    }

    /// Execute one validated command on behalf of `actor`.
    pub async fn execute(&self, actor: &str, command: TradeCommand) -> Result<TradeOutcome> {
        match command {
            TradeCommand::Accept { listing_id } => self.accept(actor, &listing_id).await,
            TradeCommand::ConfirmSent { trade_id } => self.confirm_sent(actor, &trade_id).await,
            TradeCommand::ConfirmReceived { trade_id } => {
                self.confirm_received(actor, &trade_id).await
            }
            TradeCommand::Cancel { trade_id } => self.cancel(actor, &trade_id).await,
            TradeCommand::Dispute { trade_id } => self.dispute(actor, &trade_id).await,
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// open → in_progress. Any non-seller may accept; the storage-layer
    /// compare-and-set decides the winner when two accepts race.
    async fn accept(&self, actor: &str, listing_id: &str) -> Result<TradeOutcome> {
        let actor = actor.to_string();
        let listing_id = listing_id.to_string();

        info!(
            "Accept requested: listing={}, buyer={}",
            sanitize_id(&listing_id),
            sanitize_address(&actor)
        );

        let outcome = self
            .with_conn(move |conn| {
                let listing = Listing::find_by_id(conn, &listing_id)
                    .map_err(db_err)?
                    .ok_or_else(|| Error::NotFound(format!("Listing {}", listing_id)))?;
                let status = TradeStatus::parse(&listing.status)?;

                if addresses_equal(&actor, &listing.seller_address) {
                    return Err(Error::UnauthorizedTransition {
                        actor,
                        command: CommandKind::Accept,
                    });
                }
                ensure_transition(status, CommandKind::Accept)?;

                let trade = conn
                    .transaction::<Trade, anyhow::Error, _>(|conn| {
                        let won = Listing::try_accept(conn, &listing_id, &actor)?;
                        if !won {
                            // Someone else won the compare-and-set between our
                            // read and this write; surface the race loss.
                            let from = Listing::find_by_id(conn, &listing_id)?
                                .map(|l| TradeStatus::parse(&l.status))
                                .transpose()
                                .map_err(anyhow::Error::from)?
                                .unwrap_or(TradeStatus::InProgress);
                            return Err(anyhow!(Error::InvalidStateTransition {
                                from,
                                command: CommandKind::Accept,
                            }));
                        }

                        let now = chrono::Utc::now().naive_utc();
                        let trade = Trade::create(
                            conn,
                            NewTrade {
                                id: Uuid::new_v4().to_string(),
                                listing_id: listing_id.clone(),
                                seller_address: listing.seller_address.clone(),
                                buyer_address: actor.clone(),
                                kas_amount: listing.kas_amount,
                                fiat_amount: listing.fiat_amount,
                                status: TradeStatus::InProgress.as_str().to_string(),
                                buyer_confirmed: false,
                                seller_confirmed: false,
                                contract_trade_id: listing.contract_trade_id,
                                settlement_state: SettlementState::NotSubmitted.as_str().to_string(),
                                created_at: now,
                                updated_at: now,
                            },
                        )?;
                        Ok(trade)
                    })
                    .map_err(domain_or_db)?;

                let context = TradeContext::load(conn, &trade.id)?;
                Ok(TradeOutcome {
                    trade: context.trade,
                    listing: context.listing,
                    tx_hash: None,
                })
            })
            .await?;

        info!(
            "Listing accepted: listing={}, trade={}",
            sanitize_id(&outcome.listing.id),
            sanitize_id(&outcome.trade.id)
        );
        Ok(outcome)
    }

    /// in_progress → payment_sent. Buyer only; off-chain write, no contract
    /// call.
    async fn confirm_sent(&self, actor: &str, trade_id: &str) -> Result<TradeOutcome> {
        let actor = actor.to_string();
        let trade_id = trade_id.to_string();

        let outcome = self
            .with_conn(move |conn| {
                let context = TradeContext::load(conn, &trade_id)?;

                if !addresses_equal(&actor, &context.trade.buyer_address) {
                    return Err(Error::UnauthorizedTransition {
                        actor,
                        command: CommandKind::ConfirmSent,
                    });
                }
                ensure_transition(context.trade_status, CommandKind::ConfirmSent)?;

                Trade::mark_payment_sent(conn, &trade_id).map_err(db_err)?;

                let context = TradeContext::load(conn, &trade_id)?;
                Ok(TradeOutcome {
                    trade: context.trade,
                    listing: context.listing,
                    tx_hash: None,
                })
            })
            .await?;

        info!(
            "Payment marked sent: trade={}",
            sanitize_id(&outcome.trade.id)
        );
        Ok(outcome)
    }

    /// payment_sent → completed. Seller only; submits the release call and
    /// records completion on both rows once a hash comes back.
    async fn confirm_received(&self, actor: &str, trade_id: &str) -> Result<TradeOutcome> {
        let context = self.load_context(trade_id).await?;

        if !addresses_equal(actor, &context.listing.seller_address) {
            return Err(Error::UnauthorizedTransition {
                actor: actor.to_string(),
                command: CommandKind::ConfirmReceived,
            });
        }
        ensure_transition(context.trade_status, CommandKind::ConfirmReceived)?;

        let tx_hash = self
            .submit_escrow_call(actor, &context, EscrowFunction::ConfirmPaymentReceived)
            .await?;

        let outcome = self
            .record_settlement_outcome(
                &context.trade.id,
                TradeStatus::Completed,
                Some(true),
                Some(TradeStatus::Completed),
                tx_hash,
            )
            .await?;

        info!(
            "Trade completed: trade={}, tx={}",
            sanitize_id(&outcome.trade.id),
            sanitize_txid(outcome.tx_hash.as_deref().unwrap_or_default())
        );
        Ok(outcome)
    }

    /// in_progress | payment_sent → cancelled. Either party; submits the
    /// refund-to-seller call.
    async fn cancel(&self, actor: &str, trade_id: &str) -> Result<TradeOutcome> {
        let context = self.load_context(trade_id).await?;

        self.ensure_participant(actor, &context, CommandKind::Cancel)?;
        ensure_transition(context.trade_status, CommandKind::Cancel)?;

        let tx_hash = self
            .submit_escrow_call(actor, &context, EscrowFunction::CancelTrade)
            .await?;

        let outcome = self
            .record_settlement_outcome(
                &context.trade.id,
                TradeStatus::Cancelled,
                None,
                Some(TradeStatus::Cancelled),
                tx_hash,
            )
            .await?;

        info!(
            "Trade cancelled: trade={}, by={}",
            sanitize_id(&outcome.trade.id),
            sanitize_address(actor)
        );
        Ok(outcome)
    }

    /// in_progress | payment_sent → disputed. Either party; submits the
    /// dispute flag. The listing is untouched; arbitration is external.
    async fn dispute(&self, actor: &str, trade_id: &str) -> Result<TradeOutcome> {
        let context = self.load_context(trade_id).await?;

        self.ensure_participant(actor, &context, CommandKind::Dispute)?;
        ensure_transition(context.trade_status, CommandKind::Dispute)?;

        let tx_hash = self
            .submit_escrow_call(actor, &context, EscrowFunction::RaiseDispute)
            .await?;

        let outcome = self
            .record_settlement_outcome(
                &context.trade.id,
                TradeStatus::Disputed,
                None,
                None,
                tx_hash,
            )
            .await?;

        warn!(
            "Trade disputed: trade={}, by={}",
            sanitize_id(&outcome.trade.id),
            sanitize_address(actor)
        );
        Ok(outcome)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Fresh authoritative read of trade + listing before any validation;
    /// client-held state is never trusted for a financial transition.
    async fn load_context(&self, trade_id: &str) -> Result<TradeContext> {
        let trade_id = trade_id.to_string();
        self.with_conn(move |conn| TradeContext::load(conn, &trade_id))
            .await
    }

    fn ensure_participant(
        &self,
        actor: &str,
        context: &TradeContext,
        command: CommandKind,
    ) -> Result<()> {
        let is_buyer = addresses_equal(actor, &context.trade.buyer_address);
        let is_seller = addresses_equal(actor, &context.listing.seller_address);
        if !is_buyer && !is_seller {
            return Err(Error::UnauthorizedTransition {
                actor: actor.to_string(),
                command,
            });
        }
        Ok(())
    }

    /// Encode and hand one escrow call to the signer. Pure failure here
    /// (user rejection, RPC error) changes no persisted state.
    async fn submit_escrow_call(
        &self,
        actor: &str,
        context: &TradeContext,
        function: EscrowFunction,
    ) -> Result<String> {
        let contract_trade_id =
            reconcile::resolve_contract_trade_id(&context.listing, &context.trade)?;
        let data = contract::encode_call(function, contract_trade_id);
        let target = contract::resolve_target(
            context.listing.contract_address.as_deref(),
            &self.contract.fallback_address,
        )
        .to_string();

        info!(
            "Submitting {:?} for trade={} to contract={}",
            function,
            sanitize_id(&context.trade.id),
            sanitize_address(&target)
        );

        let tx_hash = self.wallet.submit_transaction(actor, &target, &data).await?;

        info!(
            "Submission accepted: trade={}, tx={}",
            sanitize_id(&context.trade.id),
            sanitize_txid(&tx_hash)
        );
        Ok(tx_hash)
    }

    /// Confirmation write after a successful submission: trade status, flag,
    /// hash and settlement overlay in one transaction, plus the listing
    /// status when the transition defines one.
    async fn record_settlement_outcome(
        &self,
        trade_id: &str,
        trade_status: TradeStatus,
        seller_confirmed: Option<bool>,
        listing_status: Option<TradeStatus>,
        tx_hash: String,
    ) -> Result<TradeOutcome> {
        let trade_id = trade_id.to_string();
        self.with_conn(move |conn| {
            conn.transaction::<(), anyhow::Error, _>(|conn| {
                Trade::record_submission(
                    conn,
                    &trade_id,
                    trade_status,
                    seller_confirmed,
                    &tx_hash,
                )?;
                if let Some(listing_status) = listing_status {
                    let trade = Trade::find_by_id(conn, &trade_id)?
                        .ok_or_else(|| anyhow!("trade {} vanished mid-update", trade_id))?;
                    Listing::update_status(conn, &trade.listing_id, listing_status)?;
                }
                Ok(())
            })
            .map_err(domain_or_db)?;

            let context = TradeContext::load(conn, &trade_id)?;
            Ok(TradeOutcome {
                tx_hash: context.trade.tx_hash.clone(),
                trade: context.trade,
                listing: context.listing,
            })
        })
        .await
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T> + Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .get()
                .map_err(|e| Error::Database(format!("DB connection failed: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| Error::Internal(format!("database task panicked: {}", e)))?
    }
}

/// Reachability check shared by every transition.
fn ensure_transition(from: TradeStatus, command: CommandKind) -> Result<()> {
    if !from.permits(command) {
        return Err(Error::InvalidStateTransition { from, command });
    }
    Ok(())
}

fn db_err(e: anyhow::Error) -> Error {
    Error::Database(format!("{:#}", e))
}

/// Errors raised inside a diesel transaction travel out as anyhow; domain
/// errors pass through, everything else is a database failure.
fn domain_or_db(e: anyhow::Error) -> Error {
    match e.downcast::<Error>() {
        Ok(domain) => domain,
        Err(other) => Error::Database(format!("{:#}", other)),
    }
}

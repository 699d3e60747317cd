//! Trade lifecycle integration tests.
//!
//! Exercises the coordinator end to end against an in-memory record store
//! and a mock wallet provider that records every submitted call. Covers the
//! full transition graph, authorization, the accept race, the missing
//! contract-trade-id fault, and settlement reconciliation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;

use kas_marketplace_common::{
    Error, Result, SettlementState, TradeCommand, TradeStatus,
};
use server::config::{ContractConfig, SettlementConfig, DEFAULT_ESCROW_CONTRACT};
use server::contract::{encode_call, EscrowFunction};
use server::db::{self, DbPool};
use server::models::{Listing, NewListing, NewTradeMessage, Trade, TradeMessage};
use server::services::{ConsistencyManager, SettlementMonitor, TradeCoordinator};
use server::wallet::{ReceiptStatus, WalletProvider};

// ============================================================================
// MOCK INFRASTRUCTURE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
struct SubmittedCall {
    from: String,
    to: String,
    data: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
enum SubmitMode {
    Succeed,
    RejectUser,
    FailRpc,
}

/// Wallet provider that records submissions and returns scripted outcomes.
struct MockWallet {
    submitted: Mutex<Vec<SubmittedCall>>,
    mode: Mutex<SubmitMode>,
    receipts: Mutex<HashMap<String, ReceiptStatus>>,
    counter: AtomicUsize,
}

impl MockWallet {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            submitted: Mutex::new(Vec::new()),
            mode: Mutex::new(SubmitMode::Succeed),
            receipts: Mutex::new(HashMap::new()),
            counter: AtomicUsize::new(0),
        })
    }

    fn set_mode(&self, mode: SubmitMode) {
        *self.mode.lock().unwrap() = mode;
    }

    fn set_receipt(&self, tx_hash: &str, status: ReceiptStatus) {
        self.receipts
            .lock()
            .unwrap()
            .insert(tx_hash.to_string(), status);
    }

    fn calls(&self) -> Vec<SubmittedCall> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request_account(&self) -> Result<String> {
        Ok("0xmockaccount0000000000000000000000000001".to_string())
    }

    async fn submit_transaction(&self, from: &str, to: &str, data: &[u8]) -> Result<String> {
        let mode = *self.mode.lock().unwrap();
        match mode {
            SubmitMode::RejectUser => Err(Error::UserRejection),
            SubmitMode::FailRpc => Err(Error::ContractCallFailure("rpc unavailable".into())),
            SubmitMode::Succeed => {
                self.submitted.lock().unwrap().push(SubmittedCall {
                    from: from.to_string(),
                    to: to.to_string(),
                    data: data.to_vec(),
                });
                let n = self.counter.fetch_add(1, Ordering::SeqCst);
                Ok(format!("0xmocktx{:057x}", n))
            }
        }
    }

    async fn transaction_receipt(&self, tx_hash: &str) -> Result<Option<ReceiptStatus>> {
        Ok(self.receipts.lock().unwrap().get(tx_hash).copied())
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

const SELLER: &str = "0xSeller0000000000000000000000000000000001";
const BUYER: &str = "0xBuyer00000000000000000000000000000000002";
const BUYER_2: &str = "0xBuyer00000000000000000000000000000000003";
const STRANGER: &str = "0xStranger000000000000000000000000000000ff";

struct Harness {
    pool: DbPool,
    wallet: Arc<MockWallet>,
    coordinator: TradeCoordinator,
}

impl Harness {
    fn new() -> Self {
        // Single-connection pool so every checkout sees the same :memory: db.
        let pool = db::create_pool_sized(":memory:", 1).unwrap();
        db::init_schema(&pool).unwrap();

        let wallet = MockWallet::new();
        let coordinator = TradeCoordinator::new(
            pool.clone(),
            wallet.clone(),
            ContractConfig {
                fallback_address: DEFAULT_ESCROW_CONTRACT.to_string(),
                rpc_endpoint: "http://127.0.0.1:0".to_string(),
            },
        );

        Self {
            pool,
            wallet,
            coordinator,
        }
    }

    fn seed_listing(&self, id: &str, contract_trade_id: Option<i64>) {
        let mut conn = self.pool.get().unwrap();
        let now = chrono::Utc::now().naive_utc();
        Listing::create(
            &mut conn,
            NewListing {
                id: id.to_string(),
                seller_address: SELLER.to_string(),
                kas_amount: 100,
                fiat_amount: 50,
                status: TradeStatus::Open.as_str().to_string(),
                contract_address: None,
                contract_trade_id,
                location: Some("Berlin Hauptbahnhof".to_string()),
                meeting_notes: Some("Blue jacket, platform 4".to_string()),
                created_at: now,
                updated_at: now,
            },
        )
        .unwrap();
    }

    fn listing(&self, id: &str) -> Listing {
        let mut conn = self.pool.get().unwrap();
        Listing::find_by_id(&mut conn, id).unwrap().unwrap()
    }

    fn trade(&self, id: &str) -> Trade {
        let mut conn = self.pool.get().unwrap();
        Trade::find_by_id(&mut conn, id).unwrap().unwrap()
    }

    async fn accept(&self, actor: &str, listing_id: &str) -> Result<Trade> {
        self.coordinator
            .execute(
                actor,
                TradeCommand::Accept {
                    listing_id: listing_id.to_string(),
                },
            )
            .await
            .map(|outcome| outcome.trade)
    }

    /// Drive a fresh listing all the way to payment_sent.
    async fn to_payment_sent(&self, listing_id: &str) -> Trade {
        self.seed_listing(listing_id, Some(42));
        let trade = self.accept(BUYER, listing_id).await.unwrap();
        self.coordinator
            .execute(
                BUYER,
                TradeCommand::ConfirmSent {
                    trade_id: trade.id.clone(),
                },
            )
            .await
            .unwrap();
        self.trade(&trade.id)
    }
}

// ============================================================================
// SCENARIO A: ACCEPT
// ============================================================================

#[tokio::test]
async fn test_accept_creates_trade_and_flips_listing() {
    let h = Harness::new();
    h.seed_listing("l1", Some(42));

    let trade = h.accept(BUYER, "l1").await.unwrap();

    assert_eq!(trade.buyer_address, BUYER);
    assert_eq!(trade.seller_address, SELLER);
    assert_eq!(trade.status, TradeStatus::InProgress.as_str());
    assert_eq!(trade.kas_amount, 100);
    assert_eq!(trade.fiat_amount, 50);
    assert!(!trade.buyer_confirmed);
    assert!(!trade.seller_confirmed);

    let listing = h.listing("l1");
    assert_eq!(listing.status, TradeStatus::InProgress.as_str());
    assert_eq!(listing.buyer_address.as_deref(), Some(BUYER));

    // Accept is off-chain only; nothing reached the wallet.
    assert!(h.wallet.calls().is_empty());
}

#[tokio::test]
async fn test_amount_invariant_holds_at_creation() {
    let h = Harness::new();
    h.seed_listing("l1", Some(42));

    let trade = h.accept(BUYER, "l1").await.unwrap();
    let listing = h.listing("l1");
    assert_eq!(trade.kas_amount, listing.kas_amount);
}

#[tokio::test]
async fn test_seller_cannot_accept_own_listing() {
    let h = Harness::new();
    h.seed_listing("l1", Some(42));

    // Case-insensitive: the seller's address in different casing still fails.
    let err = h.accept(&SELLER.to_lowercase(), "l1").await.unwrap_err();
    assert!(matches!(err, Error::UnauthorizedTransition { .. }));

    let listing = h.listing("l1");
    assert_eq!(listing.status, TradeStatus::Open.as_str());
    assert!(listing.buyer_address.is_none());
}

// ============================================================================
// SCENARIO D: ACCEPT RACE
// ============================================================================

#[tokio::test]
async fn test_concurrent_accepts_create_exactly_one_trade() {
    let h = Harness::new();
    h.seed_listing("l1", Some(42));

    let (first, second) = tokio::join!(h.accept(BUYER, "l1"), h.accept(BUYER_2, "l1"));

    let outcomes = [first, second];
    let winners = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1, "exactly one accept may win");

    let loser = outcomes.iter().find(|r| r.is_err()).unwrap();
    assert!(matches!(
        loser.as_ref().unwrap_err(),
        Error::InvalidStateTransition { .. }
    ));

    {
        let mut conn = h.pool.get().unwrap();
        let trade = Trade::find_by_listing(&mut conn, "l1").unwrap();
        assert!(trade.is_some(), "winner's trade exists");
    }

    let listing = h.listing("l1");
    let winner_trade = outcomes.iter().flatten().next().unwrap();
    assert_eq!(
        listing.buyer_address.as_deref(),
        Some(winner_trade.buyer_address.as_str())
    );
}

#[tokio::test]
async fn test_accept_after_acceptance_is_rejected() {
    let h = Harness::new();
    h.seed_listing("l1", Some(42));
    h.accept(BUYER, "l1").await.unwrap();

    let err = h.accept(BUYER_2, "l1").await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidStateTransition {
            from: TradeStatus::InProgress,
            ..
        }
    ));
}

// ============================================================================
// CONFIRM-SENT
// ============================================================================

#[tokio::test]
async fn test_buyer_confirms_payment_sent() {
    let h = Harness::new();
    h.seed_listing("l1", Some(42));
    let trade = h.accept(BUYER, "l1").await.unwrap();

    let outcome = h
        .coordinator
        .execute(
            BUYER,
            TradeCommand::ConfirmSent {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.trade.status, TradeStatus::PaymentSent.as_str());
    assert!(outcome.trade.buyer_confirmed);
    assert!(outcome.tx_hash.is_none(), "confirm-sent is off-chain");
}

#[tokio::test]
async fn test_only_buyer_may_confirm_sent() {
    let h = Harness::new();
    h.seed_listing("l1", Some(42));
    let trade = h.accept(BUYER, "l1").await.unwrap();

    for actor in [SELLER, STRANGER] {
        let err = h
            .coordinator
            .execute(
                actor,
                TradeCommand::ConfirmSent {
                    trade_id: trade.id.clone(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnauthorizedTransition { .. }));
    }

    let trade = h.trade(&trade.id);
    assert_eq!(trade.status, TradeStatus::InProgress.as_str());
    assert!(!trade.buyer_confirmed);
}

// ============================================================================
// CONFIRM-RECEIVED (RELEASE)
// ============================================================================

#[tokio::test]
async fn test_seller_confirm_received_completes_trade() {
    let h = Harness::new();
    let trade = h.to_payment_sent("l1").await;

    let outcome = h
        .coordinator
        .execute(
            SELLER,
            TradeCommand::ConfirmReceived {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.trade.status, TradeStatus::Completed.as_str());
    assert!(outcome.trade.seller_confirmed);
    assert!(outcome.tx_hash.is_some());
    assert_eq!(outcome.listing.status, TradeStatus::Completed.as_str());
    assert_eq!(
        outcome.trade.settlement_state,
        SettlementState::Submitted.as_str()
    );

    // Exactly one release call with the expected payload, to the fallback
    // deployment since the listing carries no contract address.
    let calls = h.wallet.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].from, SELLER);
    assert_eq!(calls[0].to, DEFAULT_ESCROW_CONTRACT);
    assert_eq!(
        calls[0].data,
        encode_call(EscrowFunction::ConfirmPaymentReceived, 42).to_vec()
    );
}

#[tokio::test]
async fn test_only_seller_may_confirm_received() {
    let h = Harness::new();
    let trade = h.to_payment_sent("l1").await;

    for actor in [BUYER, STRANGER] {
        let err = h
            .coordinator
            .execute(
                actor,
                TradeCommand::ConfirmReceived {
                    trade_id: trade.id.clone(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnauthorizedTransition { .. }));
    }
    assert!(h.wallet.calls().is_empty(), "no call may reach the signer");
}

#[tokio::test]
async fn test_confirm_received_requires_payment_sent() {
    let h = Harness::new();
    h.seed_listing("l1", Some(42));
    let trade = h.accept(BUYER, "l1").await.unwrap();

    let err = h
        .coordinator
        .execute(
            SELLER,
            TradeCommand::ConfirmReceived {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidStateTransition {
            from: TradeStatus::InProgress,
            ..
        }
    ));
}

// ============================================================================
// SCENARIO C: MISSING CONTRACT TRADE ID
// ============================================================================

#[tokio::test]
async fn test_missing_contract_trade_id_is_fatal_and_writes_nothing() {
    let h = Harness::new();
    h.seed_listing("l1", None);
    let trade = h.accept(BUYER, "l1").await.unwrap();
    h.coordinator
        .execute(
            BUYER,
            TradeCommand::ConfirmSent {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap();

    let before_trade = h.trade(&trade.id);
    let before_listing = h.listing("l1");

    let err = h
        .coordinator
        .execute(
            SELLER,
            TradeCommand::ConfirmReceived {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingContractTradeId));

    // No field on either record changed and nothing reached the signer.
    let after_trade = h.trade(&trade.id);
    let after_listing = h.listing("l1");
    assert_eq!(after_trade.status, before_trade.status);
    assert_eq!(after_trade.tx_hash, before_trade.tx_hash);
    assert_eq!(after_trade.seller_confirmed, before_trade.seller_confirmed);
    assert_eq!(after_trade.settlement_state, before_trade.settlement_state);
    assert_eq!(after_listing.status, before_listing.status);
    assert!(h.wallet.calls().is_empty());
}

// ============================================================================
// SCENARIO B: CANCEL
// ============================================================================

#[tokio::test]
async fn test_seller_cancels_from_payment_sent() {
    let h = Harness::new();
    let trade = h.to_payment_sent("l1").await;
    assert!(trade.buyer_confirmed);

    let outcome = h
        .coordinator
        .execute(
            SELLER,
            TradeCommand::Cancel {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.trade.status, TradeStatus::Cancelled.as_str());
    assert_eq!(outcome.listing.status, TradeStatus::Cancelled.as_str());
    assert!(outcome.tx_hash.is_some());

    let calls = h.wallet.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].data,
        encode_call(EscrowFunction::CancelTrade, 42).to_vec()
    );
}

#[tokio::test]
async fn test_buyer_cancels_from_in_progress() {
    let h = Harness::new();
    h.seed_listing("l1", Some(42));
    let trade = h.accept(BUYER, "l1").await.unwrap();

    let outcome = h
        .coordinator
        .execute(
            BUYER,
            TradeCommand::Cancel {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.trade.status, TradeStatus::Cancelled.as_str());
}

#[tokio::test]
async fn test_stranger_cannot_cancel() {
    let h = Harness::new();
    let trade = h.to_payment_sent("l1").await;

    let err = h
        .coordinator
        .execute(
            STRANGER,
            TradeCommand::Cancel {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnauthorizedTransition { .. }));
    assert!(h.wallet.calls().is_empty());
}

// ============================================================================
// DISPUTE
// ============================================================================

#[tokio::test]
async fn test_dispute_flags_trade_but_not_listing() {
    let h = Harness::new();
    let trade = h.to_payment_sent("l1").await;

    let outcome = h
        .coordinator
        .execute(
            BUYER,
            TradeCommand::Dispute {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.trade.status, TradeStatus::Disputed.as_str());
    // Arbitration is external; the listing stays where it was.
    assert_eq!(outcome.listing.status, TradeStatus::InProgress.as_str());

    let calls = h.wallet.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].data,
        encode_call(EscrowFunction::RaiseDispute, 42).to_vec()
    );
}

// ============================================================================
// TERMINAL STATES & IDEMPOTENCE
// ============================================================================

#[tokio::test]
async fn test_completed_trade_rejects_every_command() {
    let h = Harness::new();
    let trade = h.to_payment_sent("l1").await;
    h.coordinator
        .execute(
            SELLER,
            TradeCommand::ConfirmReceived {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap();
    assert_eq!(h.wallet.calls().len(), 1);

    let commands = [
        TradeCommand::ConfirmSent {
            trade_id: trade.id.clone(),
        },
        TradeCommand::ConfirmReceived {
            trade_id: trade.id.clone(),
        },
        TradeCommand::Cancel {
            trade_id: trade.id.clone(),
        },
        TradeCommand::Dispute {
            trade_id: trade.id.clone(),
        },
    ];
    for command in commands {
        let actor = match command {
            TradeCommand::ConfirmSent { .. } => BUYER,
            _ => SELLER,
        };
        let err = h.coordinator.execute(actor, command).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidStateTransition {
                from: TradeStatus::Completed,
                ..
            }
        ));
    }

    // Funds are never released twice: still exactly one submitted call.
    assert_eq!(h.wallet.calls().len(), 1);
}

#[tokio::test]
async fn test_cancelled_trade_is_immutable() {
    let h = Harness::new();
    let trade = h.to_payment_sent("l1").await;
    h.coordinator
        .execute(
            BUYER,
            TradeCommand::Cancel {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap();

    let err = h
        .coordinator
        .execute(
            SELLER,
            TradeCommand::ConfirmReceived {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidStateTransition {
            from: TradeStatus::Cancelled,
            ..
        }
    ));
}

// ============================================================================
// SUBMISSION FAILURES LEAVE STATE UNTOUCHED
// ============================================================================

#[tokio::test]
async fn test_user_rejection_changes_nothing() {
    let h = Harness::new();
    let trade = h.to_payment_sent("l1").await;
    h.wallet.set_mode(SubmitMode::RejectUser);

    let err = h
        .coordinator
        .execute(
            SELLER,
            TradeCommand::ConfirmReceived {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UserRejection));
    assert!(err.is_recoverable());

    let after = h.trade(&trade.id);
    assert_eq!(after.status, TradeStatus::PaymentSent.as_str());
    assert!(after.tx_hash.is_none());
    assert_eq!(
        after.settlement_state,
        SettlementState::NotSubmitted.as_str()
    );

    // The actor may retry manually once the signer cooperates.
    h.wallet.set_mode(SubmitMode::Succeed);
    let outcome = h
        .coordinator
        .execute(
            SELLER,
            TradeCommand::ConfirmReceived {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.trade.status, TradeStatus::Completed.as_str());
}

#[tokio::test]
async fn test_rpc_failure_changes_nothing() {
    let h = Harness::new();
    let trade = h.to_payment_sent("l1").await;
    h.wallet.set_mode(SubmitMode::FailRpc);

    let err = h
        .coordinator
        .execute(
            BUYER,
            TradeCommand::Cancel {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ContractCallFailure(_)));

    let after = h.trade(&trade.id);
    assert_eq!(after.status, TradeStatus::PaymentSent.as_str());
    assert_eq!(h.listing("l1").status, TradeStatus::InProgress.as_str());
}

// ============================================================================
// SETTLEMENT RECONCILIATION
// ============================================================================

#[tokio::test]
async fn test_monitor_confirms_mined_submission() {
    let h = Harness::new();
    let trade = h.to_payment_sent("l1").await;
    let outcome = h
        .coordinator
        .execute(
            SELLER,
            TradeCommand::ConfirmReceived {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap();
    let tx_hash = outcome.tx_hash.unwrap();

    h.wallet.set_receipt(&tx_hash, ReceiptStatus::Succeeded);

    let monitor = SettlementMonitor::new(
        h.pool.clone(),
        h.wallet.clone(),
        SettlementConfig::default(),
    );
    monitor.check_submitted_trades().await.unwrap();

    let after = h.trade(&trade.id);
    assert_eq!(after.settlement_state, SettlementState::Confirmed.as_str());
    // The lifecycle status is untouched by the monitor.
    assert_eq!(after.status, TradeStatus::Completed.as_str());
}

#[tokio::test]
async fn test_monitor_flags_reverted_submission() {
    let h = Harness::new();
    let trade = h.to_payment_sent("l1").await;
    let outcome = h
        .coordinator
        .execute(
            BUYER,
            TradeCommand::Cancel {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap();
    h.wallet
        .set_receipt(&outcome.tx_hash.unwrap(), ReceiptStatus::Reverted);

    let monitor = SettlementMonitor::new(
        h.pool.clone(),
        h.wallet.clone(),
        SettlementConfig::default(),
    );
    monitor.check_submitted_trades().await.unwrap();

    let after = h.trade(&trade.id);
    assert_eq!(after.settlement_state, SettlementState::Failed.as_str());
}

#[tokio::test]
async fn test_monitor_leaves_pending_submission_before_deadline() {
    let h = Harness::new();
    let trade = h.to_payment_sent("l1").await;
    h.coordinator
        .execute(
            SELLER,
            TradeCommand::ConfirmReceived {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap();
    // No receipt scripted: the transaction is still in the mempool.

    let monitor = SettlementMonitor::new(
        h.pool.clone(),
        h.wallet.clone(),
        SettlementConfig::default(),
    );
    monitor.check_submitted_trades().await.unwrap();

    let after = h.trade(&trade.id);
    assert_eq!(after.settlement_state, SettlementState::Submitted.as_str());
}

#[tokio::test]
async fn test_reconciliation_read_reports_pending_settlement() {
    let h = Harness::new();
    let trade = h.to_payment_sent("l1").await;
    h.coordinator
        .execute(
            SELLER,
            TradeCommand::ConfirmReceived {
                trade_id: trade.id.clone(),
            },
        )
        .await
        .unwrap();

    let consistency = ConsistencyManager::new(h.pool.clone());
    let context = consistency.trade_context(&trade.id).await.unwrap();
    assert!(context.settlement_pending());
    assert_eq!(context.trade_status, TradeStatus::Completed);
}

// ============================================================================
// MESSAGING CHANNEL
// ============================================================================

#[tokio::test]
async fn test_messages_append_and_order() {
    let h = Harness::new();
    h.seed_listing("l1", Some(42));
    let trade = h.accept(BUYER, "l1").await.unwrap();

    let mut conn = h.pool.get().unwrap();
    let base = chrono::Utc::now().naive_utc();
    for (i, (sender, text)) in [
        (BUYER, "Meet at 3pm?"),
        (SELLER, "Works for me"),
        (BUYER, "On my way"),
    ]
    .iter()
    .enumerate()
    {
        TradeMessage::create(
            &mut conn,
            NewTradeMessage {
                id: format!("m{}", i),
                trade_id: trade.id.clone(),
                sender_address: sender.to_string(),
                message: text.to_string(),
                created_at: base + Duration::seconds(i as i64),
            },
        )
        .unwrap();
    }

    // Conversation rendering: chronological.
    let conversation = TradeMessage::find_by_trade(&mut conn, &trade.id).unwrap();
    assert_eq!(conversation.len(), 3);
    assert_eq!(conversation[0].message, "Meet at 3pm?");
    assert_eq!(conversation[2].message, "On my way");

    // Summaries: newest first, limited.
    let recent = TradeMessage::find_recent(&mut conn, &trade.id, 2).unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].message, "On my way");
    assert_eq!(recent[1].message, "Works for me");

    assert_eq!(TradeMessage::count_for_trade(&mut conn, &trade.id).unwrap(), 3);
}

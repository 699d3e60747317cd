//! Trade transition and reconciliation endpoints.
//!
//! # Endpoints
//! - POST /api/listings/{id}/accept          - accept an open listing
//! - GET  /api/listings/{id}                 - authoritative listing view
//! - POST /api/trades/{id}/confirm-sent      - buyer marks fiat sent
//! - POST /api/trades/{id}/confirm-received  - seller confirms, releases escrow
//! - POST /api/trades/{id}/cancel            - either party, refund to seller
//! - POST /api/trades/{id}/dispute           - either party, flag arbitration
//! - GET  /api/trades/{id}                   - authoritative trade view

use actix_session::Session;
use actix_web::{web, HttpResponse, Responder};
use serde::Serialize;

use kas_marketplace_common::TradeCommand;

use crate::models::{Listing, Trade};
use crate::services::{ConsistencyManager, TradeCoordinator, TradeOutcome};

use super::{error_response, get_wallet_from_session, ApiResponse};

#[derive(Debug, Serialize)]
pub struct TradeOutcomeResponse {
    pub trade: Trade,
    pub listing: Listing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl From<TradeOutcome> for TradeOutcomeResponse {
    fn from(outcome: TradeOutcome) -> Self {
        Self {
            trade: outcome.trade,
            listing: outcome.listing,
            tx_hash: outcome.tx_hash,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TradeViewResponse {
    pub trade: Trade,
    pub listing: Listing,
    /// True while the last on-chain submission is still unconfirmed.
    pub settlement_pending: bool,
}

#[derive(Debug, Serialize)]
pub struct ListingViewResponse {
    pub listing: Listing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade: Option<Trade>,
}

async fn run_command(
    session: Session,
    coordinator: &TradeCoordinator,
    command: TradeCommand,
) -> HttpResponse {
    let actor = match get_wallet_from_session(&session) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match coordinator.execute(&actor, command).await {
        Ok(outcome) => {
            HttpResponse::Ok().json(ApiResponse::success(TradeOutcomeResponse::from(outcome)))
        }
        Err(err) => error_response(&err),
    }
}

pub async fn accept_listing(
    session: Session,
    path: web::Path<String>,
    coordinator: web::Data<TradeCoordinator>,
) -> impl Responder {
    let listing_id = path.into_inner();
    run_command(session, coordinator.get_ref(), TradeCommand::Accept { listing_id }).await
}

pub async fn confirm_sent(
    session: Session,
    path: web::Path<String>,
    coordinator: web::Data<TradeCoordinator>,
) -> impl Responder {
    let trade_id = path.into_inner();
    run_command(session, coordinator.get_ref(), TradeCommand::ConfirmSent { trade_id }).await
}

pub async fn confirm_received(
    session: Session,
    path: web::Path<String>,
    coordinator: web::Data<TradeCoordinator>,
) -> impl Responder {
    let trade_id = path.into_inner();
    run_command(
        session,
        coordinator.get_ref(),
        TradeCommand::ConfirmReceived { trade_id },
    )
    .await
}

pub async fn cancel_trade(
    session: Session,
    path: web::Path<String>,
    coordinator: web::Data<TradeCoordinator>,
) -> impl Responder {
    let trade_id = path.into_inner();
    run_command(session, coordinator.get_ref(), TradeCommand::Cancel { trade_id }).await
}

pub async fn raise_dispute(
    session: Session,
    path: web::Path<String>,
    coordinator: web::Data<TradeCoordinator>,
) -> impl Responder {
    let trade_id = path.into_inner();
    run_command(session, coordinator.get_ref(), TradeCommand::Dispute { trade_id }).await
}

/// Reconciliation read: the client must call this on page load and render
/// from the result, never from cached state.
pub async fn get_trade(
    path: web::Path<String>,
    consistency: web::Data<ConsistencyManager>,
) -> impl Responder {
    match consistency.trade_context(&path.into_inner()).await {
        Ok(context) => HttpResponse::Ok().json(ApiResponse::success(TradeViewResponse {
            settlement_pending: context.settlement_pending(),
            trade: context.trade,
            listing: context.listing,
        })),
        Err(err) => error_response(&err),
    }
}

pub async fn get_listing(
    path: web::Path<String>,
    consistency: web::Data<ConsistencyManager>,
) -> impl Responder {
    match consistency.listing_view(&path.into_inner()).await {
        Ok((listing, trade)) => {
            HttpResponse::Ok().json(ApiResponse::success(ListingViewResponse { listing, trade }))
        }
        Err(err) => error_response(&err),
    }
}

pub fn configure_trade_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/listings/{id}", web::get().to(get_listing))
        .route("/api/listings/{id}/accept", web::post().to(accept_listing))
        .route("/api/trades/{id}", web::get().to(get_trade))
        .route("/api/trades/{id}/confirm-sent", web::post().to(confirm_sent))
        .route(
            "/api/trades/{id}/confirm-received",
            web::post().to(confirm_received),
        )
        .route("/api/trades/{id}/cancel", web::post().to(cancel_trade))
        .route("/api/trades/{id}/dispute", web::post().to(raise_dispute));
}

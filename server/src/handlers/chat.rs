//! Per-trade messaging endpoints.
//!
//! # Endpoints
//! - POST /api/trades/{id}/messages         - append a message
//! - GET  /api/trades/{id}/messages         - conversation, chronological
//! - GET  /api/trades/{id}/messages/recent  - summary, newest first

use actix_session::Session;
use actix_web::{web, HttpResponse, Responder};
use serde::Deserialize;
use tracing::error;

use crate::db::DbPool;
use crate::models::{NewTradeMessage, Trade, TradeMessage};

use super::{get_wallet_from_session, ApiResponse};

/// Maximum message length in characters.
const MAX_MESSAGE_LEN: usize = 2000;

/// Maximum messages per summary page.
const MAX_PAGE_SIZE: i64 = 50;

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<i64>,
}

pub async fn post_message(
    session: Session,
    path: web::Path<String>,
    body: web::Json<SendMessageRequest>,
    db: web::Data<DbPool>,
) -> impl Responder {
    let sender = match get_wallet_from_session(&session) {
        Ok(sender) => sender,
        Err(response) => return response,
    };

    let message = body.into_inner().message;
    if message.trim().is_empty() {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error("Message is empty"));
    }
    if message.chars().count() > MAX_MESSAGE_LEN {
        return HttpResponse::BadRequest().json(ApiResponse::<()>::error("Message too long"));
    }

    let trade_id = path.into_inner();
    let result = web::block(move || {
        let mut conn = db.get()?;
        let trade = Trade::find_by_id(&mut conn, &trade_id)?;
        if trade.is_none() {
            return Ok(None);
        }
        TradeMessage::create(&mut conn, NewTradeMessage::new(trade_id, sender, message)).map(Some)
    })
    .await;

    match result {
        Ok(Ok(Some(created))) => HttpResponse::Ok().json(ApiResponse::success(created)),
        Ok(Ok(None)) => {
            HttpResponse::NotFound().json(ApiResponse::<()>::error("Trade not found"))
        }
        Ok(Err(e)) => {
            error!("Failed to append trade message: {:#}", e);
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to store message"))
        }
        Err(e) => {
            error!("Blocking task failed: {}", e);
            HttpResponse::InternalServerError().json(ApiResponse::<()>::error("Internal error"))
        }
    }
}

pub async fn get_messages(path: web::Path<String>, db: web::Data<DbPool>) -> impl Responder {
    let trade_id = path.into_inner();
    let result = web::block(move || {
        let mut conn = db.get()?;
        TradeMessage::find_by_trade(&mut conn, &trade_id)
    })
    .await;

    respond_with_messages(result)
}

pub async fn get_recent_messages(
    path: web::Path<String>,
    query: web::Query<RecentQuery>,
    db: web::Data<DbPool>,
) -> impl Responder {
    let trade_id = path.into_inner();
    let limit = query.limit.unwrap_or(10).clamp(1, MAX_PAGE_SIZE);
    let result = web::block(move || {
        let mut conn = db.get()?;
        TradeMessage::find_recent(&mut conn, &trade_id, limit)
    })
    .await;

    respond_with_messages(result)
}

fn respond_with_messages(
    result: Result<anyhow::Result<Vec<TradeMessage>>, actix_web::error::BlockingError>,
) -> HttpResponse {
    match result {
        Ok(Ok(messages)) => HttpResponse::Ok().json(ApiResponse::success(messages)),
        Ok(Err(e)) => {
            error!("Failed to load trade messages: {:#}", e);
            HttpResponse::InternalServerError()
                .json(ApiResponse::<()>::error("Failed to load messages"))
        }
        Err(e) => {
            error!("Blocking task failed: {}", e);
            HttpResponse::InternalServerError().json(ApiResponse::<()>::error("Internal error"))
        }
    }
}

pub fn configure_chat_routes(cfg: &mut web::ServiceConfig) {
    cfg.route(
        "/api/trades/{trade_id}/messages",
        web::post().to(post_message),
    )
    .route("/api/trades/{trade_id}/messages", web::get().to(get_messages))
    .route(
        "/api/trades/{trade_id}/messages/recent",
        web::get().to(get_recent_messages),
    );
}

//! HTTP boundary.
//!
//! The handlers are the trusted edge: they establish the acting wallet
//! address from the server-side session and hand validated commands to the
//! coordinator. No transition logic lives here.

pub mod chat;
pub mod trades;

use actix_session::Session;
use actix_web::HttpResponse;
use serde::Serialize;
use tracing::error;

use kas_marketplace_common::Error;

/// Standard API response envelope.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.to_string()),
        }
    }
}

/// Acting wallet address from the authenticated session.
///
/// The wallet-connection flow that populates the session is an external
/// collaborator; transitions are still re-authorized against record state in
/// the coordinator, never against what the client claims.
pub fn get_wallet_from_session(session: &Session) -> Result<String, HttpResponse> {
    session
        .get::<String>("wallet_address")
        .map_err(|e| {
            error!("Session error: {}", e);
            HttpResponse::InternalServerError().json(ApiResponse::<()>::error("Session error"))
        })?
        .ok_or_else(|| {
            HttpResponse::Unauthorized().json(ApiResponse::<()>::error("No wallet connected"))
        })
}

/// Map a domain error onto an HTTP status.
pub fn error_response(err: &Error) -> HttpResponse {
    let body = ApiResponse::<()>::error(&err.to_string());
    match err {
        Error::NotFound(_) => HttpResponse::NotFound().json(body),
        Error::UnauthorizedTransition { .. } => HttpResponse::Forbidden().json(body),
        Error::InvalidStateTransition { .. } => HttpResponse::Conflict().json(body),
        Error::UserRejection | Error::InvalidInput(_) => HttpResponse::BadRequest().json(body),
        Error::ContractCallFailure(_) => HttpResponse::BadGateway().json(body),
        Error::MissingContractTradeId | Error::Database(_) | Error::Internal(_) => {
            HttpResponse::InternalServerError().json(body)
        }
    }
}

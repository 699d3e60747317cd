use std::env;
use std::sync::Arc;

use actix_cors::Cors;
use actix_session::{storage::CookieSessionStore, SessionMiddleware};
use actix_web::{cookie::Key, middleware::Logger, web, App, HttpResponse, HttpServer, Responder};
use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use server::config::{ContractConfig, SettlementConfig};
use server::db;
use server::handlers::{chat, trades};
use server::services::{ConsistencyManager, SettlementMonitor, TradeCoordinator};
use server::wallet::RpcWalletProvider;

async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

fn session_key() -> Key {
    match env::var("SESSION_SECRET") {
        Ok(secret) if secret.len() >= 64 => Key::from(secret.as_bytes()),
        _ => {
            // Ephemeral key: sessions do not survive a restart. Fine for
            // development, set SESSION_SECRET in production.
            Key::generate()
        }
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "trades.db".to_string());
    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());

    let pool = db::create_pool(&database_url).context("Failed to create database pool")?;
    db::init_schema(&pool).context("Failed to initialize schema")?;
    info!("Database ready at {}", database_url);

    let contract_config = ContractConfig::from_env().context("Invalid contract configuration")?;
    let wallet = Arc::new(RpcWalletProvider::new(contract_config.rpc_endpoint.clone()));

    let coordinator = web::Data::new(TradeCoordinator::new(
        pool.clone(),
        wallet.clone(),
        contract_config,
    ));
    let consistency = web::Data::new(ConsistencyManager::new(pool.clone()));

    let monitor = Arc::new(SettlementMonitor::new(
        pool.clone(),
        wallet,
        SettlementConfig::from_env(),
    ));
    tokio::spawn(monitor.start());

    let pool_data = web::Data::new(pool);
    let key = session_key();

    info!("Starting trade coordinator on {}", bind_addr);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(Cors::permissive())
            .wrap(SessionMiddleware::new(
                CookieSessionStore::default(),
                key.clone(),
            ))
            .app_data(coordinator.clone())
            .app_data(consistency.clone())
            .app_data(pool_data.clone())
            .route("/api/health", web::get().to(health_check))
            .configure(trades::configure_trade_routes)
            .configure(chat::configure_chat_routes)
    })
    .bind(&bind_addr)
    .context("Failed to bind server")?
    .run()
    .await
    .context("Server error")
}

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use dotenv::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{error, info};

use custodia_backend::api::admin::AdminState;
use custodia_backend::api::wallet::WalletState;
use custodia_backend::api::webhooks::WebhookState;
use custodia_backend::api::{admin, wallet, webhooks};
use custodia_backend::config::AppConfig;
use custodia_backend::custody::CustodyClient;
use custodia_backend::database::chain_repository::ChainRepository;
use custodia_backend::database::transaction_repository::TransactionRepository;
use custodia_backend::database::user_repository::UserRepository;
use custodia_backend::database::wallet_repository::WalletRepository;
use custodia_backend::database::withdrawal_repository::WithdrawalRepository;
use custodia_backend::database::{init_pool_from_config, run_migrations};
use custodia_backend::health::HealthChecker;
use custodia_backend::logging::init_tracing;
use custodia_backend::middleware::logging::{request_logging_middleware, UuidRequestId};
use custodia_backend::services::{
    DepositService, ReconcilerService, WalletService, WithdrawalService,
};

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "custodia-backend",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn liveness() -> impl IntoResponse {
    StatusCode::OK
}

async fn health(State(checker): State<HealthChecker>) -> impl IntoResponse {
    let status = checker.check().await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = AppConfig::from_env()?;
    config.validate()?;
    init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "🚀 Starting custodia backend service"
    );

    info!("📊 Initializing database connection pool...");
    let pool = init_pool_from_config(&config.database).await.map_err(|e| {
        error!("Failed to initialize database pool: {}", e);
        anyhow::anyhow!(e)
    })?;
    run_migrations(&pool).await?;
    info!("✅ Database ready");

    let users = Arc::new(UserRepository::new(pool.clone()));
    let wallets = Arc::new(WalletRepository::new(pool.clone()));
    let chains = Arc::new(ChainRepository::new(pool.clone()));
    let transactions = Arc::new(TransactionRepository::new(pool.clone()));
    let withdrawals = Arc::new(WithdrawalRepository::new(pool.clone()));

    let custody = Arc::new(CustodyClient::new(&config.custody)?);

    let withdrawal_service = Arc::new(WithdrawalService::new(
        pool.clone(),
        users.clone(),
        wallets.clone(),
        chains.clone(),
        transactions.clone(),
        withdrawals.clone(),
        custody.clone(),
    ));
    let wallet_service = Arc::new(WalletService::new(
        users.clone(),
        wallets.clone(),
        chains.clone(),
        transactions.clone(),
        custody.clone(),
    ));
    let deposit_service = Arc::new(DepositService::new(
        pool.clone(),
        users.clone(),
        wallets.clone(),
        chains.clone(),
        transactions.clone(),
    ));
    let reconciler_service = Arc::new(ReconcilerService::new(
        pool.clone(),
        users.clone(),
        transactions.clone(),
        withdrawals.clone(),
    ));

    let health_checker = HealthChecker::new(pool.clone());

    info!("🛣️  Setting up application routes...");
    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(health))
        .with_state(health_checker)
        .merge(wallet::routes(WalletState {
            wallets: wallet_service,
            withdrawals: withdrawal_service.clone(),
        }))
        .merge(admin::routes(AdminState {
            withdrawals: withdrawal_service,
        }))
        .merge(webhooks::routes(WebhookState {
            webhook_secret: config.custody.webhook_secret.clone(),
            deposits: deposit_service,
            reconciler: reconciler_service,
        }))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(axum::middleware::from_fn(request_logging_middleware))
                .layer(PropagateRequestIdLayer::x_request_id()),
        );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("❌ Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(address = %addr, "✅ custodia backend listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}

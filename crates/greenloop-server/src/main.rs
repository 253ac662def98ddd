//! GreenLoop Marketplace Server
//!
//! gRPC backend for waste pickup bookings and green coin rewards.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tonic::transport::Server;
use tracing::{info, warn};

use greenloop_core::config::{self, Config};
use greenloop_core::tracing_init::{default_filter, init_tracing};
use greenloop_proto::v1::auth_service_server::AuthServiceServer;
use greenloop_proto::v1::booking_service_server::BookingServiceServer;
use greenloop_proto::v1::company_service_server::CompanyServiceServer;
use greenloop_proto::v1::profile_service_server::ProfileServiceServer;
use greenloop_proto::v1::wallet_service_server::WalletServiceServer;

use greenloop_server::auth::{JwtManager, LogMailer};
use greenloop_server::market::Market;
use greenloop_server::server::{
    AuthServiceImpl, BookingServiceImpl, CompanyServiceImpl, ProfileServiceImpl,
    WalletServiceImpl, jwt_interceptor,
};
use greenloop_server::storage::MarketDatabase;

const DEV_SECRET: &str = "dev-secret-change-me";

#[derive(Parser, Debug)]
#[command(name = "greenloop-server")]
#[command(version, about = "GreenLoop marketplace server - bookings and green coin rewards")]
struct Args {
    /// Explicit settings file (JSON), layered over the global one.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on. Overrides `server.addr`.
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file. Overrides `server.database_path`.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JWT signing secret.
    #[arg(long, env = "GREENLOOP_JWT_SECRET", default_value = DEV_SECRET)]
    jwt_secret: String,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,

    /// OTLP collector endpoint for traces and metrics.
    #[cfg(feature = "metrics")]
    #[arg(long, env = "GREENLOOP_OTLP_ENDPOINT")]
    otlp_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = config::load_config(args.config.as_deref())?;

    init_tracing(
        &default_filter("greenloop_server", &config.server.log_level),
        args.log_json || config.server.log_json,
    );

    #[cfg(feature = "metrics")]
    let metrics_guard = match &args.otlp_endpoint {
        Some(endpoint) => Some(greenloop_core::metrics::init_metrics(endpoint)?),
        None => None,
    };

    let addr: SocketAddr = match args.addr {
        Some(addr) => addr,
        None => config.server.addr.parse()?,
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %addr,
        "Starting greenloop-server"
    );

    let db_path = resolve_db_path(args.db_path.as_deref(), &config)?;
    info!(path = %db_path.display(), "Opening market database");
    let db = MarketDatabase::open(&db_path).await?;

    if args.jwt_secret == DEV_SECRET {
        warn!("Using the built-in development JWT secret; set GREENLOOP_JWT_SECRET");
    }
    let jwt = Arc::new(JwtManager::new(
        args.jwt_secret.as_bytes(),
        config.auth.access_ttl_secs,
        config.auth.refresh_ttl_secs,
    ));

    let market = Arc::new(Market::new(
        db.clone(),
        config.rewards,
        config.feeds.broadcast_capacity,
    ));

    // Build services
    let auth = AuthServiceImpl::new(
        db,
        Arc::clone(&jwt),
        Arc::new(LogMailer),
        config.auth.clone(),
    );
    let profile = ProfileServiceImpl::new(Arc::clone(&market));
    let company = CompanyServiceImpl::new(Arc::clone(&market));
    let booking = BookingServiceImpl::new(Arc::clone(&market));
    let wallet = WalletServiceImpl::new(market);

    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<AuthServiceServer<AuthServiceImpl>>()
        .await;
    health_reporter
        .set_serving::<ProfileServiceServer<ProfileServiceImpl>>()
        .await;
    health_reporter
        .set_serving::<CompanyServiceServer<CompanyServiceImpl>>()
        .await;
    health_reporter
        .set_serving::<BookingServiceServer<BookingServiceImpl>>()
        .await;
    health_reporter
        .set_serving::<WalletServiceServer<WalletServiceImpl>>()
        .await;

    let jwt_check = jwt_interceptor(jwt);

    let grpc_router = Server::builder()
        .http2_keepalive_interval(Some(Duration::from_secs(30)))
        .http2_keepalive_timeout(Some(Duration::from_secs(10)))
        .add_service(health_service)
        .add_service(AuthServiceServer::new(auth))
        .add_service(ProfileServiceServer::with_interceptor(
            profile,
            jwt_check.clone(),
        ))
        .add_service(CompanyServiceServer::with_interceptor(
            company,
            jwt_check.clone(),
        ))
        .add_service(BookingServiceServer::with_interceptor(
            booking,
            jwt_check.clone(),
        ))
        .add_service(WalletServiceServer::with_interceptor(wallet, jwt_check));

    info!(addr = %addr, "Marketplace server listening");

    tokio::select! {
        result = grpc_router.serve(addr) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
        }
    }

    #[cfg(feature = "metrics")]
    if let Some(guard) = metrics_guard
        && let Err(e) = guard.shutdown()
    {
        warn!(error = %e, "Telemetry shutdown failed");
    }

    info!("Server stopped");
    Ok(())
}

/// CLI flag, then configured path, then the platform config directory,
/// then `~/.greenloop/market.db`.
fn resolve_db_path(cli: Option<&Path>, config: &Config) -> anyhow::Result<PathBuf> {
    if let Some(path) = cli {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = &config.server.database_path {
        return Ok(path.clone());
    }
    if let Some(path) = config::database_path() {
        return Ok(path);
    }
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".greenloop").join("market.db"))
}

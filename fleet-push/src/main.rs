use std::sync::Arc;

use fleet_push::api::{ApiServer, AppState, BearerAuth};
use fleet_push::config::AppConfig;
use fleet_push::database::{self, SqlxNotificationLog, SqlxSubscriptionStore, SubscriptionStore};
use fleet_push::delivery::DeliveryCoordinator;
use fleet_push::logging;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    let _log_guard = logging::init_logging(config.log_dir.as_deref())?;
    let shutdown = CancellationToken::new();
    if let Some(log_dir) = &config.log_dir {
        logging::start_retention_cleanup(log_dir, shutdown.child_token());
    }

    let pool = database::open_pool(&config.database_url).await?;
    database::migrate(&pool).await?;

    let store: Arc<dyn SubscriptionStore> = Arc::new(SqlxSubscriptionStore::new(pool.clone()));
    let log = Arc::new(SqlxNotificationLog::new(pool.clone()));
    let coordinator = DeliveryCoordinator::from_config(store.clone(), log, &config.web_push)?;

    tracing::info!(
        subject = %config.web_push.subject,
        concurrency = config.web_push.concurrency,
        ttl_secs = config.web_push.ttl_secs,
        "Web push delivery configured"
    );

    let state = AppState::new(
        Arc::new(coordinator),
        store,
        config.notification.clone(),
        BearerAuth::new(config.trigger_secret.as_str()),
    );
    let server = ApiServer::new(config.server.clone(), state);

    let server_token = server.shutdown_token();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            return;
        }
        tracing::info!("Shutdown signal received");
        server_token.cancel();
        shutdown.cancel();
    });

    server.run().await?;

    pool.close().await;
    tracing::info!("fleet-push stopped");

    Ok(())
}

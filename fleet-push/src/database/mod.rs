//! Persistence layer: SQLite through sqlx.
//!
//! Holds the connection pool setup, row models and the repositories backing
//! the subscription store and notification log.

pub mod models;
pub mod repositories;
pub mod time;

pub use repositories::{
    NotificationLog, SqlxNotificationLog, SqlxSubscriptionStore, SubscriptionStore,
};

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite, SqliteConnection};

pub type DbPool = Pool<Sqlite>;

const POOL_SIZE: u32 = 5;
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(30);

/// Open the service database with the default pool size.
pub async fn open_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    open_pool_with(database_url, POOL_SIZE).await
}

/// Open a WAL-mode SQLite pool.
///
/// Every connection to `sqlite::memory:` gets a private database, so callers
/// using an in-memory URL want `max_connections = 1`.
pub async fn open_pool_with(database_url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
        .after_connect(|conn, _meta| Box::pin(async move { tune_connection(conn).await }))
        .connect_with(options)
        .await?;

    verify_journal_mode(&pool).await?;
    tracing::info!(max_connections, "SQLite pool ready");

    Ok(pool)
}

async fn tune_connection(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("PRAGMA temp_store = MEMORY")
        .execute(conn)
        .await?;
    Ok(())
}

/// Some filesystems refuse WAL at connect time; check and retry once.
async fn verify_journal_mode(pool: &DbPool) -> Result<(), sqlx::Error> {
    let (mode,): (String,) = sqlx::query_as("PRAGMA journal_mode").fetch_one(pool).await?;
    match mode.as_str() {
        "wal" | "memory" => {}
        other => {
            tracing::warn!(mode = other, "SQLite is not in WAL mode, switching");
            sqlx::query("PRAGMA journal_mode = WAL").execute(pool).await?;
        }
    }
    Ok(())
}

/// Apply pending migrations from `migrations/`.
pub async fn migrate(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::debug!("Database schema up to date");
    Ok(())
}

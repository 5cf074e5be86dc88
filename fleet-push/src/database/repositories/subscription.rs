//! Subscription store.

use async_trait::async_trait;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::database::models::PushSubscriptionDbModel;
use crate::database::time::now_ms;
use crate::domain::Subscription;
use crate::{Error, Result};

/// SQLite caps the number of bound parameters per statement.
const DELETE_CHUNK_SIZE: usize = 500;

/// Registry of browser push subscriptions, keyed by endpoint.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Subscription>>;
    /// Record a successful delivery to `endpoint`.
    async fn touch(&self, endpoint: &str) -> Result<()>;
    /// Remove every listed endpoint, returning how many rows were deleted.
    async fn delete_many(&self, endpoints: &[String]) -> Result<u64>;
    /// Insert or refresh a subscription, keeping its original `created_at`.
    async fn upsert(&self, subscription: &Subscription) -> Result<Subscription>;
    /// Remove one endpoint. Returns `false` if it was not registered.
    async fn remove(&self, endpoint: &str) -> Result<bool>;
}

/// SQLx implementation of [`SubscriptionStore`].
pub struct SqlxSubscriptionStore {
    pool: SqlitePool,
}

impl SqlxSubscriptionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for SqlxSubscriptionStore {
    async fn list_all(&self) -> Result<Vec<Subscription>> {
        let rows = sqlx::query_as::<_, PushSubscriptionDbModel>(
            "SELECT * FROM push_subscriptions ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Subscription::from).collect())
    }

    async fn touch(&self, endpoint: &str) -> Result<()> {
        sqlx::query("UPDATE push_subscriptions SET last_used_at = ? WHERE endpoint = ?")
            .bind(now_ms())
            .bind(endpoint)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_many(&self, endpoints: &[String]) -> Result<u64> {
        if endpoints.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut deleted = 0;
        for chunk in endpoints.chunks(DELETE_CHUNK_SIZE) {
            let mut query =
                QueryBuilder::<Sqlite>::new("DELETE FROM push_subscriptions WHERE endpoint IN (");
            let mut separated = query.separated(", ");
            for endpoint in chunk {
                separated.push_bind(endpoint.as_str());
            }
            separated.push_unseparated(")");

            deleted += query.build().execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;

        Ok(deleted)
    }

    async fn upsert(&self, subscription: &Subscription) -> Result<Subscription> {
        let row = PushSubscriptionDbModel::from(subscription);

        sqlx::query(
            r#"
            INSERT INTO push_subscriptions (
                endpoint, p256dh, auth, user_agent, created_at, last_used_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(endpoint) DO UPDATE SET
                p256dh = excluded.p256dh,
                auth = excluded.auth,
                user_agent = excluded.user_agent,
                last_used_at = COALESCE(excluded.last_used_at, push_subscriptions.last_used_at)
            "#,
        )
        .bind(&row.endpoint)
        .bind(&row.p256dh)
        .bind(&row.auth)
        .bind(&row.user_agent)
        .bind(row.created_at)
        .bind(row.last_used_at)
        .execute(&self.pool)
        .await?;

        sqlx::query_as::<_, PushSubscriptionDbModel>(
            "SELECT * FROM push_subscriptions WHERE endpoint = ? LIMIT 1",
        )
        .bind(&row.endpoint)
        .fetch_optional(&self.pool)
        .await?
        .map(Subscription::from)
        .ok_or_else(|| Error::Other(format!("Subscription {} vanished after upsert", row.endpoint)))
    }

    async fn remove(&self, endpoint: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE endpoint = ?")
            .bind(endpoint)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

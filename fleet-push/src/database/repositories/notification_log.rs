//! Notification log.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::Result;
use crate::database::models::{LOG_STATUS_PENDING, LOG_STATUS_SENT};
use crate::database::time::now_ms;

/// Records the outcome of each fan-out run.
#[async_trait]
pub trait NotificationLog: Send + Sync {
    async fn append_summary(&self, sent: usize, failed: usize, expired: usize) -> Result<()>;
}

/// SQLx implementation of [`NotificationLog`].
///
/// The row announcing a balance update is inserted as `pending` before the
/// trigger fires. A summary completes the newest pending row; when there is
/// none, a completed row is inserted instead so no run goes unrecorded.
pub struct SqlxNotificationLog {
    pool: SqlitePool,
}

impl SqlxNotificationLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationLog for SqlxNotificationLog {
    async fn append_summary(&self, sent: usize, failed: usize, expired: usize) -> Result<()> {
        let now = now_ms();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE push_notifications_log SET
                status = ?,
                affected_rows = ?,
                failed_count = ?,
                expired_count = ?,
                completed_at = ?
            WHERE id = (
                SELECT id FROM push_notifications_log
                WHERE status = ?
                ORDER BY triggered_at DESC, id DESC
                LIMIT 1
            )
            "#,
        )
        .bind(LOG_STATUS_SENT)
        .bind(sent as i64)
        .bind(failed as i64)
        .bind(expired as i64)
        .bind(now)
        .bind(LOG_STATUS_PENDING)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            sqlx::query(
                r#"
                INSERT INTO push_notifications_log (
                    triggered_at, status, affected_rows, failed_count, expired_count, completed_at
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(now)
            .bind(LOG_STATUS_SENT)
            .bind(sent as i64)
            .bind(failed as i64)
            .bind(expired as i64)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

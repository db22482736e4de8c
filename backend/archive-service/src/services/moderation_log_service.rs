use crate::db::Database;
use crate::error::Result;
use crate::models::{CreateModerationLog, ModerationLog};

/// Append-only record of admin actions on posts
pub struct ModerationLogService {
    db: Database,
}

impl ModerationLogService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn log(&self, entry: CreateModerationLog) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO moderation_logs (admin_id, post_id, action, feedback, date_of_action)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(entry.admin_id)
        .bind(entry.post_id)
        .bind(entry.action.as_str())
        .bind(&entry.feedback)
        .execute(&self.db.pg)
        .await?;

        tracing::info!(
            admin_id = entry.admin_id,
            post_id = entry.post_id,
            action = entry.action.as_str(),
            "moderation action recorded"
        );

        Ok(())
    }

    pub async fn list_by_post(&self, post_id: i64) -> Result<Vec<ModerationLog>> {
        let logs: Vec<ModerationLog> = sqlx::query_as(
            r#"
            SELECT l.id, l.admin_id, l.post_id, l.action, l.feedback, l.date_of_action,
                   u.name AS admin_name
            FROM moderation_logs l
            LEFT JOIN users u ON u.id = l.admin_id
            WHERE l.post_id = $1
            ORDER BY l.date_of_action DESC, l.id DESC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.db.pg)
        .await?;

        Ok(logs)
    }
}

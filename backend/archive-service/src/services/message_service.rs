use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::Message;

pub struct MessageService {
    db: Database,
}

impl MessageService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, name: &str, email: &str, message: &str) -> Result<Message> {
        let stored: Message = sqlx::query_as(
            "INSERT INTO messages (name, email, message) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(name)
        .bind(email)
        .bind(message)
        .fetch_one(&self.db.pg)
        .await?;

        Ok(stored)
    }

    /// Newest first; `resolved` narrows to one state
    pub async fn list(&self, resolved: Option<bool>) -> Result<Vec<Message>> {
        let messages: Vec<Message> = sqlx::query_as(
            r#"
            SELECT * FROM messages
            WHERE ($1::BOOLEAN IS NULL OR resolved = $1)
            ORDER BY date_created DESC, id DESC
            "#,
        )
        .bind(resolved)
        .fetch_all(&self.db.pg)
        .await?;

        Ok(messages)
    }

    pub async fn resolve(&self, id: i64) -> Result<Message> {
        let message: Message =
            sqlx::query_as("UPDATE messages SET resolved = TRUE WHERE id = $1 RETURNING *")
                .bind(id)
                .fetch_optional(&self.db.pg)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Message {} not found", id)))?;

        Ok(message)
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id)
            .execute(&self.db.pg)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Message {} not found", id)));
        }

        Ok(())
    }
}

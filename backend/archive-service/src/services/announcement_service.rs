use chrono::{DateTime, Utc};

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{Announcement, CreateAnnouncement, UpdateAnnouncement};

pub const MAX_ANNOUNCEMENT_TITLE_CHARS: usize = 100;

const ANNOUNCEMENT_SELECT: &str = r#"
    SELECT a.id, a.user_id, a.title, a.content, a.date_created, a.date_start,
           a.date_end, a.is_active,
           u.name AS author_name,
           u.profile_pic AS author_profile_pic
    FROM announcements a
    LEFT JOIN users u ON u.id = a.user_id
"#;

pub fn validate_window(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<()> {
    match end {
        Some(end) if end <= start => Err(AppError::BadRequest(
            "End date must be after start date".to_string(),
        )),
        _ => Ok(()),
    }
}

fn validate_text(title: &str, content: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }
    if title.trim().chars().count() > MAX_ANNOUNCEMENT_TITLE_CHARS {
        return Err(AppError::BadRequest(format!(
            "Title must be {} characters or fewer",
            MAX_ANNOUNCEMENT_TITLE_CHARS
        )));
    }
    if content.trim().is_empty() {
        return Err(AppError::BadRequest("Content is required".to_string()));
    }
    Ok(())
}

pub struct AnnouncementService {
    db: Database,
}

impl AnnouncementService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Live announcements, newest first, optionally only those created after `since`
    pub async fn list_live(&self, since: Option<DateTime<Utc>>) -> Result<Vec<Announcement>> {
        let announcements: Vec<Announcement> = sqlx::query_as(&format!(
            r#"{}
            WHERE a.is_active
              AND a.date_start <= NOW()
              AND (a.date_end IS NULL OR a.date_end > NOW())
              AND ($1::TIMESTAMPTZ IS NULL OR a.date_created > $1)
            ORDER BY a.date_created DESC, a.id DESC
            "#,
            ANNOUNCEMENT_SELECT
        ))
        .bind(since)
        .fetch_all(&self.db.pg)
        .await?;

        Ok(announcements)
    }

    pub async fn list_all(&self) -> Result<Vec<Announcement>> {
        let announcements: Vec<Announcement> = sqlx::query_as(&format!(
            "{} ORDER BY a.date_created DESC, a.id DESC",
            ANNOUNCEMENT_SELECT
        ))
        .fetch_all(&self.db.pg)
        .await?;

        Ok(announcements)
    }

    pub async fn get(&self, id: i64) -> Result<Announcement> {
        let announcement: Announcement =
            sqlx::query_as(&format!("{} WHERE a.id = $1", ANNOUNCEMENT_SELECT))
                .bind(id)
                .fetch_optional(&self.db.pg)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Announcement {} not found", id)))?;

        Ok(announcement)
    }

    pub async fn create(&self, input: CreateAnnouncement) -> Result<Announcement> {
        validate_text(&input.title, &input.content)?;
        validate_window(input.date_start, input.date_end)?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO announcements (user_id, title, content, date_start, date_end, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(input.user_id)
        .bind(input.title.trim())
        .bind(input.content.trim())
        .bind(input.date_start)
        .bind(input.date_end)
        .bind(input.is_active)
        .fetch_one(&self.db.pg)
        .await?;

        tracing::info!(announcement_id = id, user_id = input.user_id, "announcement created");

        self.get(id).await
    }

    pub async fn update(&self, id: i64, input: UpdateAnnouncement) -> Result<Announcement> {
        let current = self.get(id).await?;

        let title = input.title.unwrap_or(current.title);
        let content = input.content.unwrap_or(current.content);
        let date_start = input.date_start.unwrap_or(current.date_start);
        let date_end = input.date_end.unwrap_or(current.date_end);
        let is_active = input.is_active.unwrap_or(current.is_active);

        validate_text(&title, &content)?;
        validate_window(date_start, date_end)?;

        sqlx::query(
            r#"
            UPDATE announcements
            SET title = $1, content = $2, date_start = $3, date_end = $4, is_active = $5
            WHERE id = $6
            "#,
        )
        .bind(title.trim())
        .bind(content.trim())
        .bind(date_start)
        .bind(date_end)
        .bind(is_active)
        .bind(id)
        .execute(&self.db.pg)
        .await?;

        self.get(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM announcements WHERE id = $1")
            .bind(id)
            .execute(&self.db.pg)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Announcement {} not found", id)));
        }

        tracing::info!(announcement_id = id, "announcement deleted");
        Ok(())
    }
}

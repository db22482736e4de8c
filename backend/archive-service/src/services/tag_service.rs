use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{CreateTag, Tag, UpdateTag};

pub const MAX_TAG_NAME_CHARS: usize = 100;

/// Categories offered on first start, in display order
pub const PREDEFINED_TAGS: &[&str] = &[
    "Trenton Families",
    "My Neighborhood/Neighborhoods",
    "Schools & Colleges",
    "Teams",
    "Houses of Worship",
    "Parks",
    "Childhood Memories",
    "Food",
    "Fraternities & Sororities",
    "Service Associations",
    "Remarkable People",
    "Arts & Artists",
    "Strange Things",
    "Trenton Pride",
    "Government/Capital City",
    "Other/Miscellaneous",
];

pub fn validate_tag_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Tag name is required".to_string()));
    }
    if name.chars().count() > MAX_TAG_NAME_CHARS {
        return Err(AppError::BadRequest(format!(
            "Tag name must be {} characters or fewer",
            MAX_TAG_NAME_CHARS
        )));
    }
    Ok(name.to_string())
}

pub struct TagService {
    db: Database,
}

impl TagService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(&self) -> Result<Vec<Tag>> {
        let tags: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY display_order, name")
            .fetch_all(&self.db.pg)
            .await?;

        Ok(tags)
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Tag>> {
        let tag: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE name = $1")
            .bind(name.trim())
            .fetch_optional(&self.db.pg)
            .await?;

        Ok(tag)
    }

    pub async fn create(&self, input: CreateTag) -> Result<Tag> {
        let name = validate_tag_name(&input.name)?;

        let tag: Tag = sqlx::query_as(
            "INSERT INTO tags (name, display_order, image_url) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&name)
        .bind(input.display_order)
        .bind(&input.image_url)
        .fetch_one(&self.db.pg)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict(format!("Tag '{}' already exists", name)),
            other => other,
        })?;

        tracing::info!(tag_id = tag.id, name = %tag.name, "tag created");

        Ok(tag)
    }

    pub async fn update(&self, id: i64, input: UpdateTag) -> Result<Tag> {
        let name = input.name.as_deref().map(validate_tag_name).transpose()?;

        let tag: Tag = sqlx::query_as(
            r#"
            UPDATE tags SET
                name = COALESCE($1, name),
                display_order = COALESCE($2, display_order),
                image_url = COALESCE($3, image_url),
                date_updated = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(&name)
        .bind(input.display_order)
        .bind(&input.image_url)
        .bind(id)
        .fetch_optional(&self.db.pg)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tag {} not found", id)))?;

        Ok(tag)
    }

    /// Posts keep existing; their tag reference is cleared by the foreign key
    pub async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.db.pg)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Tag {} not found", id)));
        }

        tracing::info!(tag_id = id, "tag deleted");
        Ok(())
    }

    /// Insert the predefined tags, resetting their display order
    pub async fn seed_predefined(&self) -> Result<usize> {
        let mut tx = self.db.pg.begin().await?;

        for (position, name) in PREDEFINED_TAGS.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO tags (name, display_order) VALUES ($1, $2)
                ON CONFLICT (name) DO UPDATE SET display_order = EXCLUDED.display_order, date_updated = NOW()
                "#,
            )
            .bind(*name)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(PREDEFINED_TAGS.len())
    }
}

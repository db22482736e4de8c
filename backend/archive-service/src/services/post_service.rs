use std::collections::HashMap;

use chrono::NaiveDate;
use sqlx::{Postgres, QueryBuilder};

use crate::db::Database;
use crate::error::{AppError, Result};
use crate::models::{Media, NewPost, PostRow, PostStatus, PostWithMedia, UpdatePost};

pub const MAX_TITLE_CHARS: usize = 100;

const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.content, p.tag_id, p.user_id, p.status,
           p.date_created, p.date_updated,
           t.name AS tag_name,
           u.name AS author_name,
           u.email AS author_email,
           u.profile_pic AS author_profile_pic
    FROM posts p
    LEFT JOIN tags t ON t.id = p.tag_id
    LEFT JOIN users u ON u.id = p.user_id
"#;

const POST_COUNT: &str = r#"
    SELECT COUNT(*)
    FROM posts p
    LEFT JOIN tags t ON t.id = p.tag_id
    LEFT JOIN users u ON u.id = p.user_id
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Archive search filters; every field set narrows the result
#[derive(Debug, Clone, Default)]
pub struct PostFilters {
    pub status: Option<PostStatus>,
    pub user_id: Option<i64>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub date: Option<NaiveDate>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

/// `YYYY-MM-DD`, blank meaning no filter
pub fn parse_date_filter(raw: Option<&str>) -> Result<Option<NaiveDate>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| AppError::BadRequest("Invalid date format. Use YYYY-MM-DD".to_string())),
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside ILIKE
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn validate_title(raw: &str) -> Result<String> {
    let title = raw.trim();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title is required".to_string()));
    }
    if title.chars().count() > MAX_TITLE_CHARS {
        return Err(AppError::BadRequest(format!(
            "Title must be {} characters or fewer",
            MAX_TITLE_CHARS
        )));
    }
    Ok(title.to_string())
}

pub fn validate_content(raw: &str) -> Result<String> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(AppError::BadRequest("Content is required".to_string()));
    }
    Ok(content.to_string())
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filters: &PostFilters) {
    qb.push(" WHERE TRUE");

    if let Some(status) = filters.status {
        qb.push(" AND p.status = ").push_bind(status.as_str());
    }
    if let Some(user_id) = filters.user_id {
        qb.push(" AND p.user_id = ").push_bind(user_id);
    }
    if let Some(title) = non_blank(&filters.title) {
        qb.push(" AND p.title ILIKE ")
            .push_bind(format!("%{}%", escape_like(title)));
    }
    if let Some(author) = non_blank(&filters.author) {
        qb.push(" AND u.name ILIKE ")
            .push_bind(format!("%{}%", escape_like(author)));
    }
    if let Some(date) = filters.date {
        qb.push(" AND (p.date_created AT TIME ZONE 'UTC')::date = ")
            .push_bind(date);
    }
    if let Some(tag) = non_blank(&filters.tag) {
        qb.push(" AND t.name = ").push_bind(tag.to_string());
    }
}

pub struct PostService {
    db: Database,
}

impl PostService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        filters: &PostFilters,
        order: SortOrder,
        page: Option<Page>,
    ) -> Result<Vec<PostWithMedia>> {
        let mut qb = QueryBuilder::<Postgres>::new(POST_SELECT);
        push_filters(&mut qb, filters);

        qb.push(match order {
            SortOrder::NewestFirst => " ORDER BY p.date_created DESC, p.id DESC",
            SortOrder::OldestFirst => " ORDER BY p.date_created ASC, p.id ASC",
        });

        if let Some(page) = page {
            qb.push(" LIMIT ").push_bind(page.limit);
            qb.push(" OFFSET ").push_bind(page.offset);
        }

        let posts: Vec<PostRow> = qb.build_query_as().fetch_all(&self.db.pg).await?;
        self.attach_media(posts).await
    }

    pub async fn count(&self, filters: &PostFilters) -> Result<i64> {
        let mut qb = QueryBuilder::<Postgres>::new(POST_COUNT);
        push_filters(&mut qb, filters);

        let total: i64 = qb.build_query_scalar().fetch_one(&self.db.pg).await?;
        Ok(total)
    }

    pub async fn get(&self, id: i64) -> Result<Option<PostWithMedia>> {
        let post: Option<PostRow> = sqlx::query_as(&format!("{} WHERE p.id = $1", POST_SELECT))
            .bind(id)
            .fetch_optional(&self.db.pg)
            .await?;

        match post {
            Some(post) => Ok(self.attach_media(vec![post]).await?.pop()),
            None => Ok(None),
        }
    }

    pub async fn require(&self, id: i64) -> Result<PostWithMedia> {
        self.get(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))
    }

    /// Post and media rows are written together or not at all
    pub async fn create(&self, input: NewPost) -> Result<PostWithMedia> {
        let mut tx = self.db.pg.begin().await?;

        let post_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO posts (title, content, tag_id, user_id, status)
            VALUES ($1, $2, $3, $4, 'pending')
            RETURNING id
            "#,
        )
        .bind(&input.title)
        .bind(&input.content)
        .bind(input.tag_id)
        .bind(input.user_id)
        .fetch_one(&mut *tx)
        .await?;

        for media in &input.media {
            sqlx::query(
                r#"
                INSERT INTO media (post_id, url, media_type, storage_key, filename, caption)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(post_id)
            .bind(&media.url)
            .bind(media.media_type.as_str())
            .bind(&media.storage_key)
            .bind(&media.filename)
            .bind(&media.caption)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            post_id,
            user_id = input.user_id,
            media_count = input.media.len(),
            "post submitted"
        );

        self.require(post_id).await
    }

    pub async fn update(&self, id: i64, input: UpdatePost) -> Result<PostWithMedia> {
        let (set_tag, tag_id) = match input.tag_id {
            Some(tag_id) => (true, tag_id),
            None => (false, None),
        };

        let result = sqlx::query(
            r#"
            UPDATE posts SET
                title = COALESCE($1, title),
                content = COALESCE($2, content),
                tag_id = CASE WHEN $3 THEN $4 ELSE tag_id END,
                date_updated = NOW()
            WHERE id = $5
            "#,
        )
        .bind(&input.title)
        .bind(&input.content)
        .bind(set_tag)
        .bind(tag_id)
        .bind(id)
        .execute(&self.db.pg)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post {} not found", id)));
        }

        self.require(id).await
    }

    pub async fn set_status(&self, id: i64, status: PostStatus) -> Result<PostWithMedia> {
        let result =
            sqlx::query("UPDATE posts SET status = $1, date_updated = NOW() WHERE id = $2")
                .bind(status.as_str())
                .bind(id)
                .execute(&self.db.pg)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post {} not found", id)));
        }

        tracing::info!(post_id = id, status = status.as_str(), "post status changed");

        self.require(id).await
    }

    /// Delete a post; returns the storage keys of its media for cleanup
    pub async fn delete(&self, id: i64) -> Result<Vec<String>> {
        let mut tx = self.db.pg.begin().await?;

        let keys: Vec<String> = sqlx::query_scalar("SELECT storage_key FROM media WHERE post_id = $1")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Post {} not found", id)));
        }

        tx.commit().await?;

        tracing::info!(post_id = id, media_count = keys.len(), "post deleted");

        Ok(keys)
    }

    async fn attach_media(&self, posts: Vec<PostRow>) -> Result<Vec<PostWithMedia>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
        let media: Vec<Media> =
            sqlx::query_as("SELECT * FROM media WHERE post_id = ANY($1) ORDER BY id")
                .bind(&ids[..])
                .fetch_all(&self.db.pg)
                .await?;

        let mut by_post: HashMap<i64, Vec<Media>> = HashMap::new();
        for m in media {
            by_post.entry(m.post_id).or_default().push(m);
        }

        Ok(posts
            .into_iter()
            .map(|post| {
                let media = by_post.remove(&post.id).unwrap_or_default();
                PostWithMedia { post, media }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_filter() {
        assert_eq!(parse_date_filter(None).unwrap(), None);
        assert_eq!(parse_date_filter(Some("  ")).unwrap(), None);
        assert_eq!(
            parse_date_filter(Some("1968-04-12")).unwrap(),
            NaiveDate::from_ymd_opt(1968, 4, 12)
        );
        assert!(matches!(
            parse_date_filter(Some("04/12/1968")),
            Err(AppError::BadRequest(_))
        ));
        assert!(parse_date_filter(Some("2024-02-30")).is_err());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("100%_sure\\"), "100\\%\\_sure\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_validate_title() {
        assert!(matches!(validate_title("   "), Err(AppError::BadRequest(msg)) if msg == "Title is required"));
        assert_eq!(validate_title(" Mill ").unwrap(), "Mill");
        assert!(validate_title(&"é".repeat(100)).is_ok());
        assert!(validate_title(&"é".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_content() {
        assert!(matches!(validate_content(""), Err(AppError::BadRequest(msg)) if msg == "Content is required"));
        assert_eq!(validate_content("story").unwrap(), "story");
    }

    #[test]
    fn test_filters_build_parameterised_sql() {
        let filters = PostFilters {
            status: Some(PostStatus::Approved),
            title: Some("mill".to_string()),
            author: Some("  ".to_string()),
            date: NaiveDate::from_ymd_opt(2020, 1, 2),
            tag: Some("Parks".to_string()),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1 FROM posts p");
        push_filters(&mut qb, &filters);
        let sql = qb.sql();

        assert!(sql.contains("p.status = $1"));
        assert!(sql.contains("p.title ILIKE $2"));
        assert!(!sql.contains("u.name ILIKE"));
        assert!(sql.contains("::date = $3"));
        assert!(sql.contains("t.name = $4"));
    }
}

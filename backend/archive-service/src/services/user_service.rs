use crate::db::Database;
use crate::error::{AppError, Result};
use crate::middleware::Role;
use crate::models::{UpsertUser, User};

pub struct UserService {
    db: Database,
}

impl UserService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert or refresh a user from their Google profile.
    ///
    /// Profile fields always follow Google. The role is only ever raised:
    /// an admin stays admin even if their address stops qualifying.
    pub async fn get_or_create_user(&self, profile: &UpsertUser, role: Role) -> Result<User> {
        let user: User = sqlx::query_as(
            r#"
            INSERT INTO users (google_id, email, name, profile_pic, role)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (google_id) DO UPDATE SET
                email = EXCLUDED.email,
                name = EXCLUDED.name,
                profile_pic = EXCLUDED.profile_pic,
                role = CASE WHEN EXCLUDED.role = 'admin' THEN 'admin' ELSE users.role END
            RETURNING *
            "#,
        )
        .bind(&profile.google_id)
        .bind(&profile.email)
        .bind(&profile.name)
        .bind(&profile.profile_pic)
        .bind(role.as_str())
        .fetch_one(&self.db.pg)
        .await?;

        tracing::info!(user_id = user.id, role = %user.role, "user signed in");

        Ok(user)
    }

    pub async fn get(&self, id: i64) -> Result<Option<User>> {
        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.db.pg)
            .await?;

        Ok(user)
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let users: Vec<User> =
            sqlx::query_as("SELECT * FROM users ORDER BY date_created DESC, id DESC")
                .fetch_all(&self.db.pg)
                .await?;

        Ok(users)
    }

    pub async fn update_role(&self, id: i64, role: Role) -> Result<User> {
        let user: User = sqlx::query_as("UPDATE users SET role = $1 WHERE id = $2 RETURNING *")
            .bind(role.as_str())
            .bind(id)
            .fetch_optional(&self.db.pg)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        tracing::info!(user_id = id, role = role.as_str(), "user role updated");

        Ok(user)
    }

    /// Returns how many rows were promoted
    pub async fn promote_by_email(&self, email: &str) -> Result<u64> {
        let result = sqlx::query("UPDATE users SET role = 'admin' WHERE LOWER(email) = LOWER($1)")
            .bind(email.trim())
            .execute(&self.db.pg)
            .await?;

        Ok(result.rows_affected())
    }
}

//! Short-lived server-side state
//!
//! Holds OAuth `state` values (mapped to the path the user wants to return to)
//! and revoked JWTs until they would have expired anyway.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};

const OAUTH_STATE_PREFIX: &str = "oauth_state:";
const TOKEN_BLACKLIST_PREFIX: &str = "token_blacklist:";

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save_oauth_state(&self, state: &str, return_to: &str, ttl: Duration) -> Result<()>;

    /// Returns the stored return path and forgets the state
    async fn take_oauth_state(&self, state: &str) -> Result<Option<String>>;

    async fn revoke_token(&self, token: &str, ttl: Duration) -> Result<()>;

    async fn is_revoked(&self, token: &str) -> Result<bool>;
}

fn store_error(e: redis::RedisError) -> AppError {
    AppError::Internal(anyhow::anyhow!("Session store error: {}", e))
}

#[derive(Clone)]
pub struct RedisSessionStore {
    conn: ConnectionManager,
}

impl RedisSessionStore {
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        tracing::info!("Redis session store connected");
        Ok(Self { conn })
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn save_oauth_state(&self, state: &str, return_to: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(
            format!("{OAUTH_STATE_PREFIX}{state}"),
            return_to,
            ttl.as_secs().max(1),
        )
        .await
        .map_err(store_error)
    }

    async fn take_oauth_state(&self, state: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        redis::cmd("GETDEL")
            .arg(format!("{OAUTH_STATE_PREFIX}{state}"))
            .query_async::<_, Option<String>>(&mut conn)
            .await
            .map_err(store_error)
    }

    async fn revoke_token(&self, token: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(
            format!("{TOKEN_BLACKLIST_PREFIX}{token}"),
            "1",
            ttl.as_secs().max(1),
        )
        .await
        .map_err(store_error)
    }

    async fn is_revoked(&self, token: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        conn.exists::<_, bool>(format!("{TOKEN_BLACKLIST_PREFIX}{token}"))
            .await
            .map_err(store_error)
    }
}

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-process store for single-instance deployments and tests
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert(&self, key: String, value: String, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            key,
            Entry {
                value,
                expires_at: now + ttl,
            },
        );
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn save_oauth_state(&self, state: &str, return_to: &str, ttl: Duration) -> Result<()> {
        self.insert(
            format!("{OAUTH_STATE_PREFIX}{state}"),
            return_to.to_string(),
            ttl,
        )
        .await;
        Ok(())
    }

    async fn take_oauth_state(&self, state: &str) -> Result<Option<String>> {
        let mut entries = self.entries.write().await;
        let entry = entries.remove(&format!("{OAUTH_STATE_PREFIX}{state}"));
        Ok(entry
            .filter(|e| e.is_live(Instant::now()))
            .map(|e| e.value))
    }

    async fn revoke_token(&self, token: &str, ttl: Duration) -> Result<()> {
        self.insert(format!("{TOKEN_BLACKLIST_PREFIX}{token}"), "1".to_string(), ttl)
            .await;
        Ok(())
    }

    async fn is_revoked(&self, token: &str) -> Result<bool> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&format!("{TOKEN_BLACKLIST_PREFIX}{token}"))
            .map(|e| e.is_live(Instant::now()))
            .unwrap_or(false))
    }
}

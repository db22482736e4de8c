use media_store::StorageConfig;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub google: GoogleConfig,
    pub frontend: FrontendConfig,
    pub admin: AdminConfig,
    pub email: EmailConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// Empty `url` selects the in-process session store
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    #[serde(default = "default_expiry_hours")]
    pub expiry_hours: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    /// Callback URL registered with Google, e.g. `https://api.example.org/api/auth/login/callback`
    pub redirect_url: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrontendConfig {
    pub origin: String,
}

/// Who gets the admin role on sign-in
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// Comma-separated list of addresses
    #[serde(default)]
    pub emails: String,
    /// Comma-separated list of domains, with or without the leading `@`
    #[serde(default)]
    pub domains: String,
}

impl AdminConfig {
    pub fn is_admin_email(&self, email: &str) -> bool {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return false;
        }

        let listed = split_list(&self.emails).any(|e| e == email);
        let in_domain = split_list(&self.domains).any(|d| {
            let domain = d.trim_start_matches('@');
            email
                .rsplit_once('@')
                .map(|(_, host)| host == domain)
                .unwrap_or(false)
        });

        listed || in_domain
    }
}

fn split_list(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Empty host puts the mailer in no-op mode
    #[serde(default)]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub from: String,
    /// Where contact-form messages are delivered
    pub org_inbox: String,
    #[serde(default = "default_true")]
    pub use_starttls: bool,
    /// Public site linked from decision emails
    pub site_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_media")]
    pub max_media_per_post: usize,
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
}

impl UploadConfig {
    /// Largest request body a post submission can legitimately produce
    pub fn body_limit(&self) -> usize {
        self.max_file_bytes
            .saturating_mul(self.max_media_per_post + 1)
            .saturating_add(1024 * 1024)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5001
}

fn default_max_connections() -> u32 {
    10
}

fn default_expiry_hours() -> u64 {
    24
}

fn default_smtp_port() -> u16 {
    587
}

fn default_true() -> bool {
    true
}

fn default_max_media() -> usize {
    5
}

fn default_max_file_bytes() -> usize {
    50 * 1024 * 1024
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5001)?
            .set_default("database.url", "postgres://localhost/archive")?
            .set_default("database.max_connections", 10)?
            .set_default("redis.url", "")?
            .set_default("jwt.secret", "development-secret-change-in-production")?
            .set_default("jwt.expiry_hours", 24)?
            .set_default("google.client_id", "")?
            .set_default("google.client_secret", "")?
            .set_default(
                "google.redirect_url",
                "http://localhost:5001/api/auth/login/callback",
            )?
            .set_default("google.auth_url", "https://accounts.google.com/o/oauth2/v2/auth")?
            .set_default("google.token_url", "https://oauth2.googleapis.com/token")?
            .set_default(
                "google.userinfo_url",
                "https://openidconnect.googleapis.com/v1/userinfo",
            )?
            .set_default("frontend.origin", "http://localhost:3000")?
            .set_default("admin.emails", "")?
            .set_default("admin.domains", "")?
            .set_default("email.smtp_host", "")?
            .set_default("email.smtp_port", 587)?
            .set_default("email.from", "120 East State <noreply@120eaststate.org>")?
            .set_default("email.org_inbox", "120eaststate@gmail.com")?
            .set_default("email.use_starttls", true)?
            .set_default("email.site_url", "http://localhost:3000")?
            .set_default("storage.bucket", "archive-media")?
            .set_default("storage.region", "us-east-1")?
            .set_default("storage.base_url", "https://archive-media.s3.amazonaws.com")?
            .set_default("storage.prefix", "archive")?
            .set_default("uploads.max_media_per_post", 5)?
            .set_default("uploads.max_file_bytes", 50 * 1024 * 1024)?
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

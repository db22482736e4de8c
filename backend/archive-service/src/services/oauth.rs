//! Google OAuth 2.0 authorization-code flow

use std::time::Duration;

use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Url;
use serde::Deserialize;

use crate::config::GoogleConfig;
use crate::error::{AppError, Result};

const STATE_LENGTH: usize = 32;
const HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
}

/// Subset of the OpenID Connect userinfo document we rely on
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUserInfo {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

impl GoogleUserInfo {
    /// Google omits the flag for some account types; only an explicit `false` counts
    pub fn is_unverified(&self) -> bool {
        self.email_verified == Some(false)
    }

    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self
                .email
                .split('@')
                .next()
                .unwrap_or_default()
                .to_string(),
        }
    }
}

#[derive(Clone)]
pub struct GoogleOAuth {
    http: reqwest::Client,
    config: GoogleConfig,
}

impl GoogleOAuth {
    pub fn new(config: &GoogleConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;

        if config.client_id.is_empty() {
            tracing::warn!("google.client_id is empty; sign-in will fail until it is configured");
        }

        Ok(Self {
            http,
            config: config.clone(),
        })
    }

    pub fn generate_state() -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(STATE_LENGTH)
            .map(char::from)
            .collect()
    }

    pub fn authorization_url(&self, state: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &self.config.auth_url,
            &[
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", "openid email profile"),
                ("state", state),
                ("prompt", "select_account"),
            ],
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid google.auth_url: {}", e)))?;

        Ok(url.into())
    }

    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("code", code),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("redirect_uri", self.config.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AppError::Upstream(format!("Malformed token response: {}", e)))
    }

    pub async fn fetch_userinfo(&self, access_token: &str) -> Result<GoogleUserInfo> {
        let response = self
            .http
            .get(&self.config.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Userinfo request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "Userinfo endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<GoogleUserInfo>()
            .await
            .map_err(|e| AppError::Upstream(format!("Malformed userinfo response: {}", e)))
    }
}

use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::config::{Config, JwtConfig};
use crate::error::{AppError, Result};
use crate::middleware::Claims;
use crate::models::User;

/// Issues and checks the HS256 tokens handed to the browser after sign-in
pub struct AuthService {
    jwt: JwtConfig,
}

impl AuthService {
    pub fn new(config: &Config) -> Self {
        Self::from_jwt(&config.jwt)
    }

    pub fn from_jwt(jwt: &JwtConfig) -> Self {
        Self { jwt: jwt.clone() }
    }

    pub fn issue_token(&self, user: &User) -> Result<String> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.jwt.expiry_hours as i64);

        let claims = Claims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role(),
            profile_pic: user.profile_pic.clone(),
            iat: now.timestamp() as usize,
            exp: exp.timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Token generation failed: {}", e)))
    }

    /// Any decoding or validation failure is reported as `Unauthorized`
    pub fn decode_token(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "rejected bearer token");
            AppError::Unauthorized
        })
    }

    /// Time left before the token expires on its own
    pub fn remaining_lifetime(claims: &Claims) -> StdDuration {
        let now = Utc::now().timestamp().max(0) as u64;
        StdDuration::from_secs((claims.exp as u64).saturating_sub(now))
    }
}

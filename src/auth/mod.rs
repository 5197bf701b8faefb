use actix_web::HttpMessage;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::AuthConfig;
use crate::errors::AppError;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // User ID
    pub iat: i64,    // Issued at
    pub exp: i64,    // Expiration time
    pub iss: String, // Issuer
}

const ISSUER: &str = "wildtrails-tours";

/// Signing, verification and hashing primitives for the credential manager.
/// Session tokens are not persisted; everything needed to verify one is in
/// the token itself plus the account record.
pub struct AuthService {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Hash a password using bcrypt. Deliberately CPU-expensive; the cost
    /// factor is part of the brute-force resistance contract.
    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        Ok(bcrypt::hash(password, self.config.bcrypt_cost)?)
    }

    /// Verify a password against its stored hash
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        Ok(bcrypt::verify(password, hash)?)
    }

    /// Issue a session token for a user id
    pub fn sign_token(&self, user_id: &str) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.config.jwt_expires_in_hours)).timestamp(),
            iss: ISSUER.to_string(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::unexpected(format!("token signing error: {}", e)))
    }

    /// Validate signature and expiry, returning the decoded claims.
    /// Any failure is an authentication failure; callers decide whether
    /// that halts the request (strict) or is swallowed (lenient).
    pub fn decode_token(&self, token: &str) -> Result<Claims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_required_spec_claims(&["exp", "sub", "iat"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| AppError::authentication("Invalid or expired session. Please log in again."))?;
        Ok(token_data.claims)
    }

    /// Seconds after issuance that a session token remains valid; used for
    /// the cookie lifetime.
    pub fn cookie_max_age_seconds(&self) -> i64 {
        self.config.jwt_cookie_expires_in_days * 24 * 60 * 60
    }

    pub fn reset_token_ttl(&self) -> Duration {
        Duration::minutes(self.config.reset_token_ttl_minutes)
    }

    /// Generate a password-reset token: the plaintext goes out-of-band to
    /// the user, only the hash is ever stored.
    pub fn generate_reset_token(&self) -> Result<(String, String), AppError> {
        let mut buf = [0u8; 32];
        getrandom::getrandom(&mut buf)
            .map_err(|e| AppError::unexpected(format!("OS RNG failure: {}", e)))?;

        let plaintext: String = buf.iter().map(|b| format!("{:02x}", b)).collect();
        let hash = hash_token(&plaintext);
        Ok((plaintext, hash))
    }
}

/// One-way hash used for reset tokens (SHA-256, hex)
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// True while a stored reset token is still redeemable: the presented hash
/// must match the stored one and the expiry must lie in the future. A
/// consumed token has both fields cleared and never verifies again.
pub fn reset_token_valid(
    stored_hash: Option<&str>,
    expires_at: Option<DateTime<Utc>>,
    presented_hash: &str,
    now: DateTime<Utc>,
) -> bool {
    stored_hash == Some(presented_hash) && matches!(expires_at, Some(exp) if exp > now)
}

/// True when the token was issued strictly before the password changed,
/// which invalidates it. No revocation list exists; this comparison is the
/// whole invalidation mechanism.
pub fn issued_before_password_change(
    issued_at: i64,
    password_changed_at: Option<DateTime<Utc>>,
) -> bool {
    match password_changed_at {
        Some(changed_at) => issued_at < changed_at.timestamp(),
        None => false,
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// Extract the session token from a request: `Authorization: Bearer` first,
/// then the `jwt` cookie. The same verification applies to both carriers.
pub fn extract_token_from_request(req: &impl HttpMessage) -> Option<String> {
    if let Some(auth_header) = req.headers().get("authorization") {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = extract_bearer_token(auth_str) {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = req.headers().get("cookie") {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(value) = cookie.strip_prefix("jwt=") {
                    return Some(value.to_string());
                }
            }
        }
    }

    None
}

//! Password reset tokens
//!
//! A token is bound to a fingerprint of the account's current password hash, so it
//! stops working as soon as the password changes.

use crate::models::User;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Reset links stay valid for three days.
pub const RESET_TIMEOUT_SECS: i64 = 3 * 24 * 60 * 60;

const RESET_PURPOSE: &str = "password_reset";

#[derive(Debug, Serialize, Deserialize)]
struct ResetClaims {
    sub: i64,
    fp: String,
    purpose: String,
    exp: i64,
}

fn fingerprint(user: &User) -> String {
    let mut hasher = Sha256::new();
    hasher.update(user.id.to_be_bytes());
    hasher.update(user.password_hash.as_bytes());
    hex::encode(&hasher.finalize()[..16])
}

#[derive(Clone)]
pub struct ResetTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl ResetTokens {
    pub fn new(secret: &str) -> Self {
        // Domain-separate from session tokens signed with the same secret.
        let key = format!("{}:{}", RESET_PURPOSE, secret);
        Self {
            encoding: EncodingKey::from_secret(key.as_bytes()),
            decoding: DecodingKey::from_secret(key.as_bytes()),
        }
    }

    pub fn issue(&self, user: &User) -> Option<String> {
        self.issue_with_expiry(user, Utc::now().timestamp() + RESET_TIMEOUT_SECS)
    }

    fn issue_with_expiry(&self, user: &User, exp: i64) -> Option<String> {
        let claims = ResetClaims {
            sub: user.id,
            fp: fingerprint(user),
            purpose: RESET_PURPOSE.to_string(),
            exp,
        };
        match encode(&Header::new(Algorithm::HS256), &claims, &self.encoding) {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::error!(error = %e, user_id = user.id, "Reset token signing failed");
                None
            }
        }
    }

    /// Check `token` against the user's current state.
    pub fn check(&self, user: &User, token: &str) -> bool {
        let validation = Validation::new(Algorithm::HS256);
        match decode::<ResetClaims>(token, &self.decoding, &validation) {
            Ok(data) => {
                let claims = data.claims;
                claims.sub == user.id
                    && claims.purpose == RESET_PURPOSE
                    && claims.fp == fingerprint(user)
            }
            Err(_) => false,
        }
    }
}

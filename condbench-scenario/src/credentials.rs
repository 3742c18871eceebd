//! Auth tokens for the target's `POST /api/auth`
//!
//! Valid tokens are ES256 JWTs carrying `jia_user_id`. The remaining
//! signing methods produce the deliberately broken tokens used by the
//! negative-test matrix.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use thiserror::Error;

/// Public half of the signing key; the target verifies tokens with it
pub const PUBLIC_KEY_PEM: &str = include_str!("../keys/ec256-public.pem");

const PRIVATE_KEY_PEM: &[u8] = include_bytes!("../keys/ec256-private.pem");
const DUMMY_PRIVATE_KEY_PEM: &[u8] = include_bytes!("../keys/ec256-dummy-private.pem");
const HS256_SECRET: &[u8] = b"condbench-not-the-real-key";

/// Token lifetime after `iat`
pub const TOKEN_LIFETIME_SECS: i64 = 3600;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    #[error("Failed to encode claims: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Malformed token: {0}")]
    Malformed(String),
}

pub trait CredentialIssuer: Send + Sync {
    /// Valid token for `user_id` issued at `issued_at`
    fn sign(&self, user_id: &str, issued_at: DateTime<Utc>) -> Result<String, CredentialError>;

    /// Correct claims signed with HS256 instead of ES256
    fn sign_wrong_algorithm(
        &self,
        user_id: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, CredentialError>;

    /// Correct claims signed with a key the target does not trust
    fn sign_wrong_key(&self, user_id: &str, issued_at: DateTime<Utc>)
        -> Result<String, CredentialError>;

    /// Token for `user_id` whose payload was swapped for `other_user_id`'s
    /// after signing
    fn sign_tampered(
        &self,
        user_id: &str,
        other_user_id: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, CredentialError>;

    /// Validly signed token with no `jia_user_id` claim
    fn sign_without_user(&self, issued_at: DateTime<Utc>) -> Result<String, CredentialError>;

    /// Validly signed token whose `jia_user_id` is a number
    fn sign_invalid_claim_type(&self, issued_at: DateTime<Utc>)
        -> Result<String, CredentialError>;
}

#[derive(Serialize)]
struct Claims<'a> {
    jia_user_id: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Serialize)]
struct TimesOnly {
    iat: i64,
    exp: i64,
}

#[derive(Serialize)]
struct NumericUser {
    jia_user_id: i64,
    iat: i64,
    exp: i64,
}

fn times(issued_at: DateTime<Utc>) -> (i64, i64) {
    let iat = issued_at.timestamp();
    let exp = (issued_at + Duration::seconds(TOKEN_LIFETIME_SECS)).timestamp();
    (iat, exp)
}

/// ES256 issuer backed by the bundled key pair
pub struct JwtIssuer {
    key: EncodingKey,
    dummy_key: EncodingKey,
    hs256_key: EncodingKey,
}

impl JwtIssuer {
    pub fn new() -> Result<Self, CredentialError> {
        Ok(Self {
            key: EncodingKey::from_ec_pem(PRIVATE_KEY_PEM)?,
            dummy_key: EncodingKey::from_ec_pem(DUMMY_PRIVATE_KEY_PEM)?,
            hs256_key: EncodingKey::from_secret(HS256_SECRET),
        })
    }

    fn es256<T: Serialize>(&self, claims: &T, key: &EncodingKey) -> Result<String, CredentialError> {
        Ok(encode(&Header::new(Algorithm::ES256), claims, key)?)
    }
}

impl CredentialIssuer for JwtIssuer {
    fn sign(&self, user_id: &str, issued_at: DateTime<Utc>) -> Result<String, CredentialError> {
        let (iat, exp) = times(issued_at);
        self.es256(&Claims { jia_user_id: user_id, iat, exp }, &self.key)
    }

    fn sign_wrong_algorithm(
        &self,
        user_id: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, CredentialError> {
        let (iat, exp) = times(issued_at);
        Ok(encode(
            &Header::new(Algorithm::HS256),
            &Claims { jia_user_id: user_id, iat, exp },
            &self.hs256_key,
        )?)
    }

    fn sign_wrong_key(
        &self,
        user_id: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, CredentialError> {
        let (iat, exp) = times(issued_at);
        self.es256(&Claims { jia_user_id: user_id, iat, exp }, &self.dummy_key)
    }

    fn sign_tampered(
        &self,
        user_id: &str,
        other_user_id: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, CredentialError> {
        let token = self.sign(user_id, issued_at)?;
        let mut parts = token.split('.');
        let (header, signature) = match (parts.next(), parts.next(), parts.next()) {
            (Some(header), Some(_), Some(signature)) => (header, signature),
            _ => return Err(CredentialError::Malformed(token.clone())),
        };

        let (iat, exp) = times(issued_at);
        let forged = serde_json::to_vec(&Claims {
            jia_user_id: other_user_id,
            iat,
            exp,
        })?;
        Ok(format!("{}.{}.{}", header, URL_SAFE_NO_PAD.encode(forged), signature))
    }

    fn sign_without_user(&self, issued_at: DateTime<Utc>) -> Result<String, CredentialError> {
        let (iat, exp) = times(issued_at);
        self.es256(&TimesOnly { iat, exp }, &self.key)
    }

    fn sign_invalid_claim_type(
        &self,
        issued_at: DateTime<Utc>,
    ) -> Result<String, CredentialError> {
        let (iat, exp) = times(issued_at);
        self.es256(
            &NumericUser {
                jia_user_id: 12345,
                iat,
                exp,
            },
            &self.key,
        )
    }
}

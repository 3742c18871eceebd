//! Negative tests for `POST /api/auth`
//!
//! Eight credential cases the target must reject, each with its expected
//! status and body.

use crate::actions::auth_rejected;
use crate::credentials::CredentialIssuer;
use chrono::{DateTime, Duration, Utc};
use condbench_core::BenchError;
use condbench_http::Transport;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Serialize;
use std::fmt;

pub const FORBIDDEN_BODY: &str = "forbidden";
pub const INVALID_PAYLOAD_BODY: &str = "invalid JWT payload";

/// Not a JWT at all: a header and an empty payload
pub const MALFORMED_TOKEN: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthCase {
    WrongAlgorithm,
    Expired,
    MissingToken,
    WrongKey,
    MalformedToken,
    TamperedPayload,
    MissingClaim,
    WrongClaimType,
}

impl AuthCase {
    pub const ALL: [AuthCase; 8] = [
        AuthCase::WrongAlgorithm,
        AuthCase::Expired,
        AuthCase::MissingToken,
        AuthCase::WrongKey,
        AuthCase::MalformedToken,
        AuthCase::TamperedPayload,
        AuthCase::MissingClaim,
        AuthCase::WrongClaimType,
    ];

    /// Case `n mod 8`
    pub fn from_index(n: usize) -> Self {
        Self::ALL[n % Self::ALL.len()]
    }

    pub fn expected_status(&self) -> u16 {
        match self {
            AuthCase::MissingClaim | AuthCase::WrongClaimType => 400,
            AuthCase::WrongAlgorithm
            | AuthCase::Expired
            | AuthCase::MissingToken
            | AuthCase::WrongKey
            | AuthCase::MalformedToken
            | AuthCase::TamperedPayload => 403,
        }
    }

    pub fn expected_body(&self) -> &'static str {
        match self.expected_status() {
            400 => INVALID_PAYLOAD_BODY,
            _ => FORBIDDEN_BODY,
        }
    }

    /// Token to present, `None` for no `Authorization` header
    pub fn token(
        &self,
        issuer: &dyn CredentialIssuer,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<String>, BenchError> {
        let signed = match self {
            AuthCase::WrongAlgorithm => issuer.sign_wrong_algorithm(user_id, now),
            AuthCase::Expired => issuer.sign(user_id, now - Duration::days(365)),
            AuthCase::MissingToken => return Ok(None),
            AuthCase::WrongKey => issuer.sign_wrong_key(user_id, now),
            AuthCase::MalformedToken => return Ok(Some(MALFORMED_TOKEN.to_string())),
            AuthCase::TamperedPayload => {
                issuer.sign_tampered(user_id, &random_user_id(), now)
            }
            AuthCase::MissingClaim => issuer.sign_without_user(now),
            AuthCase::WrongClaimType => issuer.sign_invalid_claim_type(now),
        };
        signed
            .map(Some)
            .map_err(|e| BenchError::critical(format!("auth case {}: {}", self, e)))
    }
}

impl fmt::Display for AuthCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthCase::WrongAlgorithm => "wrong_algorithm",
            AuthCase::Expired => "expired",
            AuthCase::MissingToken => "missing_token",
            AuthCase::WrongKey => "wrong_key",
            AuthCase::MalformedToken => "malformed_token",
            AuthCase::TamperedPayload => "tampered_payload",
            AuthCase::MissingClaim => "missing_claim",
            AuthCase::WrongClaimType => "wrong_claim_type",
        };
        f.write_str(name)
    }
}

/// Run one case. A token that cannot be produced is a critical error.
pub async fn run_auth_case(
    transport: &dyn Transport,
    issuer: &dyn CredentialIssuer,
    user_id: &str,
    case: AuthCase,
) -> Vec<BenchError> {
    let token = match case.token(issuer, user_id, Utc::now()) {
        Ok(token) => token,
        Err(e) => return vec![e],
    };
    auth_rejected(
        transport,
        token.as_deref(),
        case.expected_status(),
        case.expected_body(),
    )
    .await
}

fn random_user_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::JwtIssuer;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use condbench_core::ErrorKind;
    use condbench_http::{HttpMethod, HttpResponse, MockTransport};

    #[test]
    fn test_index_wraps_modulo_eight() {
        for k in 0..8 {
            assert_eq!(AuthCase::from_index(k), AuthCase::from_index(k + 8));
            assert_eq!(AuthCase::from_index(k), AuthCase::from_index(k + 800));
        }
        assert_eq!(AuthCase::from_index(3), AuthCase::WrongKey);
    }

    #[test]
    fn test_expected_responses() {
        assert_eq!(AuthCase::WrongKey.expected_status(), 403);
        assert_eq!(AuthCase::WrongKey.expected_body(), "forbidden");
        assert_eq!(AuthCase::TamperedPayload.expected_status(), 403);
        assert_eq!(AuthCase::TamperedPayload.expected_body(), "forbidden");
        assert_eq!(AuthCase::MissingClaim.expected_status(), 400);
        assert_eq!(AuthCase::MissingClaim.expected_body(), "invalid JWT payload");
        assert_eq!(AuthCase::WrongClaimType.expected_status(), 400);
    }

    #[test]
    fn test_tokens() {
        let issuer = JwtIssuer::new().unwrap();
        let now = Utc::now();
        assert_eq!(AuthCase::MissingToken.token(&issuer, "u", now).unwrap(), None);
        assert_eq!(
            AuthCase::MalformedToken.token(&issuer, "u", now).unwrap().as_deref(),
            Some(MALFORMED_TOKEN)
        );
        for case in AuthCase::ALL {
            assert!(case.token(&issuer, "u", now).is_ok(), "{}", case);
        }
    }

    #[tokio::test]
    async fn test_run_case_against_conforming_target() {
        let issuer = JwtIssuer::new().unwrap();
        let mock = MockTransport::new();
        mock.add_handler(HttpMethod::Post, "/api/auth", |req| {
            let claims = req
                .headers
                .iter()
                .find(|(k, _)| k == "Authorization")
                .and_then(|(_, token)| token.split('.').nth(1).map(str::to_string))
                .and_then(|payload| URL_SAFE_NO_PAD.decode(payload).ok())
                .and_then(|bytes| serde_json::from_slice::<serde_json::Value>(&bytes).ok());
            // signature checks are out of reach here; only the payload shape
            let response = match claims {
                Some(claims) if !claims["jia_user_id"].is_string() => {
                    HttpResponse::new(400).with_body(INVALID_PAYLOAD_BODY)
                }
                _ => HttpResponse::new(403).with_body(FORBIDDEN_BODY),
            };
            Ok(response)
        });

        let errors = run_auth_case(&mock, &issuer, "u", AuthCase::MissingToken).await;
        assert!(errors.is_empty());
        let errors = run_auth_case(&mock, &issuer, "u", AuthCase::MissingClaim).await;
        assert!(errors.is_empty(), "{:?}", errors);
    }

    #[tokio::test]
    async fn test_accepting_target_is_flagged() {
        let issuer = JwtIssuer::new().unwrap();
        let mock = MockTransport::new();
        mock.add_mock(HttpMethod::Post, "/api/auth", HttpResponse::new(200));

        for case in AuthCase::ALL {
            let errors = run_auth_case(&mock, &issuer, "u", case).await;
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].kind(), ErrorKind::StatusMismatch);
        }
    }
}

mod common;

use chrono::{DateTime, Utc};
use common::FakeTarget;
use condbench_core::{BenchError, UserKind, VirtualUser};
use condbench_http::HttpAgent;
use condbench_scenario::actions::{auth, get_me};
use condbench_scenario::{run_auth_case, AuthCase, CredentialError, CredentialIssuer, JwtIssuer};

async fn signed_in(fake: &FakeTarget, issuer: &JwtIssuer) -> (HttpAgent, VirtualUser) {
    let user = VirtualUser::new(UserKind::Normal);
    let agent = HttpAgent::new(fake.http_config()).unwrap();
    let token = issuer.sign(&user.user_id, Utc::now()).unwrap();
    let outcome = auth(&agent, &token).await;
    assert!(outcome.is_ok(), "{:?}", outcome.errors);
    (agent, user)
}

#[tokio::test]
async fn test_every_auth_case_is_rejected_as_expected() {
    let fake = FakeTarget::start().await.unwrap();
    let issuer = JwtIssuer::new().unwrap();
    let (agent, user) = signed_in(&fake, &issuer).await;

    for case in AuthCase::ALL {
        let errors = run_auth_case(&agent, &issuer, &user.user_id, case).await;
        assert!(errors.is_empty(), "{}: {:?}", case, errors);
    }

    // rejected attempts leave the existing session alone
    let me = get_me(&agent).await;
    assert!(me.is_ok(), "{:?}", me.errors);
    assert_eq!(me.value.unwrap().jia_user_id, user.user_id);
}

#[tokio::test]
async fn test_status_and_body_per_case() {
    let fake = FakeTarget::start().await.unwrap();
    let issuer = JwtIssuer::new().unwrap();
    let (agent, user) = signed_in(&fake, &issuer).await;

    assert_eq!(AuthCase::WrongKey.expected_status(), 403);
    assert_eq!(AuthCase::TamperedPayload.expected_body(), "forbidden");
    assert_eq!(AuthCase::MissingClaim.expected_status(), 400);
    assert_eq!(AuthCase::MissingClaim.expected_body(), "invalid JWT payload");

    for case in [AuthCase::WrongKey, AuthCase::TamperedPayload, AuthCase::MissingClaim] {
        assert!(run_auth_case(&agent, &issuer, &user.user_id, case).await.is_empty());
    }
}

#[tokio::test]
async fn test_accepting_target_is_reported() {
    let fake = FakeTarget::start().await.unwrap();
    let issuer = JwtIssuer::new().unwrap();
    let agent = HttpAgent::new(fake.http_config()).unwrap();

    // a valid token is answered with 200, which this case must flag
    struct ValidIssuer(JwtIssuer);
    impl CredentialIssuer for ValidIssuer {
        fn sign(&self, user_id: &str, at: DateTime<Utc>) -> Result<String, CredentialError> {
            self.0.sign(user_id, at)
        }
        fn sign_wrong_algorithm(&self, user_id: &str, at: DateTime<Utc>) -> Result<String, CredentialError> {
            self.0.sign(user_id, at)
        }
        fn sign_wrong_key(&self, user_id: &str, at: DateTime<Utc>) -> Result<String, CredentialError> {
            self.0.sign(user_id, at)
        }
        fn sign_tampered(&self, user_id: &str, _other: &str, at: DateTime<Utc>) -> Result<String, CredentialError> {
            self.0.sign(user_id, at)
        }
        fn sign_without_user(&self, at: DateTime<Utc>) -> Result<String, CredentialError> {
            self.0.sign("someone", at)
        }
        fn sign_invalid_claim_type(&self, at: DateTime<Utc>) -> Result<String, CredentialError> {
            self.0.sign("someone", at)
        }
    }

    let errors = run_auth_case(&agent, &ValidIssuer(issuer), "user", AuthCase::WrongKey).await;
    assert!(matches!(
        errors.as_slice(),
        [BenchError::StatusMismatch { actual: 200, .. }]
    ));
}

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use condbench_config::BenchConfig;
use condbench_core::{BenchError, UserKind, VirtualUser};
use condbench_http::{HttpAgent, HttpConfig};
use condbench_scenario::actions::auth;
use condbench_scenario::{run_auth_case, AuthCase, CredentialIssuer, JwtIssuer};
use serde_json::{json, Value};
use tracing::info;

/// Sign in a fresh user, then run `cases` negative cases round robin.
/// Returns one JSON line per case and whether all of them passed.
pub async fn auth_check_command(config: &BenchConfig, cases: usize) -> Result<(Vec<Value>, bool)> {
    let agent = HttpAgent::new(HttpConfig::from(config.target.clone()))
        .context("Failed to create HTTP agent")?;
    let issuer = JwtIssuer::new().context("Failed to load signing keys")?;
    let user = VirtualUser::new(UserKind::Normal);

    let token = issuer.sign(&user.user_id, Utc::now())?;
    let signed_in = auth(&agent, &token).await;
    if !signed_in.is_ok() {
        let reasons: Vec<String> = signed_in.errors.iter().map(ToString::to_string).collect();
        return Err(anyhow!("Could not sign in {}: {}", user.user_id, reasons.join("; ")));
    }
    info!("Signed in as {}", user.user_id);

    let mut lines = Vec::with_capacity(cases);
    let mut passed = true;
    for n in 0..cases {
        let case = AuthCase::from_index(n);
        let errors: Vec<BenchError> = run_auth_case(&agent, &issuer, &user.user_id, case).await;
        passed &= errors.is_empty();
        lines.push(json!({
            "case": case,
            "expected_status": case.expected_status(),
            "passed": errors.is_empty(),
            "errors": errors,
        }));
    }
    Ok((lines, passed))
}

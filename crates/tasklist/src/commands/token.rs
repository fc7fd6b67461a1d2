//! Token command - mints a bearer token signed with the configured secret.
//!
//! Useful for calling the backend directly during development without going
//! through the identity provider and the session bridge.

use std::time::Duration;

use anyhow::Result;
use clap::Args;

use tasklist_server::TokenVerifier;

use super::Context;

/// Arguments for the token command.
#[derive(Args, Debug)]
pub struct TokenArgs {
    /// Subject (user id) the token is issued for
    #[arg(short, long)]
    pub subject: String,

    /// Lifetime in seconds
    #[arg(long, default_value = "3600")]
    pub ttl: u64,

    /// Shared signing secret (overrides config)
    #[arg(long)]
    pub jwt_secret: Option<String>,
}

/// Run the token command.
pub async fn run(args: TokenArgs, ctx: &Context) -> Result<()> {
    let mut config = ctx.load_config()?;
    if let Some(secret) = args.jwt_secret {
        config.auth.get_or_insert_with(Default::default).jwt_secret = Some(secret);
    }

    let auth = config.auth();
    let Some(secret) = auth.jwt_secret.as_deref().filter(|s| !s.is_empty()) else {
        anyhow::bail!("No signing secret: set [auth] jwt_secret, TASKLIST_JWT_SECRET or --jwt-secret");
    };
    let mut verifier = TokenVerifier::new(secret);
    if let Some(audience) = auth.audience {
        verifier = verifier.with_audience(audience);
    }
    if let Some(issuer) = auth.issuer {
        verifier = verifier.with_issuer(issuer);
    }

    let token = verifier.issue(&args.subject, Duration::from_secs(args.ttl))?;

    if ctx.json_output {
        let claims = verifier.verify(&token)?;
        let expires_at = i64::try_from(claims.exp)
            .ok()
            .and_then(|exp| chrono::DateTime::from_timestamp(exp, 0))
            .map(|at| at.to_rfc3339());
        println!(
            "{}",
            serde_json::json!({
                "token": token,
                "subject": args.subject,
                "exp": claims.exp,
                "expires_at": expires_at,
            })
        );
    } else {
        println!("{}", token);
    }

    Ok(())
}

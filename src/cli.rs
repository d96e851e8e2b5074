//! Command line entry point
//!
//! With tokens as arguments each one is validated and its claims printed;
//! without arguments the HTTP endpoint is served.

use std::io::Write;

use clap::Parser;

use crate::server;
use crate::server::ServerConfig;
use crate::verifier::Validator;
use crate::verifier::VerifyJwt;

/// Validate Cloudflare Access JWTs, or serve an endpoint that does
///
/// Reads the team name from `CF_ACCESS_TEAM` and the application AUD tag
/// from `CF_ACCESS_AUD`.
#[derive(Debug, Parser)]
#[command(name = "cf-access", version, about)]
pub struct Cli {
    /// Tokens to validate. When empty, an HTTP server is started instead.
    pub tokens: Vec<String>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let validator = Validator::from_env()?;

        if self.tokens.is_empty() {
            server::serve(validator, ServerConfig::from_env()).await?;
            return Ok(());
        }

        let stdout = std::io::stdout();
        validate_all(&validator, &self.tokens, &mut stdout.lock()).await
    }
}

/// Validate the tokens in order, writing each token's claims as JSON.
/// Stops at the first invalid token.
pub async fn validate_all<V, W>(validator: &V, tokens: &[String], out: &mut W) -> anyhow::Result<()>
where
    V: VerifyJwt,
    V::Identity: serde::Serialize,
    W: Write,
{
    for token in tokens {
        let claims = validator.verify(token).await?;
        writeln!(out, "{}", serde_json::to_string_pretty(&claims)?)?;
    }
    Ok(())
}

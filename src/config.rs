use std::time::Duration;

use reqwest::Client;

use crate::error::Error;
use crate::error::Result;

const TEAM_ENV: &str = "CF_ACCESS_TEAM";
const AUDIENCE_ENV: &str = "CF_ACCESS_AUD";

const CERTS_PATH: &str = "/cdn-cgi/access/certs";

const DEFAULT_JWKS_CACHE_TTL_SECS: u64 = 600;
const DEFAULT_REFRESH_COOLDOWN_SECS: u64 = 30;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 5;

/// Configuration for the Cloudflare Access [`Validator`](crate::Validator)
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Base URL of the team, e.g. `https://myteam.cloudflareaccess.com`.
    /// Doubles as the expected issuer.
    pub(crate) team_domain: String,
    /// The application's AUD tag. Only one audience is supported.
    pub(crate) audience: String,
    /// Maximum age of a cached key set (default: 10 minutes)
    pub(crate) jwks_cache_ttl: Duration,
    /// Minimum time between refreshes caused by unknown key ids (default: 30 seconds)
    pub(crate) refresh_cooldown: Duration,
    /// Upper bound for a single key set fetch (default: 5 seconds)
    pub(crate) fetch_timeout: Duration,
    /// Clock skew tolerated on `exp` and `nbf` (default: none)
    pub(crate) leeway: Duration,
    /// Optional custom HTTP client for fetching the key set
    /// If not provided, a default client will be created
    pub(crate) http_client: Option<Client>,
}

impl ValidatorConfig {
    /// Create a configuration for the given team name (e.g. `myteam`) and AUD tag
    pub fn new(team_name: &str, audience: impl Into<String>) -> Self {
        Self::with_team_domain(format!("https://{team_name}.cloudflareaccess.com"), audience)
    }

    /// Create a configuration with an explicit team domain instead of deriving
    /// it from the team name
    pub fn with_team_domain(team_domain: impl Into<String>, audience: impl Into<String>) -> Self {
        let team_domain = team_domain.into().trim_end_matches('/').to_string();

        Self {
            team_domain,
            audience: audience.into(),
            jwks_cache_ttl: Duration::from_secs(DEFAULT_JWKS_CACHE_TTL_SECS),
            refresh_cooldown: Duration::from_secs(DEFAULT_REFRESH_COOLDOWN_SECS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            leeway: Duration::ZERO,
            http_client: None,
        }
    }

    /// Create a configuration from `CF_ACCESS_TEAM` and `CF_ACCESS_AUD` in the
    /// process environment
    ///
    /// # Errors
    /// Returns `Error::MissingEnv` if either variable is unset or empty
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env), reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &'static str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or(Error::MissingEnv(name))
        };

        let team_name = var(TEAM_ENV)?;
        let audience = var(AUDIENCE_ENV)?;
        Ok(Self::new(&team_name, audience))
    }

    /// Set the maximum age of the cached key set
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.jwks_cache_ttl = ttl;
        self
    }

    /// Set the minimum interval between refreshes triggered by unknown key ids
    pub fn with_refresh_cooldown(mut self, cooldown: Duration) -> Self {
        self.refresh_cooldown = cooldown;
        self
    }

    /// Set the timeout applied to each key set fetch
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Set the clock skew tolerated when checking `exp` and `nbf`
    pub fn with_leeway(mut self, leeway: Duration) -> Self {
        self.leeway = leeway;
        self
    }

    /// Set a custom HTTP client
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// The expected `iss` claim
    pub fn issuer(&self) -> &str {
        &self.team_domain
    }

    /// The expected `aud` entry
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Where the team publishes its signing keys
    pub fn certs_url(&self) -> String {
        format!("{}{CERTS_PATH}", self.team_domain)
    }
}

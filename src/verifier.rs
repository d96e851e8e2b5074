use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::decode;
use jsonwebtoken::decode_header;
use jsonwebtoken::jwk::AlgorithmParameters;
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::jwk::RSAKeyParameters;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::Validation;
use tracing::debug;

use crate::claims::AccessPayload;
use crate::claims::Claims;
use crate::config::ValidatorConfig;
use crate::error::validation_error;
use crate::error::Error;
use crate::error::Result;
use crate::jwks_cache::JwksCache;

/// Trait for JWT verification
#[async_trait]
pub trait VerifyJwt: Send + Sync {
    /// The type of identity information extracted from the JWT
    type Identity: Send;

    /// Verify a JWT token and extract the identity information
    async fn verify(&self, token: &str) -> Result<Self::Identity>;

    /// Like [`verify`](Self::verify), but any failure yields `None`
    async fn verify_or_none(&self, token: &str) -> Option<Self::Identity> {
        match self.verify(token).await {
            Ok(identity) => Some(identity),
            Err(error) => {
                debug!(%error, "JWT rejected");
                None
            }
        }
    }
}

/// Validator for Cloudflare Access JWTs
///
/// Checks the signature against the team's published keys, the issuer
/// against the team domain, the audience against the application's AUD tag,
/// and the token's validity window, then narrows the payload into
/// [`Claims`].
pub struct Validator {
    jwks_cache: JwksCache,
    expected_issuer: String,
    expected_audience: String,
    leeway: i64,
}

impl Validator {
    /// Create a validator for the given team name (e.g. `myteam`) and AUD tag
    pub fn new(team_name: &str, audience: impl Into<String>) -> Self {
        Self::from_config(ValidatorConfig::new(team_name, audience))
    }

    /// Create a validator from `CF_ACCESS_TEAM` and `CF_ACCESS_AUD`
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_config(ValidatorConfig::from_env()?))
    }

    /// Create a validator with the given configuration
    pub fn from_config(config: ValidatorConfig) -> Self {
        Self {
            jwks_cache: JwksCache::new(&config),
            leeway: i64::try_from(config.leeway.as_secs()).unwrap_or(i64::MAX),
            expected_issuer: config.team_domain,
            expected_audience: config.audience,
        }
    }

    /// The `iss` value tokens must carry
    pub fn issuer(&self) -> &str {
        &self.expected_issuer
    }

    /// The AUD tag tokens must list in `aud`
    pub fn audience(&self) -> &str {
        &self.expected_audience
    }

    /// Validate the JWT token with full signature verification
    fn validate_jwt(&self, token: &str, alg: Algorithm, jwk: &Jwk) -> Result<Claims> {
        let decoding_key = get_decoding_key(jwk)?;

        let mut validation = Validation::new(alg);
        validation.set_audience(&[&self.expected_audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        // Checked below so the window is half-open and the errors carry timestamps
        validation.validate_exp = false;
        validation.validate_nbf = false;

        let payload = decode::<AccessPayload>(token, &decoding_key, &validation)
            .map_err(validation_error)?
            .claims;

        if payload.iss != self.expected_issuer {
            return Err(Error::WrongIssuer(payload.iss));
        }

        let now = Utc::now().timestamp();

        if let Some(nbf) = payload.nbf {
            if nbf > now.saturating_add(self.leeway) {
                return Err(Error::TokenNotYetValid(nbf));
            }
        }

        if payload.exp <= now.saturating_sub(self.leeway) {
            return Err(Error::TokenExpired(payload.exp));
        }

        Claims::try_from(payload)
    }
}

#[async_trait]
impl VerifyJwt for Validator {
    type Identity = Claims;

    async fn verify(&self, token: &str) -> Result<Self::Identity> {
        if token.trim().is_empty() {
            return Err(Error::NotProvided);
        }

        let header = decode_header(token)?;
        let kid = header.kid.ok_or(Error::KeyIdMissing)?;
        let jwk = self.jwks_cache.get_key(&kid).await?;

        let claims = self.validate_jwt(token, header.alg, &jwk)?;
        debug!(kid = %kid, service = claims.as_service().is_some(), "JWT verified");
        Ok(claims)
    }
}

/// Get the decoding key for a published key. Symmetric keys are refused.
fn get_decoding_key(jwk: &Jwk) -> Result<DecodingKey> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(RSAKeyParameters { n, e, .. }) => {
            Ok(DecodingKey::from_rsa_components(n, e)?)
        }
        AlgorithmParameters::EllipticCurve(_) | AlgorithmParameters::OctetKeyPair(_) => {
            Ok(DecodingKey::from_jwk(jwk)?)
        }
        other_algo => Err(Error::AlgorithmNotSupported(format!("{other_algo:?}"))),
    }
}

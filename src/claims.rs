use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::Error;
use crate::error::Result;

/// The client information found in a validated Cloudflare Access JWT
///
/// Exactly one shape is produced per token, depending on how the client
/// authenticated. A token carrying a `common_name` came from a service
/// token, anything else must be an identity token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Claims {
    /// The user authenticated with an identity provider.
    Identity(IdentityClaims),
    /// The client authenticated with a service token.
    Service(ServiceClaims),
}

impl Claims {
    /// Fields shared by both shapes
    pub fn common(&self) -> &CommonClaims {
        match self {
            Claims::Identity(claims) => &claims.common,
            Claims::Service(claims) => &claims.common,
        }
    }

    pub fn as_identity(&self) -> Option<&IdentityClaims> {
        match self {
            Claims::Identity(claims) => Some(claims),
            Claims::Service(_) => None,
        }
    }

    pub fn as_service(&self) -> Option<&ServiceClaims> {
        match self {
            Claims::Service(claims) => Some(claims),
            Claims::Identity(_) => None,
        }
    }
}

/// Claims present in both identity and service tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonClaims {
    /// The type of Access token.
    #[serde(rename = "type")]
    pub ty: TokenType,
    /// Application audience (AUD) tags the token is scoped to.
    pub aud: Vec<String>,
    /// The Cloudflare Access team domain that issued the token.
    pub iss: String,
    /// Expiration time as Unix timestamp
    pub exp: i64,
    /// Issuance time as Unix timestamp
    pub iat: i64,
    /// Custom data set by the authorization settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<Value>,
}

/// The information in the JWT when authenticating with an identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityClaims {
    #[serde(flatten)]
    pub common: CommonClaims,
    /// The email address of the authenticated user, verified by the identity
    /// provider.
    pub email: String,
    /// Not-before time as Unix timestamp
    pub nbf: i64,
    /// A cache key used to get the user's identity.
    pub identity_nonce: String,
    /// The ID of the user.
    ///
    /// Unique to an email address per account. A user removed and re-added
    /// to the organization gets a new one.
    pub sub: Uuid,
    /// The country where the user authenticated from.
    pub country: String,
}

/// The information in the JWT when authenticating with a service token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceClaims {
    #[serde(flatten)]
    pub common: CommonClaims,
    /// The Client ID of the service token (`CF-Access-Client-Id`).
    pub common_name: String,
}

/// The type of Access token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenType {
    /// An application token.
    #[serde(rename = "app")]
    Application,
    /// A global session token.
    #[serde(rename = "org")]
    Global,
}

impl From<IdentityClaims> for Claims {
    fn from(value: IdentityClaims) -> Self {
        Claims::Identity(value)
    }
}

impl From<ServiceClaims> for Claims {
    fn from(value: ServiceClaims) -> Self {
        Claims::Service(value)
    }
}

/// The JWT payload as issued, before it is narrowed into [`Claims`]
///
/// Every shape-specific field is optional here so that the shape can be
/// decided explicitly instead of by whichever serde variant happens to fit.
#[derive(Debug, Deserialize)]
pub(crate) struct AccessPayload {
    #[serde(rename = "type")]
    pub ty: TokenType,
    #[serde(deserialize_with = "one_or_many")]
    pub aud: Vec<String>,
    pub iss: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub custom: Option<Value>,

    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub identity_nonce: Option<String>,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub country: Option<String>,

    #[serde(default)]
    pub common_name: Option<String>,
}

impl AccessPayload {
    fn has_identity_fields(&self) -> bool {
        self.email.is_some()
            || self.identity_nonce.is_some()
            || self.country.is_some()
            || self.sub.as_deref().is_some_and(|sub| !sub.is_empty())
    }
}

impl TryFrom<AccessPayload> for Claims {
    type Error = Error;

    fn try_from(payload: AccessPayload) -> Result<Self> {
        let service = payload
            .common_name
            .as_deref()
            .is_some_and(|name| !name.is_empty());

        if service && payload.has_identity_fields() {
            return Err(Error::AmbiguousClaims);
        }

        let common = CommonClaims {
            ty: payload.ty,
            aud: payload.aud,
            iss: payload.iss,
            exp: payload.exp,
            iat: payload.iat,
            custom: payload.custom,
        };

        if service {
            return Ok(ServiceClaims {
                common,
                common_name: payload.common_name.unwrap_or_default(),
            }
            .into());
        }

        let sub = payload
            .sub
            .filter(|sub| !sub.is_empty())
            .ok_or(Error::MissingClaim("sub"))?;

        Ok(IdentityClaims {
            common,
            email: payload.email.ok_or(Error::MissingClaim("email"))?,
            nbf: payload.nbf.ok_or(Error::MissingClaim("nbf"))?,
            identity_nonce: payload
                .identity_nonce
                .ok_or(Error::MissingClaim("identity_nonce"))?,
            sub: sub.parse()?,
            country: payload.country.ok_or(Error::MissingClaim("country"))?,
        }
        .into())
    }
}

/// Accepts `aud` as either a single string or a list of strings
fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(aud) => vec![aud],
        OneOrMany::Many(aud) => aud,
    })
}

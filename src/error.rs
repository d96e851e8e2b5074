use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("No Cloudflare Access JWT provided")]
    NotProvided,
    #[error("The provided JWT does not match the expected issuer. Provided issuer: {0}")]
    WrongIssuer(String),
    #[error("The provided JWT does not contain the expected audience")]
    InvalidAudience,
    #[error("The provided JWT has expired. Expiration timestamp: {0}")]
    TokenExpired(i64),
    #[error("The provided JWT is not valid yet. Not-before timestamp: {0}")]
    TokenNotYetValid(i64),
    #[error("Missing 'kid' in the header of the provided JWT")]
    KeyIdMissing,
    #[error("Key of your provided JWT does not match in JWKs")]
    KeyNotMatchInJwks,
    #[error("Only RSA, EC or OKP keys are supported, got: {0}")]
    AlgorithmNotSupported(String),
    #[error("JWKS cache error: {0}")]
    JwksCacheError(String),
    #[error("Missing '{0}' claim in an identity token")]
    MissingClaim(&'static str),
    #[error("Token carries both service token and identity claims")]
    AmbiguousClaims,
    #[error("Invalid 'sub' claim: {0}")]
    InvalidSubject(#[from] uuid::Error),
    #[error("Missing environment variable '{0}'")]
    MissingEnv(&'static str),
}

/// Maps the claim-validation failures reported by [`jsonwebtoken`] onto our
/// own variants so callers can match on them. Everything else stays a
/// [`Error::Jwt`].
pub(crate) fn validation_error(error: jsonwebtoken::errors::Error) -> Error {
    use jsonwebtoken::errors::ErrorKind;

    match error.kind() {
        ErrorKind::InvalidAudience => Error::InvalidAudience,
        _ => Error::Jwt(error),
    }
}

/// Message carried by [`Error::JwksCacheError`] when the key set cannot be fetched
pub(crate) fn fetch_failure_message(error: reqwest::Error) -> String {
    format!("Failed to fetch JWKS: {error}")
}

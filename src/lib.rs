//! # cf-access
//!
//! Validation of the JWTs Cloudflare Access attaches to requests it lets
//! through to a protected application.
//!
//! ## Features
//!
//! - Signature verification against the team's published keys
//! - Lazy fetching of `https://<team>.cloudflareaccess.com/cdn-cgi/access/certs`
//! - Key set caching by key id, with refresh on unknown ids and a maximum age
//! - Issuer, audience, expiration and not-before validation
//! - Claims narrowed into either an identity token or a service token shape
//! - A CLI and an HTTP endpoint (`cf-access-jwt-assertion` header) on top
//!
//! ## Example
//!
//! ```rust,no_run
//! use cf_access::{Claims, Validator, VerifyJwt};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let validator = Validator::new("myteam", "4714c1358e65fe4b408ad6d432a5f878f08194bdb4752441fd56faefa9b2b6f2");
//!
//!     let token = "eyJhbGciOiJSUzI1NiIsImtpZCI6Ij...";
//!     match validator.verify(token).await? {
//!         Claims::Identity(identity) => println!("User: {}", identity.email),
//!         Claims::Service(service) => println!("Service token: {}", service.common_name),
//!     }
//!
//!     // Or, when a rejected token is not exceptional
//!     let claims = validator.verify_or_none(token).await;
//!     println!("Valid: {}", claims.is_some());
//!
//!     Ok(())
//! }
//! ```

mod claims;
mod config;
mod error;
mod jwks_cache;
mod verifier;

pub mod cli;
pub mod server;

// Re-exports for public API
pub use claims::Claims;
pub use claims::CommonClaims;
pub use claims::IdentityClaims;
pub use claims::ServiceClaims;
pub use claims::TokenType;
pub use config::ValidatorConfig;
pub use error::Error;
pub use error::Result;
pub use verifier::Validator;
pub use verifier::VerifyJwt;

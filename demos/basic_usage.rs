use std::time::Duration;

use cf_access::Claims;
use cf_access::Validator;
use cf_access::ValidatorConfig;
use cf_access::VerifyJwt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Placeholder, use the value of a real `cf-access-jwt-assertion` header
    let token = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "eyJhbGciOiJSUzI1NiIsImtpZCI6Ij...".to_string());

    // Example 1: Team name and AUD tag
    println!("=== Example 1: Simple Usage ===");
    let validator = Validator::new(
        "myteam",
        "4714c1358e65fe4b408ad6d432a5f878f08194bdb4752441fd56faefa9b2b6f2",
    );

    match validator.verify(&token).await {
        Ok(Claims::Identity(identity)) => {
            println!("✓ Token verified successfully!");
            println!("  User: {} ({})", identity.email, identity.sub);
            println!("  Country: {}", identity.country);
        }
        Ok(Claims::Service(service)) => {
            println!("✓ Token verified successfully!");
            println!("  Service token: {}", service.common_name);
        }
        Err(e) => {
            eprintln!("✗ Token verification failed: {}", e);
        }
    }

    println!();

    // Example 2: From CF_ACCESS_TEAM / CF_ACCESS_AUD
    println!("=== Example 2: Environment ===");
    match Validator::from_env() {
        Ok(validator) => {
            let claims = validator.verify_or_none(&token).await;
            println!("Valid: {}", claims.is_some());
        }
        Err(e) => eprintln!("✗ {}", e),
    }

    println!();

    // Example 3: Custom HTTP client and cache settings
    println!("=== Example 3: Custom Configuration ===");
    let custom_client = reqwest::Client::builder()
        .user_agent("cf-access-demo")
        .build()?;

    let config = ValidatorConfig::new("myteam", "my-aud-tag")
        .with_cache_ttl(Duration::from_secs(3600))
        .with_fetch_timeout(Duration::from_secs(2))
        .with_leeway(Duration::from_secs(30))
        .with_http_client(custom_client);
    println!("Keys published at {}", config.certs_url());

    let validator = Validator::from_config(config);
    if let Some(claims) = validator.verify_or_none(&token).await {
        println!("{}", serde_json::to_string_pretty(&claims)?);
    }

    Ok(())
}

//! One-shot webhook configuration for a provider number.
//!
//! Usage: voiceline-configure <primary-url> <fallback-url> [number]
//!
//! The number defaults to TWILIO_PHONE_NUMBER. Credentials come from the
//! environment or .env, as for the main server.

use voiceline::config::ProviderCredentials;
use voiceline::configurator::{RouteConfig, configure};
use voiceline::error::ProviderError;
use voiceline::provider::ProviderClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let credentials = ProviderCredentials::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let mut args = std::env::args().skip(1);
    let (Some(primary_url), Some(fallback_url)) = (args.next(), args.next()) else {
        eprintln!("Usage: voiceline-configure <primary-url> <fallback-url> [number]");
        eprintln!("  e.g. voiceline-configure https://host:8083/voice https://host:8084/");
        std::process::exit(2);
    };
    let number = args
        .next()
        .unwrap_or_else(|| credentials.phone_number.clone());

    let route = RouteConfig {
        number,
        primary_url,
        fallback_url,
    };

    let client = ProviderClient::new(credentials);
    match configure(&client, &route).await {
        Ok(number_sid) => {
            println!(
                "✅ {} ({}) now routes to {} (fallback: {})",
                route.number, number_sid, route.primary_url, route.fallback_url
            );
            Ok(())
        }
        Err(ProviderError::NumberNotFound { number, available }) => {
            eprintln!("❌ Phone number {number} not found on this account.");
            if available.is_empty() {
                eprintln!("   The account has no incoming numbers.");
            } else {
                eprintln!("   Available numbers:");
                for n in available {
                    eprintln!("   - {n}");
                }
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("❌ Configuration failed: {e}");
            std::process::exit(1);
        }
    }
}

//! Standalone fallback responder.
//!
//! Deployed as the number's voice fallback URL. Runs apart from the primary
//! server so a primary outage cannot take it down with it.

use voiceline::fallback::fallback_routes;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let port: u16 = std::env::var("VOICELINE_FALLBACK_PORT")
        .unwrap_or_else(|_| "8084".to_string())
        .parse()
        .unwrap_or(8084);

    eprintln!("📞 Voiceline fallback v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Serving the fixed document on http://0.0.0.0:{port}/ (any path)");
    eprintln!("   Health: http://0.0.0.0:{port}/health\n");

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!(port, "Fallback responder started");
    axum::serve(listener, fallback_routes()).await?;

    Ok(())
}

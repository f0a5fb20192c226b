use std::sync::Arc;
use std::time::Duration;

use voiceline::config::{FlowConfig, ProviderCredentials};
use voiceline::content::{ContentSource, StaticContent};
use voiceline::engine::{self, CallFlowEngine};
use voiceline::handlers::HandlerRegistry;
use voiceline::handlers::builtin::sms::{ContentQueryHandler, HelpHandler};
use voiceline::handlers::builtin::voice::{FarewellHandler, MenuHandler, SpeechQueryHandler};
use voiceline::routes::webhook_routes;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // Credentials are required before we accept any traffic.
    let credentials = ProviderCredentials::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        std::process::exit(1);
    });

    let port: u16 = std::env::var("VOICELINE_PORT")
        .unwrap_or_else(|_| "8083".to_string())
        .parse()
        .unwrap_or(8083);

    let max_turns: u32 = std::env::var("VOICELINE_MAX_TURNS")
        .unwrap_or_else(|_| "10".to_string())
        .parse()
        .unwrap_or(10);

    let idle_secs: u64 = std::env::var("VOICELINE_IDLE_TIMEOUT_SECS")
        .unwrap_or_else(|_| "600".to_string())
        .parse()
        .unwrap_or(600);

    let voice_path =
        std::env::var("VOICELINE_VOICE_PATH").unwrap_or_else(|_| "/voice".to_string());
    let sms_path = std::env::var("VOICELINE_SMS_PATH").unwrap_or_else(|_| "/sms".to_string());

    let config = FlowConfig {
        max_turns,
        idle_timeout: Duration::from_secs(idle_secs),
        // Relative action URL: the provider resolves it against this document's URL.
        voice_url: voice_path.clone(),
        ..FlowConfig::default()
    };

    eprintln!("📞 Voiceline v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Account: {}...", credentials.sid_prefix());
    eprintln!("   Number: {}", credentials.phone_number);
    eprintln!("   Voice webhook: http://0.0.0.0:{port}{voice_path}");
    eprintln!("   SMS webhook: http://0.0.0.0:{port}{sms_path}");
    eprintln!("   Max turns: {max_turns}, idle timeout: {idle_secs}s\n");

    // ── Handlers ─────────────────────────────────────────────────────────
    // Registered before the listener starts; the registry is read-only
    // afterwards.
    let content: Arc<dyn ContentSource> = Arc::new(StaticContent);
    let mut registry = HandlerRegistry::new();
    registry.register_call_handler(Arc::new(FarewellHandler::new(config.goodbye.clone())));
    registry.register_call_handler(Arc::new(MenuHandler::new(Arc::clone(&content))));
    registry.register_call_handler(Arc::new(SpeechQueryHandler::new(Arc::clone(&content))));
    registry.register_message_handler(Arc::new(HelpHandler));
    registry.register_message_handler(Arc::new(ContentQueryHandler::new(content)));
    eprintln!(
        "   Handlers: {} call, {} message",
        registry.call_handler_count(),
        registry.message_handler_count()
    );

    // ── Engine ───────────────────────────────────────────────────────────
    let engine = CallFlowEngine::new(config, Arc::new(registry));
    let _eviction_handle = engine::spawn_eviction_task(Arc::clone(&engine));

    let app = webhook_routes(engine, &voice_path, &sms_path);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!(port, "Voice webhook server started");
    axum::serve(listener, app).await?;

    Ok(())
}

//! Integration tests for the webhook configurator against a stub provider
//! API server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Form, Path, Query, State},
    routing::{get, post},
};
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio::time::timeout;

use voiceline::config::ProviderCredentials;
use voiceline::configurator::{RouteConfig, configure};
use voiceline::error::ProviderError;
use voiceline::provider::ProviderClient;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Stub of the provider's incoming-phone-number API.
#[derive(Clone)]
struct StubState {
    /// (number sid, phone number) pairs the account owns.
    numbers: Arc<Vec<(String, String)>>,
    /// Recorded update calls: (path sid, form fields).
    updates: Arc<Mutex<Vec<(String, HashMap<String, String>)>>>,
}

async fn list_numbers(
    State(state): State<StubState>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let filter = query.get("PhoneNumber");
    let numbers: Vec<serde_json::Value> = state
        .numbers
        .iter()
        .filter(|(_, phone)| filter.is_none_or(|f| f == phone))
        .map(|(sid, phone)| {
            serde_json::json!({
                "sid": sid,
                "phone_number": phone,
                "voice_url": "http://old.example/voice"
            })
        })
        .collect();
    Json(serde_json::json!({ "incoming_phone_numbers": numbers }))
}

async fn update_number(
    State(state): State<StubState>,
    Path((_account, number_sid)): Path<(String, String)>,
    Form(form): Form<HashMap<String, String>>,
) -> Json<serde_json::Value> {
    let sid = number_sid.trim_end_matches(".json").to_string();
    state.updates.lock().unwrap().push((sid.clone(), form));
    Json(serde_json::json!({ "sid": sid }))
}

/// Start the stub provider; returns its base URL and recorded updates.
async fn start_stub(
    numbers: Vec<(&str, &str)>,
) -> (String, Arc<Mutex<Vec<(String, HashMap<String, String>)>>>) {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let state = StubState {
        numbers: Arc::new(
            numbers
                .into_iter()
                .map(|(sid, phone)| (sid.to_string(), phone.to_string()))
                .collect(),
        ),
        updates: Arc::clone(&updates),
    };

    let app = Router::new()
        .route(
            "/2010-04-01/Accounts/{account}/IncomingPhoneNumbers.json",
            get(list_numbers),
        )
        .route(
            "/2010-04-01/Accounts/{account}/IncomingPhoneNumbers/{number}",
            post(update_number),
        )
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://127.0.0.1:{port}"), updates)
}

fn client_for(base_url: &str) -> ProviderClient {
    ProviderClient::new(ProviderCredentials {
        account_sid: "ACtest".to_string(),
        auth_token: SecretString::from("token"),
        phone_number: "+15551234567".to_string(),
    })
    .with_base_url(base_url)
}

fn route(number: &str) -> RouteConfig {
    RouteConfig {
        number: number.to_string(),
        primary_url: "http://h/primary".to_string(),
        fallback_url: "http://h/fallback".to_string(),
    }
}

#[tokio::test]
async fn unknown_number_reports_not_found_without_mutating() {
    timeout(TEST_TIMEOUT, async {
        let (base, updates) =
            start_stub(vec![("PN1", "+15550000001"), ("PN2", "+15550000002")]).await;
        let client = client_for(&base);

        let err = configure(&client, &route("+1999"))
            .await
            .expect_err("number should not exist");

        match err {
            ProviderError::NumberNotFound { number, available } => {
                assert_eq!(number, "+1999");
                assert_eq!(available, vec!["+15550000001", "+15550000002"]);
            }
            other => panic!("expected NumberNotFound, got {other:?}"),
        }

        assert!(updates.lock().unwrap().is_empty(), "no update may happen");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn configure_sets_primary_and_fallback_and_clears_status_callback() {
    timeout(TEST_TIMEOUT, async {
        let (base, updates) = start_stub(vec![("PN42", "+15551234567")]).await;
        let client = client_for(&base);

        let sid = configure(&client, &route("+15551234567")).await.unwrap();
        assert_eq!(sid, "PN42");

        let recorded = updates.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        let (updated_sid, form) = &recorded[0];
        assert_eq!(updated_sid, "PN42");
        assert_eq!(form["VoiceUrl"], "http://h/primary");
        assert_eq!(form["VoiceMethod"], "POST");
        assert_eq!(form["VoiceFallbackUrl"], "http://h/fallback");
        assert_eq!(form["StatusCallback"], "");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn configure_is_idempotent() {
    timeout(TEST_TIMEOUT, async {
        let (base, updates) = start_stub(vec![("PN42", "+15551234567")]).await;
        let client = client_for(&base);

        configure(&client, &route("+15551234567")).await.unwrap();
        configure(&client, &route("+15551234567")).await.unwrap();

        let recorded = updates.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0], recorded[1]);
    })
    .await
    .expect("test timed out");
}

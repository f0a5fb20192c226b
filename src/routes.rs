//! Primary webhook endpoints.
//!
//! Every error path still answers with a valid, receivable document: internal
//! failures degrade to a spoken apology, never to a dropped call.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Form, State, rejection::FormRejection},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::{error, info, warn};

use crate::engine::{CallFlowEngine, terminal_plan};
use crate::error::FlowError;
use crate::event::{InboundEvent, MessageParams, VoiceParams};
use crate::twiml::{ResponsePlan, render_message_reply};

/// Spoken when an internal error made the real response impossible.
const APOLOGY_TEXT: &str =
    "Sorry, something went wrong on our end. Please call back later. Goodbye.";

/// Spoken when an event arrives for a call that is over or unknown.
const CALL_OVER_TEXT: &str = "This call has already ended. Goodbye.";

/// Pre-rendered apology document — the substitute of last resort, kept as a
/// literal so this path cannot itself fail. Checked against the renderer in
/// tests.
const APOLOGY_DOC: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
     <Response>\
     <Say voice=\"alice\">Sorry, something went wrong on our end. \
Please call back later. Goodbye.</Say>\
     <Hangup/>\
     </Response>";

/// Fixed reply when an inbound message could not be read.
const MESSAGE_ERROR_REPLY: &str = "Sorry, we couldn't read that message. Reply HELP for commands.";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<CallFlowEngine>,
}

/// Build the primary webhook router.
pub fn webhook_routes(engine: Arc<CallFlowEngine>, voice_path: &str, sms_path: &str) -> Router {
    Router::new()
        .route(voice_path, post(voice_webhook))
        .route(sms_path, post(sms_webhook))
        .route("/health", get(health))
        .with_state(AppState { engine })
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "voiceline"
    }))
}

fn xml_response(doc: String) -> Response {
    ([(header::CONTENT_TYPE, "text/xml")], doc).into_response()
}

/// Render a plan, substituting the fixed apology document if it violates an
/// invariant. Rendering the substitute cannot fail.
fn render_or_apology(plan: ResponsePlan) -> String {
    plan.render().unwrap_or_else(|e| {
        error!(error = %e, "Response plan rejected; substituting apology document");
        APOLOGY_DOC.to_string()
    })
}

async fn voice_webhook(
    State(state): State<AppState>,
    params: Result<Form<VoiceParams>, FormRejection>,
) -> Response {
    // A provider request we cannot read still gets a valid document back.
    let event = match params
        .map_err(|e| e.to_string())
        .and_then(|Form(p)| InboundEvent::from_voice(p).map_err(|e| e.to_string()))
    {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Invalid voice webhook payload");
            return xml_response(render_or_apology(terminal_plan(APOLOGY_TEXT)));
        }
    };

    info!(event = %event.summary(), "Voice webhook event");

    let plan = match state.engine.handle_voice(event).await {
        Ok(plan) => plan,
        Err(e @ (FlowError::InvalidState { .. } | FlowError::UnknownCall { .. })) => {
            warn!(error = %e, "Voice event rejected by the call flow");
            terminal_plan(CALL_OVER_TEXT)
        }
        Err(e) => {
            warn!(error = %e, "Voice event failed");
            terminal_plan(APOLOGY_TEXT)
        }
    };

    xml_response(render_or_apology(plan))
}

async fn sms_webhook(
    State(state): State<AppState>,
    params: Result<Form<MessageParams>, FormRejection>,
) -> Response {
    let event = params
        .map_err(|e| e.to_string())
        .and_then(|Form(p)| InboundEvent::from_message(p).map_err(|e| e.to_string()));

    let reply = match event {
        Ok(InboundEvent::MessageReceived { from, body }) => {
            info!(from = %from, "Message webhook event");
            state.engine.handle_message(&from, &body).await
        }
        Ok(_) | Err(_) => {
            warn!("Invalid message webhook payload");
            MESSAGE_ERROR_REPLY.to_string()
        }
    };

    let doc = render_message_reply(&reply).unwrap_or_else(|e| {
        error!(error = %e, "Message reply failed to render");
        format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{MESSAGE_ERROR_REPLY}</Message></Response>")
    });
    xml_response(doc)
}

//! Handler traits and the types they exchange.

use async_trait::async_trait;

use crate::error::HandlerError;

/// Captured caller input for one gather turn.
#[derive(Debug, Clone, Default)]
pub struct CallInput {
    pub call_id: String,
    /// Keyed digits, if the caller pressed any.
    pub digits: Option<String>,
    /// Transcribed speech, if the caller spoke.
    pub speech: Option<String>,
}

impl CallInput {
    /// Digits with surrounding whitespace removed.
    pub fn digits(&self) -> Option<&str> {
        self.digits.as_deref().map(str::trim)
    }

    /// Speech lowercased for phrase matching.
    pub fn speech_lower(&self) -> Option<String> {
        self.speech.as_deref().map(|s| s.trim().to_lowercase())
    }
}

/// What a call handler wants spoken back, and whether the flow should end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallReply {
    pub text: String,
    /// When set, the engine hangs up after speaking instead of gathering again.
    pub end_call: bool,
}

impl CallReply {
    /// Reply and keep the conversation going.
    pub fn speak(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            end_call: false,
        }
    }

    /// Reply and end the call.
    pub fn farewell(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            end_call: true,
        }
    }
}

/// Handles gathered input on a voice call.
///
/// Handlers are tried in registration order; the first one returning a
/// non-empty reply wins. Return `Ok(None)` when the input is not yours.
#[async_trait]
pub trait CallHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, input: &CallInput) -> Result<Option<CallReply>, HandlerError>;
}

/// Handles an inbound text message. Same ordering contract as
/// [`CallHandler`]; the reply is the message body to send back.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    fn name(&self) -> &str;

    async fn handle(&self, from: &str, body: &str) -> Result<Option<String>, HandlerError>;
}

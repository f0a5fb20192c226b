//! Inbound webhook events.
//!
//! The provider posts loosely-typed form parameters; this module validates
//! them at the boundary and produces a closed event type for the engine.

use serde::Deserialize;

use crate::error::FlowError;

/// A validated inbound event from the telephony provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// A new inbound call was answered.
    CallStarted {
        from: String,
        to: String,
        call_id: String,
    },
    /// The provider gathered caller input (digits and/or transcribed speech).
    GatherResult {
        call_id: String,
        digits: Option<String>,
        speech: Option<String>,
    },
    /// An inbound text message.
    MessageReceived { from: String, body: String },
}

/// Raw form parameters of a voice webhook request.
#[derive(Debug, Default, Deserialize)]
pub struct VoiceParams {
    #[serde(rename = "CallSid")]
    pub call_sid: Option<String>,
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "To")]
    pub to: Option<String>,
    #[serde(rename = "Digits")]
    pub digits: Option<String>,
    #[serde(rename = "SpeechResult")]
    pub speech_result: Option<String>,
}

/// Raw form parameters of a message webhook request.
#[derive(Debug, Default, Deserialize)]
pub struct MessageParams {
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "Body")]
    pub body: Option<String>,
    #[serde(rename = "MessageSid")]
    pub message_sid: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl InboundEvent {
    /// Classify a voice webhook request.
    ///
    /// A request carrying gathered input (`Digits` or `SpeechResult`) is a
    /// [`InboundEvent::GatherResult`]; otherwise it is the initial
    /// [`InboundEvent::CallStarted`]. The provider reuses one endpoint for
    /// both, distinguished only by these fields.
    pub fn from_voice(params: VoiceParams) -> Result<Self, FlowError> {
        let call_id = non_empty(params.call_sid).ok_or_else(|| FlowError::InvalidEvent {
            reason: "missing CallSid".to_string(),
        })?;

        let digits = non_empty(params.digits);
        let speech = non_empty(params.speech_result);

        if digits.is_some() || speech.is_some() {
            return Ok(InboundEvent::GatherResult {
                call_id,
                digits,
                speech,
            });
        }

        let from = non_empty(params.from).ok_or_else(|| FlowError::InvalidEvent {
            reason: "missing From on call start".to_string(),
        })?;
        let to = non_empty(params.to).ok_or_else(|| FlowError::InvalidEvent {
            reason: "missing To on call start".to_string(),
        })?;

        Ok(InboundEvent::CallStarted { from, to, call_id })
    }

    /// Validate a message webhook request.
    pub fn from_message(params: MessageParams) -> Result<Self, FlowError> {
        let from = non_empty(params.from).ok_or_else(|| FlowError::InvalidEvent {
            reason: "missing From on message".to_string(),
        })?;
        let body = non_empty(params.body).ok_or_else(|| FlowError::InvalidEvent {
            reason: "missing Body on message".to_string(),
        })?;
        Ok(InboundEvent::MessageReceived { from, body })
    }

    /// Short description for log lines. Never includes message bodies.
    pub fn summary(&self) -> String {
        match self {
            InboundEvent::CallStarted { from, call_id, .. } => {
                format!("call started from {from} ({call_id})")
            }
            InboundEvent::GatherResult {
                call_id,
                digits,
                speech,
            } => format!(
                "gather result for {call_id} (digits: {}, speech: {})",
                digits.is_some(),
                speech.is_some()
            ),
            InboundEvent::MessageReceived { from, .. } => format!("message from {from}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_start_requires_from_and_to() {
        let params = VoiceParams {
            call_sid: Some("CA123".into()),
            from: Some("+1555".into()),
            to: Some("+1999".into()),
            ..Default::default()
        };
        let event = InboundEvent::from_voice(params).unwrap();
        assert_eq!(
            event,
            InboundEvent::CallStarted {
                from: "+1555".into(),
                to: "+1999".into(),
                call_id: "CA123".into(),
            }
        );

        let missing = VoiceParams {
            call_sid: Some("CA123".into()),
            ..Default::default()
        };
        assert!(InboundEvent::from_voice(missing).is_err());
    }

    #[test]
    fn gathered_input_classifies_as_gather_result() {
        let params = VoiceParams {
            call_sid: Some("CA123".into()),
            digits: Some("1".into()),
            ..Default::default()
        };
        match InboundEvent::from_voice(params).unwrap() {
            InboundEvent::GatherResult {
                call_id, digits, ..
            } => {
                assert_eq!(call_id, "CA123");
                assert_eq!(digits.as_deref(), Some("1"));
            }
            other => panic!("expected GatherResult, got {other:?}"),
        }
    }

    #[test]
    fn empty_strings_are_treated_as_absent() {
        let params = VoiceParams {
            call_sid: Some("CA123".into()),
            from: Some("+1555".into()),
            to: Some("+1999".into()),
            digits: Some("".into()),
            speech_result: Some("  ".into()),
        };
        // Blank gather fields mean this is still the initial call event.
        assert!(matches!(
            InboundEvent::from_voice(params).unwrap(),
            InboundEvent::CallStarted { .. }
        ));
    }

    #[test]
    fn missing_call_sid_is_rejected() {
        let params = VoiceParams {
            from: Some("+1555".into()),
            to: Some("+1999".into()),
            ..Default::default()
        };
        assert!(InboundEvent::from_voice(params).is_err());
    }

    #[test]
    fn message_requires_from_and_body() {
        let ok = MessageParams {
            from: Some("+1555".into()),
            body: Some("hi".into()),
            message_sid: None,
        };
        assert!(InboundEvent::from_message(ok).is_ok());

        let missing_body = MessageParams {
            from: Some("+1555".into()),
            ..Default::default()
        };
        assert!(InboundEvent::from_message(missing_body).is_err());
    }
}

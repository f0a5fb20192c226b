//! Call-flow engine — the state machine behind the voice webhook.
//!
//! Each call moves `Start → Greeted → AwaitingInput → Responded → Terminated`.
//! A new call gets the greeting plus a gather; every gather result is
//! dispatched to the handler registry and either loops back into another
//! gather or ends the call. Message events are stateless single replies.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::FlowConfig;
use crate::error::FlowError;
use crate::event::InboundEvent;
use crate::handlers::{CallInput, HandlerRegistry};
use crate::twiml::{Directive, GatherMode, ResponsePlan, truncate_for_speech};

/// Lifecycle of one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    /// Greeting delivered, first gather outstanding.
    Greeted,
    /// A follow-up gather is outstanding.
    AwaitingInput,
    /// Input is being processed (transient within one request).
    Responded,
    /// The call ended; further events are invalid.
    Terminated,
}

impl CallState {
    fn as_str(self) -> &'static str {
        match self {
            CallState::Greeted => "greeted",
            CallState::AwaitingInput => "awaiting-input",
            CallState::Responded => "responded",
            CallState::Terminated => "terminated",
        }
    }
}

/// Per-call bookkeeping, keyed by the provider call id.
#[derive(Debug, Clone)]
struct CallSession {
    state: CallState,
    /// Gather turns consumed so far.
    turns: u32,
    /// When this session may be evicted if no further event arrives.
    expires_at: DateTime<Utc>,
}

/// The request-driven call-flow state machine.
pub struct CallFlowEngine {
    config: FlowConfig,
    registry: Arc<HandlerRegistry>,
    sessions: RwLock<HashMap<String, CallSession>>,
    idle: chrono::Duration,
}

impl CallFlowEngine {
    pub fn new(config: FlowConfig, registry: Arc<HandlerRegistry>) -> Arc<Self> {
        let idle = chrono::Duration::from_std(config.idle_timeout)
            .unwrap_or_else(|_| chrono::Duration::minutes(10));
        Arc::new(Self {
            config,
            registry,
            sessions: RwLock::new(HashMap::new()),
            idle,
        })
    }

    /// Handle a voice event, producing the plan to send back.
    ///
    /// Invalid-state and unknown-call conditions are errors here; the HTTP
    /// layer answers them with a safe terminal document rather than a crash.
    pub async fn handle_voice(&self, event: InboundEvent) -> Result<ResponsePlan, FlowError> {
        match event {
            InboundEvent::CallStarted { from, to, call_id } => {
                Ok(self.start_call(&from, &to, call_id).await)
            }
            InboundEvent::GatherResult {
                call_id,
                digits,
                speech,
            } => self.continue_call(call_id, digits, speech).await,
            InboundEvent::MessageReceived { .. } => Err(FlowError::InvalidEvent {
                reason: "message event on the voice path".to_string(),
            }),
        }
    }

    /// Handle an inbound text message. Stateless: one dispatch, one reply.
    pub async fn handle_message(&self, from: &str, body: &str) -> String {
        debug!(from = %from, "Dispatching inbound message");
        self.registry.dispatch_message(from, body).await
    }

    async fn start_call(&self, from: &str, to: &str, call_id: String) -> ResponsePlan {
        info!(from = %from, to = %to, call_id = %call_id, "Inbound call started");

        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&call_id) {
            warn!(call_id = %call_id, "Call restarted; resetting session");
        }
        sessions.insert(
            call_id,
            CallSession {
                state: CallState::Greeted,
                turns: 0,
                expires_at: Utc::now() + self.idle,
            },
        );
        drop(sessions);

        let mut plan = ResponsePlan::new();
        plan.push(Directive::say(&self.config.greeting));
        plan.push(self.gather(&self.config.menu_prompt));
        // Only reached if the gather times out with no input.
        plan.push(Directive::say(&self.config.no_input_farewell));
        plan.push(Directive::Hangup);
        plan
    }

    async fn continue_call(
        &self,
        call_id: String,
        digits: Option<String>,
        speech: Option<String>,
    ) -> Result<ResponsePlan, FlowError> {
        let turns = {
            let mut sessions = self.sessions.write().await;
            let session = sessions
                .get_mut(&call_id)
                .ok_or_else(|| FlowError::UnknownCall {
                    call_id: call_id.clone(),
                })?;

            if session.state == CallState::Terminated {
                return Err(FlowError::InvalidState {
                    call_id,
                    state: session.state.as_str().to_string(),
                    event: "gather result".to_string(),
                });
            }

            session.state = CallState::Responded;
            session.turns += 1;
            session.expires_at = Utc::now() + self.idle;
            session.turns
        };

        let input = CallInput {
            call_id: call_id.clone(),
            digits,
            speech,
        };
        let reply = self.registry.dispatch_call(&input).await;

        let mut plan = ResponsePlan::new();
        plan.push(Directive::say(truncate_for_speech(&reply.text)));

        let out_of_turns = turns >= self.config.max_turns;
        let ending = reply.end_call || out_of_turns;

        if ending {
            if out_of_turns && !reply.end_call {
                debug!(call_id = %call_id, turns, "Max turns reached; ending call");
                plan.push(Directive::say(&self.config.goodbye));
            }
            plan.push(Directive::Hangup);
        } else {
            plan.push(Directive::Pause { seconds: 1 });
            plan.push(self.gather(&self.config.reprompt));
            plan.push(Directive::say(&self.config.no_input_farewell));
            plan.push(Directive::Hangup);
        }

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(&call_id) {
            session.state = if ending {
                CallState::Terminated
            } else {
                CallState::AwaitingInput
            };
        }

        Ok(plan)
    }

    fn gather(&self, prompt: &str) -> Directive {
        Directive::Gather {
            mode: GatherMode::SpeechAndDigits,
            timeout_secs: self.config.gather_timeout_secs,
            action: self.config.voice_url.clone(),
            prompt: Some(prompt.to_string()),
        }
    }

    /// Number of tracked call sessions (any state).
    pub async fn active_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions whose idle deadline has passed. Returns the count.
    pub async fn evict_idle(&self) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|call_id, session| {
            let keep = session.expires_at > now;
            if !keep {
                debug!(call_id = %call_id, state = session.state.as_str(), "Evicting idle call session");
            }
            keep
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(count = evicted, "Evicted idle call sessions");
        }
        evicted
    }
}

/// Plan for answering an event the flow cannot accept: apologize and end.
pub fn terminal_plan(text: &str) -> ResponsePlan {
    let mut plan = ResponsePlan::new();
    plan.push(Directive::say(text));
    plan.push(Directive::Hangup);
    plan
}

/// Spawn a background task that periodically evicts idle call sessions.
pub fn spawn_eviction_task(engine: Arc<CallFlowEngine>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            engine.evict_idle().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::handlers::{CallHandler, CallReply};
    use async_trait::async_trait;
    use std::time::Duration;

    /// Echoes speech back; ends the call when told "goodbye".
    struct EchoHandler;

    #[async_trait]
    impl CallHandler for EchoHandler {
        fn name(&self) -> &str {
            "echo"
        }

        async fn handle(&self, input: &CallInput) -> Result<Option<CallReply>, HandlerError> {
            let heard = input
                .speech
                .clone()
                .or_else(|| input.digits.clone())
                .unwrap_or_default();
            if heard == "goodbye" {
                Ok(Some(CallReply::farewell("Bye!")))
            } else {
                Ok(Some(CallReply::speak(format!("You said {heard}"))))
            }
        }
    }

    fn engine_with(config: FlowConfig) -> Arc<CallFlowEngine> {
        let mut registry = HandlerRegistry::new();
        registry.register_call_handler(Arc::new(EchoHandler));
        CallFlowEngine::new(config, Arc::new(registry))
    }

    fn started(call_id: &str) -> InboundEvent {
        InboundEvent::CallStarted {
            from: "+1555".into(),
            to: "+1999".into(),
            call_id: call_id.into(),
        }
    }

    fn gathered(call_id: &str, speech: &str) -> InboundEvent {
        InboundEvent::GatherResult {
            call_id: call_id.into(),
            digits: None,
            speech: Some(speech.into()),
        }
    }

    #[tokio::test]
    async fn new_call_gets_greeting_then_gather() {
        let engine = engine_with(FlowConfig::default());
        let plan = engine.handle_voice(started("abc")).await.unwrap();

        let directives = plan.directives();
        assert!(matches!(&directives[0], Directive::Say { text } if text.contains("Welcome")));
        match &directives[1] {
            Directive::Gather {
                mode,
                timeout_secs,
                action,
                ..
            } => {
                assert_eq!(*mode, GatherMode::SpeechAndDigits);
                assert_eq!(*timeout_secs, 5);
                assert_eq!(action, "/voice");
            }
            other => panic!("expected Gather, got {other:?}"),
        }
        assert!(plan.validate().is_ok());
        assert_eq!(engine.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn gather_result_loops_back_into_another_gather() {
        let engine = engine_with(FlowConfig::default());
        engine.handle_voice(started("abc")).await.unwrap();

        let plan = engine
            .handle_voice(gathered("abc", "recent tournaments"))
            .await
            .unwrap();

        let directives = plan.directives();
        assert!(
            matches!(&directives[0], Directive::Say { text } if text == "You said recent tournaments")
        );
        assert!(directives
            .iter()
            .any(|d| matches!(d, Directive::Gather { .. })));
        assert!(plan.validate().is_ok());
    }

    #[tokio::test]
    async fn handler_completion_ends_the_call() {
        let engine = engine_with(FlowConfig::default());
        engine.handle_voice(started("abc")).await.unwrap();

        let plan = engine.handle_voice(gathered("abc", "goodbye")).await.unwrap();
        let directives = plan.directives();
        assert!(matches!(&directives[0], Directive::Say { text } if text == "Bye!"));
        assert!(matches!(directives.last().unwrap(), Directive::Hangup));
        assert!(!directives.iter().any(|d| matches!(d, Directive::Gather { .. })));
    }

    #[tokio::test]
    async fn event_after_termination_is_invalid_state() {
        let engine = engine_with(FlowConfig::default());
        engine.handle_voice(started("abc")).await.unwrap();
        engine.handle_voice(gathered("abc", "goodbye")).await.unwrap();

        let err = engine
            .handle_voice(gathered("abc", "hello again"))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn max_turns_forces_termination() {
        let config = FlowConfig {
            max_turns: 2,
            ..FlowConfig::default()
        };
        let engine = engine_with(config);
        engine.handle_voice(started("abc")).await.unwrap();

        // First turn still loops.
        let plan = engine.handle_voice(gathered("abc", "one")).await.unwrap();
        assert!(plan
            .directives()
            .iter()
            .any(|d| matches!(d, Directive::Gather { .. })));

        // Second turn hits the bound even though the handler wants to continue.
        let plan = engine.handle_voice(gathered("abc", "two")).await.unwrap();
        assert!(matches!(plan.directives().last().unwrap(), Directive::Hangup));
        assert!(!plan
            .directives()
            .iter()
            .any(|d| matches!(d, Directive::Gather { .. })));

        // And the call is now terminal.
        let err = engine.handle_voice(gathered("abc", "three")).await.unwrap_err();
        assert!(matches!(err, FlowError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn gather_for_unknown_call_is_rejected() {
        let engine = engine_with(FlowConfig::default());
        let err = engine.handle_voice(gathered("nope", "hi")).await.unwrap_err();
        assert!(matches!(err, FlowError::UnknownCall { .. }));
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted() {
        let config = FlowConfig {
            idle_timeout: Duration::ZERO,
            ..FlowConfig::default()
        };
        let engine = engine_with(config);
        engine.handle_voice(started("abc")).await.unwrap();
        assert_eq!(engine.active_sessions().await, 1);

        assert_eq!(engine.evict_idle().await, 1);
        assert_eq!(engine.active_sessions().await, 0);

        // The evicted call is now unknown, not resumable.
        let err = engine.handle_voice(gathered("abc", "hi")).await.unwrap_err();
        assert!(matches!(err, FlowError::UnknownCall { .. }));
    }

    #[tokio::test]
    async fn long_handler_output_is_truncated_to_fit_speech() {
        struct Verbose;

        #[async_trait]
        impl CallHandler for Verbose {
            fn name(&self) -> &str {
                "verbose"
            }
            async fn handle(&self, _: &CallInput) -> Result<Option<CallReply>, HandlerError> {
                Ok(Some(CallReply::speak("word ".repeat(500))))
            }
        }

        let mut registry = HandlerRegistry::new();
        registry.register_call_handler(Arc::new(Verbose));
        let engine = CallFlowEngine::new(FlowConfig::default(), Arc::new(registry));

        engine.handle_voice(started("abc")).await.unwrap();
        let plan = engine.handle_voice(gathered("abc", "talk")).await.unwrap();
        // Still renders: the oversized reply was truncated, not rejected.
        assert!(plan.render().is_ok());
    }

    #[tokio::test]
    async fn messages_are_stateless_dispatches() {
        let engine = engine_with(FlowConfig::default());
        let reply = engine.handle_message("+1555", "hi").await;
        // No message handlers registered — the configured default answers.
        assert!(reply.contains("HELP"));
        assert_eq!(engine.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn terminal_plan_is_valid() {
        let plan = terminal_plan("Sorry, something went wrong. Goodbye.");
        assert!(plan.validate().is_ok());
    }
}

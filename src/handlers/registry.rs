//! Handler registry.
//!
//! Populated once at startup, before the listener accepts traffic, then
//! shared read-only behind an `Arc` — dispatch never takes a lock.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::handlers::{CallHandler, CallInput, CallReply, MessageHandler};

/// Ordered lists of call and message handlers.
pub struct HandlerRegistry {
    call_handlers: Vec<Arc<dyn CallHandler>>,
    message_handlers: Vec<Arc<dyn MessageHandler>>,
    /// Spoken when no call handler claims the input.
    default_call_reply: String,
    /// Sent when no message handler claims the body.
    default_message_reply: String,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            call_handlers: Vec::new(),
            message_handlers: Vec::new(),
            default_call_reply: "I couldn't understand that. Try asking about recent \
                                 tournaments or top players."
                .to_string(),
            default_message_reply: "Message received. Reply HELP for available commands."
                .to_string(),
        }
    }

    /// Override the reply used when no call handler matches.
    pub fn with_default_call_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_call_reply = reply.into();
        self
    }

    /// Override the reply used when no message handler matches.
    pub fn with_default_message_reply(mut self, reply: impl Into<String>) -> Self {
        self.default_message_reply = reply.into();
        self
    }

    /// Append a call handler. Registration order is invocation order;
    /// duplicate names are allowed.
    pub fn register_call_handler(&mut self, handler: Arc<dyn CallHandler>) {
        debug!(handler = handler.name(), "Registered call handler");
        self.call_handlers.push(handler);
    }

    /// Append a message handler.
    pub fn register_message_handler(&mut self, handler: Arc<dyn MessageHandler>) {
        debug!(handler = handler.name(), "Registered message handler");
        self.message_handlers.push(handler);
    }

    pub fn call_handler_count(&self) -> usize {
        self.call_handlers.len()
    }

    pub fn message_handler_count(&self) -> usize {
        self.message_handlers.len()
    }

    /// Dispatch gathered call input to the first handler that claims it.
    ///
    /// A handler error is logged and treated as no-result so one bad handler
    /// cannot abort dispatch for the rest. Falls back to the configured
    /// default reply.
    pub async fn dispatch_call(&self, input: &CallInput) -> CallReply {
        for handler in &self.call_handlers {
            match handler.handle(input).await {
                Ok(Some(reply)) if !reply.text.trim().is_empty() => {
                    debug!(handler = handler.name(), "Call handler matched");
                    return reply;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        handler = handler.name(),
                        call_id = %input.call_id,
                        error = %e,
                        "Call handler failed; trying next"
                    );
                }
            }
        }
        CallReply::speak(self.default_call_reply.clone())
    }

    /// Dispatch an inbound message body to the first handler that claims it.
    pub async fn dispatch_message(&self, from: &str, body: &str) -> String {
        for handler in &self.message_handlers {
            match handler.handle(from, body).await {
                Ok(Some(reply)) if !reply.trim().is_empty() => {
                    debug!(handler = handler.name(), "Message handler matched");
                    return reply;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        handler = handler.name(),
                        from = %from,
                        error = %e,
                        "Message handler failed; trying next"
                    );
                }
            }
        }
        self.default_message_reply.clone()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

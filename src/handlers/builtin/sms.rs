//! Built-in SMS handlers: the HELP command and content keyword queries.

use std::sync::Arc;

use async_trait::async_trait;

use crate::content::ContentSource;
use crate::error::HandlerError;
use crate::handlers::MessageHandler;

const SMS_HELP: &str = "Commands: TOURNAMENTS, PLAYERS, STATS. Text a command for the latest info.";

/// Replies to HELP with the command list.
pub struct HelpHandler;

#[async_trait]
impl MessageHandler for HelpHandler {
    fn name(&self) -> &str {
        "help"
    }

    async fn handle(&self, _from: &str, body: &str) -> Result<Option<String>, HandlerError> {
        if body.trim().eq_ignore_ascii_case("help") {
            Ok(Some(SMS_HELP.to_string()))
        } else {
            Ok(None)
        }
    }
}

/// Answers content keywords: TOURNAMENTS, PLAYERS, STATS.
pub struct ContentQueryHandler {
    content: Arc<dyn ContentSource>,
}

impl ContentQueryHandler {
    pub fn new(content: Arc<dyn ContentSource>) -> Self {
        Self { content }
    }
}

#[async_trait]
impl MessageHandler for ContentQueryHandler {
    fn name(&self) -> &str {
        "content-query"
    }

    async fn handle(&self, _from: &str, body: &str) -> Result<Option<String>, HandlerError> {
        let body = body.to_uppercase();
        let reply = if body.contains("TOURNAMENT") {
            self.content.recent_tournaments()
        } else if body.contains("PLAYER") {
            self.content.top_players()
        } else if body.contains("STATS") || body.contains("ATTENDANCE") {
            self.content.attendance()
        } else {
            return Ok(None);
        };
        Ok(reply)
    }
}

//! Built-in voice handlers: farewell detection, the digit menu, and
//! speech-phrase queries against the content source.

use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use crate::content::ContentSource;
use crate::error::HandlerError;
use crate::handlers::{CallHandler, CallInput, CallReply};
use crate::twiml::truncate_for_speech;

const HELP_TEXT: &str = "To hear about tournaments, say recent tournaments. \
                         For player rankings, say top players. \
                         For attendance info, say attendance.";

const UNAVAILABLE: &str = "That information isn't available right now. Please try again later.";

/// Make raw content safe and pleasant to speak: strip markup characters,
/// fold newlines into sentence pauses, and fit the spoken-text limit.
pub fn clean_for_speech(text: &str, markup: &Regex) -> String {
    let stripped = markup.replace_all(text, "");
    let folded = stripped.trim().replace('\n', ". ");
    truncate_for_speech(&folded)
}

/// Ends the flow when the caller says goodbye or presses 0.
pub struct FarewellHandler {
    goodbye: String,
}

impl FarewellHandler {
    pub fn new(goodbye: impl Into<String>) -> Self {
        Self {
            goodbye: goodbye.into(),
        }
    }
}

#[async_trait]
impl CallHandler for FarewellHandler {
    fn name(&self) -> &str {
        "farewell"
    }

    async fn handle(&self, input: &CallInput) -> Result<Option<CallReply>, HandlerError> {
        if input.digits() == Some("0") {
            return Ok(Some(CallReply::farewell(self.goodbye.clone())));
        }
        if let Some(speech) = input.speech_lower() {
            let done = matches!(
                speech.as_str(),
                "no" | "nope" | "bye" | "goodbye" | "no thanks" | "nothing" | "that's all"
            ) || speech.contains("goodbye");
            if done {
                return Ok(Some(CallReply::farewell(self.goodbye.clone())));
            }
        }
        Ok(None)
    }
}

/// DTMF menu: 1 recent tournaments, 2 top players, 3 attendance, 9 help.
pub struct MenuHandler {
    content: Arc<dyn ContentSource>,
    markup: Regex,
}

impl MenuHandler {
    pub fn new(content: Arc<dyn ContentSource>) -> Self {
        Self {
            content,
            markup: Regex::new(r"[*_#`]").unwrap(),
        }
    }

    fn lookup(&self, digit: &str) -> Option<String> {
        let raw = match digit {
            "1" => self.content.recent_tournaments(),
            "2" => self.content.top_players(),
            "3" => self.content.attendance(),
            "9" => Some(HELP_TEXT.to_string()),
            _ => Some("Invalid option. Please try again.".to_string()),
        };
        Some(clean_for_speech(&raw.unwrap_or_else(|| UNAVAILABLE.to_string()), &self.markup))
    }
}

#[async_trait]
impl CallHandler for MenuHandler {
    fn name(&self) -> &str {
        "menu"
    }

    async fn handle(&self, input: &CallInput) -> Result<Option<CallReply>, HandlerError> {
        match input.digits() {
            Some(digit) if !digit.is_empty() => Ok(self.lookup(digit).map(CallReply::speak)),
            _ => Ok(None),
        }
    }
}

/// Maps common spoken phrases to content lookups.
pub struct SpeechQueryHandler {
    content: Arc<dyn ContentSource>,
    markup: Regex,
}

impl SpeechQueryHandler {
    pub fn new(content: Arc<dyn ContentSource>) -> Self {
        Self {
            content,
            markup: Regex::new(r"[*_#`]").unwrap(),
        }
    }

    fn lookup(&self, speech: &str) -> Option<String> {
        let raw = if speech.contains("tournament") || speech.contains("who won") {
            self.content.recent_tournaments()
        } else if speech.contains("player") || speech.contains("ranking") {
            self.content.top_players()
        } else if speech.contains("attendance") {
            self.content.attendance()
        } else if speech.contains("help") {
            Some(HELP_TEXT.to_string())
        } else {
            return None;
        };
        Some(clean_for_speech(&raw.unwrap_or_else(|| UNAVAILABLE.to_string()), &self.markup))
    }
}

#[async_trait]
impl CallHandler for SpeechQueryHandler {
    fn name(&self) -> &str {
        "speech-query"
    }

    async fn handle(&self, input: &CallInput) -> Result<Option<CallReply>, HandlerError> {
        match input.speech_lower() {
            Some(speech) if !speech.is_empty() => Ok(self.lookup(&speech).map(CallReply::speak)),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::StaticContent;

    fn input_with_digits(digits: &str) -> CallInput {
        CallInput {
            call_id: "CA1".into(),
            digits: Some(digits.into()),
            speech: None,
        }
    }

    fn input_with_speech(speech: &str) -> CallInput {
        CallInput {
            call_id: "CA1".into(),
            digits: None,
            speech: Some(speech.into()),
        }
    }

    #[tokio::test]
    async fn menu_routes_digits_to_content() {
        let menu = MenuHandler::new(Arc::new(StaticContent));

        let reply = menu.handle(&input_with_digits("1")).await.unwrap().unwrap();
        assert!(reply.text.contains("West Coast Warzone"));

        let reply = menu.handle(&input_with_digits("2")).await.unwrap().unwrap();
        assert!(reply.text.contains("West"));

        let reply = menu.handle(&input_with_digits("7")).await.unwrap().unwrap();
        assert!(reply.text.contains("Invalid option"));

        // Speech-only input is not the menu's business.
        assert!(menu.handle(&input_with_speech("hello")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn speech_phrases_map_to_content() {
        let handler = SpeechQueryHandler::new(Arc::new(StaticContent));

        let reply = handler
            .handle(&input_with_speech("tell me about recent tournaments"))
            .await
            .unwrap()
            .unwrap();
        assert!(reply.text.contains("West Coast Warzone"));
        assert!(!reply.end_call);

        // Unrecognized speech defers to the next handler.
        assert!(handler
            .handle(&input_with_speech("what is the weather"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn farewell_ends_the_flow() {
        let handler = FarewellHandler::new("Goodbye!");

        let reply = handler
            .handle(&input_with_speech("goodbye"))
            .await
            .unwrap()
            .unwrap();
        assert!(reply.end_call);

        let reply = handler.handle(&input_with_digits("0")).await.unwrap().unwrap();
        assert!(reply.end_call);

        // "no" must match as a whole utterance, not as a substring.
        assert!(handler
            .handle(&input_with_speech("north county tournaments"))
            .await
            .unwrap()
            .is_none());
    }

    #[test]
    fn cleanup_strips_markup_and_folds_newlines() {
        let markup = Regex::new(r"[*_#`]").unwrap();
        let cleaned = clean_for_speech("**Top 3**\nWest\nZamasu", &markup);
        assert_eq!(cleaned, "Top 3. West. Zamasu");
    }
}

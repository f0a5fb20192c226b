//! Configuration types: provider credentials and call-flow tunables.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Telephony provider credentials, read once at startup.
///
/// Sources, in order: process environment, then a `.env` file in the working
/// directory. The auth token is wrapped in [`SecretString`] so it cannot end
/// up in logs; the account SID is only ever logged as a short prefix.
#[derive(Clone)]
pub struct ProviderCredentials {
    pub account_sid: String,
    pub auth_token: SecretString,
    /// The service's own phone number, E.164.
    pub phone_number: String,
}

impl ProviderCredentials {
    /// Load credentials from the environment, falling back to `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let file_vars = read_env_file(Path::new(".env"))?;
        Self::from_sources(&file_vars)
    }

    /// Load credentials from the environment with an explicit fallback map.
    fn from_sources(fallback: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |key: &str, hint: &str| -> Result<String, ConfigError> {
            std::env::var(key)
                .ok()
                .filter(|v| !v.is_empty())
                .or_else(|| fallback.get(key).cloned())
                .ok_or_else(|| ConfigError::MissingRequired {
                    key: key.to_string(),
                    hint: hint.to_string(),
                })
        };

        let account_sid = get(
            "TWILIO_ACCOUNT_SID",
            "Set it in the environment or in .env (starts with AC).",
        )?;
        let auth_token = get(
            "TWILIO_AUTH_TOKEN",
            "Set it in the environment or in .env. Find it in the provider console.",
        )?;
        let phone_number = get(
            "TWILIO_PHONE_NUMBER",
            "The provider-assigned number this service answers for, E.164.",
        )?;

        Ok(Self {
            account_sid,
            auth_token: SecretString::from(auth_token),
            phone_number,
        })
    }

    /// Short SID prefix safe for logs and banners.
    pub fn sid_prefix(&self) -> &str {
        let end = self.account_sid.len().min(8);
        &self.account_sid[..end]
    }
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("account_sid", &format!("{}...", self.sid_prefix()))
            .field("auth_token", &"***")
            .field("phone_number", &self.phone_number)
            .finish()
    }
}

/// Parse `KEY=VALUE` lines from a `.env` file. Comments and blank lines are
/// skipped, surrounding quotes stripped.
pub fn parse_env_file(contents: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            let value = value.trim().trim_matches('"').trim_matches('\'');
            vars.insert(key.trim().to_string(), value.to_string());
        }
    }
    vars
}

/// Read a `.env` file from disk into a map. Missing file is not an error.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(parse_env_file(&contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
        Err(e) => Err(ConfigError::Io(e)),
    }
}

/// Call-flow configuration.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Spoken greeting for a new call.
    pub greeting: String,
    /// Menu prompt spoken inside the first gather.
    pub menu_prompt: String,
    /// Re-prompt spoken inside follow-up gathers.
    pub reprompt: String,
    /// Spoken when a gather times out with no input, before hanging up.
    pub no_input_farewell: String,
    /// Spoken when the flow ends normally.
    pub goodbye: String,
    /// Seconds the provider waits for caller input in a gather.
    pub gather_timeout_secs: u32,
    /// Maximum number of gather turns before the call is forced to end.
    pub max_turns: u32,
    /// Absolute URL the provider posts call events to (the gather action).
    pub voice_url: String,
    /// Idle duration after which per-call state is evicted.
    pub idle_timeout: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            greeting: "Welcome to the tournament tracker voice line!".to_string(),
            menu_prompt: "You can ask me anything about tournaments and players. \
                          For example, say recent tournaments, or top players. \
                          Or press 1 for recent tournaments, 2 for player rankings, \
                          3 for attendance info, or 9 for help."
                .to_string(),
            reprompt: "Is there anything else you'd like to know?".to_string(),
            no_input_farewell: "I didn't hear anything. Please call back to try again."
                .to_string(),
            goodbye: "Thanks for calling. Goodbye!".to_string(),
            gather_timeout_secs: 5,
            max_turns: 10,
            voice_url: "/voice".to_string(),
            idle_timeout: Duration::from_secs(600), // 10 minutes
        }
    }
}

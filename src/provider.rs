//! Provider REST client for number routing configuration.
//!
//! Consumes the provider's incoming-phone-number API: list/filter numbers
//! and update where a number's voice webhooks point. Off the hot path —
//! used only by the one-shot configurator.

use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::debug;

use crate::config::ProviderCredentials;
use crate::error::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.twilio.com";

/// One provider-owned phone number, as returned by the listing API.
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingNumber {
    pub sid: String,
    pub phone_number: String,
    #[serde(default)]
    pub voice_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NumberList {
    incoming_phone_numbers: Vec<IncomingNumber>,
}

/// Thin client over the provider's configuration API.
pub struct ProviderClient {
    http: reqwest::Client,
    base_url: String,
    credentials: ProviderCredentials,
}

impl ProviderClient {
    pub fn new(credentials: ProviderCredentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials,
        }
    }

    /// Point the client at a different API host (stub server in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn numbers_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/IncomingPhoneNumbers.json",
            self.base_url, self.credentials.account_sid
        )
    }

    fn number_url(&self, number_sid: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/IncomingPhoneNumbers/{}.json",
            self.base_url, self.credentials.account_sid, number_sid
        )
    }

    /// Find the account's entry for one phone number, if it exists.
    pub async fn find_number(
        &self,
        phone_number: &str,
    ) -> Result<Option<IncomingNumber>, ProviderError> {
        debug!(number = %phone_number, "Looking up incoming phone number");
        let resp = self
            .http
            .get(self.numbers_url())
            .basic_auth(
                &self.credentials.account_sid,
                Some(self.credentials.auth_token.expose_secret()),
            )
            .query(&[("PhoneNumber", phone_number)])
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ProviderError::Http(format!(
                "number lookup failed with status {}",
                resp.status()
            )));
        }

        let list: NumberList = resp
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(list.incoming_phone_numbers.into_iter().next())
    }

    /// List every number on the account (diagnostic aid for not-found).
    pub async fn list_numbers(&self) -> Result<Vec<IncomingNumber>, ProviderError> {
        let resp = self
            .http
            .get(self.numbers_url())
            .basic_auth(
                &self.credentials.account_sid,
                Some(self.credentials.auth_token.expose_secret()),
            )
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(ProviderError::Http(format!(
                "number listing failed with status {}",
                resp.status()
            )));
        }

        let list: NumberList = resp
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(list.incoming_phone_numbers)
    }

    /// Point a number's voice routing at the given primary and fallback
    /// URLs, and clear any stale status callback. Idempotent on the
    /// provider side.
    pub async fn update_voice_urls(
        &self,
        number_sid: &str,
        primary_url: &str,
        fallback_url: &str,
    ) -> Result<(), ProviderError> {
        let form = [
            ("VoiceUrl", primary_url),
            ("VoiceMethod", "POST"),
            ("VoiceFallbackUrl", fallback_url),
            ("StatusCallback", ""),
        ];

        let resp = self
            .http
            .post(self.number_url(number_sid))
            .basic_auth(
                &self.credentials.account_sid,
                Some(self.credentials.auth_token.expose_secret()),
            )
            .form(&form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::UpdateRejected { status, body });
        }
        Ok(())
    }
}

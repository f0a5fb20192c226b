//! One-shot webhook configuration.
//!
//! Points a provider number at the primary and fallback webhook URLs.
//! Idempotent: re-running with the same arguments leaves the provider in
//! the same state. Not safe to run concurrently against one number —
//! the caller serializes.

use tracing::info;

use crate::error::ProviderError;
use crate::provider::ProviderClient;

/// Where one number's webhooks should point. Transient: built for the
/// configuration call and discarded.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    /// The phone number to configure, E.164.
    pub number: String,
    pub primary_url: String,
    pub fallback_url: String,
}

/// Configure the number's voice routing.
///
/// Unknown numbers produce [`ProviderError::NumberNotFound`] carrying the
/// account's available numbers as a diagnostic — nothing is mutated in that
/// case. Returns the provider-side id of the updated number.
pub async fn configure(
    client: &ProviderClient,
    route: &RouteConfig,
) -> Result<String, ProviderError> {
    info!(number = %route.number, "Configuring webhook routing");

    let Some(number) = client.find_number(&route.number).await? else {
        let available = client
            .list_numbers()
            .await?
            .into_iter()
            .map(|n| n.phone_number)
            .collect();
        return Err(ProviderError::NumberNotFound {
            number: route.number.clone(),
            available,
        });
    };

    info!(
        number_sid = %number.sid,
        current_voice_url = number.voice_url.as_deref().unwrap_or("(unset)"),
        "Updating voice routing"
    );

    client
        .update_voice_urls(&number.sid, &route.primary_url, &route.fallback_url)
        .await?;

    info!(
        number_sid = %number.sid,
        primary = %route.primary_url,
        fallback = %route.fallback_url,
        "Webhook routing updated"
    );

    Ok(number.sid)
}

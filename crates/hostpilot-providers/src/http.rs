//! Shared request plumbing: send, check status, decode.

use hostpilot_core::ProviderError;
use serde::de::DeserializeOwned;
use tracing::error;

/// Send `request` and decode a JSON body of type `T`.
///
/// Network failures map to `Transport`, non-2xx statuses to `Api`, and
/// undecodable bodies to `Protocol`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request.send().await.map_err(|e| {
        error!(provider = provider, error = %e, "HTTP request failed");
        ProviderError::transport(provider, e)
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error body".to_string());
        error!(provider = provider, status = %status, body = %body, "API error");
        return Err(ProviderError::Api {
            provider: provider.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| ProviderError::transport(provider, e))?;

    serde_json::from_slice(&bytes).map_err(|e| {
        error!(provider = provider, error = %e, "Failed to parse LLM response");
        ProviderError::protocol(provider, e)
    })
}

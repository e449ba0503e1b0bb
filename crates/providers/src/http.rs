use reqwest::{header::RETRY_AFTER, Response};
use tracing::warn;

use crate::error::{ProviderError, Result};

/// Pass successful responses through; classify everything else.
pub(crate) async fn check_status(provider: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after_secs = response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    if status.as_u16() == 429 {
        warn!(provider, "Rate limited");
        return Err(ProviderError::RateLimited { retry_after_secs });
    }

    warn!(provider, status = status.as_u16(), "Provider returned an error");
    Err(ProviderError::from_status(status.as_u16(), body))
}

pub(crate) fn trim_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}

use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::AppError;

pub(crate) fn build_http(service: &'static str, timeout: Duration) -> Result<reqwest::Client, AppError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|err| AppError::Config(format!("{service} http client: {err}")))
}

/// Sends `request` and decodes a JSON body. Transport errors, non-2xx
/// statuses and undecodable bodies all become [`AppError::Upstream`].
pub(crate) async fn send_json<T: DeserializeOwned>(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T, AppError> {
    let response = request
        .send()
        .await
        .map_err(|err| AppError::upstream(service, err.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        warn!(service, %status, "upstream returned an error status");
        return Err(AppError::upstream(service, format!("{status}: {body}")));
    }

    response
        .json::<T>()
        .await
        .map_err(|err| AppError::upstream(service, format!("invalid response body: {err}")))
}

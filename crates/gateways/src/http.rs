//! Shared HTTP plumbing: transport mapping and status classification.

use std::time::Duration;

use saga::GatewayError;
use serde::de::DeserializeOwned;

/// Maps a transport-level reqwest failure into the error taxonomy.
pub(crate) fn transport_error(err: reqwest::Error) -> GatewayError {
    GatewayError::Network(err.to_string())
}

/// Classifies a non-success HTTP response.
///
/// 429 carries the Retry-After hint through; 401/403 are auth failures;
/// 5xx is a server fault; anything else means the request itself was
/// rejected.
pub(crate) async fn classify_error_response(response: reqwest::Response) -> GatewayError {
    let status = response.status().as_u16();
    match status {
        429 => {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse::<u64>().ok())
                .map(Duration::from_secs);
            GatewayError::RateLimited { retry_after }
        }
        401 | 403 => GatewayError::Unauthorized { status },
        500..=599 => GatewayError::Server {
            status,
            message: body_text(response).await,
        },
        _ => GatewayError::Request {
            status,
            message: body_text(response).await,
        },
    }
}

/// Sends a POST with a JSON body, classifying failure.
pub(crate) async fn post_json(
    client: &reqwest::Client,
    url: &str,
    body: &serde_json::Value,
) -> Result<reqwest::Response, GatewayError> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(transport_error)?;
    ok_or_classified(response).await
}

/// Sends a GET, classifying failure.
pub(crate) async fn get(
    client: &reqwest::Client,
    url: &str,
) -> Result<reqwest::Response, GatewayError> {
    let response = client.get(url).send().await.map_err(transport_error)?;
    ok_or_classified(response).await
}

/// Sends a DELETE, classifying failure.
pub(crate) async fn delete(
    client: &reqwest::Client,
    url: &str,
) -> Result<reqwest::Response, GatewayError> {
    let response = client.delete(url).send().await.map_err(transport_error)?;
    ok_or_classified(response).await
}

/// Decodes a JSON response body.
pub(crate) async fn decode_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, GatewayError> {
    response
        .json::<T>()
        .await
        .map_err(|err| GatewayError::Decode(err.to_string()))
}

async fn ok_or_classified(
    response: reqwest::Response,
) -> Result<reqwest::Response, GatewayError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(classify_error_response(response).await)
    }
}

async fn body_text(response: reqwest::Response) -> String {
    response.text().await.unwrap_or_default()
}

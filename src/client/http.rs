use crate::error::ClientError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use uuid::Uuid;

pub(crate) const REQUEST_ID_HEADER: &str = "X-Request-Id";

pub(crate) fn build_client(timeout: Duration) -> Result<Client, ClientError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("vento_swap/", env!("CARGO_PKG_VERSION"))),
    );

    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|e| {
            tracing::error!(error = %e, "failed to build http client");
            ClientError::from(e)
        })
}

pub(crate) fn parse_url(url: &str) -> Result<Url, ClientError> {
    Url::parse(url).map_err(|e| ClientError::Transport(format!("invalid url {url}: {e}")))
}

/// Appends percent-encoded path segments to `base`.
pub(crate) fn join_segments(base: &Url, segments: &[&str]) -> Result<Url, ClientError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ClientError::Transport(format!("url cannot be a base: {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Sends `request` tagged with a fresh request id and decodes a JSON body.
///
/// Non-2xx responses become `Rejected` when the body carries an `error` or
/// `message` string, otherwise `Status { context, .. }`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    request: RequestBuilder,
    context: &'static str,
) -> Result<T, ClientError> {
    let request_id = Uuid::new_v4().to_string();
    let response = request
        .header(REQUEST_ID_HEADER, &request_id)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, request_id = %request_id, context, "request failed");
            ClientError::from(e)
        })?;

    let status = response.status();
    let body = response.bytes().await.map_err(|e| {
        tracing::warn!(error = %e, request_id = %request_id, context, "failed to read body");
        ClientError::from(e)
    })?;

    if !status.is_success() {
        tracing::warn!(
            status = status.as_u16(),
            request_id = %request_id,
            context,
            "request rejected"
        );
        return Err(error_from_body(&body).unwrap_or(ClientError::Status {
            context,
            status: status.as_u16(),
        }));
    }

    serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(error = %e, request_id = %request_id, context, "failed to decode body");
        ClientError::from(e)
    })
}

fn error_from_body(body: &[u8]) -> Option<ClientError> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["error", "message"]
        .iter()
        .find_map(|key| value.get(*key)?.as_str())
        .map(|message| ClientError::Rejected(message.to_string()))
}

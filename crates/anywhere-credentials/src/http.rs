//! One-shot HTTP round-trips against the control plane.

use crate::roots::RootCaPool;
use anywhere_types::{body_prefix, CredentialError, HttpSettings, Result};
use reqwest::header::HeaderMap;
use reqwest::{Client, ClientBuilder, Method, StatusCode};
use tracing::{debug, warn};
use url::Url;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("anywhere-credentials/", env!("CARGO_PKG_VERSION"));

/// Client builder with the shared timeouts and trust store applied.
///
/// Callers add their own identity before building.
pub fn client_builder(settings: &HttpSettings, roots: Option<&RootCaPool>) -> ClientBuilder {
    let builder = Client::builder()
        .use_rustls_tls()
        .user_agent(USER_AGENT)
        .timeout(settings.timeout())
        .connect_timeout(settings.connect_timeout())
        .tcp_keepalive(settings.tcp_keepalive())
        .pool_idle_timeout(settings.pool_idle_timeout());

    match roots {
        Some(roots) => roots.apply(builder),
        None => builder,
    }
}

/// Join an endpoint path onto the API base URL, keeping any base path.
pub fn endpoint(base: &Url, path: &str) -> Result<Url> {
    let joined = format!(
        "{}/{}",
        base.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined)
        .map_err(|e| CredentialError::Config(format!("Invalid endpoint URL '{}': {}", joined, e)))
}

/// Send one request and return the full response body on HTTP 200.
///
/// The body is read to the end on every path so the connection can return to
/// the pool. Any other status yields [`CredentialError::HttpStatus`] carrying
/// a bounded body prefix. Dropping the returned future aborts the request.
pub async fn execute(
    client: &Client,
    method: Method,
    url: &Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
) -> Result<Vec<u8>> {
    let transport_error = |e: reqwest::Error| CredentialError::HttpTransport {
        method: method.to_string(),
        url: url.to_string(),
        cause: error_chain(&e),
    };

    debug!(%method, %url, "sending request");

    let mut request = client.request(method.clone(), url.clone()).headers(headers);
    if let Some(body) = body {
        request = request.body(body);
    }

    let response = request.send().await.map_err(transport_error)?;
    let status = response.status();
    let bytes = response.bytes().await.map_err(transport_error)?;

    if status != StatusCode::OK {
        warn!(%method, %url, status = status.as_u16(), "unexpected response status");
        return Err(CredentialError::HttpStatus {
            method: method.to_string(),
            url: url.to_string(),
            status: status.as_u16(),
            body: body_prefix(&bytes),
        });
    }

    debug!(%method, %url, bytes = bytes.len(), "request succeeded");
    Ok(bytes.to_vec())
}

/// Flatten an error and its sources into one line.
///
/// Some layers already render their sources in `Display`; a cause whose text
/// is already present is not repeated.
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

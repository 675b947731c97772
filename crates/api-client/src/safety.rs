//! URL checks and redaction for outbound requests.

use crate::error::{ApiClientError, Result};
use url::Url;

/// Reject anything that is not an absolute `http(s)` URL with a host.
///
/// # Errors
///
/// Returns a config error naming the offending part of the URL.
pub fn ensure_http_url(url: &Url) -> Result<()> {
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ApiClientError::Config(format!(
            "unsupported URL scheme '{scheme}' (expected http or https)"
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(ApiClientError::Config("missing URL host".to_string()));
    }
    Ok(())
}

/// Drop credentials, query and fragment so URLs can be logged.
#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

#[must_use]
pub fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    msg
}

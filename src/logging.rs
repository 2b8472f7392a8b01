//! Helpers for logging requests to and responses from the remote ledger.

use reqwest::{Method, StatusCode, Url};

/// Bodies longer than this many bytes are truncated in `info` logs.
///
/// The full body is still logged at the `debug` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// JSON fields whose values must never reach the logs.
const REDACTED_FIELDS: [&str; 4] = ["password", "confirm_password", "access", "refresh"];

/// Replace the value of every credential field in a JSON body with asterisks.
///
/// Bodies that are not JSON objects are returned unchanged.
pub(crate) fn redact_credentials(body: &str) -> String {
    let Ok(serde_json::Value::Object(mut fields)) = serde_json::from_str(body) else {
        return body.to_owned();
    };

    let mut redacted = false;

    for field in REDACTED_FIELDS {
        if let Some(value) = fields.get_mut(field) {
            *value = serde_json::Value::String("********".to_owned());
            redacted = true;
        }
    }

    if redacted {
        serde_json::Value::Object(fields).to_string()
    } else {
        body.to_owned()
    }
}

pub(crate) fn log_request(method: &Method, url: &Url, body: &str) {
    let body = redact_credentials(body);

    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending request: {method} {url}\nbody: {:}...",
            truncate(&body)
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Sending request: {method} {url}\nbody: {body:?}");
    }
}

pub(crate) fn log_response(status: StatusCode, url: &Url, body: &str) {
    let body = redact_credentials(body);

    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received response: {status} from {url}\nbody: {:}...",
            truncate(&body)
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Received response: {status} from {url}\nbody: {body:?}");
    }
}

/// Cut `body` at the length limit without splitting a UTF-8 character.
fn truncate(body: &str) -> &str {
    let mut end = LOG_BODY_LENGTH_LIMIT.min(body.len());

    while !body.is_char_boundary(end) {
        end -= 1;
    }

    &body[..end]
}

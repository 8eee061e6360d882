//! The single HTTPS round-trip every adapter makes.

use std::time::Duration;

use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::LlmError;

use super::json::raw_prefix;

/// Wall-clock limit on one provider call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Send `request` and return the response body.
///
/// The call is abandoned when `timeout` elapses or `cancel` fires. Non-2xx
/// responses become [`LlmError::Auth`] (401/403) or [`LlmError::Api`].
pub async fn send(
    provider: &str,
    request: RequestBuilder,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<String, LlmError> {
    let exchange = async {
        let response = request.send().await.map_err(|e| transport(provider, e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| transport(provider, e))?;
        debug!(provider, status = status.as_u16(), bytes = body.len(), "Provider responded");

        if !status.is_success() {
            return Err(from_http_status(provider, status.as_u16(), &body));
        }
        Ok::<_, LlmError>(body)
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(LlmError::Cancelled {
            provider: provider.to_string(),
        }),
        result = tokio::time::timeout(timeout, exchange) => {
            result.map_err(|_| LlmError::Timeout {
                provider: provider.to_string(),
                seconds: timeout.as_secs(),
            })?
        }
    }
}

/// Decode a provider's JSON envelope.
pub fn decode<T: DeserializeOwned>(provider: &str, body: &str) -> Result<T, LlmError> {
    serde_json::from_str(body).map_err(|e| LlmError::ResponseParse {
        provider: provider.to_string(),
        error: e.to_string(),
        raw_prefix: raw_prefix(body),
    })
}

fn transport(provider: &str, err: reqwest::Error) -> LlmError {
    LlmError::Transport {
        provider: provider.to_string(),
        message: err.to_string(),
    }
}

/// Map a failed HTTP status to an error, keeping a bounded slice of the body.
pub fn from_http_status(provider: &str, status: u16, body: &str) -> LlmError {
    let message = error_message(body);
    match status {
        401 | 403 => LlmError::Auth {
            provider: provider.to_string(),
            status,
            message,
        },
        _ => LlmError::Api {
            provider: provider.to_string(),
            status,
            message,
        },
    }
}

/// `error.message` from a JSON error body when present, else the raw body prefix.
fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body)
        && let Some(message) = value
            .pointer("/error/message")
            .or_else(|| value.pointer("/message"))
            .and_then(|m| m.as_str())
    {
        return raw_prefix(message);
    }
    raw_prefix(body.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_statuses() {
        for status in [401, 403] {
            let err = from_http_status("openai", status, "denied");
            assert!(matches!(err, LlmError::Auth { status: s, .. } if s == status));
        }
    }

    #[test]
    fn test_other_statuses_are_api_errors() {
        let err = from_http_status("gemini", 500, "boom");
        match err {
            LlmError::Api {
                provider,
                status,
                message,
            } => {
                assert_eq!(provider, "gemini");
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("Expected Api, got: {:?}", other),
        }
    }

    #[test]
    fn test_error_message_prefers_json_message() {
        let body = r#"{"type": "error", "error": {"type": "authentication_error", "message": "invalid x-api-key"}}"#;
        assert_eq!(error_message(body), "invalid x-api-key");
        assert_eq!(error_message(r#"{"message": "quota"}"#), "quota");
    }

    #[test]
    fn test_error_message_bounds_raw_body() {
        let body = "z".repeat(1000);
        assert_eq!(error_message(&body).len(), 200);
    }

    #[test]
    fn test_decode_failure_is_response_parse() {
        #[derive(serde::Deserialize, Debug)]
        struct Envelope {
            #[allow(dead_code)]
            id: String,
        }
        let err = decode::<Envelope>("anthropic", "<html>bad gateway</html>").unwrap_err();
        match err {
            LlmError::ResponseParse { raw_prefix, .. } => {
                assert_eq!(raw_prefix, "<html>bad gateway</html>")
            }
            other => panic!("Expected ResponseParse, got: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_before_send() {
        let token = CancellationToken::new();
        token.cancel();
        // Unroutable address; cancellation must win before any connect attempt matters
        let request = reqwest::Client::new().post("http://10.255.255.1:9/");
        let err = send("anthropic", request, REQUEST_TIMEOUT, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Cancelled { .. }));
    }
}

use reqwest::{Response, StatusCode};
use serde::Deserialize;

/// Typed failure of a tracking-server call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The request never got an HTTP answer.
    #[error("{0}")]
    Transport(String),
    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Server { status: u16, message: String },
    /// The server answered 2xx with a body we could not read.
    #[error("unexpected response: {0}")]
    Decode(String),
    #[error("{0} is not available on this server")]
    Unsupported(&'static str),
}

impl SyncError {
    /// Failures that mean we cannot trust the link to the server.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, SyncError::Transport(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SyncError::Decode(err.to_string())
        } else {
            SyncError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: String,
}

/// Pass 2xx responses through; turn everything else into [`SyncError`].
///
/// The `{error}` envelope message is surfaced as-is when the body carries
/// one.
pub async fn classify_response(
    response: Result<Response, reqwest::Error>,
) -> Result<Response, SyncError> {
    let resp = response?;
    if resp.status().is_success() {
        return Ok(resp);
    }

    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    Err(server_error(status, &body))
}

pub(crate) fn server_error(status: StatusCode, body: &str) -> SyncError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|envelope| envelope.error)
        .unwrap_or_else(|_| format!("server returned {}", status.as_u16()));
    SyncError::Server {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_message_is_surfaced() {
        let err = server_error(StatusCode::NOT_FOUND, r#"{"error":"unknown serial"}"#);
        assert_eq!(
            err,
            SyncError::Server {
                status: 404,
                message: "unknown serial".into()
            }
        );
        assert_eq!(err.to_string(), "unknown serial");
        assert!(!err.is_connection_failure());
    }

    #[test]
    fn missing_envelope_falls_back_to_status() {
        let err = server_error(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>");
        assert_eq!(err.to_string(), "server returned 500");
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn only_transport_counts_as_connection_failure() {
        assert!(SyncError::Transport("refused".into()).is_connection_failure());
        assert!(!SyncError::Decode("bad json".into()).is_connection_failure());
        assert!(!SyncError::Unsupported("scan").is_connection_failure());
    }
}

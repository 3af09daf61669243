//! Faults that escape the dispatcher.
//!
//! Everything the dispatcher can recover from (unknown paths, wrong methods,
//! bad parameters, file I/O) becomes an [`Outcome`](super::Outcome). The only
//! errors left are faults raised by capability members themselves. They are
//! not handled here; the transport renders them verbatim.

use axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Unrecovered faults from capability invocation.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The member returned an error.
    #[error("capability '{member}' failed: {error}")]
    InvocationFault {
        member: String,
        error: anyhow::Error,
    },

    /// The member panicked.
    #[error("capability '{member}' panicked: {detail}")]
    InvocationPanicked { member: String, detail: String },
}

impl DispatchError {
    pub fn member(&self) -> &str {
        match self {
            Self::InvocationFault { member, .. } | Self::InvocationPanicked { member, .. } => member,
        }
    }

    /// Full diagnostic text, including the error chain.
    pub fn detail(&self) -> String {
        match self {
            Self::InvocationFault { member, error } => {
                format!("Unhandled fault in capability '{}':\n{:?}", member, error)
            }
            Self::InvocationPanicked { member, detail } => {
                format!("Capability '{}' panicked:\n{}", member, detail)
            }
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let mut response = (StatusCode::INTERNAL_SERVER_ERROR, self.detail()).into_response();
        response
            .headers_mut()
            .insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fault_response_shows_chain() {
        let error = anyhow::anyhow!("disk on fire").context("writing report");
        let fault = DispatchError::InvocationFault {
            member: "Report".to_string(),
            error,
        };
        assert_eq!(fault.member(), "Report");

        let response = fault.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let body = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("Report"));
        assert!(text.contains("writing report"));
        assert!(text.contains("disk on fire"));
    }

    #[test]
    fn test_panic_display() {
        let fault = DispatchError::InvocationPanicked {
            member: "Greet".to_string(),
            detail: "index out of bounds".to_string(),
        };
        assert_eq!(
            fault.to_string(),
            "capability 'Greet' panicked: index out of bounds"
        );
    }
}

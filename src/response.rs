//! Uniform response envelope.
//!
//! Every endpoint answers with `{status, message, data?, meta?}`; the HTTP
//! status mirrors [`ServiceResponse::code`]. Rendering an envelope logs it:
//! `info` for success, `error` for failures.

use crate::error::Error;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

/// Message used when an error carries no text of its own.
pub const FALLBACK_MESSAGE: &str = "Oops; something went wrong, please try again later!";

/// Outcome of a service operation, ready to render.
#[derive(Clone, Debug)]
pub struct ServiceResponse {
    pub success: bool,
    pub code: StatusCode,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub meta: Option<serde_json::Value>,
    pub error: Option<Error>,
}

/// Wire shape of an envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl ServiceResponse {
    /// 200 OK envelope.
    pub fn success(
        message: impl Into<String>,
        data: Option<serde_json::Value>,
        meta: Option<serde_json::Value>,
    ) -> Self {
        Self::success_with_code(StatusCode::OK, message, data, meta)
    }

    /// Success envelope with an explicit 2xx code.
    pub fn success_with_code(
        code: StatusCode,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
        meta: Option<serde_json::Value>,
    ) -> Self {
        debug_assert!(code.is_success(), "success envelope with {}", code);
        Self {
            success: true,
            code,
            message: message.into(),
            data,
            meta,
            error: None,
        }
    }

    /// Error envelope.
    ///
    /// The message defaults to the error's own text, then to
    /// [`FALLBACK_MESSAGE`]. The code defaults to what the error kind
    /// implies: 404 for `NotFound`, 400 for `InvalidQuery`, 500 otherwise.
    pub fn error(
        err: Option<Error>,
        message: Option<String>,
        code: Option<StatusCode>,
        data: Option<serde_json::Value>,
    ) -> Self {
        let code = code.unwrap_or_else(|| err.as_ref().map_or(StatusCode::INTERNAL_SERVER_ERROR, status_of));
        let message = message
            .filter(|m| !m.is_empty())
            .or_else(|| err.as_ref().map(Error::to_string).filter(|m| !m.is_empty()))
            .unwrap_or_else(|| FALLBACK_MESSAGE.to_string());

        Self {
            success: false,
            code,
            message,
            data,
            meta: None,
            error: err,
        }
    }

    /// Wire form of this envelope.
    pub fn envelope(&self) -> Envelope {
        Envelope {
            status: if self.success { "success" } else { "error" }.to_string(),
            message: self.message.clone(),
            data: self.data.clone(),
            meta: self.meta.clone(),
        }
    }
}

fn status_of(err: &Error) -> StatusCode {
    match err {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<Error> for ServiceResponse {
    fn from(err: Error) -> Self {
        Self::error(Some(err), None, None, None)
    }
}

impl IntoResponse for ServiceResponse {
    fn into_response(self) -> Response {
        if self.success {
            info!("{} {}", self.code.as_u16(), self.message);
        } else {
            match &self.error {
                Some(err) => error!("{} {} ({:?})", self.code.as_u16(), self.message, err),
                None => error!("{} {}", self.code.as_u16(), self.message),
            }
        }

        (self.code, Json(self.envelope())).into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        ServiceResponse::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope() {
        let resp = ServiceResponse::success("Done", Some(json!([1])), Some(json!({"total": 1})));

        assert!(resp.success);
        assert_eq!(resp.code, StatusCode::OK);
        assert_eq!(
            serde_json::to_value(resp.envelope()).expect("Failed to serialize"),
            json!({"status": "success", "message": "Done", "data": [1], "meta": {"total": 1}})
        );
    }

    #[test]
    fn test_success_omits_absent_fields() {
        let resp = ServiceResponse::success("Welcome", None, None);
        assert_eq!(
            serde_json::to_value(resp.envelope()).expect("Failed to serialize"),
            json!({"status": "success", "message": "Welcome"})
        );
    }

    #[test]
    fn test_error_defaults() {
        let resp = ServiceResponse::error(None, None, None, None);
        assert!(!resp.success);
        assert_eq!(resp.code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.message, FALLBACK_MESSAGE);
    }

    #[test]
    fn test_error_kind_picks_code() {
        let not_found = ServiceResponse::from(Error::NotFound(
            "No country information was found for Atlantis".to_string(),
        ));
        assert_eq!(not_found.code, StatusCode::NOT_FOUND);
        assert_eq!(
            not_found.message,
            "No country information was found for Atlantis"
        );

        let bad = ServiceResponse::from(Error::InvalidQuery("minPopulation".to_string()));
        assert_eq!(bad.code, StatusCode::BAD_REQUEST);

        let internal = ServiceResponse::from(Error::Store("down".to_string()));
        assert_eq!(internal.code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(internal.message, "Store error: down");
    }

    #[test]
    fn test_explicit_message_and_code_win() {
        let resp = ServiceResponse::error(
            Some(Error::Store("down".to_string())),
            Some("Try later".to_string()),
            Some(StatusCode::SERVICE_UNAVAILABLE),
            Some(json!({"retry": true})),
        );

        assert_eq!(resp.code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            serde_json::to_value(resp.envelope()).expect("Failed to serialize"),
            json!({"status": "error", "message": "Try later", "data": {"retry": true}})
        );
    }

    #[test]
    fn test_into_response_status() {
        let response = Error::NotFound("gone".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

//! Response envelope.
//!
//! # Responsibilities
//! - Wrap every reply in the fixed `status`/`status_number`/`status_code`/
//!   `status_message`/`data` JSON shape
//! - Carry the HTTP status line, inheriting a body failure from the request
//!
//! # Design Decisions
//! - `reply` consumes the envelope: one response, written once
//! - The first status set wins; later ones are ignored with a warning
//! - The body is compact JSON without a trailing newline

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, HeaderValue, StatusCode},
    response::Response,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::error::ReplyError;
use crate::http::request::RequestAdapter;
use crate::observability::metrics;

/// Wire shape of every reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// 1 on success, 0 on failure.
    pub status: u8,
    pub status_number: String,
    pub status_code: String,
    pub status_message: String,
    pub data: Value,
}

/// Single-shot writer for an [`Envelope`].
#[derive(Debug, Default)]
pub struct ResponseEnvelope {
    http_status: Option<StatusCode>,
}

impl ResponseEnvelope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a response that answers with the request's body failure status,
    /// if parsing recorded one.
    pub fn for_request(request: &RequestAdapter) -> Self {
        Self {
            http_status: request.body_status(),
        }
    }

    /// Set the HTTP status line. Only the first status set takes effect.
    pub fn set_http_code(mut self, code: StatusCode) -> Self {
        match self.http_status {
            Some(current) if current != code => {
                tracing::warn!(
                    current = current.as_u16(),
                    ignored = code.as_u16(),
                    "Superfluous status code ignored"
                );
            }
            Some(_) => {}
            None => self.http_status = Some(code),
        }
        self
    }

    /// Status the response will be written with.
    pub fn http_status(&self) -> StatusCode {
        self.http_status.unwrap_or(StatusCode::OK)
    }

    pub fn reply<T: Serialize>(
        self,
        success: bool,
        number: &str,
        code: &str,
        message: &str,
        data: T,
    ) -> Result<Response, ReplyError> {
        let envelope = Envelope {
            status: u8::from(success),
            status_number: number.to_string(),
            status_code: code.to_string(),
            status_message: message.to_string(),
            data: serde_json::to_value(data)?,
        };
        let body = serde_json::to_vec(&envelope)?;

        metrics::record_reply(if success { "success" } else { "failed" });

        let response = Response::builder()
            .status(self.http_status())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(Body::from(body))?;
        Ok(response)
    }

    pub fn reply_failed<T: Serialize>(
        self,
        number: &str,
        code: &str,
        message: &str,
        data: T,
    ) -> Result<Response, ReplyError> {
        self.reply(false, number, code, message, data)
    }

    pub fn reply_success<T: Serialize>(
        self,
        number: &str,
        code: &str,
        message: &str,
        data: T,
    ) -> Result<Response, ReplyError> {
        self.reply(true, number, code, message, data)
    }
}

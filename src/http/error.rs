//! Error types for request adaptation and response writing.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors returned by request accessors.
#[derive(Debug, Error)]
pub enum RequestError {
    /// No upload was stored under the requested field name.
    #[error("no such file")]
    NoSuchFile,

    /// A single file was requested but the field holds several.
    #[error("invalid file, maybe files instead")]
    ExpectedFiles,

    /// Several files were requested but the field holds exactly one.
    #[error("invalid files, maybe file instead")]
    ExpectedFile,

    /// The stored upload could not be opened.
    #[error("files error: {0}")]
    FileOpen(#[from] std::io::Error),

    #[error("no time specified")]
    MissingTime,

    #[error("use RFC3339 format string for datetime")]
    InvalidTime,

    /// The retained body could not be decoded into the requested type.
    #[error("body decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Reasons a request body was not merged into the parameter store.
#[derive(Debug, Error)]
pub enum BodyError {
    #[error("failed to read request body: {0}")]
    Read(String),

    #[error("malformed multipart body: {0}")]
    Multipart(String),

    #[error("malformed form body: {0}")]
    Form(String),

    #[error("malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),

    /// An upload exceeded the in-memory budget and could not be spooled to disk.
    #[error("failed to store upload: {0}")]
    Spool(#[from] std::io::Error),
}

/// Errors raised while writing a response envelope.
#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("failed to serialize envelope: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to build response: {0}")]
    Build(#[from] axum::http::Error),
}

impl IntoResponse for ReplyError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Failed to write response envelope");
        (StatusCode::INTERNAL_SERVER_ERROR, "Failed to write response").into_response()
    }
}

//! Request body classification and decoding.
//!
//! # Responsibilities
//! - Decide whether a method carries a body worth parsing
//! - Classify the declared `Content-Type`
//! - Decode multipart, url-encoded and JSON payloads
//!
//! # Design Decisions
//! - Only the media-type essence is compared; parameters such as
//!   `charset` or `boundary` are ignored for classification
//! - The host's `DefaultBodyLimit` governs how much body is read
//! - Decoders return grouped raw strings or typed maps; merging into the
//!   store is left to the adapter so a failed body leaves no partial entries

use std::borrow::Cow;

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
    http::{Method, StatusCode},
};
use percent_encoding::percent_decode;
use serde_json::{Map, Value};

use crate::http::error::BodyError;
use crate::http::files::{FilePart, FileStore, Spooler};
use crate::params::infer::group;

pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const APPLICATION_JSON: &str = "application/json";

/// Body encodings the adapter knows how to merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Multipart,
    Form,
    Json,
    Other,
}

impl BodyKind {
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let essence = content_type
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase())
            .unwrap_or_default();

        match essence.as_str() {
            MULTIPART_FORM_DATA => BodyKind::Multipart,
            FORM_URLENCODED => BodyKind::Form,
            APPLICATION_JSON => BodyKind::Json,
            _ => BodyKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BodyKind::Multipart => "multipart",
            BodyKind::Form => "form",
            BodyKind::Json => "json",
            BodyKind::Other => "other",
        }
    }

    /// Status reported when a body of this kind cannot be decoded.
    pub fn rejection_status(&self) -> StatusCode {
        match self {
            BodyKind::Json => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// PUT, POST, DELETE and PATCH bodies are parsed; every other method only
/// contributes its query string.
pub fn carries_body(method: &Method) -> bool {
    matches!(
        *method,
        Method::PUT | Method::POST | Method::DELETE | Method::PATCH
    )
}

/// Decoded multipart payload.
#[derive(Debug, Default)]
pub(crate) struct MultipartBody {
    pub fields: Vec<(String, Vec<String>)>,
    pub files: FileStore,
}

pub(crate) async fn read_bytes<S>(request: Request, state: &S) -> Result<Bytes, BodyError>
where
    S: Send + Sync,
{
    Bytes::from_request(request, state)
        .await
        .map_err(|rejection| BodyError::Read(rejection.body_text()))
}

pub(crate) async fn read_multipart<S>(
    request: Request,
    state: &S,
    memory_budget: usize,
) -> Result<MultipartBody, BodyError>
where
    S: Send + Sync,
{
    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|rejection| BodyError::Multipart(rejection.body_text()))?;

    let mut spooler = Spooler::new(memory_budget);
    let mut fields: Vec<(String, String)> = Vec::new();
    let mut uploads: Vec<(String, FilePart)> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| BodyError::Multipart(err.body_text()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let file_name = field
            .file_name()
            .filter(|file_name| !file_name.is_empty())
            .map(str::to_string);

        match file_name {
            Some(file_name) => {
                let content_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|err| BodyError::Multipart(err.body_text()))?;
                let part = spooler.store(file_name, content_type, data).await?;
                uploads.push((name, part));
            }
            None => {
                let text = field
                    .text()
                    .await
                    .map_err(|err| BodyError::Multipart(err.body_text()))?;
                spooler.charge(text.len());
                fields.push((name, text));
            }
        }
    }

    Ok(MultipartBody {
        fields: group(fields),
        files: FileStore::from_groups(group(uploads)),
    })
}

/// Strictly decode an url-encoded payload into grouped raw pairs.
///
/// Every `%` must start a two-digit hex escape and every decoded key and
/// value must be UTF-8; the whole body is rejected otherwise.
pub(crate) fn decode_form(bytes: &[u8]) -> Result<Vec<(String, Vec<String>)>, BodyError> {
    let pairs = bytes
        .split(|byte| *byte == b'&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = match pair.iter().position(|byte| *byte == b'=') {
                Some(at) => (&pair[..at], &pair[at + 1..]),
                None => (pair, &pair[pair.len()..]),
            };
            Ok((decode_component(key)?, decode_component(value)?))
        })
        .collect::<Result<Vec<_>, BodyError>>()?;
    Ok(group(pairs))
}

fn decode_component(raw: &[u8]) -> Result<String, BodyError> {
    if let Some(at) = malformed_escape(raw) {
        return Err(BodyError::Form(format!(
            "invalid escape {:?}",
            String::from_utf8_lossy(&raw[at..raw.len().min(at + 3)])
        )));
    }
    let spaced: Vec<u8> = raw
        .iter()
        .map(|byte| if *byte == b'+' { b' ' } else { *byte })
        .collect();
    percent_decode(&spaced)
        .decode_utf8()
        .map(Cow::into_owned)
        .map_err(|err| BodyError::Form(err.to_string()))
}

/// Offset of the first `%` not followed by two hex digits.
fn malformed_escape(raw: &[u8]) -> Option<usize> {
    raw.iter()
        .enumerate()
        .filter(|(_, byte)| **byte == b'%')
        .map(|(at, _)| at)
        .find(|&at| {
            !matches!(
                raw.get(at + 1..at + 3),
                Some([high, low]) if high.is_ascii_hexdigit() && low.is_ascii_hexdigit()
            )
        })
}

/// Decode a JSON object body. A `null` body carries no entries.
pub(crate) fn decode_json(bytes: &[u8]) -> Result<Map<String, Value>, BodyError> {
    let object: Option<Map<String, Value>> = serde_json::from_slice(bytes)?;
    Ok(object.unwrap_or_default())
}

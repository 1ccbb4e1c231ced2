//! Demo handlers.
//!
//! Every handler extracts a [`RequestAdapter`] and answers with a
//! [`ResponseEnvelope`], so body failures surface with the status the
//! adapter recorded.

use std::collections::BTreeMap;
use std::io;
use std::net::IpAddr;

use axum::{http::StatusCode, response::Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::http::error::{ReplyError, RequestError};
use crate::http::files::{FileHeader, FilePart, UploadedFile};
use crate::http::request::RequestAdapter;
use crate::http::response::ResponseEnvelope;
use crate::params::{ParamAccess, Params};

pub const SUCCESS_NUMBER: &str = "0000000";
pub const SUCCESS_CODE: &str = "SSSSSS";
pub const FAILURE_NUMBER: &str = "0000001";

type Reply = Result<Response, ReplyError>;

/// `GET /`: reads `list.obj.id[0]` and replies success.
pub async fn index(request: RequestAdapter) -> Reply {
    let first_id = request
        .get_map("list")
        .and_then(|list| list.get("obj"))
        .and_then(|obj| obj.get("id"))
        .and_then(|ids| ids.get(0));
    if let Some(id) = first_id {
        info!(id = %id, "list.obj.id[0]");
    }

    ResponseEnvelope::for_request(&request).reply_success(
        SUCCESS_NUMBER,
        SUCCESS_CODE,
        "Success",
        Value::Null,
    )
}

#[derive(Serialize)]
struct EchoData<'a> {
    method: &'a str,
    path: &'a str,
    params: &'a Params,
    files: BTreeMap<&'a str, Vec<&'a FileHeader>>,
}

/// `ANY /echo`: replies with everything the adapter parsed.
pub async fn echo(request: RequestAdapter) -> Reply {
    let envelope = ResponseEnvelope::for_request(&request);

    if let Some(status) = request.body_status() {
        return envelope.reply_failed(
            FAILURE_NUMBER,
            "BODYER",
            status.canonical_reason().unwrap_or("Bad body"),
            request.params(),
        );
    }

    let files: BTreeMap<&str, Vec<&FileHeader>> = request
        .files()
        .iter()
        .map(|(name, entry)| (name, entry.parts().iter().map(FilePart::header).collect()))
        .collect();

    envelope.reply_success(
        SUCCESS_NUMBER,
        SUCCESS_CODE,
        "Success",
        EchoData {
            method: request.method().as_str(),
            path: request.path(),
            params: request.params(),
            files,
        },
    )
}

#[derive(Debug, Serialize)]
struct UploadSummary {
    file_name: String,
    content_type: Option<String>,
    size: u64,
    bytes_read: u64,
}

/// `POST /upload/{kind}`: `single` opens field `file` with the single-file
/// accessor, `many` with the plural one.
pub async fn upload(request: RequestAdapter) -> Reply {
    let opened = match request.segment("kind") {
        "single" => request.get_file("file").map(|file| vec![file]),
        "many" => request.get_files("file"),
        other => {
            return ResponseEnvelope::new()
                .set_http_code(StatusCode::NOT_FOUND)
                .reply_failed(
                    FAILURE_NUMBER,
                    "NOKIND",
                    &format!("unknown upload kind '{other}'"),
                    Value::Null,
                );
        }
    };

    let envelope = ResponseEnvelope::for_request(&request);
    let files = match opened {
        Ok(files) => files,
        Err(err) => {
            return envelope.set_http_code(StatusCode::BAD_REQUEST).reply_failed(
                FAILURE_NUMBER,
                "FILEER",
                &err.to_string(),
                Value::Null,
            );
        }
    };

    match drain(files).await {
        Ok(summaries) => {
            envelope.reply_success(SUCCESS_NUMBER, SUCCESS_CODE, "Success", summaries)
        }
        Err(err) => envelope
            .set_http_code(StatusCode::INTERNAL_SERVER_ERROR)
            .reply_failed(FAILURE_NUMBER, "FILEER", &err.to_string(), Value::Null),
    }
}

/// Read every upload to the end off the async runtime.
async fn drain(files: Vec<UploadedFile>) -> io::Result<Vec<UploadSummary>> {
    tokio::task::spawn_blocking(move || {
        files
            .into_iter()
            .map(|mut file| -> io::Result<UploadSummary> {
                let bytes_read = io::copy(&mut file, &mut io::sink())?;
                Ok(UploadSummary {
                    file_name: file.file_name().to_string(),
                    content_type: file.content_type().map(str::to_string),
                    size: file.size(),
                    bytes_read,
                })
            })
            .collect()
    })
    .await
    .map_err(io::Error::other)?
}

#[derive(Serialize)]
struct ItemData<'a> {
    id: u64,
    raw_id: &'a str,
    since: Option<String>,
    limit: Option<u64>,
    verbose: bool,
}

/// `GET /items/{id}`: segment, time and strict numeric accessors.
pub async fn item(request: RequestAdapter) -> Reply {
    let envelope = ResponseEnvelope::for_request(&request);

    let since = match request.get_time("since") {
        Ok(time) => Some(time.to_rfc3339()),
        Err(RequestError::MissingTime) => None,
        Err(err) => {
            return envelope.set_http_code(StatusCode::BAD_REQUEST).reply_failed(
                FAILURE_NUMBER,
                "TIMEER",
                &err.to_string(),
                Value::Null,
            );
        }
    };

    envelope.reply_success(
        SUCCESS_NUMBER,
        SUCCESS_CODE,
        "Success",
        ItemData {
            id: request.segment_u64("id"),
            raw_id: request.segment("id"),
            since,
            limit: request.try_u64("limit"),
            verbose: request.get_bool("verbose"),
        },
    )
}

#[derive(Debug, Deserialize)]
struct Greeting {
    name: String,
    #[serde(default = "one")]
    times: usize,
}

fn one() -> usize {
    1
}

/// `POST /greet`: decodes the retained body as a struct.
pub async fn greet(request: RequestAdapter) -> Reply {
    let envelope = ResponseEnvelope::for_request(&request);

    match request.get_struct::<Greeting>() {
        Ok(greeting) => {
            let message = vec![format!("Hello, {}", greeting.name); greeting.times.min(8)];
            envelope.reply_success(SUCCESS_NUMBER, SUCCESS_CODE, "Success", message)
        }
        Err(err) => envelope.set_http_code(StatusCode::BAD_REQUEST).reply_failed(
            FAILURE_NUMBER,
            "DECODE",
            &err.to_string(),
            Value::Null,
        ),
    }
}

#[derive(Serialize)]
struct Caller {
    client_ip: Option<IpAddr>,
    scheme: String,
    host: String,
    url: String,
    full_url: String,
    user: Option<String>,
}

/// `GET /whoami`: URL, client address and Basic auth accessors.
pub async fn whoami(request: RequestAdapter) -> Reply {
    let caller = Caller {
        client_ip: request.client_ip(),
        scheme: request.scheme().to_string(),
        host: request.host(),
        url: request.url(),
        full_url: request.full_url(),
        user: request.has_user().then(|| request.username()),
    };

    ResponseEnvelope::for_request(&request).reply_success(
        SUCCESS_NUMBER,
        SUCCESS_CODE,
        "Success",
        caller,
    )
}

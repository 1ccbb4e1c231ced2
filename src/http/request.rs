//! Request adaptation.
//!
//! # Responsibilities
//! - Merge query parameters and the request body into one [`Params`] store
//! - Keep multipart uploads in a separate [`FileStore`]
//! - Expose URL, header, Basic auth, path segment and client address accessors
//! - Record a body failure as a status for the response to inherit
//!
//! # Data Flow
//! ```text
//! axum Request
//!     → query string (always)          → infer → Params
//!     → PUT/POST/DELETE/PATCH body:
//!         multipart/form-data          → fields → infer → Params
//!                                      → files  → FileStore
//!         x-www-form-urlencoded        → infer → Params
//!         application/json             → Params (typed, no inference)
//!         anything else                → ignored
//! ```
//!
//! # Design Decisions
//! - Construction never fails; a bad body leaves the query parameters and
//!   sets `body_status` (400, or 500 for JSON)
//! - Body entries overwrite query entries with the same key
//! - The raw form/JSON body is kept so it can be decoded again as a struct

use std::collections::HashMap;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Bytes,
    extract::{ConnectInfo, FromRequest, FromRequestParts, RawPathParams, Request},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, HOST},
        uri::Authority,
        HeaderMap, Method, StatusCode, Uri,
    },
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::http::body::{self, BodyKind};
use crate::http::error::{BodyError, RequestError};
use crate::http::files::{FileStore, UploadedFile};
use crate::observability::metrics;
use crate::params::{ParamAccess, Params};

/// Header consulted for the original client address behind a proxy.
pub const X_FORWARDED_FOR: &str = "x-forwarded-for";
pub const X_REAL_IP: &str = "x-real-ip";
pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Per-request parsing options, read from the request extensions.
///
/// Install with `axum::Extension(PlugOptions { .. })` on the router; requests
/// without the extension use the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlugOptions {
    /// Bytes of multipart data kept in memory before uploads spill to disk.
    pub multipart_max_memory: usize,
}

impl Default for PlugOptions {
    fn default() -> Self {
        Self {
            multipart_max_memory: 32 << 10,
        }
    }
}

/// A single queryable view over everything a request carried.
#[derive(Debug)]
pub struct RequestAdapter {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    segments: HashMap<String, String>,
    params: Params,
    files: FileStore,
    raw_body: Bytes,
    remote_addr: Option<SocketAddr>,
    body_status: Option<StatusCode>,
}

impl RequestAdapter {
    /// Parse `request` into an adapter. Never fails; see [`Self::body_status`].
    pub async fn plug<S>(request: Request, state: &S) -> Self
    where
        S: Send + Sync,
    {
        let (mut parts, body) = request.into_parts();

        let segments = match RawPathParams::from_request_parts(&mut parts, state).await {
            Ok(raw) => raw
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            Err(_) => HashMap::new(),
        };
        let options = parts
            .extensions
            .get::<PlugOptions>()
            .copied()
            .unwrap_or_default();
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        let mut adapter = Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            segments,
            params: Params::from_query(parts.uri.query()),
            files: FileStore::default(),
            raw_body: Bytes::new(),
            remote_addr,
            body_status: None,
        };

        debug!(
            method = %adapter.method,
            path = %adapter.uri.path(),
            param_count = adapter.params.len(),
            "Query params parsed"
        );

        if !body::carries_body(&adapter.method) {
            metrics::record_plugged("none");
            return adapter;
        }

        let kind = BodyKind::from_content_type(
            adapter
                .headers
                .get(CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
        );
        let request = Request::from_parts(parts, body);

        let outcome = match kind {
            BodyKind::Multipart => adapter.absorb_multipart(request, state, options).await,
            BodyKind::Form => adapter.absorb_form(request, state).await,
            BodyKind::Json => adapter.absorb_json(request, state).await,
            BodyKind::Other => Ok(()),
        };

        match outcome {
            Ok(()) => {
                debug!(
                    kind = kind.as_str(),
                    param_count = adapter.params.len(),
                    file_fields = adapter.files.len(),
                    "Request body merged"
                );
                metrics::record_plugged(kind.as_str());
            }
            Err(err) => {
                let status = kind.rejection_status();
                warn!(
                    kind = kind.as_str(),
                    status = status.as_u16(),
                    error = %err,
                    "Request body rejected"
                );
                metrics::record_body_rejected(kind.as_str(), status.as_u16());
                adapter.body_status = Some(status);
            }
        }

        adapter
    }

    async fn absorb_multipart<S>(
        &mut self,
        request: Request,
        state: &S,
        options: PlugOptions,
    ) -> Result<(), BodyError>
    where
        S: Send + Sync,
    {
        let multipart = body::read_multipart(request, state, options.multipart_max_memory).await?;
        self.params.merge_raw(multipart.fields);
        self.files = multipart.files;
        Ok(())
    }

    async fn absorb_form<S>(&mut self, request: Request, state: &S) -> Result<(), BodyError>
    where
        S: Send + Sync,
    {
        let bytes = body::read_bytes(request, state).await?;
        self.params.merge_raw(body::decode_form(&bytes)?);
        self.raw_body = bytes;
        Ok(())
    }

    async fn absorb_json<S>(&mut self, request: Request, state: &S) -> Result<(), BodyError>
    where
        S: Send + Sync,
    {
        let bytes = body::read_bytes(request, state).await?;
        self.raw_body = bytes.clone();
        self.params.merge_typed(body::decode_json(&bytes)?);
        Ok(())
    }

    /// Status to answer with when the body could not be merged: 400 for
    /// multipart and url-encoded bodies, 500 for JSON.
    pub fn body_status(&self) -> Option<StatusCode> {
        self.body_status
    }

    /// Add or overwrite one parameter.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.params.append(key, value);
    }

    /// Decode the retained body as JSON into `T`.
    ///
    /// Url-encoded bodies are retained too but only decode if they happen to
    /// be JSON. Multipart bodies are consumed while parsing and decode as
    /// empty input.
    pub fn get_struct<T: DeserializeOwned>(&self) -> Result<T, RequestError> {
        Ok(serde_json::from_slice(&self.raw_body)?)
    }

    pub fn raw_body(&self) -> &[u8] {
        &self.raw_body
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    // --- url ---

    fn authority(&self) -> Option<Authority> {
        match self.uri.authority() {
            Some(authority) => Some(authority.clone()),
            None => self
                .headers
                .get(HOST)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.parse().ok()),
        }
    }

    /// Host name without the port, from the URI or the `Host` header.
    pub fn host(&self) -> String {
        self.authority()
            .map(|authority| authority.host().to_string())
            .unwrap_or_default()
    }

    pub fn port(&self) -> Option<u16> {
        self.authority().and_then(|authority| authority.port_u16())
    }

    /// URI scheme, else `X-Forwarded-Proto`, else `http`.
    pub fn scheme(&self) -> &str {
        self.uri
            .scheme_str()
            .or_else(|| {
                self.headers
                    .get(X_FORWARDED_PROTO)
                    .and_then(|value| value.to_str().ok())
            })
            .unwrap_or("http")
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn raw_query(&self) -> &str {
        self.uri.query().unwrap_or_default()
    }

    /// `scheme://authority/path`, without the query.
    pub fn url(&self) -> String {
        let authority = self
            .authority()
            .map(|authority| authority.to_string())
            .unwrap_or_default();
        format!("{}://{}{}", self.scheme(), authority, self.path())
    }

    /// [`Self::url`] plus the query string when there is one.
    pub fn full_url(&self) -> String {
        match self.uri.query() {
            Some(query) => format!("{}?{}", self.url(), query),
            None => self.url(),
        }
    }

    // --- client ---

    /// Original client address: first `X-Forwarded-For` hop, then
    /// `X-Real-IP`, then the connection peer.
    pub fn client_ip(&self) -> Option<IpAddr> {
        let forwarded = self
            .headers
            .get(X_FORWARDED_FOR)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .and_then(|hop| hop.trim().parse().ok());

        forwarded
            .or_else(|| {
                self.headers
                    .get(X_REAL_IP)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.trim().parse().ok())
            })
            .or_else(|| self.remote_addr.map(|addr| addr.ip()))
    }

    /// Port of the connection peer.
    pub fn client_port(&self) -> Option<u16> {
        self.remote_addr.map(|addr| addr.port())
    }

    // --- basic auth ---

    fn basic_auth(&self) -> Option<(String, String)> {
        let value = self.headers.get(AUTHORIZATION)?.to_str().ok()?;
        let (scheme, encoded) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (user, password) = decoded.split_once(':')?;
        Some((user.to_string(), password.to_string()))
    }

    pub fn has_user(&self) -> bool {
        self.basic_auth().is_some()
    }

    pub fn username(&self) -> String {
        self.basic_auth().map(|(user, _)| user).unwrap_or_default()
    }

    pub fn password(&self) -> String {
        self.basic_auth()
            .map(|(_, password)| password)
            .unwrap_or_default()
    }

    // --- headers ---

    /// First value of a header, or `""`.
    pub fn header(&self, key: &str) -> &str {
        self.headers
            .get(key)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    pub fn has_header(&self, keys: &[&str]) -> bool {
        keys.iter().all(|key| self.headers.contains_key(*key))
    }

    pub fn header_filled(&self, keys: &[&str]) -> bool {
        keys.iter()
            .all(|key| self.headers.contains_key(*key) && !self.header(key).is_empty())
    }

    // --- path segments ---

    pub fn segment(&self, key: &str) -> &str {
        self.segments.get(key).map(String::as_str).unwrap_or_default()
    }

    pub fn segment_u64(&self, key: &str) -> u64 {
        self.segment(key).parse().unwrap_or_default()
    }

    pub fn segment_u32(&self, key: &str) -> u32 {
        self.segment_u64(key) as u32
    }

    pub fn segment_usize(&self, key: &str) -> usize {
        self.segment_u64(key) as usize
    }

    pub fn segment_i64(&self, key: &str) -> i64 {
        self.segment(key).parse().unwrap_or_default()
    }

    pub fn segment_i32(&self, key: &str) -> i32 {
        self.segment_i64(key) as i32
    }

    pub fn segment_isize(&self, key: &str) -> isize {
        self.segment_i64(key) as isize
    }

    // --- files ---

    pub fn files(&self) -> &FileStore {
        &self.files
    }

    pub fn has_file(&self, keys: &[&str]) -> bool {
        keys.iter().all(|key| self.files.contains(key))
    }

    pub fn get_file(&self, key: &str) -> Result<UploadedFile, RequestError> {
        self.files.get_file(key)
    }

    pub fn get_files(&self, key: &str) -> Result<Vec<UploadedFile>, RequestError> {
        self.files.get_files(key)
    }
}

impl ParamAccess for RequestAdapter {
    fn params(&self) -> &Params {
        &self.params
    }
}

impl<S> FromRequest<S> for RequestAdapter
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::plug(request, state).await)
    }
}

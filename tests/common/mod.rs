//! Shared utilities for integration tests.

use std::net::SocketAddr;

use axum::body::Body;
use axum::http::Response;
use http_body_util::BodyExt;
use http_plug::http::Envelope;
use http_plug::{HttpServer, ServiceConfig, Shutdown};
use tokio::net::TcpListener;

/// Start the demo server on an ephemeral port. Dropping or triggering the
/// returned [`Shutdown`] stops it.
#[allow(dead_code)]
pub async fn start_server(config: ServiceConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let signal = shutdown.subscribe();
    tokio::spawn(async move {
        HttpServer::new(config).run(listener, signal).await.unwrap();
    });

    (addr, shutdown)
}

/// Collect a response body into a decoded envelope.
#[allow(dead_code)]
pub async fn envelope(response: Response<Body>) -> Envelope {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Hand-built multipart body with boundary `XYZ`. Parts are
/// `(field, Some(filename), content)` for files, `(field, None, value)` for
/// text fields.
#[allow(dead_code)]
pub fn multipart_body(parts: &[(&str, Option<&str>, &str)]) -> String {
    let mut body = String::new();
    for (field, file_name, content) in parts {
        body.push_str("--XYZ\r\n");
        match file_name {
            Some(name) => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\n\
                 Content-Type: text/plain\r\n\r\n"
            )),
            None => body.push_str(&format!(
                "Content-Disposition: form-data; name=\"{field}\"\r\n\r\n"
            )),
        }
        body.push_str(content);
        body.push_str("\r\n");
    }
    body.push_str("--XYZ--\r\n");
    body
}

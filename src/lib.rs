//! Request adaptation for axum services.
//!
//! [`RequestAdapter`] folds the query string and the request body
//! (multipart, url-encoded or JSON) into one parameter store with lenient
//! typed accessors, and keeps uploads in a separate file store.
//! [`ResponseEnvelope`] writes every reply in one fixed JSON shape.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod params;

pub use config::schema::ServiceConfig;
pub use http::{HttpServer, RequestAdapter, ResponseEnvelope};
pub use lifecycle::Shutdown;
pub use params::{ParamAccess, Params};

//! HTTP request adaptation and response writing.
//!
//! # Data Flow
//! ```text
//! axum Request
//!     → request.rs (RequestAdapter: query + body → Params, uploads → FileStore)
//!         → body.rs (content-type dispatch, multipart/form/JSON decoding)
//!         → files.rs (in-memory or spooled uploads)
//!     → handler (typed accessors via params::ParamAccess)
//!     → response.rs (ResponseEnvelope → JSON envelope)
//!     → Send to client
//! ```
//!
//! `server.rs` and `handlers.rs` host the adapter in the demo service.

pub mod body;
pub mod error;
pub mod files;
pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use error::{BodyError, ReplyError, RequestError};
pub use files::{FileEntry, FileHeader, FilePart, FileStore, UploadedFile};
pub use request::{PlugOptions, RequestAdapter};
pub use response::{Envelope, ResponseEnvelope};
pub use server::HttpServer;

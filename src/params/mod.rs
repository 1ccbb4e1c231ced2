//! Parameter store subsystem.
//!
//! # Data Flow
//! ```text
//! raw strings (query, url-encoded form, multipart fields)
//!     → infer.rs (group repeated keys, JSON array/object detection)
//!     → store.rs (Params: one key → value map, body wins on collision)
//!
//! typed JSON body
//!     → store.rs (merged as-is, no inference)
//!
//! handlers
//!     → access.rs (lenient typed getters, presence predicates)
//! ```
//!
//! # Design Decisions
//! - Values are `serde_json::Value`, a closed set of variants matched explicitly
//! - The store is filled once at construction; `append` is the only later write
//! - Lenient getters never fail; `try_*` getters report absence as `None`

pub mod access;
pub mod infer;
pub mod store;

pub use access::ParamAccess;
pub use infer::{group, identify, scan};
pub use store::Params;

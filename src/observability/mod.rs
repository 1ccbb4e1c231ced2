//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! request adapter / response envelope produce:
//!     → tracing events (parse steps, body rejections)
//!     → metrics.rs (counters per body kind and reply outcome)
//!
//! demo binary installs:
//!     → logging.rs (subscriber: env filter + pretty/json formatter)
//!     → metrics.rs (Prometheus scrape endpoint)
//! ```
//!
//! # Design Decisions
//! - The library only emits; installing subscribers and exporters is left
//!   to the hosting binary
//! - Metrics are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;

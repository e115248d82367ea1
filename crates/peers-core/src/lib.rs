//! Core data model shared by all PeerIQ crates: the canonical
//! `{ticker -> {metric -> [{period, value}]}}` shape, fiscal-period math,
//! and the JSON sanitizer that keeps provider payloads serializable.

pub mod error;
pub mod period;
pub mod sanitize;
pub mod types;

pub use error::PeersError;
pub use period::{cmp_period_labels, max_period, min_period, FiscalQuarter, PeriodWindow};
pub use sanitize::{sanitize_f64, sanitize_json};
pub use types::{CompanyFinancials, DataPoint, MetricSeries};

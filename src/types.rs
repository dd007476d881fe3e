//! Shared key newtypes, calendar-date handling, and the crate-wide error type.

use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;
use time::macros::format_description;
use time::Date;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FaroError>;

/// Identifier of a customer row.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct CustKey(pub i64);

/// Identifier of an order row and of one aggregated output row.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub struct OrderKey(pub i64);

impl fmt::Display for CustKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CustKey {
    fn from(value: i64) -> Self {
        CustKey(value)
    }
}

impl From<CustKey> for i64 {
    fn from(value: CustKey) -> Self {
        value.0
    }
}

impl From<i64> for OrderKey {
    fn from(value: i64) -> Self {
        OrderKey(value)
    }
}

impl From<OrderKey> for i64 {
    fn from(value: OrderKey) -> Self {
        value.0
    }
}

/// Parses a `YYYY-MM-DD` string into a calendar date.
///
/// The `context` label names the field being parsed (for example
/// `"orders.o_orderdate"`) and is carried into the error so a failing query
/// points at the offending column. Parsing is strict: the string must be a
/// real calendar date, not merely three dash-separated numbers.
pub fn parse_date(context: &'static str, value: &str) -> Result<Date> {
    Date::parse(value, format_description!("[year]-[month]-[day]")).map_err(|_| {
        FaroError::ParseDate {
            context,
            value: value.to_owned(),
        }
    })
}

/// Renders a calendar date back into its fixed-width `YYYY-MM-DD` form.
pub fn format_date(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// Serde helper that writes dates in `YYYY-MM-DD` form.
pub fn serialize_date<S: Serializer>(date: &Date, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_date(*date))
}

/// Errors surfaced by the engine.
///
/// Every variant is fatal to the enclosing query: there is no per-record
/// retry or skip-and-continue, and partial results are never returned.
#[derive(Debug, Error)]
pub enum FaroError {
    /// I/O failure while reading a table.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Transport-level CSV failure (malformed quoting, unreadable file).
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    /// A table's column layout does not match its fixed positional schema.
    #[error("schema mismatch in {table}: {detail}")]
    SchemaMismatch {
        /// Table whose layout was rejected.
        table: &'static str,
        /// Human-readable description of the divergence.
        detail: String,
    },
    /// A date column or parameter does not hold a `YYYY-MM-DD` calendar date.
    #[error("invalid date in {context}: {value:?} is not a YYYY-MM-DD calendar date")]
    ParseDate {
        /// Field or parameter being parsed.
        context: &'static str,
        /// Offending input string.
        value: String,
    },
    /// Two aggregation groups share an order key but disagree on the order
    /// date or ship priority. Indicates corrupted input; never reconciled.
    #[error("aggregation invariant violated for order {order_key}: {detail}")]
    AggregationInvariant {
        /// Order key shared by the conflicting groups.
        order_key: i64,
        /// Description of the disagreement.
        detail: String,
    },
    /// Internal state that can only arise from corrupted construction.
    #[error("corruption detected: {0}")]
    Corruption(String),
    /// Invalid argument with a static description.
    #[error("invalid argument: {0}")]
    Invalid(&'static str),
    /// Invalid argument with a dynamic description.
    #[error("invalid argument: {0}")]
    InvalidOwned(String),
}

impl FaroError {
    /// Returns a machine-readable code for the error variant.
    pub fn code(&self) -> &'static str {
        match self {
            FaroError::Io(_) => "Io",
            FaroError::Csv(_) => "Csv",
            FaroError::SchemaMismatch { .. } => "SchemaMismatch",
            FaroError::ParseDate { .. } => "ParseDate",
            FaroError::AggregationInvariant { .. } => "AggregationInvariant",
            FaroError::Corruption(_) => "Corruption",
            FaroError::Invalid(_) | FaroError::InvalidOwned(_) => "Invalid",
        }
    }
}

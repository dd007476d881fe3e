//! Shipping-priority revenue reports over customer, orders and lineitem
//! CSV data.
//!
//! One fixed query shape is supported: filter the three relations by market
//! segment and cutoff date, join them with two hash joins, fold revenue per
//! order group, and sort the groups by revenue. [`Engine`] ties table
//! access, planning, and execution together; the `faro` binary wraps it.

#![warn(missing_docs)]

pub mod cli;
pub mod datagen;
pub mod engine;
pub mod query;
pub mod record;
pub mod types;

pub use engine::Engine;
pub use query::{QueryOutput, QueryParams, ResultRow};
pub use types::{FaroError, Result};

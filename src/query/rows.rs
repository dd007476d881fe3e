//! Typed tuples flowing between pipeline stages, and the query output.

use std::time::Duration;

use serde::Serialize;
use time::Date;

use crate::types::{format_date, serialize_date, CustKey, FaroError, OrderKey, Result};

/// Order that survived the order-date filter.
///
/// Carries everything later stages need: the customer key feeds the first
/// join, the order key feeds the second, and date plus priority travel
/// through to the output group.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OrderTuple {
    /// `o_orderkey`.
    pub order_key: OrderKey,
    /// `o_custkey`.
    pub cust_key: CustKey,
    /// `o_orderdate`, strictly before the cutoff.
    pub order_date: Date,
    /// `o_shippriority`.
    pub ship_priority: i32,
}

/// Line item that survived the ship-date filter, reduced to the revenue it
/// contributes: `l_extendedprice * (1 - l_discount)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LineItemRevenue {
    /// `l_orderkey`.
    pub order_key: OrderKey,
    /// Revenue contribution of this line item.
    pub revenue: f64,
}

/// Grouping key of the aggregation.
///
/// Order date and ship priority are functionally dependent on the order key
/// in well-formed data, so each key identifies exactly one output row.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct AggregationKey {
    /// Order key of the group.
    pub order_key: OrderKey,
    /// Order date shared by the group.
    pub order_date: Date,
    /// Ship priority shared by the group.
    pub ship_priority: i32,
}

/// One aggregated output row.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultRow {
    /// Order key of the group.
    pub order_key: OrderKey,
    /// Summed revenue across the group's line items.
    pub revenue: f64,
    /// Order date shared by the group.
    #[serde(serialize_with = "serialize_date")]
    pub order_date: Date,
    /// Ship priority shared by the group.
    pub ship_priority: i32,
}

impl ResultRow {
    /// Seeds a group from one joined order/line-item pair.
    pub fn new(order: &OrderTuple, line: &LineItemRevenue) -> Self {
        ResultRow {
            order_key: order.order_key,
            revenue: line.revenue,
            order_date: order.order_date,
            ship_priority: order.ship_priority,
        }
    }

    /// Grouping key of this row.
    pub fn key(&self) -> AggregationKey {
        AggregationKey {
            order_key: self.order_key,
            order_date: self.order_date,
            ship_priority: self.ship_priority,
        }
    }

    /// Folds another row of the same group into this one.
    ///
    /// Both rows must carry the same grouping key; a disagreement means the
    /// caller grouped incorrectly and is reported, never papered over.
    pub fn accumulate(&mut self, other: ResultRow) -> Result<()> {
        if self.key() != other.key() {
            return Err(FaroError::AggregationInvariant {
                order_key: self.order_key.0,
                detail: format!(
                    "cannot fold ({}, {}) into ({}, {})",
                    format_date(other.order_date),
                    other.ship_priority,
                    format_date(self.order_date),
                    self.ship_priority
                ),
            });
        }
        self.revenue += other.revenue;
        Ok(())
    }
}

/// Materialized result of one query run.
#[derive(Clone, Debug)]
pub struct QueryOutput {
    /// Groups in final presentation order: revenue descending, then order
    /// date ascending, then order key ascending.
    pub rows: Vec<ResultRow>,
    /// Hash of the physical plan that produced the rows.
    pub plan_hash: u64,
    /// Wall-clock time spent planning and executing.
    pub elapsed: Duration,
}

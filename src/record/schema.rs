//! Fixed positional column layouts for the three relations.

use crate::types::{FaroError, Result};

/// Scalar type of one column.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ColumnType {
    /// 64-bit signed integer.
    Long,
    /// 32-bit signed integer.
    Int,
    /// 64-bit float.
    Double,
    /// UTF-8 text. Dates travel as text and are parsed where consumed.
    Str,
}

impl ColumnType {
    /// SQL-ish name used in error messages.
    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Long => "BIGINT",
            ColumnType::Int => "INTEGER",
            ColumnType::Double => "DOUBLE",
            ColumnType::Str => "TEXT",
        }
    }
}

/// One column at a fixed position in a relation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ColumnDef {
    /// Column name as it appears in a CSV header row.
    pub name: &'static str,
    /// Scalar type of the column's cells.
    pub ty: ColumnType,
}

const fn col(name: &'static str, ty: ColumnType) -> ColumnDef {
    ColumnDef { name, ty }
}

/// Column indexes the engine reads from the customer relation.
pub mod customer {
    /// `c_custkey`.
    pub const CUSTKEY: usize = 0;
    /// `c_mktsegment`.
    pub const MKTSEGMENT: usize = 6;
}

/// Column indexes the engine reads from the orders relation.
pub mod orders {
    /// `o_orderkey`.
    pub const ORDERKEY: usize = 0;
    /// `o_custkey`.
    pub const CUSTKEY: usize = 1;
    /// `o_orderdate`.
    pub const ORDERDATE: usize = 2;
    /// `o_shippriority`.
    pub const SHIPPRIORITY: usize = 3;
}

/// Column indexes the engine reads from the lineitem relation.
pub mod lineitem {
    /// `l_orderkey`.
    pub const ORDERKEY: usize = 0;
    /// `l_extendedprice`.
    pub const EXTENDEDPRICE: usize = 1;
    /// `l_discount`.
    pub const DISCOUNT: usize = 2;
    /// `l_shipdate`.
    pub const SHIPDATE: usize = 10;
}

const CUSTOMER_COLUMNS: &[ColumnDef] = &[
    col("c_custkey", ColumnType::Long),
    col("c_name", ColumnType::Str),
    col("c_address", ColumnType::Str),
    col("c_nationkey", ColumnType::Long),
    col("c_phone", ColumnType::Str),
    col("c_acctbal", ColumnType::Double),
    col("c_mktsegment", ColumnType::Str),
    col("c_comment", ColumnType::Str),
];

const ORDERS_COLUMNS: &[ColumnDef] = &[
    col("o_orderkey", ColumnType::Long),
    col("o_custkey", ColumnType::Long),
    col("o_orderdate", ColumnType::Str),
    col("o_shippriority", ColumnType::Int),
    col("o_orderstatus", ColumnType::Str),
    col("o_totalprice", ColumnType::Double),
    col("o_orderpriority", ColumnType::Str),
    col("o_clerk", ColumnType::Str),
    col("o_comment", ColumnType::Str),
];

const LINEITEM_COLUMNS: &[ColumnDef] = &[
    col("l_orderkey", ColumnType::Long),
    col("l_extendedprice", ColumnType::Double),
    col("l_discount", ColumnType::Double),
    col("l_partkey", ColumnType::Long),
    col("l_suppkey", ColumnType::Long),
    col("l_linenumber", ColumnType::Int),
    col("l_quantity", ColumnType::Double),
    col("l_tax", ColumnType::Double),
    col("l_returnflag", ColumnType::Str),
    col("l_linestatus", ColumnType::Str),
    col("l_shipdate", ColumnType::Str),
    col("l_commitdate", ColumnType::Str),
    col("l_receiptdate", ColumnType::Str),
];

/// Ordered column layout of one relation.
///
/// The three layouts are fixed at compile time. Sources validate their data
/// against the layout before the engine reads a single row; any divergence
/// is a [`FaroError::SchemaMismatch`] and aborts the query.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TableSchema {
    name: &'static str,
    columns: &'static [ColumnDef],
}

impl TableSchema {
    /// Layout of the customer relation.
    pub fn customer() -> Self {
        TableSchema {
            name: "customer",
            columns: CUSTOMER_COLUMNS,
        }
    }

    /// Layout of the orders relation.
    pub fn orders() -> Self {
        TableSchema {
            name: "orders",
            columns: ORDERS_COLUMNS,
        }
    }

    /// Layout of the lineitem relation.
    pub fn lineitem() -> Self {
        TableSchema {
            name: "lineitem",
            columns: LINEITEM_COLUMNS,
        }
    }

    /// Relation name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Columns in positional order.
    pub fn columns(&self) -> &[ColumnDef] {
        self.columns
    }

    /// Number of columns.
    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    /// Rough bytes-per-row figure used for row-count estimation.
    pub fn row_width_hint(&self) -> u64 {
        let cells: u64 = self
            .columns
            .iter()
            .map(|c| match c.ty {
                ColumnType::Long | ColumnType::Int => 7,
                ColumnType::Double => 8,
                ColumnType::Str => 18,
            })
            .sum();
        cells + self.arity() as u64
    }

    /// Validates a CSV header row against this layout.
    pub fn check_header(&self, headers: &[&str]) -> Result<()> {
        if headers.len() != self.arity() {
            return Err(FaroError::SchemaMismatch {
                table: self.name,
                detail: format!(
                    "header has {} columns, expected {}",
                    headers.len(),
                    self.arity()
                ),
            });
        }
        for (idx, (have, want)) in headers.iter().zip(self.columns.iter()).enumerate() {
            if !have.eq_ignore_ascii_case(want.name) {
                return Err(FaroError::SchemaMismatch {
                    table: self.name,
                    detail: format!(
                        "header column {idx} is {have:?}, expected {:?}",
                        want.name
                    ),
                });
            }
        }
        Ok(())
    }

    /// Validates the cell count of one data row.
    pub fn check_arity(&self, cells: usize, row: u64) -> Result<()> {
        if cells != self.arity() {
            return Err(FaroError::SchemaMismatch {
                table: self.name,
                detail: format!(
                    "row {row} has {cells} columns, expected {}",
                    self.arity()
                ),
            });
        }
        Ok(())
    }
}

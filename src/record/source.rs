//! Where rows come from: the source trait, in-memory tables, CSV tables.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter};
use tracing::debug;

use crate::record::record::{Field, Record};
use crate::record::schema::{ColumnType, TableSchema};
use crate::types::{FaroError, Result};

/// Pull-based iterator over one table's rows.
pub trait RecordCursor {
    /// Returns the next row, or `None` once the table is exhausted.
    fn try_next(&mut self) -> Result<Option<Record>>;
}

/// One relation the engine can scan.
pub trait RecordSource {
    /// Layout of the rows this source produces.
    fn schema(&self) -> &TableSchema;

    /// Starts a fresh scan over all rows.
    fn scan(&self) -> Result<Box<dyn RecordCursor + '_>>;

    /// Row-count estimate for planning, if the source can offer one.
    ///
    /// The estimate never affects results, only operator ordering, so a
    /// coarse figure is acceptable and `None` is always safe.
    fn estimated_rows(&self) -> Option<u64>;
}

/// Fully materialized table, used by fixtures and the data generator.
#[derive(Debug)]
pub struct MemTable {
    schema: TableSchema,
    rows: Vec<Record>,
}

impl MemTable {
    /// Builds a table after checking every row against the schema.
    pub fn new(schema: TableSchema, rows: Vec<Record>) -> Result<Self> {
        for row in &rows {
            row.conforms_to(&schema)?;
        }
        Ok(MemTable { schema, rows })
    }

    /// Number of rows held.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

struct MemCursor<'a> {
    rows: std::slice::Iter<'a, Record>,
}

impl RecordCursor for MemCursor<'_> {
    fn try_next(&mut self) -> Result<Option<Record>> {
        Ok(self.rows.next().cloned())
    }
}

impl RecordSource for MemTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn scan(&self) -> Result<Box<dyn RecordCursor + '_>> {
        Ok(Box::new(MemCursor {
            rows: self.rows.iter(),
        }))
    }

    fn estimated_rows(&self) -> Option<u64> {
        Some(self.rows.len() as u64)
    }
}

/// CSV-backed table. Expects a header row matching the schema.
///
/// The header is validated when the table is opened and again on every scan,
/// since the file can change between the two. Cells are decoded to the
/// schema's column types as rows stream; the first undecodable cell aborts
/// the scan with a [`FaroError::SchemaMismatch`].
#[derive(Debug)]
pub struct CsvTable {
    schema: TableSchema,
    path: PathBuf,
    estimate: Option<u64>,
}

impl CsvTable {
    /// Opens a CSV file and validates its header against the schema.
    pub fn open(schema: TableSchema, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&path)?;
        let headers = reader.headers()?;
        let names: Vec<&str> = headers.iter().collect();
        schema.check_header(&names)?;

        // Size-based estimate; a hint only, never load-bearing.
        let estimate = fs::metadata(&path)
            .ok()
            .map(|m| m.len() / schema.row_width_hint());
        debug!(
            table = schema.name(),
            path = %path.display(),
            estimate,
            "opened csv table"
        );
        Ok(CsvTable {
            schema,
            path,
            estimate,
        })
    }

    /// Path of the underlying file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

struct CsvCursor {
    schema: TableSchema,
    records: StringRecordsIntoIter<fs::File>,
    row: u64,
}

impl RecordCursor for CsvCursor {
    fn try_next(&mut self) -> Result<Option<Record>> {
        match self.records.next() {
            None => Ok(None),
            Some(raw) => {
                self.row += 1;
                let raw = raw?;
                decode_row(&self.schema, self.row, &raw).map(Some)
            }
        }
    }
}

impl RecordSource for CsvTable {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    fn scan(&self) -> Result<Box<dyn RecordCursor + '_>> {
        // Flexible so that ragged rows reach the arity check and report the
        // offending row instead of a bare csv error.
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)?;
        let headers = reader.headers()?;
        let names: Vec<&str> = headers.iter().collect();
        self.schema.check_header(&names)?;
        Ok(Box::new(CsvCursor {
            schema: self.schema.clone(),
            records: reader.into_records(),
            row: 0,
        }))
    }

    fn estimated_rows(&self) -> Option<u64> {
        self.estimate
    }
}

fn decode_row(schema: &TableSchema, row: u64, raw: &StringRecord) -> Result<Record> {
    schema.check_arity(raw.len(), row)?;
    let mut fields = Vec::with_capacity(schema.arity());
    for (def, cell) in schema.columns().iter().zip(raw.iter()) {
        let field = match def.ty {
            ColumnType::Long => Field::Long(parse_cell(schema, def.name, row, cell, "BIGINT")?),
            ColumnType::Int => Field::Int(parse_cell(schema, def.name, row, cell, "INTEGER")?),
            ColumnType::Double => Field::Double(parse_cell(schema, def.name, row, cell, "DOUBLE")?),
            ColumnType::Str => Field::Str(cell.to_owned()),
        };
        fields.push(field);
    }
    Ok(Record::new(fields))
}

fn parse_cell<T: FromStr>(
    schema: &TableSchema,
    column: &'static str,
    row: u64,
    cell: &str,
    type_name: &'static str,
) -> Result<T> {
    cell.trim().parse().map_err(|_| FaroError::SchemaMismatch {
        table: schema.name(),
        detail: format!("row {row} column {column}: {cell:?} is not a {type_name}"),
    })
}

/// The three relations a query runs over.
///
/// Construction checks that each source carries the expected fixed layout,
/// so a mis-wired bundle fails before any row is processed.
#[derive(Clone)]
pub struct Tables {
    /// Customer relation.
    pub customer: Arc<dyn RecordSource>,
    /// Orders relation.
    pub orders: Arc<dyn RecordSource>,
    /// Lineitem relation.
    pub lineitem: Arc<dyn RecordSource>,
}

impl Tables {
    /// Bundles three sources after checking their layouts.
    pub fn new(
        customer: Arc<dyn RecordSource>,
        orders: Arc<dyn RecordSource>,
        lineitem: Arc<dyn RecordSource>,
    ) -> Result<Self> {
        check_layout(customer.as_ref(), &TableSchema::customer())?;
        check_layout(orders.as_ref(), &TableSchema::orders())?;
        check_layout(lineitem.as_ref(), &TableSchema::lineitem())?;
        Ok(Tables {
            customer,
            orders,
            lineitem,
        })
    }

    /// Opens `customer.csv`, `orders.csv` and `lineitem.csv` under one
    /// directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        Tables::from_paths(
            dir.join("customer.csv"),
            dir.join("orders.csv"),
            dir.join("lineitem.csv"),
        )
    }

    /// Opens the three relations from individually named CSV files.
    pub fn from_paths(
        customer: impl Into<PathBuf>,
        orders: impl Into<PathBuf>,
        lineitem: impl Into<PathBuf>,
    ) -> Result<Self> {
        Tables::new(
            Arc::new(CsvTable::open(TableSchema::customer(), customer)?),
            Arc::new(CsvTable::open(TableSchema::orders(), orders)?),
            Arc::new(CsvTable::open(TableSchema::lineitem(), lineitem)?),
        )
    }

}

impl std::fmt::Debug for Tables {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tables")
            .field("customer", &self.customer.schema().name())
            .field("orders", &self.orders.schema().name())
            .field("lineitem", &self.lineitem.schema().name())
            .finish()
    }
}

fn check_layout(source: &dyn RecordSource, want: &TableSchema) -> Result<()> {
    let have = source.schema();
    if have != want {
        return Err(FaroError::SchemaMismatch {
            table: want.name(),
            detail: format!("source reports layout {:?}", have.name()),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer_row(key: i64, segment: &str) -> Record {
        Record::new(vec![
            Field::Long(key),
            Field::Str(format!("Customer#{key:09}")),
            Field::Str("address".into()),
            Field::Long(1),
            Field::Str("11-111-111-1111".into()),
            Field::Double(0.0),
            Field::Str(segment.into()),
            Field::Str("comment".into()),
        ])
    }

    #[test]
    fn mem_table_scans_rows_in_order() -> Result<()> {
        let table = MemTable::new(
            TableSchema::customer(),
            vec![customer_row(1, "BUILDING"), customer_row(2, "MACHINERY")],
        )?;
        assert_eq!(table.len(), 2);
        assert!(!table.is_empty());
        assert_eq!(table.estimated_rows(), Some(2));

        let mut cursor = table.scan()?;
        let first = cursor.try_next()?.unwrap();
        assert_eq!(first.get_long(0)?, 1);
        let second = cursor.try_next()?.unwrap();
        assert_eq!(second.get_str(6)?, "MACHINERY");
        assert!(cursor.try_next()?.is_none());
        Ok(())
    }

    #[test]
    fn mem_table_rejects_nonconforming_rows() {
        let bad = Record::new(vec![Field::Long(1)]);
        let err = MemTable::new(TableSchema::customer(), vec![bad]).unwrap_err();
        assert_eq!(err.code(), "SchemaMismatch");
    }

    #[test]
    fn csv_table_round_trips_rows() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("orders.csv");
        fs::write(
            &path,
            "o_orderkey,o_custkey,o_orderdate,o_shippriority,o_orderstatus,o_totalprice,o_orderpriority,o_clerk,o_comment\n\
             10,1,1995-03-01,0,O,100.5,1-URGENT,Clerk#1,fast\n\
             11,2,1995-04-02,1,F,7.25,3-MEDIUM,Clerk#2,slow\n",
        )?;

        let table = CsvTable::open(TableSchema::orders(), &path)?;
        assert_eq!(table.path(), path);
        let mut cursor = table.scan()?;
        let first = cursor.try_next()?.unwrap();
        assert_eq!(first.get_long(0)?, 10);
        assert_eq!(first.get_str(2)?, "1995-03-01");
        assert_eq!(first.get_int(3)?, 0);
        assert_eq!(first.get_double(5)?, 100.5);
        let second = cursor.try_next()?.unwrap();
        assert_eq!(second.get_long(1)?, 2);
        assert!(cursor.try_next()?.is_none());
        Ok(())
    }

    #[test]
    fn csv_table_rejects_wrong_header() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("orders.csv");
        fs::write(&path, "o_custkey,o_orderkey\n1,10\n")?;
        let err = CsvTable::open(TableSchema::orders(), &path).unwrap_err();
        assert_eq!(err.code(), "SchemaMismatch");
        Ok(())
    }

    #[test]
    fn csv_scan_flags_undecodable_cells() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("orders.csv");
        fs::write(
            &path,
            "o_orderkey,o_custkey,o_orderdate,o_shippriority,o_orderstatus,o_totalprice,o_orderpriority,o_clerk,o_comment\n\
             ten,1,1995-03-01,0,O,100.5,1-URGENT,Clerk#1,fast\n",
        )?;
        let table = CsvTable::open(TableSchema::orders(), &path)?;
        let mut cursor = table.scan()?;
        let err = cursor.try_next().unwrap_err();
        assert_eq!(err.code(), "SchemaMismatch");
        assert!(err.to_string().contains("o_orderkey"));
        Ok(())
    }

    #[test]
    fn tables_reject_swapped_sources() -> Result<()> {
        let customer = Arc::new(MemTable::new(TableSchema::customer(), Vec::new())?);
        let orders = Arc::new(MemTable::new(TableSchema::orders(), Vec::new())?);
        let lineitem = Arc::new(MemTable::new(TableSchema::lineitem(), Vec::new())?);

        assert!(Tables::new(customer.clone(), orders.clone(), lineitem.clone()).is_ok());
        let err = Tables::new(orders, customer, lineitem).unwrap_err();
        assert_eq!(err.code(), "SchemaMismatch");
        Ok(())
    }
}

//! Decoded rows with typed positional accessors.

use crate::record::schema::{ColumnType, TableSchema};
use crate::types::{FaroError, Result};

/// One decoded cell.
#[derive(Clone, Debug, PartialEq)]
pub enum Field {
    /// 64-bit signed integer.
    Long(i64),
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 text.
    Str(String),
}

impl Field {
    /// Type tag of the cell.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Field::Long(_) => ColumnType::Long,
            Field::Int(_) => ColumnType::Int,
            Field::Double(_) => ColumnType::Double,
            Field::Str(_) => ColumnType::Str,
        }
    }
}

/// One immutable row of a relation.
///
/// Rows are only built by sources that have already validated cell count and
/// cell types against the owning [`TableSchema`], so the typed accessors
/// treat any divergence as corruption rather than bad input.
#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    /// Wraps decoded cells into a row.
    pub fn new(fields: Vec<Field>) -> Self {
        Record { fields }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the row holds no cells.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Cells in positional order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Checks this row against a schema: arity and per-cell types.
    pub fn conforms_to(&self, schema: &TableSchema) -> Result<()> {
        schema.check_arity(self.len(), 0)?;
        for (idx, (field, def)) in self.fields.iter().zip(schema.columns()).enumerate() {
            if field.column_type() != def.ty {
                return Err(FaroError::SchemaMismatch {
                    table: schema.name(),
                    detail: format!(
                        "column {idx} ({}) holds {}, expected {}",
                        def.name,
                        field.column_type().name(),
                        def.ty.name()
                    ),
                });
            }
        }
        Ok(())
    }

    fn field(&self, idx: usize) -> Result<&Field> {
        self.fields.get(idx).ok_or_else(|| {
            FaroError::Corruption(format!(
                "field index {idx} out of range for record of arity {}",
                self.len()
            ))
        })
    }

    fn type_error(&self, idx: usize, want: ColumnType) -> FaroError {
        let have = self.fields[idx].column_type();
        FaroError::Corruption(format!(
            "field {idx} holds {}, expected {}",
            have.name(),
            want.name()
        ))
    }

    /// Reads a `Long` cell.
    pub fn get_long(&self, idx: usize) -> Result<i64> {
        match self.field(idx)? {
            Field::Long(v) => Ok(*v),
            _ => Err(self.type_error(idx, ColumnType::Long)),
        }
    }

    /// Reads an `Int` cell.
    pub fn get_int(&self, idx: usize) -> Result<i32> {
        match self.field(idx)? {
            Field::Int(v) => Ok(*v),
            _ => Err(self.type_error(idx, ColumnType::Int)),
        }
    }

    /// Reads a `Double` cell.
    pub fn get_double(&self, idx: usize) -> Result<f64> {
        match self.field(idx)? {
            Field::Double(v) => Ok(*v),
            _ => Err(self.type_error(idx, ColumnType::Double)),
        }
    }

    /// Reads a `Str` cell.
    pub fn get_str(&self, idx: usize) -> Result<&str> {
        match self.field(idx)? {
            Field::Str(v) => Ok(v.as_str()),
            _ => Err(self.type_error(idx, ColumnType::Str)),
        }
    }
}

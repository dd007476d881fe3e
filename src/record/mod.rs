//! Relations, rows, and the collaborators that read them.
//!
//! Tables are positional: every relation has a fixed column layout and the
//! engine addresses columns by index, never by name. [`schema`] pins those
//! layouts, [`record`] holds decoded rows, and [`source`] abstracts where
//! rows come from (in-memory fixtures or CSV files on disk).

pub mod record;
pub mod schema;
pub mod source;

pub use record::{Field, Record};
pub use schema::{ColumnDef, ColumnType, TableSchema};
pub use source::{CsvTable, MemTable, RecordCursor, RecordSource, Tables};

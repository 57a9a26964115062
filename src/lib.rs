// ============================================================================
// Tablegate Library
// ============================================================================
//
// Records with declared properties, optional casts and an optional UUID
// identity, plus a table gateway that persists them through any database
// that implements `DbInterface`. `MemoryDb` is the bundled in-memory backend.
//
// ============================================================================

pub mod core;
pub mod interface;
pub mod memory;
pub mod record;
pub mod result;
pub mod table;

pub use core::{CastKind, DbError, FieldMap, Result, Row, Value};
pub use interface::DbInterface;
pub use memory::{MemoryConfig, MemoryDb, TableDef};
pub use record::{ID_COLUMN, Record, RecordSchema, SchemaConfig};
pub use result::QueryResult;
pub use table::{Criteria, Hydrator, Page, PageMeta, Table};

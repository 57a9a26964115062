use std::sync::Arc;
use crate::core::{Result, Value};
use crate::result::QueryResult;

/// The database abstraction a [`Table`](crate::Table) executes through.
///
/// Implement this for a real driver connection to use the mapping layer in
/// production; [`MemoryDb`](crate::MemoryDb) implements it for tests and
/// embedded use. Errors returned from here are passed through the table layer
/// unchanged.
pub trait DbInterface {
    /// Executes a statement with `?` placeholders bound positionally to `params`.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Auto-increment identifier assigned by the most recent insert.
    fn insert_id(&self) -> Result<i64>;

    /// Converts a canonical textual UUID into its binary storage value.
    fn uuid_to_bin(&self, uuid: &str) -> Result<Value>;

    /// Converts a binary storage value back into a canonical textual UUID.
    fn bin_to_uuid(&self, bin: &Value) -> Result<String>;
}

impl<T: DbInterface + ?Sized> DbInterface for &T {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        (**self).execute(sql, params)
    }

    fn insert_id(&self) -> Result<i64> {
        (**self).insert_id()
    }

    fn uuid_to_bin(&self, uuid: &str) -> Result<Value> {
        (**self).uuid_to_bin(uuid)
    }

    fn bin_to_uuid(&self, bin: &Value) -> Result<String> {
        (**self).bin_to_uuid(bin)
    }
}

impl<T: DbInterface + ?Sized> DbInterface for Box<T> {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        (**self).execute(sql, params)
    }

    fn insert_id(&self) -> Result<i64> {
        (**self).insert_id()
    }

    fn uuid_to_bin(&self, uuid: &str) -> Result<Value> {
        (**self).uuid_to_bin(uuid)
    }

    fn bin_to_uuid(&self, bin: &Value) -> Result<String> {
        (**self).bin_to_uuid(bin)
    }
}

impl<T: DbInterface + ?Sized> DbInterface for Arc<T> {
    fn execute(&self, sql: &str, params: &[Value]) -> Result<QueryResult> {
        (**self).execute(sql, params)
    }

    fn insert_id(&self) -> Result<i64> {
        (**self).insert_id()
    }

    fn uuid_to_bin(&self, uuid: &str) -> Result<Value> {
        (**self).uuid_to_bin(uuid)
    }

    fn bin_to_uuid(&self, bin: &Value) -> Result<String> {
        (**self).bin_to_uuid(bin)
    }
}

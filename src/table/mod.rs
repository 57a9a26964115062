pub mod criteria;
pub mod page;
pub mod sql;

use std::sync::Arc;
use log::{debug, trace, warn};
use crate::core::{DbError, FieldMap, Result, Value};
use crate::interface::DbInterface;
use crate::record::{ID_COLUMN, Record, RecordSchema};
use crate::result::QueryResult;

pub use criteria::Criteria;
pub use page::{Page, PageMeta};
use sql::Statement;

/// Turns a fetched row (UUID columns already textual) into a record.
pub type Hydrator = Arc<dyn Fn(&Arc<RecordSchema>, FieldMap) -> Result<Record> + Send + Sync>;

/// Gateway between one physical table and the records of one schema.
///
/// The table holds no row data. Every call is one synchronous round trip
/// through the bound [`DbInterface`] (two for [`paginate`](Self::paginate)).
///
/// # Examples
///
/// ```
/// use tablegate::{Criteria, MemoryDb, Record, RecordSchema, Table, TableDef, Value};
///
/// # fn main() -> tablegate::Result<()> {
/// let db = MemoryDb::new();
/// db.define_table(TableDef::new("users").auto_increment("id").columns(["name"]))?;
///
/// let users = Table::new(&db, "users", RecordSchema::new("user").property("name").into_shared());
/// let mut ann = Record::new(users.schema().clone(), [("name", "Ann")]);
/// users.insert(&mut ann)?;
/// assert_eq!(ann.id(), &Value::Integer(1));
///
/// let found = users.find_where(&Criteria::new().filter("name = ?", [Value::from("Ann")]))?;
/// assert_eq!(found.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct Table<D: DbInterface> {
    db: D,
    name: String,
    schema: Arc<RecordSchema>,
    hydrator: Hydrator,
}

impl<D: DbInterface> Table<D> {
    pub fn new(db: D, name: &str, schema: Arc<RecordSchema>) -> Self {
        Self {
            db,
            name: name.to_string(),
            schema,
            hydrator: Arc::new(|schema: &Arc<RecordSchema>, row: FieldMap| {
                Ok(Record::new(schema.clone(), row))
            }),
        }
    }

    /// Replaces the default row-to-record conversion.
    pub fn with_hydrator<F>(mut self, hydrator: F) -> Self
    where
        F: Fn(&Arc<RecordSchema>, FieldMap) -> Result<Record> + Send + Sync + 'static,
    {
        self.hydrator = Arc::new(hydrator);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schema(&self) -> &Arc<RecordSchema> {
        &self.schema
    }

    pub fn db(&self) -> &D {
        &self.db
    }

    /// Looks a row up by identity. A missing row is `Ok(None)`.
    pub fn find_by_id(&self, id: impl Into<Value>) -> Result<Option<Record>> {
        let id = self.to_store(ID_COLUMN, id.into())?;
        let mut result = self.run(sql::select_by_id(&self.name, id))?;

        match result.fetch() {
            Some(row) => self.hydrate(row).map(Some),
            None => Ok(None),
        }
    }

    pub fn find_where(&self, criteria: &Criteria) -> Result<Vec<Record>> {
        let stmt = sql::select(&self.name, criteria).map_err(|e| match e {
            DbError::PreconditionViolation(message) => self.precondition(message),
            other => other,
        })?;
        let mut result = self.run(stmt)?;
        result
            .fetch_all()
            .into_iter()
            .map(|row| self.hydrate(row))
            .collect()
    }

    pub fn count_by_where(&self, criteria: &Criteria) -> Result<usize> {
        let mut result = self.run(sql::count(&self.name, criteria))?;
        let count = result
            .fetch_scalar()
            .ok_or_else(|| DbError::ExecutionError(format!("COUNT on '{}' returned no rows", self.name)))?;

        count
            .as_i64()
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| {
                DbError::TypeMismatch(format!(
                    "COUNT on '{}' returned {} value {}",
                    self.name,
                    count.type_name(),
                    count
                ))
            })
    }

    /// Persists one record.
    ///
    /// Auto-increment variants receive the store-assigned id; UUID variants
    /// keep the id generated at construction.
    pub fn insert<'r>(&self, record: &'r mut Record) -> Result<&'r mut Record> {
        self.check_schema(record)?;
        let (columns, values) = self.persist_fields(record)?;
        self.run(sql::insert(&self.name, &columns, vec![values]))?;

        if !self.schema.uses_uuid_ids() {
            let id = self.db.insert_id()?;
            trace!("'{}' assigned id {}", self.name, id);
            record.set_id(id);
        }

        Ok(record)
    }

    /// Persists many records in a single multi-row statement.
    ///
    /// Ids are not back-filled: auto-increment records keep a `Null` id after
    /// this call, unlike [`insert`](Self::insert).
    pub fn insert_many(&self, records: Vec<Record>) -> Result<Vec<Record>> {
        if records.is_empty() {
            return Err(self.precondition("insert_many requires at least one record".into()));
        }

        self.check_schema(&records[0])?;
        let (columns, first) = self.persist_fields(&records[0])?;
        let mut rows = Vec::with_capacity(records.len());
        rows.push(first);

        for (idx, record) in records.iter().enumerate().skip(1) {
            self.check_schema(record)?;
            let (row_columns, values) = self.persist_fields(record)?;
            let aligned = align_row(&columns, row_columns, values).ok_or_else(|| {
                self.precondition(format!(
                    "record {} of insert_many has a different column set than record 0",
                    idx
                ))
            })?;
            rows.push(aligned);
        }

        self.run(sql::insert(&self.name, &columns, rows))?;
        Ok(records)
    }

    /// Loads page `page` (1-based) of `per_page` rows plus pager metadata.
    pub fn paginate(&self, page: usize, per_page: usize, criteria: &Criteria) -> Result<Page> {
        if page == 0 || per_page == 0 {
            return Err(self.precondition(format!(
                "page and per_page must be positive (got page={}, per_page={})",
                page, per_page
            )));
        }

        let offset = (page - 1).checked_mul(per_page).ok_or_else(|| {
            self.precondition(format!(
                "page {} of {} rows is past the addressable range",
                page, per_page
            ))
        })?;
        let data = self.find_where(&criteria.clone().limit(per_page).offset(offset))?;
        let total = self.count_by_where(criteria)?;

        Ok(Page {
            data,
            meta: PageMeta::new(total, page, per_page),
        })
    }

    /// Writes every non-id field of an already persisted record.
    pub fn update(&self, record: &Record) -> Result<usize> {
        self.check_schema(record)?;
        if record.id().is_null() {
            return Err(self.precondition("cannot update a record without an id".into()));
        }

        let id = self.to_store(ID_COLUMN, record.id().clone())?;
        let assignments = record
            .to_array()
            .into_iter()
            .filter(|(column, _)| column != ID_COLUMN)
            .map(|(column, value)| {
                let value = self.to_store(&column, value)?;
                Ok((column, value))
            })
            .collect::<Result<Vec<_>>>()?;

        if assignments.is_empty() {
            return Ok(0);
        }

        let result = self.run(sql::update_by_id(&self.name, assignments, id))?;
        Ok(result.affected_rows().unwrap_or(0))
    }

    pub fn delete_by_id(&self, id: impl Into<Value>) -> Result<usize> {
        let id = self.to_store(ID_COLUMN, id.into())?;
        let result = self.run(sql::delete_by_id(&self.name, id))?;
        Ok(result.affected_rows().unwrap_or(0))
    }

    fn run(&self, stmt: Statement) -> Result<QueryResult> {
        debug!("[{}] {} ({} params)", self.name, stmt.sql, stmt.params.len());
        self.db.execute(&stmt.sql, &stmt.params)
    }

    fn hydrate(&self, row: FieldMap) -> Result<Record> {
        let row = row
            .into_iter()
            .map(|(column, value)| {
                let value = self.from_store(&column, value)?;
                Ok((column, value))
            })
            .collect::<Result<FieldMap>>()?;

        (self.hydrator)(&self.schema, row)
    }

    /// Serialized columns and store-ready values; a `Null` id is left out so
    /// the store can assign one.
    fn persist_fields(&self, record: &Record) -> Result<(Vec<String>, Vec<Value>)> {
        let mut columns = Vec::new();
        let mut values = Vec::new();

        for (column, value) in record.to_array() {
            if column == ID_COLUMN && value.is_null() {
                continue;
            }
            values.push(self.to_store(&column, value)?);
            columns.push(column);
        }

        Ok((columns, values))
    }

    fn to_store(&self, column: &str, value: Value) -> Result<Value> {
        if !self.schema.is_uuid_column(column) {
            return Ok(value);
        }

        match value {
            Value::Null => Ok(Value::Null),
            Value::Text(uuid) => self.db.uuid_to_bin(&uuid),
            other => Err(DbError::MalformedUuid(format!(
                "column '{}' expects a textual UUID, got {} {}",
                column,
                other.type_name(),
                other
            ))),
        }
    }

    fn from_store(&self, column: &str, value: Value) -> Result<Value> {
        if !self.schema.is_uuid_column(column) || value.is_null() {
            return Ok(value);
        }
        self.db.bin_to_uuid(&value).map(Value::Text)
    }

    fn check_schema(&self, record: &Record) -> Result<()> {
        if Arc::ptr_eq(record.schema(), &self.schema) || **record.schema() == *self.schema {
            return Ok(());
        }
        Err(self.precondition(format!(
            "record of schema '{}' cannot be stored in a table of schema '{}'",
            record.schema().name(),
            self.schema.name()
        )))
    }

    fn precondition(&self, message: String) -> DbError {
        warn!("[{}] {}", self.name, message);
        DbError::PreconditionViolation(message)
    }
}

/// Reorders `values` to follow `expected`; `None` when the column sets differ.
fn align_row(expected: &[String], columns: Vec<String>, values: Vec<Value>) -> Option<Vec<Value>> {
    if expected.len() != columns.len() {
        return None;
    }
    if expected == columns.as_slice() {
        return Some(values);
    }

    let mut pairs: Vec<Option<(String, Value)>> = columns.into_iter().zip(values).map(Some).collect();
    expected
        .iter()
        .map(|name| {
            pairs
                .iter_mut()
                .find(|pair| matches!(pair, Some((column, _)) if column == name))
                .and_then(Option::take)
                .map(|(_, value)| value)
        })
        .collect()
}

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use crate::core::{DbError, Result, Row, Value};
use crate::result::QueryResult;
use super::ast::*;
use super::eval::EvalContext;

/// Column layout of an in-memory table.
///
/// An auto-increment column is always the primary key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDef {
    name: String,
    columns: Vec<String>,
    primary_key: Option<String>,
    auto_increment: Option<String>,
}

impl TableDef {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            primary_key: None,
            auto_increment: None,
        }
    }

    pub fn column(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.columns.contains(&name) {
            self.columns.push(name);
        }
        self
    }

    pub fn columns<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().fold(self, |def, name| def.column(name))
    }

    /// Integer column filled from a per-table counter when inserted as NULL.
    pub fn auto_increment(self, name: impl Into<String>) -> Self {
        let name = name.into();
        let mut def = self.primary_key(name.clone());
        def.auto_increment = Some(name);
        def
    }

    pub fn primary_key(self, name: impl Into<String>) -> Self {
        let name = name.into();
        let mut def = self.column(name.clone());
        def.primary_key = Some(name);
        def
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn primary_key_column(&self) -> Option<&str> {
        self.primary_key.as_deref()
    }

    pub fn auto_increment_column(&self) -> Option<&str> {
        self.auto_increment.as_deref()
    }

    fn index_of(&self, column: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == column)
            .ok_or_else(|| DbError::ColumnNotFound(column.to_string(), self.name.clone()))
    }
}

#[derive(Debug)]
struct MemTable {
    def: TableDef,
    rows: Vec<Row>,
    next_id: i64,
}

impl MemTable {
    fn new(def: TableDef) -> Self {
        Self {
            def,
            rows: Vec::new(),
            next_id: 1,
        }
    }

    fn context<'a>(&'a self, row: &'a [Value], params: &'a [Value]) -> EvalContext<'a> {
        EvalContext::new(&self.def.name, &self.def.columns, row, params)
    }

    fn matching(&self, selection: Option<&Expr>, params: &[Value]) -> Result<Vec<usize>> {
        let mut hits = Vec::new();
        for (idx, row) in self.rows.iter().enumerate() {
            let keep = match selection {
                Some(expr) => self.context(row, params).matches(expr)?,
                None => true,
            };
            if keep {
                hits.push(idx);
            }
        }
        Ok(hits)
    }

    /// Fails when any primary key among `rows` is NULL or repeated.
    fn check_primary_keys<'r>(&self, rows: impl Iterator<Item = &'r Row>) -> Result<()> {
        let Some(pk) = self.def.primary_key_column() else {
            return Ok(());
        };
        let pk_idx = self.def.index_of(pk)?;

        let mut seen = HashSet::new();
        for row in rows {
            let key = &row[pk_idx];
            if key.is_null() {
                return Err(DbError::ConstraintViolation(format!(
                    "Primary key '{}' of '{}' cannot be NULL",
                    pk, self.def.name
                )));
            }
            if !seen.insert(key.clone()) {
                return Err(DbError::ConstraintViolation(format!(
                    "Duplicate primary key {} in '{}'",
                    key, self.def.name
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
pub struct Storage {
    tables: HashMap<String, MemTable>,
    last_insert_id: i64,
}

impl Storage {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            last_insert_id: 0,
        }
    }

    pub fn define(&mut self, def: TableDef) -> Result<()> {
        if self.tables.contains_key(def.name()) {
            return Err(DbError::TableExists(def.name().to_string()));
        }
        self.tables.insert(def.name().to_string(), MemTable::new(def));
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        self.tables
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    pub fn table_def(&self, name: &str) -> Result<&TableDef> {
        self.table(name).map(|table| &table.def)
    }

    pub fn row_count(&self, name: &str) -> Result<usize> {
        self.table(name).map(|table| table.rows.len())
    }

    pub fn last_insert_id(&self) -> i64 {
        self.last_insert_id
    }

    pub fn select(&self, stmt: &SelectStmt, params: &[Value]) -> Result<QueryResult> {
        let table = self.table(&stmt.table_name)?;
        let mut hits = table.matching(stmt.selection.as_ref(), params)?;

        if let Projection::Count(label) = &stmt.projection {
            return Ok(QueryResult::new(
                vec![label.clone()],
                vec![vec![Value::Integer(hits.len() as i64)]],
            ));
        }

        if !stmt.order_by.is_empty() {
            hits = sort_rows(table, hits, &stmt.order_by, params)?;
        }

        let offset = bound(&stmt.table_name, stmt.offset.as_ref(), params, "OFFSET")?.unwrap_or(0);
        let limit = bound(&stmt.table_name, stmt.limit.as_ref(), params, "LIMIT")?;
        let window = hits.into_iter().skip(offset).take(limit.unwrap_or(usize::MAX));

        let (columns, indices) = match &stmt.projection {
            Projection::Columns(names) => {
                let indices = names
                    .iter()
                    .map(|name| table.def.index_of(name))
                    .collect::<Result<Vec<_>>>()?;
                (names.clone(), Some(indices))
            }
            _ => (table.def.columns.clone(), None),
        };

        let rows = window
            .map(|idx| {
                let row = &table.rows[idx];
                match &indices {
                    Some(indices) => indices.iter().map(|&i| row[i].clone()).collect(),
                    None => row.clone(),
                }
            })
            .collect();

        Ok(QueryResult::new(columns, rows))
    }

    /// All rows are validated before any is stored.
    pub fn insert(&mut self, stmt: &InsertStmt, params: &[Value]) -> Result<QueryResult> {
        let table = self.table_mut(&stmt.table_name)?;

        let mut seen = HashSet::new();
        let positions = stmt
            .columns
            .iter()
            .map(|column| {
                if !seen.insert(column.as_str()) {
                    return Err(DbError::ExecutionError(format!(
                        "Column '{}' listed twice in INSERT",
                        column
                    )));
                }
                table.def.index_of(column)
            })
            .collect::<Result<Vec<_>>>()?;

        let auto_idx = match table.def.auto_increment_column() {
            Some(column) => Some(table.def.index_of(column)?),
            None => None,
        };

        let mut next_id = table.next_id;
        let mut first_id = None;
        let mut new_rows = Vec::with_capacity(stmt.rows.len());

        for exprs in &stmt.rows {
            let mut row = vec![Value::Null; table.def.columns.len()];
            let ctx = EvalContext::constant(&stmt.table_name, params);
            for (expr, &pos) in exprs.iter().zip(&positions) {
                row[pos] = ctx.eval(expr)?;
            }

            if let Some(idx) = auto_idx {
                let id = match &row[idx] {
                    Value::Null => next_id,
                    explicit => {
                        let id = explicit.as_i64().ok_or_else(|| {
                            DbError::TypeMismatch(format!(
                                "Auto-increment column expects an integer, got {} {}",
                                explicit.type_name(),
                                explicit
                            ))
                        })?;
                        id
                    }
                };
                let successor = id.checked_add(1).ok_or_else(|| {
                    DbError::ConstraintViolation(format!(
                        "Auto-increment range of '{}' exhausted at {}",
                        stmt.table_name, id
                    ))
                })?;
                next_id = next_id.max(successor);
                row[idx] = Value::Integer(id);
                first_id.get_or_insert(id);
            }

            new_rows.push(row);
        }

        table.check_primary_keys(table.rows.iter().chain(new_rows.iter()))?;

        let count = new_rows.len();
        table.rows.extend(new_rows);
        table.next_id = next_id;

        if let Some(id) = first_id {
            self.last_insert_id = id;
        }

        Ok(QueryResult::affected(count))
    }

    pub fn update(&mut self, stmt: &UpdateStmt, params: &[Value]) -> Result<QueryResult> {
        let table = self.table_mut(&stmt.table_name)?;

        let targets = stmt
            .assignments
            .iter()
            .map(|(column, expr)| Ok((table.def.index_of(column)?, expr)))
            .collect::<Result<Vec<_>>>()?;

        let hits = table.matching(stmt.selection.as_ref(), params)?;

        let mut updated = Vec::with_capacity(hits.len());
        for &idx in &hits {
            let current = &table.rows[idx];
            let ctx = table.context(current, params);
            let mut row = current.clone();
            for (pos, expr) in &targets {
                row[*pos] = ctx.eval(expr)?;
            }
            updated.push((idx, row));
        }

        {
            let changed: HashMap<usize, &Row> = updated.iter().map(|(idx, row)| (*idx, row)).collect();
            let merged = table
                .rows
                .iter()
                .enumerate()
                .map(|(idx, row)| changed.get(&idx).copied().unwrap_or(row));
            table.check_primary_keys(merged)?;
        }

        let count = updated.len();
        for (idx, row) in updated {
            table.rows[idx] = row;
        }

        Ok(QueryResult::affected(count))
    }

    pub fn delete(&mut self, stmt: &DeleteStmt, params: &[Value]) -> Result<QueryResult> {
        let table = self.table_mut(&stmt.table_name)?;
        let hits: HashSet<usize> = table
            .matching(stmt.selection.as_ref(), params)?
            .into_iter()
            .collect();

        let mut idx = 0;
        table.rows.retain(|_| {
            let keep = !hits.contains(&idx);
            idx += 1;
            keep
        });

        Ok(QueryResult::affected(hits.len()))
    }

    fn table(&self, name: &str) -> Result<&MemTable> {
        self.tables
            .get(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut MemTable> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| DbError::TableNotFound(name.to_string()))
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new()
    }
}

/// ASC puts NULLs last, DESC puts them first. The sort is stable.
fn sort_rows(table: &MemTable, hits: Vec<usize>, order_by: &[OrderByExpr], params: &[Value]) -> Result<Vec<usize>> {
    let mut keyed = hits
        .into_iter()
        .map(|idx| {
            let ctx = table.context(&table.rows[idx], params);
            let keys = order_by
                .iter()
                .map(|key| ctx.eval(&key.expr))
                .collect::<Result<Vec<_>>>()?;
            Ok((idx, keys))
        })
        .collect::<Result<Vec<_>>>()?;

    keyed.sort_by(|(_, a), (_, b)| {
        for (key, (left, right)) in order_by.iter().zip(a.iter().zip(b)) {
            let ordering = compare_keys(left, right, key.descending);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });

    Ok(keyed.into_iter().map(|(idx, _)| idx).collect())
}

fn compare_keys(left: &Value, right: &Value, descending: bool) -> Ordering {
    match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) if descending => Ordering::Less,
        (true, false) => Ordering::Greater,
        (false, true) if descending => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ordering = left.compare(right).unwrap_or(Ordering::Equal);
            if descending { ordering.reverse() } else { ordering }
        }
    }
}

/// Evaluates a LIMIT/OFFSET expression to a row count.
fn bound(table: &str, expr: Option<&Expr>, params: &[Value], clause: &str) -> Result<Option<usize>> {
    let Some(expr) = expr else {
        return Ok(None);
    };

    let value = EvalContext::constant(table, params).eval(expr)?;
    value
        .as_i64()
        .and_then(|n| usize::try_from(n).ok())
        .map(Some)
        .ok_or_else(|| {
            DbError::TypeMismatch(format!(
                "{} expects a non-negative integer, got {} {}",
                clause,
                value.type_name(),
                value
            ))
        })
}

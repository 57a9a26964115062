use crate::core::{FieldMap, Row, Value};

/// Result-set handle returned by [`DbInterface::execute`](crate::DbInterface::execute).
///
/// Row-producing statements carry columns and rows and are consumed through
/// [`fetch`](Self::fetch) / [`fetch_all`](Self::fetch_all). Row-affecting
/// statements carry `affected_rows` instead.
#[derive(Debug, Clone)]
pub struct QueryResult {
    columns: Vec<String>,
    rows: Vec<Row>,
    affected_rows: Option<usize>,
    cursor: usize,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            affected_rows: None,
            cursor: 0,
        }
    }

    /// Outcome of an INSERT, UPDATE or DELETE.
    pub fn affected(count: usize) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            affected_rows: Some(count),
            cursor: 0,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn affected_rows(&self) -> Option<usize> {
        self.affected_rows
    }

    /// True when the statement produced a row set rather than a write count.
    pub fn is_query(&self) -> bool {
        self.affected_rows.is_none()
    }

    /// Next unread row as a column-name keyed map.
    pub fn fetch(&mut self) -> Option<FieldMap> {
        let row = self.rows.get(self.cursor)?;
        let fields = self
            .columns
            .iter()
            .cloned()
            .zip(row.iter().cloned())
            .collect();
        self.cursor += 1;
        Some(fields)
    }

    /// All remaining unread rows.
    pub fn fetch_all(&mut self) -> Vec<FieldMap> {
        let mut out = Vec::with_capacity(self.rows.len().saturating_sub(self.cursor));
        while let Some(fields) = self.fetch() {
            out.push(fields);
        }
        out
    }

    /// First column of the next unread row, as returned by `SELECT COUNT(*)`.
    pub fn fetch_scalar(&mut self) -> Option<Value> {
        self.fetch()
            .and_then(|fields| fields.into_iter().next())
            .map(|(_, value)| value)
    }
}

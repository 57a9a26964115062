use crate::core::Value;

/// Selection criteria for [`Table::find_where`](crate::Table::find_where) and
/// friends.
///
/// The where and order fragments are trusted SQL written by the caller; only
/// the positional `params` carry request-derived data.
///
/// ```
/// use tablegate::{Criteria, Value};
///
/// let criteria = Criteria::new()
///     .filter("age >= ? AND active = ?", [Value::from(18i64), Value::from(true)])
///     .order_by("age DESC")
///     .limit(10);
/// assert_eq!(criteria.params().len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    where_clause: Option<String>,
    params: Vec<Value>,
    order_by: Option<String>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl Criteria {
    /// Matches every row.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, clause: &str, params: impl IntoIterator<Item = Value>) -> Self {
        let clause = clause.trim();
        self.where_clause = (!clause.is_empty()).then(|| clause.to_string());
        self.params = params.into_iter().collect();
        self
    }

    pub fn order_by(mut self, order: &str) -> Self {
        let order = order.trim();
        self.order_by = (!order.is_empty()).then(|| order.to_string());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn where_clause(&self) -> Option<&str> {
        self.where_clause.as_deref()
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn order(&self) -> Option<&str> {
        self.order_by.as_deref()
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<usize> {
        self.offset
    }
}

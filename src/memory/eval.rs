use std::cmp::Ordering;
use crate::core::{DbError, Result, Value};
use super::ast::{BinaryOp, Expr};
use super::pattern::eval_like;

/// Row and parameters an expression is evaluated against.
///
/// Constant contexts (VALUES rows, LIMIT, OFFSET) have no columns; any column
/// reference in them fails with `ColumnNotFound`.
pub struct EvalContext<'a> {
    table: &'a str,
    columns: &'a [String],
    row: &'a [Value],
    params: &'a [Value],
}

impl<'a> EvalContext<'a> {
    pub fn new(table: &'a str, columns: &'a [String], row: &'a [Value], params: &'a [Value]) -> Self {
        Self {
            table,
            columns,
            row,
            params,
        }
    }

    pub fn constant(table: &'a str, params: &'a [Value]) -> Self {
        Self::new(table, &[], &[], params)
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Column(name) => self
                .columns
                .iter()
                .position(|column| column == name)
                .and_then(|idx| self.row.get(idx))
                .cloned()
                .ok_or_else(|| DbError::ColumnNotFound(name.clone(), self.table.to_string())),

            Expr::Literal(value) => Ok(value.clone()),

            Expr::Param(idx) => self.params.get(*idx).cloned().ok_or_else(|| {
                DbError::ExecutionError(format!(
                    "Parameter {} is not bound ({} supplied)",
                    idx + 1,
                    self.params.len()
                ))
            }),

            Expr::BinaryOp { left, op, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                match op {
                    BinaryOp::And => Ok(and(truth(&left), truth(&right))),
                    BinaryOp::Or => Ok(or(truth(&left), truth(&right))),
                    _ => compare(*op, left, right),
                }
            }

            Expr::Not(inner) => Ok(match truth(&self.eval(inner)?) {
                Some(b) => Value::Boolean(!b),
                None => Value::Null,
            }),

            Expr::IsNull { expr, negated } => {
                let is_null = self.eval(expr)?.is_null();
                Ok(Value::Boolean(is_null != *negated))
            }

            Expr::InList { expr, list, negated } => {
                let needle = self.eval(expr)?;
                if needle.is_null() {
                    return Ok(Value::Null);
                }

                let mut saw_null = false;
                for item in list {
                    let candidate = self.eval(item)?;
                    if candidate.is_null() {
                        saw_null = true;
                        continue;
                    }
                    if compare(BinaryOp::Eq, needle.clone(), candidate)?.as_bool() {
                        return Ok(Value::Boolean(!*negated));
                    }
                }

                Ok(if saw_null {
                    Value::Null
                } else {
                    Value::Boolean(*negated)
                })
            }

            Expr::Like { expr, pattern, negated, case_insensitive } => {
                let text = self.eval(expr)?;
                let pattern = self.eval(pattern)?;
                if text.is_null() || pattern.is_null() {
                    return Ok(Value::Null);
                }

                let matched = eval_like(&as_text(&text), &as_text(&pattern), !*case_insensitive)?;
                Ok(Value::Boolean(matched != *negated))
            }
        }
    }

    /// WHERE semantics: only a true result keeps the row.
    pub fn matches(&self, expr: &Expr) -> Result<bool> {
        Ok(truth(&self.eval(expr)?).unwrap_or(false))
    }
}

fn truth(value: &Value) -> Option<bool> {
    if value.is_null() {
        None
    } else {
        Some(value.as_bool())
    }
}

fn and(left: Option<bool>, right: Option<bool>) -> Value {
    match (left, right) {
        (Some(false), _) | (_, Some(false)) => Value::Boolean(false),
        (Some(true), Some(true)) => Value::Boolean(true),
        _ => Value::Null,
    }
}

fn or(left: Option<bool>, right: Option<bool>) -> Value {
    match (left, right) {
        (Some(true), _) | (_, Some(true)) => Value::Boolean(true),
        (Some(false), Some(false)) => Value::Boolean(false),
        _ => Value::Null,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::Text(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Booleans compare against numbers as 0/1.
fn coerce(left: Value, right: Value) -> (Value, Value) {
    match (left, right) {
        (Value::Boolean(b), right @ (Value::Integer(_) | Value::Float(_))) => {
            (Value::Integer(b as i64), right)
        }
        (left @ (Value::Integer(_) | Value::Float(_)), Value::Boolean(b)) => {
            (left, Value::Integer(b as i64))
        }
        pair => pair,
    }
}

fn compare(op: BinaryOp, left: Value, right: Value) -> Result<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Null);
    }

    let (left, right) = coerce(left, right);
    let ordering = match left.compare(&right) {
        Ok(ordering) => ordering,
        Err(_) if op == BinaryOp::Eq => return Ok(Value::Boolean(false)),
        Err(_) if op == BinaryOp::NotEq => return Ok(Value::Boolean(true)),
        Err(e) => return Err(e),
    };

    let result = match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::NotEq => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::LtEq => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::GtEq => ordering != Ordering::Less,
        BinaryOp::And | BinaryOp::Or => {
            return Err(DbError::ExecutionError(format!("{:?} is not a comparison", op)));
        }
    };

    Ok(Value::Boolean(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::parser::SqlParserAdapter;
    use crate::memory::ast::Statement;

    fn where_clause(sql: &str) -> Expr {
        let parsed = SqlParserAdapter::new()
            .parse(&format!("SELECT * FROM t WHERE {}", sql))
            .unwrap();
        match parsed.statement {
            Statement::Select(select) => select.selection.unwrap(),
            _ => unreachable!(),
        }
    }

    fn check(sql: &str, row: &[Value], params: &[Value]) -> Value {
        let columns = vec!["id".to_string(), "name".to_string(), "score".to_string()];
        EvalContext::new("t", &columns, row, params)
            .eval(&where_clause(sql))
            .unwrap()
    }

    fn row() -> Vec<Value> {
        vec![Value::Integer(1), Value::Text("Ann".into()), Value::Null]
    }

    #[test]
    fn test_comparisons_with_params() {
        assert_eq!(check("id = ?", &row(), &[Value::Integer(1)]), Value::Boolean(true));
        assert_eq!(check("id > ?", &row(), &[Value::Integer(1)]), Value::Boolean(false));
        assert_eq!(check("name <> 'Bob'", &row(), &[]), Value::Boolean(true));
        assert_eq!(check("id = ?", &row(), &[Value::Boolean(true)]), Value::Boolean(true));
    }

    #[test]
    fn test_null_logic() {
        assert_eq!(check("score = 1", &row(), &[]), Value::Null);
        assert_eq!(check("score = 1 AND id = 2", &row(), &[]), Value::Boolean(false));
        assert_eq!(check("score = 1 OR id = 1", &row(), &[]), Value::Boolean(true));
        assert_eq!(check("score IS NULL", &row(), &[]), Value::Boolean(true));
        assert_eq!(check("NOT (score = 1)", &row(), &[]), Value::Null);
    }

    #[test]
    fn test_in_list_and_like() {
        assert_eq!(check("id IN (3, 2, 1)", &row(), &[]), Value::Boolean(true));
        assert_eq!(check("id NOT IN (?, ?)", &row(), &[Value::Integer(5), Value::Integer(6)]), Value::Boolean(true));
        assert_eq!(check("id IN (2, NULL)", &row(), &[]), Value::Null);
        assert_eq!(check("name LIKE 'A%'", &row(), &[]), Value::Boolean(true));
        assert_eq!(check("name NOT LIKE ?", &row(), &[Value::from("_nn")]), Value::Boolean(false));
    }

    #[test]
    fn test_mixed_types() {
        assert_eq!(check("name = 1", &row(), &[]), Value::Boolean(false));
        assert_eq!(check("name != 1", &row(), &[]), Value::Boolean(true));

        let columns = vec!["id".to_string()];
        let err = EvalContext::new("t", &columns, &[Value::Integer(1)], &[])
            .eval(&where_clause("name > 1"))
            .unwrap_err();
        assert!(matches!(err, DbError::ColumnNotFound(..)));
    }
}

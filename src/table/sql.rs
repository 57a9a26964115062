//! Parameterized statement builders used by [`Table`](crate::Table).
//!
//! Values never reach the SQL text; every one of them is a `?` placeholder
//! with a matching entry in `params`.

use crate::core::{DbError, Result, Value};
use super::Criteria;

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

pub fn select_by_id(table: &str, id: Value) -> Statement {
    Statement {
        sql: format!("SELECT * FROM {} WHERE id = ?", table),
        params: vec![id],
    }
}

/// Fails when LIMIT or OFFSET does not fit a store integer.
pub fn select(table: &str, criteria: &Criteria) -> Result<Statement> {
    let mut sql = format!("SELECT * FROM {}", table);
    let mut params = criteria.params().to_vec();

    if let Some(clause) = criteria.where_clause() {
        sql.push_str(" WHERE ");
        sql.push_str(clause);
    }
    if let Some(order) = criteria.order() {
        sql.push_str(" ORDER BY ");
        sql.push_str(order);
    }
    if let Some(limit) = criteria.limit_value() {
        sql.push_str(" LIMIT ?");
        params.push(row_bound("LIMIT", limit)?);
    }
    if let Some(offset) = criteria.offset_value() {
        sql.push_str(" OFFSET ?");
        params.push(row_bound("OFFSET", offset)?);
    }

    Ok(Statement { sql, params })
}

/// Ordering, limit and offset are ignored.
pub fn count(table: &str, criteria: &Criteria) -> Statement {
    let mut sql = format!("SELECT COUNT(*) FROM {}", table);
    if let Some(clause) = criteria.where_clause() {
        sql.push_str(" WHERE ");
        sql.push_str(clause);
    }

    Statement {
        sql,
        params: criteria.params().to_vec(),
    }
}

/// One placeholder group per row; params are flattened row-major.
///
/// No columns yields `() VALUES ()`, a row of store defaults.
pub fn insert(table: &str, columns: &[String], rows: Vec<Vec<Value>>) -> Statement {
    let group = placeholder_group(columns.len());
    let groups = vec![group; rows.len()].join(", ");

    Statement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES {}",
            table,
            columns.join(", "),
            groups
        ),
        params: rows.into_iter().flatten().collect(),
    }
}

pub fn update_by_id(table: &str, assignments: Vec<(String, Value)>, id: Value) -> Statement {
    let set = assignments
        .iter()
        .map(|(column, _)| format!("{} = ?", column))
        .collect::<Vec<_>>()
        .join(", ");

    let mut params: Vec<Value> = assignments.into_iter().map(|(_, value)| value).collect();
    params.push(id);

    Statement {
        sql: format!("UPDATE {} SET {} WHERE id = ?", table, set),
        params,
    }
}

pub fn delete_by_id(table: &str, id: Value) -> Statement {
    Statement {
        sql: format!("DELETE FROM {} WHERE id = ?", table),
        params: vec![id],
    }
}

fn row_bound(clause: &str, n: usize) -> Result<Value> {
    Value::try_from(n).map_err(|_| {
        DbError::PreconditionViolation(format!("{} {} is out of range for the store", clause, n))
    })
}

fn placeholder_group(width: usize) -> String {
    format!("({})", vec!["?"; width].join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_all_clauses() {
        let criteria = Criteria::new()
            .filter("age > ? AND name LIKE ?", [Value::from(18i64), Value::from("A%")])
            .order_by("age DESC")
            .limit(20)
            .offset(40);

        let stmt = select("users", &criteria).unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM users WHERE age > ? AND name LIKE ? ORDER BY age DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(
            stmt.params,
            vec![
                Value::Integer(18),
                Value::Text("A%".into()),
                Value::Integer(20),
                Value::Integer(40)
            ]
        );
    }

    #[test]
    fn test_select_without_criteria() {
        let stmt = select("users", &Criteria::new()).unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM users");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_oversized_bounds_rejected() {
        let err = select("users", &Criteria::new().limit(usize::MAX)).unwrap_err();
        assert!(matches!(err, DbError::PreconditionViolation(_)));

        let err = select("users", &Criteria::new().limit(10).offset(usize::MAX)).unwrap_err();
        assert!(matches!(err, DbError::PreconditionViolation(_)));

        let stmt = select("users", &Criteria::new().offset(i64::MAX as usize)).unwrap();
        assert_eq!(stmt.params, vec![Value::Integer(i64::MAX)]);
    }

    #[test]
    fn test_count_ignores_paging() {
        let criteria = Criteria::new().filter("active = ?", [Value::from(true)]).limit(5).order_by("id");
        let stmt = count("users", &criteria);
        assert_eq!(stmt.sql, "SELECT COUNT(*) FROM users WHERE active = ?");
        assert_eq!(stmt.params, vec![Value::Boolean(true)]);
    }

    #[test]
    fn test_multi_row_insert() {
        let columns = vec!["id".to_string(), "name".to_string()];
        let stmt = insert(
            "users",
            &columns,
            vec![
                vec![Value::from(1i64), Value::from("a")],
                vec![Value::from(2i64), Value::from("b")],
            ],
        );

        assert_eq!(stmt.sql, "INSERT INTO users (id, name) VALUES (?, ?), (?, ?)");
        assert_eq!(
            stmt.params,
            vec![
                Value::Integer(1),
                Value::Text("a".into()),
                Value::Integer(2),
                Value::Text("b".into())
            ]
        );
    }

    #[test]
    fn test_insert_without_columns() {
        let stmt = insert("events", &[], vec![Vec::new()]);
        assert_eq!(stmt.sql, "INSERT INTO events () VALUES ()");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_update_and_delete() {
        let stmt = update_by_id(
            "users",
            vec![("name".into(), Value::from("z")), ("age".into(), Value::from(3i64))],
            Value::from(9i64),
        );
        assert_eq!(stmt.sql, "UPDATE users SET name = ?, age = ? WHERE id = ?");
        assert_eq!(stmt.params.last(), Some(&Value::Integer(9)));

        let stmt = delete_by_id("users", Value::from(9i64));
        assert_eq!(stmt.sql, "DELETE FROM users WHERE id = ?");
    }
}

use std::sync::Arc;
use std::thread;
use tablegate::{DbError, DbInterface, MemoryConfig, MemoryDb, Result, TableDef, Value};

fn products() -> MemoryDb {
    let db = MemoryDb::new();
    db.define_table(TableDef::new("products").auto_increment("id").columns(["name", "price", "tag"]))
        .unwrap();

    db.execute(
        "INSERT INTO products (name, price, tag) VALUES (?, ?, ?), (?, ?, ?), (?, ?, ?), (?, ?, ?)",
        &[
            Value::from("Apple"), Value::from(1.5), Value::from("fruit"),
            Value::from("Bread"), Value::from(3.0), Value::Null,
            Value::from("Cherry"), Value::from(7.25), Value::from("fruit"),
            Value::from("Donut"), Value::from(2.0), Value::from("sweet"),
        ],
    )
    .unwrap();
    db
}

fn names(db: &MemoryDb, sql: &str, params: &[Value]) -> Vec<Value> {
    let result = db.execute(sql, params).unwrap();
    result.rows().iter().map(|row| row[0].clone()).collect()
}

#[test]
fn test_multi_row_insert_reports_first_id() {
    let db = products();
    assert_eq!(db.insert_id().unwrap(), 1);
    assert_eq!(db.row_count("products").unwrap(), 4);

    let result = db
        .execute("INSERT INTO products (name) VALUES ('Eclair'), ('Fig')", &[])
        .unwrap();
    assert_eq!(result.affected_rows(), Some(2));
    assert!(!result.is_query());
    assert_eq!(db.insert_id().unwrap(), 5);
}

#[test]
fn test_predicates() {
    let db = products();

    assert_eq!(
        names(&db, "SELECT name FROM products WHERE tag = ? AND price > ? ORDER BY name", &[Value::from("fruit"), Value::from(2i64)]),
        vec![Value::from("Cherry")]
    );
    assert_eq!(
        names(&db, "SELECT name FROM products WHERE tag IS NULL OR name LIKE 'D%' ORDER BY id", &[]),
        vec![Value::from("Bread"), Value::from("Donut")]
    );
    assert_eq!(
        names(&db, "SELECT name FROM products WHERE id IN (?, ?) ORDER BY id DESC", &[Value::from(1i64), Value::from(3i64)]),
        vec![Value::from("Cherry"), Value::from("Apple")]
    );
    assert_eq!(
        names(&db, "SELECT name FROM products WHERE NOT (price < 3) ORDER BY price", &[]),
        vec![Value::from("Bread"), Value::from("Cherry")]
    );
}

#[test]
fn test_nulls_sort_last_ascending() {
    let db = products();
    let tags = names(&db, "SELECT tag FROM products ORDER BY tag, id", &[]);
    assert_eq!(tags.last(), Some(&Value::Null));

    let tags = names(&db, "SELECT tag FROM products ORDER BY tag DESC", &[]);
    assert_eq!(tags.first(), Some(&Value::Null));
}

#[test]
fn test_fetch_api() {
    let db = products();
    let mut result = db
        .execute("SELECT * FROM products WHERE id = ?", &[Value::from(2i64)])
        .unwrap();

    assert!(result.is_query());
    assert_eq!(result.columns(), &["id", "name", "price", "tag"]);

    let row = result.fetch().unwrap();
    assert_eq!(row[0], ("id".to_string(), Value::Integer(2)));
    assert_eq!(row[3], ("tag".to_string(), Value::Null));
    assert!(result.fetch().is_none());

    let mut count = db.execute("SELECT COUNT(*) FROM products", &[]).unwrap();
    assert_eq!(count.fetch_scalar(), Some(Value::Integer(4)));
}

#[test]
fn test_update_delete_counts() {
    let db = products();

    let result = db
        .execute("UPDATE products SET tag = ? WHERE tag IS NULL", &[Value::from("bakery")])
        .unwrap();
    assert_eq!(result.affected_rows(), Some(1));

    let result = db.execute("DELETE FROM products WHERE tag = 'fruit'", &[]).unwrap();
    assert_eq!(result.affected_rows(), Some(2));
    assert_eq!(db.row_count("products").unwrap(), 2);

    let result = db.execute("DELETE FROM products", &[]).unwrap();
    assert_eq!(result.affected_rows(), Some(2));
}

#[test]
fn test_errors() {
    let db = products();

    let cases: Vec<(&str, Vec<Value>)> = vec![
        ("SELECT * FROM missing", vec![]),
        ("SELECT nope FROM products", vec![]),
        ("SELECT * FROM products WHERE id = ?", vec![]),
        ("SELECT * FROM products WHERE id = ?", vec![Value::from(1i64), Value::from(2i64)]),
        ("CREATE TABLE x (id INT)", vec![]),
        ("SELECT * FROM products WHERE", vec![]),
    ];

    for (sql, params) in cases {
        let err = db.execute(sql, &params).unwrap_err();
        assert!(err.is_store_failure(), "{} -> {:?}", sql, err);
    }

    assert!(matches!(
        db.define_table(TableDef::new("products")),
        Err(DbError::TableExists(_))
    ));
}

#[test]
fn test_shared_across_threads() -> Result<()> {
    let db = Arc::new(MemoryDb::with_config(MemoryConfig::new("shared").statement_cache_capacity(4))?);
    db.define_table(TableDef::new("events").auto_increment("id").column("worker"))?;

    let handles: Vec<_> = (0..4i64)
        .map(|worker| {
            let db = Arc::clone(&db);
            thread::spawn(move || -> Result<()> {
                for _ in 0..10 {
                    db.execute("INSERT INTO events (worker) VALUES (?)", &[Value::from(worker)])?;
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked")?;
    }

    let mut result = db.execute("SELECT COUNT(*) FROM events WHERE worker = ?", &[Value::from(2i64)])?;
    assert_eq!(result.fetch_scalar(), Some(Value::Integer(10)));
    assert_eq!(db.row_count("events")?, 40);
    Ok(())
}

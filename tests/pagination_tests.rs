
use tablegate::{Criteria, DbError, Table, Value};
use test_support::{RecordingDb, seed_users, user_schema, users_db};

#[test]
fn test_empty_result_meta() {
    let db = users_db();
    let users = Table::new(&db, "users", user_schema());

    let page = users.paginate(1, 20, &Criteria::new()).unwrap();

    assert!(page.data.is_empty());
    assert_eq!(page.meta.total, 0);
    assert_eq!(page.meta.last_page, 1);
    assert!(!page.meta.has_more_pages);

    let json = serde_json::to_value(&page).unwrap();
    assert_eq!(json["data"], serde_json::json!([]));
    assert_eq!(json["meta"]["total"], serde_json::json!(0));
}

#[test]
fn test_walks_pages_in_order() {
    let db = users_db();
    let users = Table::new(&db, "users", user_schema());
    let rows: Vec<(String, i64)> = (1..=5).map(|i| (format!("user{}", i), 20 + i)).collect();
    let rows: Vec<(&str, i64)> = rows.iter().map(|(n, a)| (n.as_str(), *a)).collect();
    seed_users(&users, &rows);

    let criteria = Criteria::new().order_by("id");

    let first = users.paginate(1, 2, &criteria).unwrap();
    assert_eq!(first.data.len(), 2);
    assert_eq!(first.data[0].id(), &Value::Integer(1));
    assert_eq!(first.meta.total, 5);
    assert_eq!(first.meta.last_page, 3);
    assert!(first.meta.has_more_pages);

    let last = users.paginate(3, 2, &criteria).unwrap();
    assert_eq!(last.data.len(), 1);
    assert_eq!(last.data[0].id(), &Value::Integer(5));
    assert!(!last.meta.has_more_pages);

    let beyond = users.paginate(9, 2, &criteria).unwrap();
    assert!(beyond.data.is_empty());
    assert_eq!(beyond.meta.total, 5);
}

#[test]
fn test_filter_applies_to_data_and_total() {
    let db = RecordingDb::new(users_db());
    let users = Table::new(&db, "users", user_schema());
    seed_users(&users, &[("Ann", 30), ("Bob", 17), ("Cid", 44), ("Dee", 52)]);
    db.reset();

    let criteria = Criteria::new()
        .filter("age >= ?", [Value::from(18i64)])
        .order_by("age DESC");
    let page = users.paginate(2, 2, &criteria).unwrap();

    assert_eq!(page.meta.total, 3);
    assert_eq!(page.meta.page, 2);
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].get("name").unwrap(), Value::from("Ann"));

    let statements = db.statements.borrow();
    assert_eq!(statements.len(), 2);
    assert_eq!(
        statements[0].0,
        "SELECT * FROM users WHERE age >= ? ORDER BY age DESC LIMIT ? OFFSET ?"
    );
    assert_eq!(
        statements[0].1,
        vec![Value::Integer(18), Value::Integer(2), Value::Integer(2)]
    );
    assert_eq!(statements[1].0, "SELECT COUNT(*) FROM users WHERE age >= ?");
}

#[test]
fn test_zero_page_or_size_rejected() {
    let db = RecordingDb::new(users_db());
    let users = Table::new(&db, "users", user_schema());

    assert!(matches!(
        users.paginate(0, 10, &Criteria::new()),
        Err(DbError::PreconditionViolation(_))
    ));
    assert!(matches!(
        users.paginate(1, 0, &Criteria::new()),
        Err(DbError::PreconditionViolation(_))
    ));
    assert!(db.statements.borrow().is_empty());
}

#[test]
fn test_out_of_range_page_rejected() {
    let db = RecordingDb::new(users_db());
    let users = Table::new(&db, "users", user_schema());

    assert!(matches!(
        users.paginate(usize::MAX, 2, &Criteria::new()),
        Err(DbError::PreconditionViolation(_))
    ));
    assert!(matches!(
        users.find_where(&Criteria::new().limit(usize::MAX)),
        Err(DbError::PreconditionViolation(_))
    ));
    assert!(db.statements.borrow().is_empty());

    let page = users.paginate(1, usize::MAX / 2, &Criteria::new()).unwrap();
    assert!(page.data.is_empty());
}

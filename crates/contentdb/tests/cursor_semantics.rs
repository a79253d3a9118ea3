use contentdb::prelude::*;

fn with_rows(n: i64) -> Database {
    let db = open_in_memory_database();
    db.exec("CREATE TABLE t (i INTEGER)");
    for i in 0..n {
        let mut values = ContentValues::new();
        values.put_integer("i", i);
        assert!(db.insert("t", &values));
    }
    db
}

#[test]
fn exhausts_after_exactly_n_rows() {
    for n in [1_i64, 2, 5] {
        let db = with_rows(n);
        let mut cursor = db.query("SELECT i FROM t ORDER BY i");

        assert!(cursor.move_to_first());
        let mut seen = vec![cursor.get_int(0)];
        while cursor.move_to_next() {
            seen.push(cursor.get_int(0));
        }

        assert_eq!(seen, (0..n).collect::<Vec<_>>());
        assert!(cursor.is_after_last());
        assert!(!cursor.move_to_next());
        assert!(cursor.is_after_last());
    }
}

#[test]
fn move_to_next_is_false_once_exhausted() {
    let db = with_rows(1);
    let mut cursor = db.query("SELECT i FROM t");
    assert!(cursor.move_to_first());
    assert!(!cursor.is_after_last());

    // Completion is not reported as a row.
    assert!(!cursor.move_to_next());
    assert!(cursor.is_after_last());
    for _ in 0..3 {
        assert!(!cursor.move_to_next());
    }
}

#[test]
fn empty_result_set() {
    let db = with_rows(0);
    let mut cursor = db.query("SELECT i FROM t");
    assert!(!cursor.move_to_first());
    assert!(cursor.is_after_last());
    assert!(!cursor.move_to_next());
    assert_eq!(db.get_error(), "");
}

#[test]
fn restart_replays_rows() {
    let db = with_rows(3);
    let mut cursor = db.query("SELECT i FROM t ORDER BY i");

    let mut first_pass = 0;
    if cursor.move_to_first() {
        first_pass += 1;
        while cursor.move_to_next() {
            first_pass += 1;
        }
    }

    let mut second_pass = 0;
    if cursor.move_to_first() {
        second_pass += 1;
        while cursor.move_to_next() {
            second_pass += 1;
        }
    }

    assert_eq!(first_pass, 3);
    assert_eq!(second_pass, 3);
}

#[test]
fn restart_sees_new_rows() {
    let db = with_rows(1);
    let mut cursor = db.query("SELECT COUNT(*) FROM t");
    assert!(cursor.move_to_first());
    assert_eq!(cursor.get_int(0), 1);

    db.exec("INSERT INTO t (i) VALUES (9)");
    assert!(cursor.move_to_first());
    assert_eq!(cursor.get_int(0), 2);
}

#[test]
fn bad_sql_gives_after_last_cursor() {
    let db = with_rows(1);
    let mut cursor = db.query("SELECT nope FROM t");
    assert!(cursor.is_after_last());
    assert!(!cursor.move_to_first());
    assert!(db.get_error().contains("nope"));

    // A later successful call clears the reported error.
    let mut cursor = db.query("SELECT i FROM t");
    assert!(cursor.move_to_first());
    assert_eq!(db.get_error(), "");
}

#[test]
fn step_error_ends_iteration() {
    let db = open_in_memory_database();
    db.exec("CREATE TABLE t (v TEXT)");
    db.exec("INSERT INTO t VALUES ('a'), ('b')");

    // abs() of i64::MIN raises an integer overflow on the first row.
    let mut cursor = db.query("SELECT abs(-9223372036854775807 - length(v)) FROM t");
    assert!(!cursor.move_to_first());
    assert!(cursor.is_after_last());
    assert!(!cursor.move_to_next());
    assert!(db.get_error().contains("overflow"));
}

#[test]
fn cursor_column_metadata() {
    let db = with_rows(1);
    let mut cursor = db.query("SELECT i AS number, 'x' AS letter FROM t");
    assert_eq!(cursor.column_count(), 2);
    assert_eq!(cursor.column_name(1).as_deref(), Some("letter"));
    assert!(cursor.move_to_first());
    assert_eq!(cursor.column_type(0), DataType::Integer);
    assert_eq!(cursor.column_type(1), DataType::Text);
}

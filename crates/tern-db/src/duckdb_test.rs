use super::*;
use tempfile::tempdir;

#[tokio::test]
async fn test_in_memory() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert_eq!(db.db_type(), "duckdb");
    assert!(!db.in_transaction());
}

#[tokio::test]
async fn test_execute_batch_and_count() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t1 (id INT); INSERT INTO t1 VALUES (1), (2);")
        .await
        .unwrap();

    assert!(db.relation_exists("t1").await.unwrap());
    assert_eq!(db.query_count("SELECT * FROM t1").await.unwrap(), 2);
}

#[tokio::test]
async fn test_relation_not_exists() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert!(!db.relation_exists("nonexistent").await.unwrap());
}

#[tokio::test]
async fn test_commit_keeps_changes() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.begin().await.unwrap();
    assert!(db.in_transaction());
    db.execute("CREATE TABLE users (id INT)").await.unwrap();
    db.commit().await.unwrap();

    assert!(!db.in_transaction());
    assert!(db.relation_exists("users").await.unwrap());
}

#[tokio::test]
async fn test_rollback_discards_changes() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute("CREATE TABLE users (id INT)").await.unwrap();

    db.begin().await.unwrap();
    db.execute("INSERT INTO users VALUES (1)").await.unwrap();
    db.execute("CREATE TABLE orders (id INT)").await.unwrap();
    db.rollback().await.unwrap();

    assert!(!db.in_transaction());
    assert_eq!(db.query_count("SELECT * FROM users").await.unwrap(), 0);
    assert!(!db.relation_exists("orders").await.unwrap());
}

#[tokio::test]
async fn test_nested_begin_rejected() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.begin().await.unwrap();
    assert!(matches!(
        db.begin().await,
        Err(DbError::TransactionError(_))
    ));
    db.rollback().await.unwrap();
}

#[tokio::test]
async fn test_commit_without_transaction() {
    let db = DuckDbBackend::in_memory().unwrap();
    assert!(matches!(
        db.commit().await,
        Err(DbError::TransactionError(_))
    ));
    // Rolling back nothing is harmless
    db.rollback().await.unwrap();
}

#[tokio::test]
async fn test_truncate() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INT); INSERT INTO t VALUES (1), (2), (3);")
        .await
        .unwrap();

    db.truncate("t").await.unwrap();
    assert_eq!(db.query_count("SELECT * FROM t").await.unwrap(), 0);
    assert!(matches!(
        db.truncate("missing").await,
        Err(DbError::TableNotFound(_))
    ));
}

#[tokio::test]
async fn test_create_table_as_copy() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch("CREATE TABLE t (id INT); INSERT INTO t VALUES (1), (2);")
        .await
        .unwrap();

    db.create_table_as("t_copy", "SELECT * FROM t", true)
        .await
        .unwrap();
    assert_eq!(db.query_count("SELECT * FROM t_copy").await.unwrap(), 2);
}

#[tokio::test]
async fn test_copy_rows() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        "CREATE TABLE src (id INT); INSERT INTO src VALUES (1), (2); CREATE TABLE dst (id INT);",
    )
    .await
    .unwrap();

    assert_eq!(db.copy_rows("src", "dst").await.unwrap(), 2);
    assert_eq!(db.query_count("SELECT * FROM dst").await.unwrap(), 2);
    assert!(matches!(
        db.copy_rows("missing", "dst").await,
        Err(DbError::TableNotFound(_))
    ));
}

#[tokio::test]
async fn test_reserved_and_mixed_case_names() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.execute_batch(
        r#"CREATE TABLE "order" (id INT); INSERT INTO "order" VALUES (1), (2);
           CREATE TABLE "Audit Log" (id INT);"#,
    )
    .await
    .unwrap();

    db.create_table_as("order_tern_backup", r#"SELECT * FROM "order""#, true)
        .await
        .unwrap();
    db.truncate("order").await.unwrap();
    assert_eq!(db.query_count(r#"SELECT * FROM "order""#).await.unwrap(), 0);

    assert_eq!(db.copy_rows("order_tern_backup", "order").await.unwrap(), 2);
    assert_eq!(db.copy_rows("order", "Audit Log").await.unwrap(), 2);

    db.drop_if_exists("Audit Log").await.unwrap();
    assert!(!db.relation_exists("Audit Log").await.unwrap());
}

#[tokio::test]
async fn test_append_csv_creates_then_appends() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("people.csv");
    std::fs::write(&csv, "id,name\n1,ada\n2,grace\n").unwrap();
    let path = csv.display().to_string();

    let db = DuckDbBackend::in_memory().unwrap();
    db.append_csv("people", &path).await.unwrap();
    assert_eq!(db.query_count("SELECT * FROM people").await.unwrap(), 2);

    db.append_csv("people", &path).await.unwrap();
    assert_eq!(db.query_count("SELECT * FROM people").await.unwrap(), 4);
}

#[tokio::test]
async fn test_drop_if_exists() {
    let db = DuckDbBackend::in_memory().unwrap();
    db.create_table_as("to_drop", "SELECT 1 AS id", false)
        .await
        .unwrap();
    assert!(db.relation_exists("to_drop").await.unwrap());

    db.drop_if_exists("to_drop").await.unwrap();
    assert!(!db.relation_exists("to_drop").await.unwrap());
}

#[tokio::test]
async fn test_file_backed_database_persists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tern.duckdb");
    {
        let db = DuckDbBackend::from_path(&path).unwrap();
        db.execute("CREATE TABLE kept (id INT)").await.unwrap();
    }
    let db = DuckDbBackend::new(path.to_str().unwrap()).unwrap();
    assert!(db.relation_exists("kept").await.unwrap());
}

use super::*;
use std::fs;
use tempfile::tempdir;

#[test]
fn test_discover_sorted_and_qualified() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("b_orders.sql"), "-- up\n").unwrap();
    fs::write(dir.path().join("a_users.sql"), "-- up\n").unwrap();
    fs::write(dir.path().join(".gitkeep"), "").unwrap();
    fs::create_dir(dir.path().join("nested")).unwrap();

    let units = discover_units(dir.path(), "App\\Migrations").unwrap();

    let names: Vec<&str> = units.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["a_users", "b_orders"]);
    assert_eq!(units[0].namespace, "App\\Migrations\\a_users");
    assert_eq!(units[0].extension, "sql");
    assert_eq!(units[0].file_name(), "a_users.sql");
}

#[test]
fn test_discover_missing_directory_is_empty() {
    let dir = tempdir().unwrap();
    let units = discover_units(&dir.path().join("nope"), "").unwrap();
    assert!(units.is_empty());
}

#[test]
fn test_discover_duplicate_stem() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("users.sql"), "").unwrap();
    fs::write(dir.path().join("users.csv"), "").unwrap();

    let err = discover_units(dir.path(), "").unwrap_err();
    assert!(matches!(err, CoreError::DuplicateUnit { .. }));
}

#[test]
fn test_qualify() {
    assert_eq!(qualify("", "UserTable"), "UserTable");
    assert_eq!(qualify("App\\", "UserTable"), "App\\UserTable");
    assert_eq!(qualify("App\\Db", "UserTable"), "App\\Db\\UserTable");
}

#[test]
fn test_find_unit() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("users.sql"), "").unwrap();

    assert!(find_unit(dir.path(), "", "users").unwrap().is_some());
    assert!(find_unit(dir.path(), "", "orders").unwrap().is_none());
}

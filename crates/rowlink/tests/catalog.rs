//! Metadata discovery against a scripted driver.

mod common;

use common::{client, column, generated, pk, users_columns, FakeDriver, DATABASE};
use rowlink::Error;

#[test]
fn test_bulk_load_stores_every_table() {
    let driver = FakeDriver::new();
    driver.add_table("users", users_columns());
    driver.add_table(
        "orders",
        vec![
            pk("order_id", "bigint(20)"),
            column("total", "decimal(10,2)"),
            generated("created_at", "timestamp"),
        ],
    );
    let client = client(&driver);

    let meta = client.table("users").metadata().unwrap();
    assert_eq!(meta.primary_key, "id");
    assert_eq!(meta.updatable_columns, vec!["user_name", "signup_date"]);
    assert_eq!(meta.column_type("user_name"), Some("varchar"));

    // The other table came along with the same query.
    assert!(client.catalog().is_known(DATABASE, "orders"));
    let orders = client.catalog().get(DATABASE, "orders").unwrap();
    assert_eq!(orders.primary_key, "order_id");
    assert_eq!(orders.updatable_columns, vec!["total"]);
    assert_eq!(orders.column_type("total"), Some("decimal"));
    assert_eq!(driver.count("show full columns"), 0);
}

#[test]
fn test_metadata_fetched_once() {
    let driver = FakeDriver::new();
    driver.add_table("users", users_columns());
    let client = client(&driver);

    let first = client.table("users").metadata().unwrap();
    let second = client.table("users").metadata().unwrap();
    assert_eq!(first, second);
    assert_eq!(driver.count("select TABLE_NAME"), 1);
}

#[test]
fn test_fallback_to_show_columns() {
    let driver = FakeDriver::new();
    driver.add_table("users", users_columns());
    driver.fail_bulk_query();
    let client = client(&driver);

    let meta = client.table("users").metadata().unwrap();
    assert_eq!(meta.primary_key, "id");
    assert_eq!(meta.column_names(), vec!["id", "user_name", "signup_date"]);
    assert!(driver
        .statements()
        .contains(&"show full columns from shop.users".to_string()));
}

#[test]
fn test_missing_table_is_schema_unknown() {
    let driver = FakeDriver::new();
    driver.add_table("users", users_columns());
    let client = client(&driver);

    let err = client.table("ghosts").metadata().unwrap_err();
    assert!(matches!(
        err,
        Error::SchemaUnknown { ref table, .. } if table == "ghosts"
    ));
    assert!(!client.catalog().is_known(DATABASE, "ghosts"));
    // Known tables are still served.
    assert!(client.catalog().is_known(DATABASE, "users"));
}

#[test]
fn test_table_without_single_primary_key_is_skipped() {
    let driver = FakeDriver::new();
    driver.add_table("users", users_columns());
    driver.add_table(
        "links",
        vec![pk("left_id", "int"), pk("right_id", "int")],
    );
    let client = client(&driver);

    let err = client.table("links").metadata().unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedPrimaryKey { found: 2, .. }
    ));
    assert!(!client.catalog().is_known(DATABASE, "links"));
    assert!(client.catalog().is_known(DATABASE, "users"));
}

#[test]
fn test_operations_check_table_name_first() {
    let driver = FakeDriver::new();
    let client = client(&driver);

    assert!(matches!(
        client.table("").metadata(),
        Err(Error::TableNotSelected)
    ));
    assert!(driver.statements().is_empty());
}

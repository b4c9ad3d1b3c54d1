//! `_async` operations delivered through completions.

mod common;

use std::time::Duration;

use chrono::{DateTime, Utc};
use common::{client, users_columns, FakeDriver};
use crossbeam_channel::unbounded;
use rowlink::{callbacks, Aggregate, Client, ClientOptions, DeleteOutcome, Error, Row, Value};
use rowlink_derive::Record;

const WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Default, Clone, Record)]
struct User {
    id: i32,
    user_name: String,
    signup_date: DateTime<Utc>,
}

fn setup() -> (std::sync::Arc<FakeDriver>, Client) {
    let driver = FakeDriver::new();
    driver.add_table("users", users_columns());
    driver.respond(
        "select id, user_name, signup_date from users",
        vec![Row::from_pairs([
            ("id", Value::Int(7)),
            ("user_name", Value::from("ana")),
            ("signup_date", Value::Null),
        ])],
    );
    let client = client(&driver);
    (driver, client)
}

#[test]
fn test_get_async_delivers_records() {
    let (_driver, client) = setup();
    let (tx, rx) = unbounded();

    client
        .table("users")
        .get_async::<User, _>(Some("id = 7".to_string()), tx)
        .unwrap();
    let users = rx.recv_timeout(WAIT).unwrap().unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, 7);
}

#[test]
fn test_write_operations_async() {
    let (driver, client) = setup();
    let users = client.table("users");

    driver.push_exec(1, Some(8));
    let (add_tx, add_rx) = unbounded();
    users
        .add_async(
            User {
                user_name: "bo".to_string(),
                ..User::default()
            },
            add_tx,
        )
        .unwrap();
    assert_eq!(add_rx.recv_timeout(WAIT).unwrap().unwrap(), Some(8));

    let (update_tx, update_rx) = unbounded();
    users
        .update_async(
            User {
                id: 8,
                user_name: "bob".to_string(),
                ..User::default()
            },
            update_tx,
        )
        .unwrap();
    assert_eq!(update_rx.recv_timeout(WAIT).unwrap().unwrap(), 1);

    driver.push_exec(0, None);
    let (delete_tx, delete_rx) = unbounded();
    users.delete_async("id = 99".to_string(), delete_tx).unwrap();
    assert_eq!(
        delete_rx.recv_timeout(WAIT).unwrap().unwrap(),
        DeleteOutcome::NoEffect
    );
}

#[test]
fn test_aggregate_async() {
    let (driver, client) = setup();
    driver.respond("select count(id) from users", vec![Row::from_pairs([("n", Value::Int(3))])]);
    let users = client.table("users");

    let (tx, rx) = unbounded();
    users.count_async(None, tx).unwrap();
    assert_eq!(rx.recv_timeout(WAIT).unwrap().unwrap(), 3);

    let (tx, rx) = unbounded();
    users
        .aggregate_async(Aggregate::min("nope"), None, tx)
        .unwrap();
    assert!(matches!(
        rx.recv_timeout(WAIT).unwrap(),
        Err(Error::UnknownColumn { .. })
    ));
}

#[test]
fn test_failures_reach_failure_callback() {
    let (_driver, client) = setup();
    let (tx, rx) = unbounded();
    let failure_tx = tx.clone();

    client
        .table("")
        .get_async::<User, _>(
            None,
            callbacks(
                move |_users: Vec<User>| tx.send("success".to_string()).unwrap(),
                move |e: Error| failure_tx.send(e.to_string()).unwrap(),
            ),
        )
        .unwrap();
    let message = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(message, Error::TableNotSelected.to_string());
}

#[test]
fn test_table_ddl_async() {
    let (_driver, client) = setup();

    let (tx, rx) = unbounded();
    client
        .create_table_async("audit", vec!["id".to_string(), "int".to_string()], tx)
        .unwrap();
    rx.recv_timeout(WAIT).unwrap().unwrap();
    assert!(client.table_exists("audit").unwrap());

    let (tx, rx) = unbounded();
    client.drop_table_async("audit", tx).unwrap();
    rx.recv_timeout(WAIT).unwrap().unwrap();
    assert!(!client.table_exists("audit").unwrap());
}

#[test]
fn test_offline_client_reports_through_completion() {
    let client = Client::with_options(common::config(), None, ClientOptions::default());
    let (tx, rx) = unbounded();

    client.table("users").count_async(None, tx).unwrap();
    assert!(matches!(
        rx.recv_timeout(WAIT).unwrap(),
        Err(Error::ConnectionAbsent { .. })
    ));
}

#[test]
fn test_refused_submission_reaches_failure_callback() {
    let driver = FakeDriver::new();
    driver.add_table("users", users_columns());
    let client = Client::with_options(
        common::config(),
        Some(std::sync::Arc::clone(&driver) as std::sync::Arc<dyn rowlink::Driver>),
        ClientOptions {
            workers: 1,
            queue_capacity: 1,
        },
    );
    let users = client.table("users");

    // The first completion holds the only worker until released.
    let (started_tx, started_rx) = unbounded();
    let (release_tx, release_rx) = unbounded::<()>();
    users
        .count_async(
            None,
            callbacks(
                move |_: i64| {
                    started_tx.send(()).unwrap();
                    release_rx.recv_timeout(WAIT).unwrap();
                },
                |_| {},
            ),
        )
        .unwrap();
    started_rx.recv_timeout(WAIT).unwrap();

    let (queued_tx, queued_rx) = unbounded();
    users.count_async(None, queued_tx).unwrap();

    let (fail_tx, fail_rx) = unbounded();
    let refused = users.count_async(
        None,
        callbacks(|_: i64| {}, move |e: Error| fail_tx.send(e).unwrap()),
    );
    assert!(matches!(refused, Err(Error::QueueFull)));
    assert!(matches!(fail_rx.recv_timeout(WAIT).unwrap(), Error::QueueFull));

    release_tx.send(()).unwrap();
    assert_eq!(queued_rx.recv_timeout(WAIT).unwrap().unwrap(), 0);
}

//! Tests for the `#[derive(Record)]` macro output.

#![deny(non_snake_case)]

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rowlink::{FieldKind, Record, Value};
use rowlink_derive::Record;

#[derive(Debug, Default, Clone, PartialEq, Record)]
pub struct Account {
    pub id: i64,
    #[record(name = "userName")]
    pub name: String,
    pub balance: f64,
    pub active: bool,
    pub born: Option<NaiveDate>,
    pub last_seen: NaiveDateTime,
    pub alarm: NaiveTime,
    pub rank: i16,
    pub r#type: i8,
    #[record(skip)]
    pub session: Option<String>,
}

#[test]
fn test_field_names_and_order() {
    let names: Vec<&str> = Account::fields().iter().map(|f| f.name).collect();
    assert_eq!(
        names,
        vec![
            "id",
            "userName",
            "balance",
            "active",
            "born",
            "last_seen",
            "alarm",
            "rank",
            "type"
        ]
    );
}

#[test]
fn test_field_kinds() {
    let kind = |name: &str| Account::field(name).map(|f| f.kind);
    assert_eq!(kind("id"), Some(FieldKind::Long));
    assert_eq!(kind("userName"), Some(FieldKind::Text));
    assert_eq!(kind("balance"), Some(FieldKind::Double));
    assert_eq!(kind("active"), Some(FieldKind::Bool));
    assert_eq!(kind("born"), Some(FieldKind::Date));
    assert_eq!(kind("last_seen"), Some(FieldKind::DateTime));
    assert_eq!(kind("alarm"), Some(FieldKind::Time));
    assert_eq!(kind("rank"), Some(FieldKind::Short));
    assert_eq!(kind("type"), Some(FieldKind::Byte));
    assert_eq!(kind("session"), None);
    assert_eq!(kind("name"), None);
}

#[test]
fn test_getters() {
    let account = Account {
        id: 3,
        name: "ana".to_string(),
        born: None,
        ..Account::default()
    };
    let get = |name: &str| Account::field(name).map(|f| (f.get)(&account));
    assert_eq!(get("id"), Some(Value::Int(3)));
    assert_eq!(get("userName"), Some(Value::from("ana")));
    assert_eq!(get("born"), Some(Value::Null));
    assert_eq!(get("active"), Some(Value::Bool(false)));
}

#[test]
fn test_setters() {
    let mut account = Account::default();
    let born = NaiveDate::from_ymd_opt(1990, 5, 17).unwrap();

    (Account::field("userName").unwrap().set)(&mut account, Value::from("bo")).unwrap();
    (Account::field("born").unwrap().set)(&mut account, Value::Date(born)).unwrap();
    (Account::field("rank").unwrap().set)(&mut account, Value::Int(12)).unwrap();
    assert_eq!(account.name, "bo");
    assert_eq!(account.born, Some(born));
    assert_eq!(account.rank, 12);

    (Account::field("born").unwrap().set)(&mut account, Value::Null).unwrap();
    assert_eq!(account.born, None);

    // Out of range for i8.
    assert!((Account::field("type").unwrap().set)(&mut account, Value::Int(300)).is_err());
    assert!((Account::field("alarm").unwrap().set)(&mut account, Value::from("not a time")).is_err());
}

#[derive(Debug, Default, Record)]
#[allow(non_snake_case)]
struct Legacy {
    signupDate: Option<NaiveDate>,
}

#[test]
fn test_camel_case_identifiers() {
    let field = Legacy::field("signupDate").unwrap();
    assert_eq!(field.kind, FieldKind::Date);

    let mut legacy = Legacy::default();
    let day = NaiveDate::from_ymd_opt(2024, 2, 3).unwrap();
    (field.set)(&mut legacy, Value::Date(day)).unwrap();
    assert_eq!(legacy.signupDate, Some(day));
}

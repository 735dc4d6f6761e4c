//! Tests for domain models.

use crate::db::models::*;
use crate::db::{DbError, Entity, Value};

fn lando() -> Driver {
    Driver {
        id: None,
        name: "Lando Norris".to_string(),
        nationality: Some("British".to_string()),
        team: "McLaren".to_string(),
        number: Some(4),
        role: DriverRole::Race,
        car_id: None,
    }
}

#[test]
fn driver_role_deserializes_from_database_format() {
    let reserve: DriverRole = serde_json::from_str("\"reserve\"").unwrap();
    assert_eq!(reserve, DriverRole::Reserve);
    assert_eq!("test".parse::<DriverRole>().unwrap(), DriverRole::Test);
    assert!("pilot".parse::<DriverRole>().is_err());
}

#[test]
fn driver_role_defaults_to_race_when_missing() {
    let driver: Driver =
        serde_json::from_str(r#"{"name":"Oscar Piastri","team":"McLaren"}"#).unwrap();
    assert_eq!(driver.role, DriverRole::Race);
    assert_eq!(driver.id, None);
}

#[test]
fn values_align_with_columns() {
    let driver = lando();
    assert_eq!(driver.values().len(), Driver::COLUMNS.len());

    let car = Car {
        id: Some(3),
        name: "MCL35M".to_string(),
        season: 2021,
        engine: "Mercedes M12".to_string(),
        team: "McLaren".to_string(),
    };
    assert_eq!(car.values().len(), Car::COLUMNS.len());
    assert_eq!(car.column_value("season"), Some(Value::Int(2021)));
    assert_eq!(car.column_value("id"), Some(Value::Int(3)));
    assert_eq!(car.column_value("colour"), None);
}

#[test]
fn missing_optional_columns_are_null() {
    let mut driver = lando();
    driver.car_id = None;
    driver.nationality = None;
    assert_eq!(driver.column_value("car_id"), Some(Value::Null));
    assert_eq!(driver.column_value("nationality"), Some(Value::Null));
    assert_eq!(driver.column_value("id"), Some(Value::Null));
}

#[test]
fn blank_driver_name_is_rejected() {
    let mut driver = lando();
    driver.name = "   ".to_string();
    match driver.validate() {
        Err(DbError::Validation { field, .. }) => assert_eq!(field.as_deref(), Some("name")),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn out_of_range_number_is_rejected() {
    let mut driver = lando();
    driver.number = Some(100);
    assert!(matches!(
        driver.validate(),
        Err(DbError::Validation { field: Some(f), .. }) if f == "number"
    ));
}

#[test]
fn race_before_first_season_is_rejected() {
    let race = Race {
        id: None,
        name: "British Grand Prix".to_string(),
        circuit: "Silverstone".to_string(),
        country: "United Kingdom".to_string(),
        season: 1949,
        round: 1,
        date: None,
        winner_id: None,
    };
    assert!(matches!(
        race.validate(),
        Err(DbError::Validation { field: Some(f), .. }) if f == "season"
    ));
}

#[test]
fn select_list_starts_with_id() {
    assert_eq!(Car::select_list(), "id, name, season, engine, team");
}

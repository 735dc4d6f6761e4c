//! Domain models for the McLaren database.
//!
//! These models are storage-agnostic and represent the core entities
//! used throughout the application. Each one implements [`Entity`], which is
//! all the generic repository needs to persist it.

use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::any::AnyRow;

use crate::db::entity::{Entity, Id, Value, require_text};
use crate::db::{DbError, DbResult};

/// First Formula One world championship season.
pub const FIRST_SEASON: i64 = 1950;

// =============================================================================
// Race
// =============================================================================

/// A grand prix in a given season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Race {
    #[serde(default)]
    pub id: Option<Id>,
    pub name: String,
    pub circuit: String,
    pub country: String,
    pub season: i64,
    pub round: i64,
    /// Race day as `YYYY-MM-DD`.
    #[serde(default)]
    pub date: Option<String>,
    /// Driver who won the race, if it has been run.
    #[serde(default)]
    pub winner_id: Option<Id>,
}

impl Entity for Race {
    const TABLE: &'static str = "race";
    const NAME: &'static str = "Race";
    const COLUMNS: &'static [&'static str] = &[
        "name",
        "circuit",
        "country",
        "season",
        "round",
        "date",
        "winner_id",
    ];

    fn id(&self) -> Option<Id> {
        self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.name.as_str().into(),
            self.circuit.as_str().into(),
            self.country.as_str().into(),
            self.season.into(),
            self.round.into(),
            self.date.clone().into(),
            self.winner_id.into(),
        ]
    }

    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Race {
            id: Some(row.try_get("id")?),
            name: row.try_get("name")?,
            circuit: row.try_get("circuit")?,
            country: row.try_get("country")?,
            season: row.try_get("season")?,
            round: row.try_get("round")?,
            date: row.try_get("date")?,
            winner_id: row.try_get("winner_id")?,
        })
    }

    fn validate(&self) -> DbResult<()> {
        require_text("name", &self.name)?;
        require_text("circuit", &self.circuit)?;
        require_text("country", &self.country)?;
        validate_season(self.season)?;
        if self.round < 1 {
            return Err(DbError::invalid_field("round", "round must be at least 1"));
        }
        Ok(())
    }
}

// =============================================================================
// Car
// =============================================================================

/// A car entered by a team for one season.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Car {
    #[serde(default)]
    pub id: Option<Id>,
    /// Chassis name, e.g. "MCL35M".
    pub name: String,
    pub season: i64,
    pub engine: String,
    pub team: String,
}

impl Entity for Car {
    const TABLE: &'static str = "car";
    const NAME: &'static str = "Car";
    const COLUMNS: &'static [&'static str] = &["name", "season", "engine", "team"];

    fn id(&self) -> Option<Id> {
        self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.name.as_str().into(),
            self.season.into(),
            self.engine.as_str().into(),
            self.team.as_str().into(),
        ]
    }

    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error> {
        Ok(Car {
            id: Some(row.try_get("id")?),
            name: row.try_get("name")?,
            season: row.try_get("season")?,
            engine: row.try_get("engine")?,
            team: row.try_get("team")?,
        })
    }

    fn validate(&self) -> DbResult<()> {
        require_text("name", &self.name)?;
        require_text("engine", &self.engine)?;
        require_text("team", &self.team)?;
        validate_season(self.season)
    }
}

// =============================================================================
// Driver
// =============================================================================

/// A driver, optionally assigned to a car.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    #[serde(default)]
    pub id: Option<Id>,
    pub name: String,
    #[serde(default)]
    pub nationality: Option<String>,
    pub team: String,
    /// Permanent race number.
    #[serde(default)]
    pub number: Option<i64>,
    #[serde(default)]
    pub role: DriverRole,
    #[serde(default)]
    pub car_id: Option<Id>,
}

/// Seat a driver holds within the team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DriverRole {
    #[default]
    Race,
    Reserve,
    Test,
}

impl std::fmt::Display for DriverRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriverRole::Race => write!(f, "race"),
            DriverRole::Reserve => write!(f, "reserve"),
            DriverRole::Test => write!(f, "test"),
        }
    }
}

impl std::str::FromStr for DriverRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "race" => Ok(DriverRole::Race),
            "reserve" => Ok(DriverRole::Reserve),
            "test" => Ok(DriverRole::Test),
            _ => Err(format!("Unknown driver role: {}", s)),
        }
    }
}

impl Entity for Driver {
    const TABLE: &'static str = "driver";
    const NAME: &'static str = "Driver";
    const COLUMNS: &'static [&'static str] =
        &["name", "nationality", "team", "number", "role", "car_id"];

    fn id(&self) -> Option<Id> {
        self.id
    }

    fn set_id(&mut self, id: Id) {
        self.id = Some(id);
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.name.as_str().into(),
            self.nationality.clone().into(),
            self.team.as_str().into(),
            self.number.into(),
            self.role.to_string().into(),
            self.car_id.into(),
        ]
    }

    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        Ok(Driver {
            id: Some(row.try_get("id")?),
            name: row.try_get("name")?,
            nationality: row.try_get("nationality")?,
            team: row.try_get("team")?,
            number: row.try_get("number")?,
            role: role.parse().map_err(|e: String| sqlx::Error::ColumnDecode {
                index: "role".to_string(),
                source: e.into(),
            })?,
            car_id: row.try_get("car_id")?,
        })
    }

    fn validate(&self) -> DbResult<()> {
        require_text("name", &self.name)?;
        require_text("team", &self.team)?;
        if self.number.is_some_and(|n| !(0..=99).contains(&n)) {
            return Err(DbError::invalid_field(
                "number",
                "number must be between 0 and 99",
            ));
        }
        Ok(())
    }
}

fn validate_season(season: i64) -> DbResult<()> {
    if season < FIRST_SEASON {
        return Err(DbError::invalid_field(
            "season",
            format!("season must be {FIRST_SEASON} or later"),
        ));
    }
    Ok(())
}

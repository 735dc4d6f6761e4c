//! Entity abstraction shared by every persisted resource.
//!
//! An [`Entity`] describes how a domain type maps onto a single table: its
//! column list, how to turn an instance into column values and how to read it
//! back from a row. The generic repository is written once against this trait.

use sqlx::any::AnyRow;

use crate::db::DbResult;

/// Storage-assigned numeric identity.
pub type Id = i64;

/// A single column value.
///
/// `Null` is rendered as a literal `NULL` in generated SQL instead of being
/// bound, so both backends see a correctly typed null.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Int(i64),
    Text(String),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// A persisted domain object with a stable identity.
pub trait Entity: Sized + Send + Sync + Unpin + 'static {
    /// Table holding this entity.
    const TABLE: &'static str;
    /// Human readable kind, used in errors and graph nodes.
    const NAME: &'static str;
    /// Non-id columns, in the order produced by [`Entity::values`].
    const COLUMNS: &'static [&'static str];

    fn id(&self) -> Option<Id>;

    fn set_id(&mut self, id: Id);

    /// Column values aligned with [`Entity::COLUMNS`].
    fn values(&self) -> Vec<Value>;

    fn from_row(row: &AnyRow) -> Result<Self, sqlx::Error>;

    /// Domain-level checks run before any write reaches storage.
    fn validate(&self) -> DbResult<()> {
        Ok(())
    }

    /// Value of a named column, including `id`.
    fn column_value(&self, column: &str) -> Option<Value> {
        if column == "id" {
            return Some(self.id().into());
        }
        Self::COLUMNS
            .iter()
            .position(|c| *c == column)
            .and_then(|idx| self.values().into_iter().nth(idx))
    }

    /// `id, col1, col2, ...` for SELECT lists.
    fn select_list() -> String {
        std::iter::once("id")
            .chain(Self::COLUMNS.iter().copied())
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn has_column(column: &str) -> bool {
        column == "id" || Self::COLUMNS.contains(&column)
    }
}

/// Positional parameter collector for generated SQL.
///
/// Emits `$1, $2, ...` placeholders, which both the SQLite and PostgreSQL
/// drivers accept through `sqlx::Any`.
#[derive(Debug, Default)]
pub struct Params {
    values: Vec<Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value and return the SQL fragment standing in for it.
    pub fn push(&mut self, value: Value) -> String {
        match value {
            Value::Null => "NULL".to_string(),
            other => {
                self.values.push(other);
                format!("${}", self.values.len())
            }
        }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Require a non-blank text field.
pub fn require_text(field: &str, value: &str) -> DbResult<()> {
    if value.trim().is_empty() {
        return Err(crate::db::DbError::invalid_field(
            field,
            format!("{field} must not be blank"),
        ));
    }
    Ok(())
}

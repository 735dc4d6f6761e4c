//! Filter predicates for repository queries.
//!
//! A [`Filter`] is evaluated by the backing store (rendered to a SQL `WHERE`
//! clause) but can also be evaluated in memory against an entity with
//! [`Filter::matches`]. Both evaluations follow SQL semantics: any comparison
//! involving `NULL` is false.

use crate::db::entity::{Entity, Params, Value};
use crate::db::{DbError, DbResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Matches every row.
    All,
    /// Column equals value. `Eq(col, Value::Null)` matches NULL columns.
    Eq(&'static str, Value),
    /// ASCII case-insensitive substring match on a text column.
    Contains(&'static str, String),
    /// Integer column is greater than or equal to the bound.
    AtLeast(&'static str, i64),
    /// Integer column is less than or equal to the bound.
    AtMost(&'static str, i64),
    And(Vec<Filter>),
    Or(Vec<Filter>),
}

impl Filter {
    pub fn eq(column: &'static str, value: impl Into<Value>) -> Self {
        Filter::Eq(column, value.into())
    }

    pub fn contains(column: &'static str, text: impl Into<String>) -> Self {
        Filter::Contains(column, text.into())
    }

    /// Combine two filters, flattening nested conjunctions and dropping `All`.
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And(mut a), Filter::And(b)) => {
                a.extend(b);
                Filter::And(a)
            }
            (Filter::And(mut a), f) => {
                a.push(f);
                Filter::And(a)
            }
            (f, Filter::And(mut b)) => {
                b.insert(0, f);
                Filter::And(b)
            }
            (a, b) => Filter::And(vec![a, b]),
        }
    }

    /// Render as a SQL boolean expression for entity `T`.
    ///
    /// Column names are checked against `T`'s column list so that nothing
    /// outside the schema reaches the SQL text.
    pub fn to_sql<T: Entity>(&self, params: &mut Params) -> DbResult<String> {
        Ok(match self {
            Filter::All => "1 = 1".to_string(),
            Filter::Eq(col, Value::Null) => format!("{} IS NULL", checked::<T>(col)?),
            Filter::Eq(col, value) => {
                let col = checked::<T>(col)?;
                format!("{} = {}", col, params.push(value.clone()))
            }
            Filter::Contains(col, text) => {
                let col = checked::<T>(col)?;
                let pattern = format!("%{}%", escape_like(&text.to_ascii_lowercase()));
                format!(
                    "{} LIKE {} ESCAPE '\\'",
                    fold_ascii_case(col),
                    params.push(Value::Text(pattern))
                )
            }
            Filter::AtLeast(col, bound) => {
                let col = checked::<T>(col)?;
                format!("{} >= {}", col, params.push(Value::Int(*bound)))
            }
            Filter::AtMost(col, bound) => {
                let col = checked::<T>(col)?;
                format!("{} <= {}", col, params.push(Value::Int(*bound)))
            }
            Filter::And(parts) => join::<T>(parts, " AND ", "1 = 1", params)?,
            Filter::Or(parts) => join::<T>(parts, " OR ", "1 = 0", params)?,
        })
    }

    /// Evaluate the predicate against an in-memory entity.
    pub fn matches<T: Entity>(&self, entity: &T) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(col, Value::Null) => entity.column_value(col) == Some(Value::Null),
            Filter::Eq(col, value) => entity.column_value(col).as_ref() == Some(value),
            Filter::Contains(col, text) => match entity.column_value(col) {
                Some(Value::Text(s)) => s
                    .to_ascii_lowercase()
                    .contains(&text.to_ascii_lowercase()),
                _ => false,
            },
            Filter::AtLeast(col, bound) => {
                matches!(entity.column_value(col), Some(Value::Int(v)) if v >= *bound)
            }
            Filter::AtMost(col, bound) => {
                matches!(entity.column_value(col), Some(Value::Int(v)) if v <= *bound)
            }
            Filter::And(parts) => parts.iter().all(|f| f.matches(entity)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(entity)),
        }
    }
}

fn checked<T: Entity>(column: &'static str) -> DbResult<&'static str> {
    if T::has_column(column) {
        Ok(column)
    } else {
        Err(DbError::Validation {
            field: Some(column.to_string()),
            message: format!("{} has no column '{}'", T::NAME, column),
        })
    }
}

fn join<T: Entity>(
    parts: &[Filter],
    sep: &str,
    empty: &str,
    params: &mut Params,
) -> DbResult<String> {
    if parts.is_empty() {
        return Ok(empty.to_string());
    }
    let rendered = parts
        .iter()
        .map(|p| p.to_sql::<T>(params).map(|s| format!("({s})")))
        .collect::<DbResult<Vec<_>>>()?;
    Ok(rendered.join(sep))
}

/// Lowercase `A`-`Z` in a SQL text expression and leave every other
/// character alone, identically on every backend and in [`Filter::matches`].
pub(super) fn fold_ascii_case(expr: &str) -> String {
    ('A'..='Z').fold(expr.to_string(), |folded, upper| {
        format!(
            "REPLACE({}, '{}', '{}')",
            folded,
            upper,
            upper.to_ascii_lowercase()
        )
    })
}

fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

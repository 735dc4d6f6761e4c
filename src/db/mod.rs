//! Database abstraction layer.
//!
//! This module provides trait-based abstractions for data access. One generic
//! repository serves every entity kind, and the same code runs on SQLite and
//! PostgreSQL through `sqlx::Any`.
//!
//! # Architecture
//!
//! - `error`: Storage-agnostic error types
//! - `entity`: The `Entity` trait every persisted type implements
//! - `filter`: Query predicates, rendered to SQL or evaluated in memory
//! - `models`: Domain entities (Race, Car, Driver)
//! - `context`: Connection pool and request-scoped `DataContext`
//! - `repository`: Generic `Repository<T>` contract and its SQL implementation

mod context;
mod entity;
mod error;
mod filter;
mod models;
mod repository;

#[cfg(test)]
mod models_test;

pub use context::{DataContext, Storage};
pub use entity::{Entity, Id, Params, Value};
pub use error::{DbError, DbResult};
pub use filter::Filter;
pub use models::*;
pub use repository::*;

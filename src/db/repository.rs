//! Repository contract and its single generic implementation.
//!
//! [`Repository<T>`] defines the data-access operations every entity kind
//! supports. [`SqlRepository`] implements it once for any `T: Entity` on top of
//! a [`DataContext`]; the per-resource traits ([`RaceRepository`],
//! [`CarRepository`], [`DriverRepository`]) only add queries expressed through
//! [`Repository::query`].

use std::future::Future;
use std::marker::PhantomData;

use async_stream::try_stream;
use futures_util::TryStreamExt;
use futures_util::stream::BoxStream;
use sqlx::any::AnyArguments;
use sqlx::query::Query;
use sqlx::{Any, Connection, Row};

use crate::db::context::DataContext;
use crate::db::entity::{Entity, Id, Params, Value};
use crate::db::filter::Filter;
use crate::db::models::{Car, Driver, Race};
use crate::db::{DbError, DbResult};

/// Lazy, single-pass sequence of query results.
pub type EntityStream<'a, T> = BoxStream<'a, DbResult<T>>;

/// Data access for one entity kind.
pub trait Repository<T: Entity>: Send + Sync {
    /// Every stored entity, ordered by id.
    fn get_all(&self) -> impl Future<Output = DbResult<Vec<T>>> + Send;

    /// The entity with the given id, or `None`.
    fn get_by_id(&self, id: Id) -> impl Future<Output = DbResult<Option<T>>> + Send;

    /// Persist a new entity and return it with its storage-assigned id.
    fn add(&self, entity: T) -> impl Future<Output = DbResult<T>> + Send;

    /// Overwrite an existing entity.
    fn update(&self, entity: T) -> impl Future<Output = DbResult<T>> + Send;

    /// Delete an entity by id.
    fn remove(&self, id: Id) -> impl Future<Output = DbResult<()>> + Send;

    /// Entities matching `filter`, ordered by id. Nothing runs until the
    /// stream is first polled.
    fn query(&self, filter: Filter) -> EntityStream<'_, T>;
}

// =============================================================================
// Generic SQL implementation
// =============================================================================

/// SQLx-backed repository, generic over the entity kind.
pub struct SqlRepository<'ctx, T> {
    ctx: &'ctx DataContext,
    _entity: PhantomData<fn() -> T>,
}

impl<'ctx, T: Entity> SqlRepository<'ctx, T> {
    pub fn new(ctx: &'ctx DataContext) -> Self {
        Self {
            ctx,
            _entity: PhantomData,
        }
    }
}

impl<T> Clone for SqlRepository<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SqlRepository<'_, T> {}

fn bind_all<'q>(
    mut query: Query<'q, Any, AnyArguments<'q>>,
    values: &'q [Value],
) -> Query<'q, Any, AnyArguments<'q>> {
    for value in values {
        query = match value {
            Value::Int(v) => query.bind(*v),
            Value::Text(v) => query.bind(v.as_str()),
            // Params renders NULL inline and never registers it.
            Value::Null => query,
        };
    }
    query
}

impl<T: Entity> Repository<T> for SqlRepository<'_, T> {
    async fn get_all(&self) -> DbResult<Vec<T>> {
        self.query(Filter::All).try_collect().await
    }

    async fn get_by_id(&self, id: Id) -> DbResult<Option<T>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            T::select_list(),
            T::TABLE
        );
        let mut conn = self.ctx.connection().await;
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&mut **conn)
            .await?;
        row.map(|r| T::from_row(&r)).transpose().map_err(DbError::from)
    }

    async fn add(&self, mut entity: T) -> DbResult<T> {
        entity.validate()?;

        let mut params = Params::new();
        let placeholders: Vec<String> = entity
            .values()
            .into_iter()
            .map(|v| params.push(v))
            .collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
            T::TABLE,
            T::COLUMNS.join(", "),
            placeholders.join(", ")
        );
        let values = params.into_values();

        let mut conn = self.ctx.connection().await;
        let mut tx = Connection::begin(&mut **conn).await?;
        let row = bind_all(sqlx::query(&sql), &values)
            .fetch_one(&mut *tx)
            .await?;
        let id: Id = row.try_get(0)?;
        tx.commit().await?;

        entity.set_id(id);
        Ok(entity)
    }

    async fn update(&self, entity: T) -> DbResult<T> {
        let id = entity.id().ok_or_else(|| DbError::NotFound {
            entity_type: T::NAME.to_string(),
            id: "<none>".to_string(),
        })?;
        entity.validate()?;

        let mut params = Params::new();
        let assignments: Vec<String> = T::COLUMNS
            .iter()
            .zip(entity.values())
            .map(|(col, v)| format!("{} = {}", col, params.push(v)))
            .collect();
        let id_placeholder = params.push(Value::Int(id));
        let sql = format!(
            "UPDATE {} SET {} WHERE id = {}",
            T::TABLE,
            assignments.join(", "),
            id_placeholder
        );
        let values = params.into_values();

        let mut conn = self.ctx.connection().await;
        let mut tx = Connection::begin(&mut **conn).await?;
        let result = bind_all(sqlx::query(&sql), &values)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            // Dropping the transaction rolls it back.
            return Err(DbError::not_found(T::NAME, id));
        }
        tx.commit().await?;

        Ok(entity)
    }

    async fn remove(&self, id: Id) -> DbResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = $1", T::TABLE);

        let mut conn = self.ctx.connection().await;
        let mut tx = Connection::begin(&mut **conn).await?;
        let result = sqlx::query(&sql).bind(id).execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found(T::NAME, id));
        }
        tx.commit().await?;

        Ok(())
    }

    fn query(&self, filter: Filter) -> EntityStream<'_, T> {
        let ctx = self.ctx;
        Box::pin(try_stream! {
            let mut params = Params::new();
            let condition = filter.to_sql::<T>(&mut params)?;
            let sql = format!(
                "SELECT {} FROM {} WHERE {} ORDER BY id",
                T::select_list(),
                T::TABLE,
                condition
            );
            let values = params.into_values();

            let mut conn = ctx.connection().await;
            let mut rows = bind_all(sqlx::query(&sql), &values).fetch(&mut **conn);
            while let Some(row) = rows.try_next().await? {
                yield T::from_row(&row)?;
            }
        })
    }
}

// =============================================================================
// Resource repositories
// =============================================================================

/// Race-specific queries.
pub trait RaceRepository: Repository<Race> {
    /// Races in a season, ordered by round.
    fn find_by_season(&self, season: i64) -> impl Future<Output = DbResult<Vec<Race>>> + Send;

    /// Races won by a driver.
    fn find_won_by(&self, driver_id: Id) -> impl Future<Output = DbResult<Vec<Race>>> + Send;
}

impl<R: Repository<Race>> RaceRepository for R {
    async fn find_by_season(&self, season: i64) -> DbResult<Vec<Race>> {
        let mut races: Vec<Race> = self.query(Filter::eq("season", season)).try_collect().await?;
        races.sort_by_key(|r| r.round);
        Ok(races)
    }

    async fn find_won_by(&self, driver_id: Id) -> DbResult<Vec<Race>> {
        self.query(Filter::eq("winner_id", driver_id))
            .try_collect()
            .await
    }
}

/// Car-specific queries.
pub trait CarRepository: Repository<Car> {
    fn find_by_season(&self, season: i64) -> impl Future<Output = DbResult<Vec<Car>>> + Send;

    fn find_by_team(&self, team: &str) -> impl Future<Output = DbResult<Vec<Car>>> + Send;
}

impl<R: Repository<Car>> CarRepository for R {
    async fn find_by_season(&self, season: i64) -> DbResult<Vec<Car>> {
        self.query(Filter::eq("season", season)).try_collect().await
    }

    async fn find_by_team(&self, team: &str) -> DbResult<Vec<Car>> {
        self.query(Filter::eq("team", team)).try_collect().await
    }
}

/// Driver-specific queries.
pub trait DriverRepository: Repository<Driver> {
    fn find_by_team(&self, team: &str) -> impl Future<Output = DbResult<Vec<Driver>>> + Send;

    /// Drivers assigned to a car.
    fn find_by_car(&self, car_id: Id) -> impl Future<Output = DbResult<Vec<Driver>>> + Send;
}

impl<R: Repository<Driver>> DriverRepository for R {
    async fn find_by_team(&self, team: &str) -> DbResult<Vec<Driver>> {
        self.query(Filter::eq("team", team)).try_collect().await
    }

    async fn find_by_car(&self, car_id: Id) -> DbResult<Vec<Driver>> {
        self.query(Filter::eq("car_id", car_id)).try_collect().await
    }
}

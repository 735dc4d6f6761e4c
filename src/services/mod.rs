//! Resource services.
//!
//! A service is built per request from the request's [`DataContext`] and holds
//! the repository handles it needs. Services own no state and contain no SQL:
//! cross-resource checks and aggregation live here, persistence lives in
//! [`crate::db::repository`]. Repository errors pass through unchanged.
//!
//! [`DataContext`]: crate::db::DataContext

mod cars;
mod drivers;
mod races;


pub use cars::{CarFilter, CarsService};
pub use drivers::{DriverFilter, DriversService};
pub use races::{RaceFilter, RacesService};

use crate::db::{DbError, DbResult, Driver, Entity, Filter, Id, Race, RaceRepository, Repository};
use crate::serde_utils::{EntityGraph, NodeId};

/// Build a filter from optional criteria, matching everything when none are set.
fn combine(parts: impl IntoIterator<Item = Option<Filter>>) -> Filter {
    parts.into_iter().flatten().fold(Filter::All, Filter::and)
}

/// Fail with `NotFound` unless the repository holds `id`.
async fn require<T: Entity>(repo: &impl Repository<T>, id: Id) -> DbResult<T> {
    repo.get_by_id(id)
        .await?
        .ok_or_else(|| DbError::not_found(T::NAME, id))
}

/// Fail with a field-level `Validation` error when a reference points nowhere.
async fn require_reference<T: Entity>(
    repo: &impl Repository<T>,
    field: &str,
    id: Option<Id>,
) -> DbResult<()> {
    let Some(id) = id else {
        return Ok(());
    };
    if repo.get_by_id(id).await?.is_none() {
        return Err(DbError::invalid_field(
            field,
            format!("{} references unknown {} {}", field, T::NAME, id),
        ));
    }
    Ok(())
}

/// Add a driver's won races to the graph, each pointing back at the winner.
async fn link_wins(
    races: &impl Repository<Race>,
    graph: &mut EntityGraph,
    driver: NodeId,
    driver_id: Id,
) -> DbResult<()> {
    graph.declare_many(driver, "wins");
    for race in races.find_won_by(driver_id).await? {
        let node = graph.insert(&race);
        graph.link_many(driver, "wins", node);
        graph.link_one(node, "winner", driver);
    }
    Ok(())
}

/// Add a driver to the graph with its car link resolved against `car`.
fn link_driver(graph: &mut EntityGraph, driver: &Driver, car: NodeId) -> NodeId {
    let node = graph.insert(driver);
    graph.link_one(node, "car", car);
    graph.link_many(car, "drivers", node);
    node
}

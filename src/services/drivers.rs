use futures_util::TryStreamExt;

use crate::db::{
    Car, DataContext, DbResult, Driver, DriverRepository, DriverRole, Filter, Id, Race,
    RaceRepository, Repository, SqlRepository,
};
use crate::serde_utils::EntityGraph;

use super::{combine, link_driver, link_wins, require, require_reference};

/// Criteria for listing drivers. Unset fields do not restrict the result.
#[derive(Debug, Clone, Default)]
pub struct DriverFilter {
    pub team: Option<String>,
    /// Case-insensitive substring of the driver's name.
    pub name: Option<String>,
    pub role: Option<DriverRole>,
    pub car_id: Option<Id>,
}

impl DriverFilter {
    fn into_filter(self) -> Filter {
        combine([
            self.team.map(|t| Filter::eq("team", t)),
            self.name.map(|n| Filter::contains("name", n)),
            self.role.map(|r| Filter::eq("role", r.to_string())),
            self.car_id.map(|c| Filter::eq("car_id", c)),
        ])
    }
}

pub struct DriversService<'ctx> {
    drivers: SqlRepository<'ctx, Driver>,
    cars: SqlRepository<'ctx, Car>,
    races: SqlRepository<'ctx, Race>,
}

impl<'ctx> DriversService<'ctx> {
    pub fn new(ctx: &'ctx DataContext) -> Self {
        Self {
            drivers: ctx.set(),
            cars: ctx.set(),
            races: ctx.set(),
        }
    }

    pub async fn list(&self, filter: DriverFilter) -> DbResult<Vec<Driver>> {
        self.drivers.query(filter.into_filter()).try_collect().await
    }

    pub async fn get(&self, id: Id) -> DbResult<Driver> {
        require(&self.drivers, id).await
    }

    pub async fn create(&self, driver: Driver) -> DbResult<Driver> {
        require_reference(&self.cars, "car_id", driver.car_id).await?;
        self.drivers.add(driver).await
    }

    pub async fn update(&self, id: Id, mut driver: Driver) -> DbResult<Driver> {
        driver.id = Some(id);
        require_reference(&self.cars, "car_id", driver.car_id).await?;
        self.drivers.update(driver).await
    }

    /// Delete a driver. Races they won keep their result but lose the winner.
    pub async fn delete(&self, id: Id) -> DbResult<()> {
        self.drivers.remove(id).await
    }

    /// Races won by a driver.
    pub async fn wins(&self, id: Id) -> DbResult<Vec<Race>> {
        require(&self.drivers, id).await?;
        self.races.find_won_by(id).await
    }

    /// The driver, their car with its other drivers, and their wins, as one
    /// reference-preserving graph. The driver is the root.
    pub async fn graph(&self, id: Id) -> DbResult<EntityGraph> {
        let driver = require(&self.drivers, id).await?;

        let mut graph = EntityGraph::new();
        let root = graph.insert(&driver);
        if let Some(car_id) = driver.car_id {
            let car = require(&self.cars, car_id).await?;
            let car_node = graph.insert(&car);
            graph.declare_many(car_node, "drivers");
            for seated in self.drivers.find_by_car(car_id).await? {
                link_driver(&mut graph, &seated, car_node);
            }
        }
        link_wins(&self.races, &mut graph, root, id).await?;
        Ok(graph)
    }
}

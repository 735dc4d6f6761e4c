use futures_util::TryStreamExt;

use crate::db::{
    Car, DataContext, DbResult, Driver, DriverRepository, Filter, Id, Race, Repository,
    SqlRepository,
};
use crate::serde_utils::EntityGraph;

use super::{combine, link_driver, link_wins, require};

/// Criteria for listing cars. Unset fields do not restrict the result.
#[derive(Debug, Clone, Default)]
pub struct CarFilter {
    pub season: Option<i64>,
    pub team: Option<String>,
    /// Case-insensitive substring of the chassis name.
    pub name: Option<String>,
}

impl CarFilter {
    fn into_filter(self) -> Filter {
        combine([
            self.season.map(|s| Filter::eq("season", s)),
            self.team.map(|t| Filter::eq("team", t)),
            self.name.map(|n| Filter::contains("name", n)),
        ])
    }
}

pub struct CarsService<'ctx> {
    cars: SqlRepository<'ctx, Car>,
    drivers: SqlRepository<'ctx, Driver>,
    races: SqlRepository<'ctx, Race>,
}

impl<'ctx> CarsService<'ctx> {
    pub fn new(ctx: &'ctx DataContext) -> Self {
        Self {
            cars: ctx.set(),
            drivers: ctx.set(),
            races: ctx.set(),
        }
    }

    pub async fn list(&self, filter: CarFilter) -> DbResult<Vec<Car>> {
        self.cars.query(filter.into_filter()).try_collect().await
    }

    pub async fn get(&self, id: Id) -> DbResult<Car> {
        require(&self.cars, id).await
    }

    pub async fn create(&self, car: Car) -> DbResult<Car> {
        self.cars.add(car).await
    }

    pub async fn update(&self, id: Id, mut car: Car) -> DbResult<Car> {
        car.id = Some(id);
        self.cars.update(car).await
    }

    /// Delete a car. Drivers assigned to it lose their assignment.
    pub async fn delete(&self, id: Id) -> DbResult<()> {
        self.cars.remove(id).await
    }

    /// Drivers assigned to a car.
    pub async fn drivers(&self, id: Id) -> DbResult<Vec<Driver>> {
        require(&self.cars, id).await?;
        self.drivers.find_by_car(id).await
    }

    /// The car, its drivers and their wins, as one reference-preserving graph.
    pub async fn graph(&self, id: Id) -> DbResult<EntityGraph> {
        let car = require(&self.cars, id).await?;

        let mut graph = EntityGraph::new();
        let root = graph.insert(&car);
        graph.declare_many(root, "drivers");
        for driver in self.drivers.find_by_car(id).await? {
            let node = link_driver(&mut graph, &driver, root);
            if let Some(driver_id) = driver.id {
                link_wins(&self.races, &mut graph, node, driver_id).await?;
            }
        }
        Ok(graph)
    }
}

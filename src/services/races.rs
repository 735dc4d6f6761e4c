use futures_util::TryStreamExt;

use crate::db::{
    DataContext, DbResult, Driver, Filter, Id, Race, RaceRepository, Repository, SqlRepository,
};

use super::{combine, require, require_reference};

/// Criteria for listing races. Unset fields do not restrict the result.
#[derive(Debug, Clone, Default)]
pub struct RaceFilter {
    pub season: Option<i64>,
    pub country: Option<String>,
    /// Case-insensitive substring of the race name.
    pub name: Option<String>,
    pub winner_id: Option<Id>,
}

impl RaceFilter {
    fn into_filter(self) -> Filter {
        combine([
            self.season.map(|s| Filter::eq("season", s)),
            self.country.map(|c| Filter::eq("country", c)),
            self.name.map(|n| Filter::contains("name", n)),
            self.winner_id.map(|w| Filter::eq("winner_id", w)),
        ])
    }
}

pub struct RacesService<'ctx> {
    races: SqlRepository<'ctx, Race>,
    drivers: SqlRepository<'ctx, Driver>,
}

impl<'ctx> RacesService<'ctx> {
    pub fn new(ctx: &'ctx DataContext) -> Self {
        Self {
            races: ctx.set(),
            drivers: ctx.set(),
        }
    }

    pub async fn list(&self, filter: RaceFilter) -> DbResult<Vec<Race>> {
        self.races.query(filter.into_filter()).try_collect().await
    }

    /// Calendar for one season, in round order.
    pub async fn season(&self, season: i64) -> DbResult<Vec<Race>> {
        self.races.find_by_season(season).await
    }

    pub async fn get(&self, id: Id) -> DbResult<Race> {
        require(&self.races, id).await
    }

    pub async fn create(&self, race: Race) -> DbResult<Race> {
        require_reference(&self.drivers, "winner_id", race.winner_id).await?;
        self.races.add(race).await
    }

    pub async fn update(&self, id: Id, mut race: Race) -> DbResult<Race> {
        race.id = Some(id);
        require_reference(&self.drivers, "winner_id", race.winner_id).await?;
        self.races.update(race).await
    }

    pub async fn delete(&self, id: Id) -> DbResult<()> {
        self.races.remove(id).await
    }
}

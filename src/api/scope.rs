//! Request-scoped services.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use super::error::ApiError;
use super::state::AppState;
use crate::db::DataContext;
use crate::services::{CarsService, DriversService, RacesService};

/// Everything a controller needs for one request.
///
/// Extracting it opens a [`DataContext`]; dropping it at the end of the
/// request returns the connection to the pool. Services are built on demand
/// and borrow the context.
pub struct RequestScope {
    ctx: DataContext,
}

impl RequestScope {
    pub fn races(&self) -> RacesService<'_> {
        RacesService::new(&self.ctx)
    }

    pub fn cars(&self) -> CarsService<'_> {
        CarsService::new(&self.ctx)
    }

    pub fn drivers(&self) -> DriversService<'_> {
        DriversService::new(&self.ctx)
    }
}

impl FromRequestParts<AppState> for RequestScope {
    type Rejection = ApiError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ctx = state.storage().context().await?;
        Ok(Self { ctx })
    }
}

//! Race (grand prix) handlers.

use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use crate::api::error::{ApiError, ErrorResponse};
use crate::api::extract::{Filters, Payload, ResourceId};
use crate::api::scope::RequestScope;
use crate::db::{Id, Race};
use crate::services::RaceFilter;

// =============================================================================
// DTOs (Data Transfer Objects)
// =============================================================================

/// Race response DTO
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RaceResponse {
    #[schema(example = 1)]
    pub id: Id,
    #[schema(example = "Italian Grand Prix")]
    pub name: String,
    #[schema(example = "Monza")]
    pub circuit: String,
    #[schema(example = "Italy")]
    pub country: String,
    #[schema(example = 2021)]
    pub season: i64,
    #[schema(example = 14)]
    pub round: i64,
    /// Race day (YYYY-MM-DD)
    #[schema(example = "2021-09-12")]
    pub date: Option<String>,
    /// Winning driver
    pub winner_id: Option<Id>,
}

impl From<Race> for RaceResponse {
    fn from(r: Race) -> Self {
        Self {
            id: r.id.unwrap_or_default(),
            name: r.name,
            circuit: r.circuit,
            country: r.country,
            season: r.season,
            round: r.round,
            date: r.date,
            winner_id: r.winner_id,
        }
    }
}

/// Create or replace race request DTO
#[derive(Debug, Deserialize, ToSchema)]
pub struct RaceRequest {
    #[schema(example = "Italian Grand Prix")]
    pub name: String,
    #[schema(example = "Monza")]
    pub circuit: String,
    #[schema(example = "Italy")]
    pub country: String,
    #[schema(example = 2021)]
    pub season: i64,
    #[schema(example = 14)]
    pub round: i64,
    #[schema(example = "2021-09-12")]
    pub date: Option<String>,
    pub winner_id: Option<Id>,
}

impl From<RaceRequest> for Race {
    fn from(r: RaceRequest) -> Self {
        Race {
            id: None,
            name: r.name,
            circuit: r.circuit,
            country: r.country,
            season: r.season,
            round: r.round,
            date: r.date,
            winner_id: r.winner_id,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListRacesQuery {
    /// Championship season
    #[param(example = 2021)]
    pub season: Option<i64>,
    /// Exact country name
    #[param(example = "Italy")]
    pub country: Option<String>,
    /// Case-insensitive substring of the race name
    #[param(example = "italian")]
    pub name: Option<String>,
    /// Winning driver
    pub winner_id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RaceList {
    pub items: Vec<RaceResponse>,
    pub total: usize,
}

// =============================================================================
// Handlers
// =============================================================================

/// List races
///
/// With only `season` given, races come back in round order (the season
/// calendar). Otherwise they are ordered by id.
#[utoipa::path(
    get,
    path = "/api/v0.9/races",
    tag = "races",
    params(ListRacesQuery),
    responses(
        (status = 200, description = "List of races", body = RaceList),
        (status = 400, description = "Invalid query", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn list_races(
    scope: RequestScope,
    Filters(query): Filters<ListRacesQuery>,
) -> Result<Json<RaceList>, ApiError> {
    let races = match query {
        ListRacesQuery {
            season: Some(season),
            country: None,
            name: None,
            winner_id: None,
        } => scope.races().season(season).await?,
        q => {
            scope
                .races()
                .list(RaceFilter {
                    season: q.season,
                    country: q.country,
                    name: q.name,
                    winner_id: q.winner_id,
                })
                .await?
        }
    };
    let items: Vec<RaceResponse> = races.into_iter().map(RaceResponse::from).collect();
    Ok(Json(RaceList {
        total: items.len(),
        items,
    }))
}

/// Get a race by ID
#[utoipa::path(
    get,
    path = "/api/v0.9/races/{id}",
    tag = "races",
    params(("id" = i64, Path, description = "Race ID")),
    responses(
        (status = 200, description = "Race found", body = RaceResponse),
        (status = 404, description = "Race not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn get_race(
    scope: RequestScope,
    ResourceId(id): ResourceId,
) -> Result<Json<RaceResponse>, ApiError> {
    let race = scope.races().get(id).await?;
    Ok(Json(race.into()))
}

/// Create a new race
#[utoipa::path(
    post,
    path = "/api/v0.9/races",
    tag = "races",
    request_body = RaceRequest,
    responses(
        (status = 201, description = "Race created", body = RaceResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn create_race(
    scope: RequestScope,
    Payload(req): Payload<RaceRequest>,
) -> Result<(StatusCode, Json<RaceResponse>), ApiError> {
    let race = scope.races().create(req.into()).await?;
    Ok((StatusCode::CREATED, Json(race.into())))
}

/// Replace a race
#[utoipa::path(
    put,
    path = "/api/v0.9/races/{id}",
    tag = "races",
    params(("id" = i64, Path, description = "Race ID")),
    request_body = RaceRequest,
    responses(
        (status = 200, description = "Race updated", body = RaceResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Race not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn update_race(
    scope: RequestScope,
    ResourceId(id): ResourceId,
    Payload(req): Payload<RaceRequest>,
) -> Result<Json<RaceResponse>, ApiError> {
    let race = scope.races().update(id, req.into()).await?;
    Ok(Json(race.into()))
}

/// Delete a race
#[utoipa::path(
    delete,
    path = "/api/v0.9/races/{id}",
    tag = "races",
    params(("id" = i64, Path, description = "Race ID")),
    responses(
        (status = 204, description = "Race deleted"),
        (status = 404, description = "Race not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn delete_race(
    scope: RequestScope,
    ResourceId(id): ResourceId,
) -> Result<StatusCode, ApiError> {
    scope.races().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Driver management handlers.

use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use crate::api::error::{ApiError, ErrorResponse};
use crate::api::extract::{Filters, Payload, ResourceId};
use crate::api::scope::RequestScope;
use crate::db::{Driver, DriverRole, Id};
use crate::serde_utils::EntityGraph;
use crate::services::DriverFilter;

use super::RaceResponse;

// =============================================================================
// DTOs (Data Transfer Objects)
// =============================================================================

/// Driver response DTO
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DriverResponse {
    #[schema(example = 4)]
    pub id: Id,
    #[schema(example = "Lando Norris")]
    pub name: String,
    #[schema(example = "British")]
    pub nationality: Option<String>,
    #[schema(example = "McLaren")]
    pub team: String,
    /// Permanent race number
    #[schema(example = 4)]
    pub number: Option<i64>,
    /// Seat within the team (race, reserve, test)
    #[schema(value_type = String, example = "race")]
    pub role: DriverRole,
    /// Assigned car
    pub car_id: Option<Id>,
}

impl From<Driver> for DriverResponse {
    fn from(d: Driver) -> Self {
        Self {
            id: d.id.unwrap_or_default(),
            name: d.name,
            nationality: d.nationality,
            team: d.team,
            number: d.number,
            role: d.role,
            car_id: d.car_id,
        }
    }
}

/// Create or replace driver request DTO
#[derive(Debug, Deserialize, ToSchema)]
pub struct DriverRequest {
    #[schema(example = "Lando Norris")]
    pub name: String,
    #[schema(example = "British")]
    pub nationality: Option<String>,
    #[schema(example = "McLaren")]
    pub team: String,
    #[schema(example = 4)]
    pub number: Option<i64>,
    /// Defaults to `race`
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "race")]
    pub role: DriverRole,
    pub car_id: Option<Id>,
}

impl From<DriverRequest> for Driver {
    fn from(r: DriverRequest) -> Self {
        Driver {
            id: None,
            name: r.name,
            nationality: r.nationality,
            team: r.team,
            number: r.number,
            role: r.role,
            car_id: r.car_id,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListDriversQuery {
    /// Exact team name
    #[param(example = "McLaren")]
    pub team: Option<String>,
    /// Case-insensitive substring of the driver's name
    #[param(example = "norris")]
    pub name: Option<String>,
    /// Seat within the team (race, reserve, test)
    #[param(value_type = Option<String>, example = "race")]
    pub role: Option<DriverRole>,
    /// Assigned car
    pub car_id: Option<Id>,
}

impl From<ListDriversQuery> for DriverFilter {
    fn from(q: ListDriversQuery) -> Self {
        DriverFilter {
            team: q.team,
            name: q.name,
            role: q.role,
            car_id: q.car_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DriverList {
    pub items: Vec<DriverResponse>,
    pub total: usize,
}

// =============================================================================
// Handlers
// =============================================================================

/// List drivers
///
/// Returns every driver matching the optional filters, ordered by id
#[utoipa::path(
    get,
    path = "/api/v0.9/drivers",
    tag = "drivers",
    params(ListDriversQuery),
    responses(
        (status = 200, description = "List of drivers", body = DriverList),
        (status = 400, description = "Invalid query", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn list_drivers(
    scope: RequestScope,
    Filters(query): Filters<ListDriversQuery>,
) -> Result<Json<DriverList>, ApiError> {
    let drivers = scope.drivers().list(query.into()).await?;
    let items: Vec<DriverResponse> = drivers.into_iter().map(DriverResponse::from).collect();
    Ok(Json(DriverList {
        total: items.len(),
        items,
    }))
}

/// Get a driver by ID
#[utoipa::path(
    get,
    path = "/api/v0.9/drivers/{id}",
    tag = "drivers",
    params(("id" = i64, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Driver found", body = DriverResponse),
        (status = 404, description = "Driver not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn get_driver(
    scope: RequestScope,
    ResourceId(id): ResourceId,
) -> Result<Json<DriverResponse>, ApiError> {
    let driver = scope.drivers().get(id).await?;
    Ok(Json(driver.into()))
}

/// Create a new driver
///
/// The id is assigned by storage. `car_id`, when given, must reference an
/// existing car.
#[utoipa::path(
    post,
    path = "/api/v0.9/drivers",
    tag = "drivers",
    request_body = DriverRequest,
    responses(
        (status = 201, description = "Driver created", body = DriverResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn create_driver(
    scope: RequestScope,
    Payload(req): Payload<DriverRequest>,
) -> Result<(StatusCode, Json<DriverResponse>), ApiError> {
    let driver = scope.drivers().create(req.into()).await?;
    Ok((StatusCode::CREATED, Json(driver.into())))
}

/// Replace a driver
#[utoipa::path(
    put,
    path = "/api/v0.9/drivers/{id}",
    tag = "drivers",
    params(("id" = i64, Path, description = "Driver ID")),
    request_body = DriverRequest,
    responses(
        (status = 200, description = "Driver updated", body = DriverResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Driver not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn update_driver(
    scope: RequestScope,
    ResourceId(id): ResourceId,
    Payload(req): Payload<DriverRequest>,
) -> Result<Json<DriverResponse>, ApiError> {
    let driver = scope.drivers().update(id, req.into()).await?;
    Ok(Json(driver.into()))
}

/// Delete a driver
#[utoipa::path(
    delete,
    path = "/api/v0.9/drivers/{id}",
    tag = "drivers",
    params(("id" = i64, Path, description = "Driver ID")),
    responses(
        (status = 204, description = "Driver deleted"),
        (status = 404, description = "Driver not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn delete_driver(
    scope: RequestScope,
    ResourceId(id): ResourceId,
) -> Result<StatusCode, ApiError> {
    scope.drivers().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Races won by a driver
#[utoipa::path(
    get,
    path = "/api/v0.9/drivers/{id}/wins",
    tag = "drivers",
    params(("id" = i64, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Races won", body = Vec<RaceResponse>),
        (status = 404, description = "Driver not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn list_driver_wins(
    scope: RequestScope,
    ResourceId(id): ResourceId,
) -> Result<Json<Vec<RaceResponse>>, ApiError> {
    let races = scope.drivers().wins(id).await?;
    Ok(Json(races.into_iter().map(RaceResponse::from).collect()))
}

/// Driver object graph
///
/// The driver, their car with everyone seated in it, and the races they won.
/// Repeated objects are written once with `$id` and referenced afterwards
/// with `{"$ref": ...}`.
#[utoipa::path(
    get,
    path = "/api/v0.9/drivers/{id}/graph",
    tag = "drivers",
    params(("id" = i64, Path, description = "Driver ID")),
    responses(
        (status = 200, description = "Reference-preserving driver graph"),
        (status = 404, description = "Driver not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn driver_graph(
    scope: RequestScope,
    ResourceId(id): ResourceId,
) -> Result<Json<EntityGraph>, ApiError> {
    Ok(Json(scope.drivers().graph(id).await?))
}

//! Car management handlers.

use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use utoipa::{IntoParams, ToSchema};

use crate::api::error::{ApiError, ErrorResponse};
use crate::api::extract::{Filters, Payload, ResourceId};
use crate::api::scope::RequestScope;
use crate::db::{Car, Id};
use crate::serde_utils::EntityGraph;
use crate::services::CarFilter;

use super::DriverResponse;

// =============================================================================
// DTOs (Data Transfer Objects)
// =============================================================================

/// Car response DTO
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CarResponse {
    #[schema(example = 1)]
    pub id: Id,
    /// Chassis name
    #[schema(example = "MCL35M")]
    pub name: String,
    #[schema(example = 2021)]
    pub season: i64,
    #[schema(example = "Mercedes M12 E Performance")]
    pub engine: String,
    #[schema(example = "McLaren")]
    pub team: String,
}

impl From<Car> for CarResponse {
    fn from(c: Car) -> Self {
        Self {
            id: c.id.unwrap_or_default(),
            name: c.name,
            season: c.season,
            engine: c.engine,
            team: c.team,
        }
    }
}

/// Create or replace car request DTO
#[derive(Debug, Deserialize, ToSchema)]
pub struct CarRequest {
    #[schema(example = "MCL35M")]
    pub name: String,
    #[schema(example = 2021)]
    pub season: i64,
    #[schema(example = "Mercedes M12 E Performance")]
    pub engine: String,
    #[schema(example = "McLaren")]
    pub team: String,
}

impl From<CarRequest> for Car {
    fn from(r: CarRequest) -> Self {
        Car {
            id: None,
            name: r.name,
            season: r.season,
            engine: r.engine,
            team: r.team,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListCarsQuery {
    /// Championship season
    #[param(example = 2021)]
    pub season: Option<i64>,
    /// Exact team name
    #[param(example = "McLaren")]
    pub team: Option<String>,
    /// Case-insensitive substring of the chassis name
    #[param(example = "mcl")]
    pub name: Option<String>,
}

impl From<ListCarsQuery> for CarFilter {
    fn from(q: ListCarsQuery) -> Self {
        CarFilter {
            season: q.season,
            team: q.team,
            name: q.name,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CarList {
    pub items: Vec<CarResponse>,
    pub total: usize,
}

// =============================================================================
// Handlers
// =============================================================================

/// List cars
#[utoipa::path(
    get,
    path = "/api/v0.9/cars",
    tag = "cars",
    params(ListCarsQuery),
    responses(
        (status = 200, description = "List of cars", body = CarList),
        (status = 400, description = "Invalid query", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn list_cars(
    scope: RequestScope,
    Filters(query): Filters<ListCarsQuery>,
) -> Result<Json<CarList>, ApiError> {
    let cars = scope.cars().list(query.into()).await?;
    let items: Vec<CarResponse> = cars.into_iter().map(CarResponse::from).collect();
    Ok(Json(CarList {
        total: items.len(),
        items,
    }))
}

/// Get a car by ID
#[utoipa::path(
    get,
    path = "/api/v0.9/cars/{id}",
    tag = "cars",
    params(("id" = i64, Path, description = "Car ID")),
    responses(
        (status = 200, description = "Car found", body = CarResponse),
        (status = 404, description = "Car not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn get_car(
    scope: RequestScope,
    ResourceId(id): ResourceId,
) -> Result<Json<CarResponse>, ApiError> {
    let car = scope.cars().get(id).await?;
    Ok(Json(car.into()))
}

/// Create a new car
#[utoipa::path(
    post,
    path = "/api/v0.9/cars",
    tag = "cars",
    request_body = CarRequest,
    responses(
        (status = 201, description = "Car created", body = CarResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn create_car(
    scope: RequestScope,
    Payload(req): Payload<CarRequest>,
) -> Result<(StatusCode, Json<CarResponse>), ApiError> {
    let car = scope.cars().create(req.into()).await?;
    Ok((StatusCode::CREATED, Json(car.into())))
}

/// Replace a car
#[utoipa::path(
    put,
    path = "/api/v0.9/cars/{id}",
    tag = "cars",
    params(("id" = i64, Path, description = "Car ID")),
    request_body = CarRequest,
    responses(
        (status = 200, description = "Car updated", body = CarResponse),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Car not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn update_car(
    scope: RequestScope,
    ResourceId(id): ResourceId,
    Payload(req): Payload<CarRequest>,
) -> Result<Json<CarResponse>, ApiError> {
    let car = scope.cars().update(id, req.into()).await?;
    Ok(Json(car.into()))
}

/// Delete a car
///
/// Drivers assigned to the car are left without one.
#[utoipa::path(
    delete,
    path = "/api/v0.9/cars/{id}",
    tag = "cars",
    params(("id" = i64, Path, description = "Car ID")),
    responses(
        (status = 204, description = "Car deleted"),
        (status = 404, description = "Car not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn delete_car(
    scope: RequestScope,
    ResourceId(id): ResourceId,
) -> Result<StatusCode, ApiError> {
    scope.cars().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Drivers assigned to a car
#[utoipa::path(
    get,
    path = "/api/v0.9/cars/{id}/drivers",
    tag = "cars",
    params(("id" = i64, Path, description = "Car ID")),
    responses(
        (status = 200, description = "Assigned drivers", body = Vec<DriverResponse>),
        (status = 404, description = "Car not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn list_car_drivers(
    scope: RequestScope,
    ResourceId(id): ResourceId,
) -> Result<Json<Vec<DriverResponse>>, ApiError> {
    let drivers = scope.cars().drivers(id).await?;
    Ok(Json(drivers.into_iter().map(DriverResponse::from).collect()))
}

/// Car object graph
///
/// The car, its drivers (each pointing back at the car) and their wins.
#[utoipa::path(
    get,
    path = "/api/v0.9/cars/{id}/graph",
    tag = "cars",
    params(("id" = i64, Path, description = "Car ID")),
    responses(
        (status = 200, description = "Reference-preserving car graph"),
        (status = 404, description = "Car not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[instrument(skip(scope))]
pub async fn car_graph(
    scope: RequestScope,
    ResourceId(id): ResourceId,
) -> Result<Json<EntityGraph>, ApiError> {
    Ok(Json(scope.cars().graph(id).await?))
}

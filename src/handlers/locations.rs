use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    services::locations::{CreateLocation, UpdateLocation},
    ApiResponse, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateLocationRequest {
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 1, max = 10))]
    pub zone: String,
    #[validate(length(min = 1, max = 10))]
    pub aisle: String,
    #[validate(length(min = 1, max = 10))]
    pub rack: String,
    #[validate(length(min = 1, max = 10))]
    pub shelf: String,
    #[validate(range(min = 1))]
    pub capacity: i32,
    /// Optional temperature requirement in degrees Celsius
    pub temperature: Option<f64>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateLocationRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 10))]
    pub zone: Option<String>,
    #[validate(length(min = 1, max = 10))]
    pub aisle: Option<String>,
    #[validate(length(min = 1, max = 10))]
    pub rack: Option<String>,
    #[validate(length(min = 1, max = 10))]
    pub shelf: Option<String>,
    #[validate(range(min = 1))]
    pub capacity: Option<i32>,
    pub temperature: Option<f64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListLocationsQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Restrict to one warehouse zone
    pub zone: Option<String>,
    pub is_active: Option<bool>,
}

/// Derived occupancy of a location, replayed from the movement ledger
#[derive(Debug, Serialize, ToSchema)]
pub struct LocationOccupancy {
    pub location_id: Uuid,
    /// Signed sum of all movements for this location (+IN / -OUT)
    pub occupancy: i64,
    pub capacity: i32,
}

/// Create a new storage location
#[utoipa::path(
    post,
    path = "/api/v1/locations",
    request_body = CreateLocationRequest,
    responses(
        (status = 201, description = "Location created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Code already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn create_location(
    State(state): State<AppState>,
    Json(request): Json<CreateLocationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;

    let location = state
        .services
        .locations
        .create_location(CreateLocation {
            code: request.code,
            name: request.name,
            zone: request.zone,
            aisle: request.aisle,
            rack: request.rack,
            shelf: request.shelf,
            capacity: request.capacity,
            temperature: request.temperature,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(location))))
}

/// List locations with pagination, optionally restricted to one zone
#[utoipa::path(
    get,
    path = "/api/v1/locations",
    params(ListLocationsQuery),
    responses(
        (status = 200, description = "Location list returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn list_locations(
    State(state): State<AppState>,
    Query(query): Query<ListLocationsQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(u64::from(state.config.api_default_page_size))
        .clamp(1, u64::from(state.config.api_max_page_size));

    let (locations, total) = state
        .services
        .locations
        .list_locations(page, limit, query.zone, query.is_active)
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        locations, total, page, limit,
    ))))
}

/// Get a location by ID
#[utoipa::path(
    get,
    path = "/api/v1/locations/{id}",
    params(("id" = Uuid, Path, description = "Location ID")),
    responses(
        (status = 200, description = "Location returned"),
        (status = 404, description = "Location not found", body = crate::errors::ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let location = state
        .services
        .locations
        .get_location(&id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Location with ID {} not found", id)))?;

    Ok(Json(ApiResponse::success(location)))
}

/// Get a location by its code
#[utoipa::path(
    get,
    path = "/api/v1/locations/code/{code}",
    params(("code" = String, Path, description = "Location code")),
    responses(
        (status = 200, description = "Location returned"),
        (status = 404, description = "Location not found", body = crate::errors::ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn get_location_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let location = state
        .services
        .locations
        .get_location_by_code(&code)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Location with code '{}' not found", code))
        })?;

    Ok(Json(ApiResponse::success(location)))
}

/// Current derived occupancy of a location
#[utoipa::path(
    get,
    path = "/api/v1/locations/{id}/occupancy",
    params(("id" = Uuid, Path, description = "Location ID")),
    responses(
        (status = 200, description = "Occupancy returned"),
        (status = 404, description = "Location not found", body = crate::errors::ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn get_location_occupancy(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let location = state
        .services
        .locations
        .get_location(&id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Location with ID {} not found", id)))?;

    let occupancy = state.services.stock_movements.location_occupancy(id).await?;

    Ok(Json(ApiResponse::success(LocationOccupancy {
        location_id: id,
        occupancy,
        capacity: location.capacity,
    })))
}

/// Update a location
#[utoipa::path(
    put,
    path = "/api/v1/locations/{id}",
    params(("id" = Uuid, Path, description = "Location ID")),
    request_body = UpdateLocationRequest,
    responses(
        (status = 200, description = "Location updated"),
        (status = 404, description = "Location not found", body = crate::errors::ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateLocationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;

    let location = state
        .services
        .locations
        .update_location(
            id,
            UpdateLocation {
                name: request.name,
                zone: request.zone,
                aisle: request.aisle,
                rack: request.rack,
                shelf: request.shelf,
                capacity: request.capacity,
                temperature: request.temperature,
                is_active: request.is_active,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(location)))
}

/// Deactivate a location
#[utoipa::path(
    delete,
    path = "/api/v1/locations/{id}",
    params(("id" = Uuid, Path, description = "Location ID")),
    responses(
        (status = 200, description = "Location deactivated"),
        (status = 404, description = "Location not found", body = crate::errors::ErrorResponse)
    ),
    tag = "locations"
)]
pub async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.locations.delete_location(id).await?;

    Ok(Json(ApiResponse::<()>::message(
        "Location deactivated".to_string(),
    )))
}

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::AuthUser,
    entities::stock_movement::MovementType,
    errors::ServiceError,
    services::stock_movements::{NewStockMovement, StockMovementFilter},
    ApiResponse, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateStockMovementRequest {
    pub product_id: Uuid,
    pub location_id: Uuid,
    /// "IN" or "OUT"
    pub r#type: MovementType,
    /// Always positive; the type carries the direction
    #[validate(range(min = 1))]
    pub quantity: i32,
    /// Reference number (PO, SO, etc.)
    #[validate(length(max = 100))]
    pub reference: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListMovementsQuery {
    pub product_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    /// "IN" or "OUT"
    pub r#type: Option<String>,
    /// Inclusive lower bound (RFC 3339)
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound (RFC 3339)
    pub date_to: Option<DateTime<Utc>>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PageQuery {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Record a stock movement (receipt or shipment) for the authenticated user.
///
/// Admissibility is decided atomically against the current ledger: an OUT
/// must not exceed the product's on-hand quantity and an IN must not push the
/// location's derived occupancy past its capacity.
#[utoipa::path(
    post,
    path = "/api/v1/stock-movements",
    request_body = CreateStockMovementRequest,
    responses(
        (status = 201, description = "Movement recorded"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent update conflict", body = crate::errors::ErrorResponse),
        (status = 422, description = "Movement rejected", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-movements"
)]
pub async fn create_stock_movement(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(request): Json<CreateStockMovementRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;

    let record = state
        .services
        .stock_movements
        .process_movement(
            NewStockMovement {
                product_id: request.product_id,
                location_id: request.location_id,
                movement_type: request.r#type,
                quantity: request.quantity,
                reference: request.reference,
                notes: request.notes,
            },
            auth_user.user_id,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(record))))
}

/// List stock movements, most recent first
#[utoipa::path(
    get,
    path = "/api/v1/stock-movements",
    params(ListMovementsQuery),
    responses(
        (status = 200, description = "Movement list returned"),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-movements"
)]
pub async fn list_stock_movements(
    State(state): State<AppState>,
    Query(query): Query<ListMovementsQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let movement_type = match query.r#type.as_deref() {
        None => None,
        Some(raw) => Some(MovementType::parse(raw).ok_or_else(|| {
            ServiceError::BadRequest(format!("invalid movement type '{}'", raw))
        })?),
    };

    let limit = query
        .limit
        .unwrap_or(u64::from(state.config.api_default_page_size))
        .clamp(1, u64::from(state.config.api_max_page_size));
    let offset = query.offset.unwrap_or(0);

    let filter = StockMovementFilter {
        product_id: query.product_id,
        location_id: query.location_id,
        user_id: query.user_id,
        movement_type,
        date_from: query.date_from,
        date_to: query.date_to,
        limit,
        offset,
    };

    let (movements, total) = state
        .services
        .stock_movements
        .list_movements(&filter)
        .await?;

    let page = offset / limit + 1;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        movements, total, page, limit,
    ))))
}

/// Get a stock movement by ID
#[utoipa::path(
    get,
    path = "/api/v1/stock-movements/{id}",
    params(("id" = Uuid, Path, description = "Movement ID")),
    responses(
        (status = 200, description = "Movement returned"),
        (status = 404, description = "Movement not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-movements"
)]
pub async fn get_stock_movement(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state.services.stock_movements.get_movement(id).await?;

    Ok(Json(ApiResponse::success(record)))
}

/// List movements for one product
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/movements",
    params(("id" = Uuid, Path, description = "Product ID"), PageQuery),
    responses(
        (status = 200, description = "Movement list returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-movements"
)]
pub async fn list_movements_by_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let limit = query
        .limit
        .unwrap_or(u64::from(state.config.api_default_page_size))
        .clamp(1, u64::from(state.config.api_max_page_size));
    let offset = query.offset.unwrap_or(0);

    let (movements, total) = state
        .services
        .stock_movements
        .movements_by_product(id, limit, offset)
        .await?;

    let page = offset / limit + 1;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        movements, total, page, limit,
    ))))
}

/// List movements for one location
#[utoipa::path(
    get,
    path = "/api/v1/locations/{id}/movements",
    params(("id" = Uuid, Path, description = "Location ID"), PageQuery),
    responses(
        (status = 200, description = "Movement list returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "stock-movements"
)]
pub async fn list_movements_by_location(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let limit = query
        .limit
        .unwrap_or(u64::from(state.config.api_default_page_size))
        .clamp(1, u64::from(state.config.api_max_page_size));
    let offset = query.offset.unwrap_or(0);

    let (movements, total) = state
        .services
        .stock_movements
        .movements_by_location(id, limit, offset)
        .await?;

    let page = offset / limit + 1;
    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        movements, total, page, limit,
    ))))
}

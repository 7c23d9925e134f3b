use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    errors::ServiceError,
    services::products::{CreateProduct, UpdateProduct},
    ApiResponse, AppState, PaginatedResponse,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 50))]
    pub sku: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub weight_kg: Decimal,
    pub dimensions_cm: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    /// Initial on-hand quantity before any movement history exists
    #[serde(default)]
    #[validate(range(min = 0))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub weight_kg: Option<Decimal>,
    pub dimensions_cm: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListProductsQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Matches name, SKU or category
    pub search: Option<String>,
    pub is_active: Option<bool>,
}

/// Create a new product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created"),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;

    let product = state
        .services
        .products
        .create_product(CreateProduct {
            sku: request.sku,
            name: request.name,
            description: request.description,
            price: request.price,
            weight_kg: request.weight_kg,
            dimensions_cm: request.dimensions_cm,
            category: request.category,
            quantity: request.quantity,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(product))))
}

/// List products with pagination and optional search
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(ListProductsQuery),
    responses(
        (status = 200, description = "Product list returned"),
        (status = 401, description = "Unauthorized", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ListProductsQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(u64::from(state.config.api_default_page_size))
        .clamp(1, u64::from(state.config.api_max_page_size));

    let (products, total) = state
        .services
        .products
        .list_products(page, limit, query.is_active, query.search)
        .await?;

    Ok(Json(ApiResponse::success(PaginatedResponse::new(
        products, total, page, limit,
    ))))
}

/// Get a product by ID
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product returned"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state
        .services
        .products
        .get_product(&id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product with ID {} not found", id)))?;

    Ok(Json(ApiResponse::success(product)))
}

/// Get a product by its SKU
#[utoipa::path(
    get,
    path = "/api/v1/products/sku/{sku}",
    params(("sku" = String, Path, description = "Product SKU")),
    responses(
        (status = 200, description = "Product returned"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn get_product_by_sku(
    State(state): State<AppState>,
    Path(sku): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let product = state
        .services
        .products
        .get_product_by_sku(&sku)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product with SKU '{}' not found", sku)))?;

    Ok(Json(ApiResponse::success(product)))
}

/// Update a product
#[utoipa::path(
    put,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    request.validate()?;

    let product = state
        .services
        .products
        .update_product(
            id,
            UpdateProduct {
                name: request.name,
                description: request.description,
                price: request.price,
                weight_kg: request.weight_kg,
                dimensions_cm: request.dimensions_cm,
                category: request.category,
                is_active: request.is_active,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(product)))
}

/// Deactivate a product
#[utoipa::path(
    delete,
    path = "/api/v1/products/{id}",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product deactivated"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.products.delete_product(id).await?;

    Ok(Json(ApiResponse::<()>::message(
        "Product deactivated".to_string(),
    )))
}

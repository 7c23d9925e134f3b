//! Warehouse API Library
//!
//! Inventory control backend: product catalog, storage locations, and an
//! append-only stock movement ledger with capacity-checked receipts and
//! stock-checked shipments.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod openapi;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::State,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::auth::{require_auth, AuthService};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(items: Vec<T>, total: u64, page: u64, limit: u64) -> Self {
        let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
        Self {
            items,
            total,
            page,
            limit,
            total_pages,
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn message(message: String) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Build the versioned API router. Everything except registration and login
/// requires an authenticated caller.
pub fn api_v1_routes(auth_service: Arc<AuthService>) -> Router<AppState> {
    let public = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login));

    let protected = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        // Product catalog
        .route(
            "/products",
            post(handlers::products::create_product).get(handlers::products::list_products),
        )
        .route(
            "/products/:id",
            get(handlers::products::get_product)
                .put(handlers::products::update_product)
                .delete(handlers::products::delete_product),
        )
        .route("/products/sku/:sku", get(handlers::products::get_product_by_sku))
        .route(
            "/products/:id/movements",
            get(handlers::stock_movements::list_movements_by_product),
        )
        // Storage locations
        .route(
            "/locations",
            post(handlers::locations::create_location).get(handlers::locations::list_locations),
        )
        .route(
            "/locations/:id",
            get(handlers::locations::get_location)
                .put(handlers::locations::update_location)
                .delete(handlers::locations::delete_location),
        )
        .route(
            "/locations/code/:code",
            get(handlers::locations::get_location_by_code),
        )
        .route(
            "/locations/:id/occupancy",
            get(handlers::locations::get_location_occupancy),
        )
        .route(
            "/locations/:id/movements",
            get(handlers::stock_movements::list_movements_by_location),
        )
        // Stock movement ledger
        .route(
            "/stock-movements",
            post(handlers::stock_movements::create_stock_movement)
                .get(handlers::stock_movements::list_stock_movements),
        )
        .route(
            "/stock-movements/:id",
            get(handlers::stock_movements::get_stock_movement),
        )
        .route_layer(middleware::from_fn_with_state(auth_service, require_auth));

    Router::new()
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .merge(public)
        .merge(protected)
}

async fn api_status() -> Json<ApiResponse<Value>> {
    let version = env!("CARGO_PKG_VERSION");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "service": "warehouse-api",
        "timestamp": Utc::now().to_rfc3339(),
    });

    Json(ApiResponse::success(status_data))
}

async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": Utc::now().to_rfc3339(),
    });

    Json(ApiResponse::success(health_data))
}

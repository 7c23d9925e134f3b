use utoipa::OpenApi;

/// OpenAPI document for the warehouse API. Served at
/// `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Warehouse API",
        description = "Inventory control backend: product catalog, storage locations, and an append-only stock movement ledger"
    ),
    paths(
        crate::handlers::auth::register,
        crate::handlers::auth::login,
        crate::handlers::auth::me,
        crate::handlers::products::create_product,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::get_product_by_sku,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::locations::create_location,
        crate::handlers::locations::list_locations,
        crate::handlers::locations::get_location,
        crate::handlers::locations::get_location_by_code,
        crate::handlers::locations::get_location_occupancy,
        crate::handlers::locations::update_location,
        crate::handlers::locations::delete_location,
        crate::handlers::stock_movements::create_stock_movement,
        crate::handlers::stock_movements::list_stock_movements,
        crate::handlers::stock_movements::get_stock_movement,
        crate::handlers::stock_movements::list_movements_by_product,
        crate::handlers::stock_movements::list_movements_by_location,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::entities::stock_movement::MovementType,
        crate::handlers::auth::RegisterRequest,
        crate::handlers::auth::LoginRequest,
        crate::handlers::auth::LoginResponse,
        crate::handlers::products::CreateProductRequest,
        crate::handlers::products::UpdateProductRequest,
        crate::handlers::locations::CreateLocationRequest,
        crate::handlers::locations::UpdateLocationRequest,
        crate::handlers::locations::LocationOccupancy,
        crate::handlers::stock_movements::CreateStockMovementRequest,
    )),
    tags(
        (name = "auth", description = "Authentication"),
        (name = "products", description = "Product catalog"),
        (name = "locations", description = "Storage locations"),
        (name = "stock-movements", description = "Stock movement ledger")
    )
)]
pub struct ApiDoc;

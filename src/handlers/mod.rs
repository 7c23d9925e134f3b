pub mod auth;
pub mod locations;
pub mod products;
pub mod stock_movements;

use std::sync::Arc;

use crate::auth::AuthService;
use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    locations::LocationService, products::ProductService, stock_movements::StockMovementService,
};

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<ProductService>,
    pub locations: Arc<LocationService>,
    pub stock_movements: Arc<StockMovementService>,
    pub auth: Arc<AuthService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        auth_service: Arc<AuthService>,
    ) -> Self {
        let products = Arc::new(ProductService::new(db_pool.clone(), event_sender.clone()));
        let locations = Arc::new(LocationService::new(db_pool.clone(), event_sender.clone()));
        let stock_movements = Arc::new(StockMovementService::new(db_pool, event_sender));

        Self {
            products,
            locations,
            stock_movements,
            auth: auth_service,
        }
    }
}

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use rust_decimal::Decimal;
use tempfile::TempDir;
use tokio::sync::mpsc;
use uuid::Uuid;

use warehouse_api::{
    auth::{AuthConfig, AuthService},
    config::AppConfig,
    db,
    entities::{location, product, user},
    events::{self, EventSender},
    handlers::AppServices,
    services::{locations::CreateLocation, products::CreateProduct},
    AppState,
};

const TEST_JWT_SECRET: &str =
    "integration-test-secret-with-plenty-of-unique-characters-0123456789abcdef";

/// Helper harness for spinning up an application state backed by a throwaway
/// SQLite database.
pub struct TestApp {
    pub state: AppState,
    pub auth_service: Arc<AuthService>,
    /// Seeded operator account performing the test movements
    pub operator: user::Model,
    pub token: String,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let db_dir = TempDir::new().expect("failed to create temp dir");
        let db_path = db_dir.path().join("warehouse_test.db");
        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let mut cfg = AppConfig::new(
            db_url,
            TEST_JWT_SECRET.to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // A single pooled connection serializes SQLite access in tests.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let db_arc = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_cfg = AuthConfig::new(
            cfg.jwt_secret.clone(),
            cfg.auth_issuer.clone(),
            cfg.auth_audience.clone(),
            Duration::from_secs(cfg.jwt_expiration as u64),
            cfg.api_key_prefix.clone(),
        )
        .expect("failed to create auth config");
        let auth_service = Arc::new(AuthService::new(
            auth_cfg,
            db_arc.clone(),
            Arc::new(event_sender.clone()),
        ));

        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            auth_service.clone(),
        );

        let operator = auth_service
            .register(
                "operator".to_string(),
                "operator@warehouse.test".to_string(),
                "operator-password".to_string(),
            )
            .await
            .expect("failed to register operator");
        let token = auth_service
            .generate_token(&operator)
            .expect("failed to issue token");

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        Self {
            state,
            auth_service,
            operator,
            token,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// Router wired exactly like the production binary, minus the outer
    /// middleware layers.
    #[allow(dead_code)]
    pub fn router(&self) -> Router {
        Router::new()
            .nest(
                "/api/v1",
                warehouse_api::api_v1_routes(self.auth_service.clone()),
            )
            .with_state(self.state.clone())
    }

    /// Seed a product with the given SKU and initial quantity.
    #[allow(dead_code)]
    pub async fn seed_product(&self, sku: &str, quantity: i32) -> product::Model {
        self.state
            .services
            .products
            .create_product(CreateProduct {
                sku: sku.to_string(),
                name: format!("Product {}", sku),
                description: None,
                price: Decimal::new(999, 2),
                weight_kg: Decimal::new(10, 1),
                dimensions_cm: None,
                category: "test".to_string(),
                quantity,
            })
            .await
            .expect("failed to seed product")
    }

    /// Seed a location with the given code and capacity.
    #[allow(dead_code)]
    pub async fn seed_location(&self, code: &str, capacity: i32) -> location::Model {
        self.state
            .services
            .locations
            .create_location(CreateLocation {
                code: code.to_string(),
                name: format!("Shelf {}", code),
                zone: code.chars().next().unwrap_or('A').to_string(),
                aisle: "01".to_string(),
                rack: "01".to_string(),
                shelf: "01".to_string(),
                capacity,
                temperature: None,
            })
            .await
            .expect("failed to seed location")
    }

    #[allow(dead_code)]
    pub fn operator_id(&self) -> Uuid {
        self.operator.id
    }
}

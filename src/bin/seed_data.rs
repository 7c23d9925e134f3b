//! Seeds the database with an admin user and a small demo catalog.
//!
//! Usage: APP__JWT_SECRET=... cargo run --bin seed-data

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::info;

use warehouse_api as api;
use api::services::{locations::CreateLocation, products::CreateProduct};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config()?;
    api::config::init_tracing(cfg.log_level(), cfg.log_json);

    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    api::db::run_migrations(&db_pool).await?;
    let db_arc = Arc::new(db_pool);

    let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = Arc::new(api::events::EventSender::new(event_tx));
    tokio::spawn(api::events::process_events(event_rx));

    let auth_cfg = api::auth::AuthConfig::new(
        cfg.jwt_secret.clone(),
        cfg.auth_issuer.clone(),
        cfg.auth_audience.clone(),
        Duration::from_secs(cfg.jwt_expiration as u64),
        cfg.api_key_prefix.clone(),
    )
    .context("failed to create auth config")?;
    let auth = Arc::new(api::auth::AuthService::new(
        auth_cfg,
        db_arc.clone(),
        event_sender.clone(),
    ));

    let services = api::handlers::AppServices::new(db_arc.clone(), event_sender, auth.clone());

    // Admin account
    match auth
        .register(
            "admin".to_string(),
            "admin@warehouse.local".to_string(),
            "admin123!change-me".to_string(),
        )
        .await
    {
        Ok(user) => info!(user_id = %user.id, api_key = ?user.api_key, "Admin user created"),
        Err(api::errors::ServiceError::Conflict(_)) => info!("Admin user already present"),
        Err(e) => return Err(e.into()),
    }

    // Demo catalog
    let demo_products = [
        ("LAPTOP-001", "Laptop 14\"", "electronics", Decimal::new(129900, 2), 25),
        ("MOUSE-001", "Wireless Mouse", "electronics", Decimal::new(3499, 2), 120),
        ("SHELF-KIT-01", "Shelf Assembly Kit", "fixtures", Decimal::new(8999, 2), 40),
    ];

    for (sku, name, category, price, quantity) in demo_products {
        match services
            .products
            .create_product(CreateProduct {
                sku: sku.to_string(),
                name: name.to_string(),
                description: None,
                price,
                weight_kg: Decimal::new(10, 1),
                dimensions_cm: None,
                category: category.to_string(),
                quantity,
            })
            .await
        {
            Ok(product) => info!(sku = %product.sku, "Product seeded"),
            Err(api::errors::ServiceError::Conflict(_)) => info!(sku, "Product already present"),
            Err(e) => return Err(e.into()),
        }
    }

    let demo_locations = [
        ("A-01-01-01", "A", "01", "01", "01", 500),
        ("A-01-01-02", "A", "01", "01", "02", 500),
        ("B-02-01-01", "B", "02", "01", "01", 1000),
    ];

    for (code, zone, aisle, rack, shelf, capacity) in demo_locations {
        match services
            .locations
            .create_location(CreateLocation {
                code: code.to_string(),
                name: format!("Shelf {}", code),
                zone: zone.to_string(),
                aisle: aisle.to_string(),
                rack: rack.to_string(),
                shelf: shelf.to_string(),
                capacity,
                temperature: None,
            })
            .await
        {
            Ok(location) => info!(code = %location.code, "Location seeded"),
            Err(api::errors::ServiceError::Conflict(_)) => info!(code, "Location already present"),
            Err(e) => return Err(e.into()),
        }
    }

    info!("Seeding complete");
    Ok(())
}

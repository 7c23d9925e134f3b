mod common;

use std::sync::Arc;

use common::TestApp;
use uuid::Uuid;

use warehouse_api::{
    entities::stock_movement::MovementType,
    services::stock_movements::NewStockMovement,
};

fn movement(product_id: Uuid, location_id: Uuid, movement_type: MovementType, quantity: i32) -> NewStockMovement {
    NewStockMovement {
        product_id,
        location_id,
        movement_type,
        quantity,
        reference: None,
        notes: None,
    }
}

#[tokio::test]
async fn concurrent_outbound_movements_never_drive_quantity_negative() {
    let app = Arc::new(TestApp::new().await);
    let product = app.seed_product("RACE-OUT-001", 10).await;
    let location = app.seed_location("R-01-01-01", 1000).await;

    // Two OUT movements of 6 against quantity 10: exactly one may be admitted.
    let mut tasks = vec![];
    for _ in 0..2 {
        let app = app.clone();
        let product_id = product.id;
        let location_id = location.id;
        tasks.push(tokio::spawn(async move {
            app.state
                .services
                .stock_movements
                .process_movement(
                    movement(product_id, location_id, MovementType::Out, 6),
                    app.operator_id(),
                )
                .await
                .is_ok()
        }));
    }

    let mut admitted = 0;
    for task in tasks {
        if task.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1, "exactly one of the two OUTs may be admitted");

    let remaining = app
        .state
        .services
        .products
        .get_product(&product.id)
        .await
        .unwrap()
        .unwrap()
        .quantity;
    assert_eq!(remaining, 4);
}

#[tokio::test]
async fn concurrent_outbound_drain_admits_exactly_the_available_stock() {
    let app = Arc::new(TestApp::new().await);
    let product = app.seed_product("RACE-OUT-002", 10).await;
    let location = app.seed_location("R-01-01-02", 1000).await;

    // 20 concurrent OUTs of 1 unit each against quantity 10: exactly 10 admitted.
    let mut tasks = vec![];
    for _ in 0..20 {
        let app = app.clone();
        let product_id = product.id;
        let location_id = location.id;
        tasks.push(tokio::spawn(async move {
            app.state
                .services
                .stock_movements
                .process_movement(
                    movement(product_id, location_id, MovementType::Out, 1),
                    app.operator_id(),
                )
                .await
                .is_ok()
        }));
    }

    let mut admitted = 0;
    for task in tasks {
        if task.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(
        admitted, 10,
        "exactly 10 unit shipments should succeed; got {}",
        admitted
    );

    let remaining = app
        .state
        .services
        .products
        .get_product(&product.id)
        .await
        .unwrap()
        .unwrap()
        .quantity;
    assert_eq!(remaining, 0);
}

#[tokio::test]
async fn concurrent_inbound_movements_never_overshoot_capacity() {
    let app = Arc::new(TestApp::new().await);
    let product = app.seed_product("RACE-IN-001", 0).await;
    let location = app.seed_location("R-02-01-01", 10).await;

    // 20 concurrent INs of 1 unit each into capacity 10: exactly 10 admitted,
    // occupancy lands exactly at the ceiling.
    let mut tasks = vec![];
    for _ in 0..20 {
        let app = app.clone();
        let product_id = product.id;
        let location_id = location.id;
        tasks.push(tokio::spawn(async move {
            app.state
                .services
                .stock_movements
                .process_movement(
                    movement(product_id, location_id, MovementType::In, 1),
                    app.operator_id(),
                )
                .await
                .is_ok()
        }));
    }

    let mut admitted = 0;
    for task in tasks {
        if task.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 10, "capacity 10 admits exactly 10 unit receipts");

    let occupancy = app
        .state
        .services
        .stock_movements
        .location_occupancy(location.id)
        .await
        .unwrap();
    assert_eq!(occupancy, 10);

    let quantity = app
        .state
        .services
        .products
        .get_product(&product.id)
        .await
        .unwrap()
        .unwrap()
        .quantity;
    assert_eq!(quantity, 10);
}

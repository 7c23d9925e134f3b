use crate::entities::{location, product, stock_movement::MovementType};
use crate::errors::ServiceError;

/// Decides whether a proposed stock movement is admissible and, if so, what
/// the product's new aggregate quantity becomes.
///
/// Pure and deterministic: no I/O, no clock, no side effects. The caller is
/// responsible for supplying the location's current derived occupancy for
/// inbound movements (outbound movements are not capacity-checked).
///
/// Rejections come back as the typed variants `ReferenceUnavailable`,
/// `InsufficientStock` and `ExceedsCapacity`.
pub fn validate_movement(
    movement_type: MovementType,
    quantity: i32,
    product: &product::Model,
    location: &location::Model,
    current_location_occupancy: Option<i64>,
) -> Result<i32, ServiceError> {
    if quantity <= 0 {
        return Err(ServiceError::ValidationError(
            "movement quantity must be greater than zero".to_string(),
        ));
    }

    if !product.is_active {
        return Err(ServiceError::ReferenceUnavailable(format!(
            "product {} is not active",
            product.sku
        )));
    }

    if !location.is_active {
        return Err(ServiceError::ReferenceUnavailable(format!(
            "location {} is not active",
            location.code
        )));
    }

    match movement_type {
        MovementType::Out => {
            if product.quantity < quantity {
                return Err(ServiceError::InsufficientStock(format!(
                    "requested {}, on hand {}",
                    quantity, product.quantity
                )));
            }
            // Never negative by construction; exactly zero is allowed.
            Ok(product.quantity - quantity)
        }
        MovementType::In => {
            let occupancy = current_location_occupancy.ok_or_else(|| {
                ServiceError::InternalError(
                    "inbound validation requires the location occupancy".to_string(),
                )
            })?;

            let projected = occupancy + i64::from(quantity);
            if projected > i64::from(location.capacity) {
                return Err(ServiceError::ExceedsCapacity(format!(
                    "location {} holds {}, adding {} exceeds capacity {}",
                    location.code, occupancy, quantity, location.capacity
                )));
            }

            product.quantity.checked_add(quantity).ok_or_else(|| {
                ServiceError::ValidationError("product quantity overflow".to_string())
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use uuid::Uuid;

    fn product(quantity: i32, is_active: bool) -> product::Model {
        product::Model {
            id: Uuid::new_v4(),
            sku: "WIDGET-001".to_string(),
            name: "Widget".to_string(),
            description: None,
            price: Decimal::new(1999, 2),
            weight_kg: Decimal::new(5, 1),
            dimensions_cm: None,
            category: "widgets".to_string(),
            quantity,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn location(capacity: i32, is_active: bool) -> location::Model {
        location::Model {
            id: Uuid::new_v4(),
            code: "A-01-01-01".to_string(),
            name: "Shelf A-01-01-01".to_string(),
            zone: "A".to_string(),
            aisle: "01".to_string(),
            rack: "01".to_string(),
            shelf: "01".to_string(),
            capacity,
            temperature: None,
            is_active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn inbound_within_capacity_adds_to_quantity() {
        let result = validate_movement(
            MovementType::In,
            15,
            &product(10, true),
            &location(20, true),
            Some(0),
        );
        assert_eq!(result.unwrap(), 25);
    }

    #[test]
    fn inbound_filling_location_exactly_is_admitted() {
        let result = validate_movement(
            MovementType::In,
            5,
            &product(0, true),
            &location(20, true),
            Some(15),
        );
        assert_eq!(result.unwrap(), 5);
    }

    #[test]
    fn inbound_over_capacity_is_rejected() {
        let err = validate_movement(
            MovementType::In,
            10,
            &product(25, true),
            &location(20, true),
            Some(15),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::ExceedsCapacity(_)));
    }

    #[test]
    fn outbound_draining_stock_to_zero_is_admitted() {
        let result = validate_movement(
            MovementType::Out,
            25,
            &product(25, true),
            &location(20, true),
            None,
        );
        assert_eq!(result.unwrap(), 0);
    }

    #[test]
    fn outbound_beyond_stock_is_rejected() {
        let err = validate_movement(
            MovementType::Out,
            30,
            &product(25, true),
            &location(20, true),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::InsufficientStock(_)));
    }

    #[test]
    fn outbound_ignores_location_capacity() {
        // OUT is not capacity-checked; occupancy is irrelevant and may even be
        // driven negative by the caller's ledger.
        let result = validate_movement(
            MovementType::Out,
            5,
            &product(10, true),
            &location(1, true),
            None,
        );
        assert_eq!(result.unwrap(), 5);
    }

    #[test]
    fn inactive_product_is_reference_unavailable() {
        let err = validate_movement(
            MovementType::In,
            1,
            &product(0, false),
            &location(20, true),
            Some(0),
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::ReferenceUnavailable(_)));
    }

    #[test]
    fn inactive_location_is_reference_unavailable() {
        let err = validate_movement(
            MovementType::Out,
            1,
            &product(10, true),
            &location(20, false),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ServiceError::ReferenceUnavailable(_)));
    }

    #[test]
    fn non_positive_quantity_is_invalid() {
        for qty in [0, -1] {
            let err = validate_movement(
                MovementType::In,
                qty,
                &product(10, true),
                &location(20, true),
                Some(0),
            )
            .unwrap_err();
            assert!(matches!(err, ServiceError::ValidationError(_)));
        }
    }

    proptest! {
        /// Replaying any sequence of proposed movements through the validator
        /// keeps the aggregate quantity equal to the signed sum of admitted
        /// movements, never negative, and never lets admitted inbound
        /// movements push the derived occupancy past capacity.
        #[test]
        fn replay_preserves_aggregate_invariants(
            capacity in 1i32..500,
            moves in prop::collection::vec((prop::bool::ANY, 1i32..100), 0..64),
        ) {
            let loc = location(capacity, true);
            let mut quantity: i32 = 0;
            let mut occupancy: i64 = 0;
            let mut admitted_sum: i64 = 0;

            for (inbound, qty) in moves {
                let movement_type = if inbound { MovementType::In } else { MovementType::Out };
                let prod = product(quantity, true);
                let occ = if inbound { Some(occupancy) } else { None };

                match validate_movement(movement_type, qty, &prod, &loc, occ) {
                    Ok(new_quantity) => {
                        quantity = new_quantity;
                        occupancy += movement_type.sign() * i64::from(qty);
                        admitted_sum += movement_type.sign() * i64::from(qty);
                    }
                    Err(err) => prop_assert!(err.is_rejection()),
                }

                prop_assert!(quantity >= 0);
                prop_assert!(occupancy <= i64::from(capacity));
                prop_assert_eq!(i64::from(quantity), admitted_sum);
            }
        }
    }
}

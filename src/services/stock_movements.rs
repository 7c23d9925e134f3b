use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionError, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::{
        location::{self, Entity as Location},
        product::{self, Entity as Product},
        stock_movement::{self, Entity as StockMovement, MovementType},
        user::{self, Entity as User},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::stock_validation::validate_movement,
};

/// Bounded retry for the conditional aggregate-quantity write. Exhaustion
/// surfaces as `ConcurrentModification`.
const QUANTITY_WRITE_ATTEMPTS: u32 = 3;

/// Page size applied when a filter does not specify a limit.
const DEFAULT_PAGE_SIZE: u64 = 20;

/// A proposed stock movement, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStockMovement {
    pub product_id: Uuid,
    pub location_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: i32,
    pub reference: Option<String>,
    pub notes: Option<String>,
}

/// Query descriptor for the ledger read side. Filters AND-combine; the date
/// range is inclusive on both ends.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockMovementFilter {
    pub product_id: Option<Uuid>,
    pub location_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub movement_type: Option<MovementType>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub limit: u64,
    pub offset: u64,
}

/// A ledger row enriched with its related product, location and user.
#[derive(Debug, Clone, Serialize)]
pub struct StockMovementRecord {
    #[serde(flatten)]
    pub movement: stock_movement::Model,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<product::Model>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<location::Model>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<user::Model>,
}

/// Service owning the stock movement ledger and the movement processor.
///
/// `process_movement` is the only write path: it resolves references, derives
/// occupancy for inbound movements, runs the pure validator, appends to the
/// ledger and advances the product's aggregate quantity, all inside a single
/// database transaction. The aggregate write is conditional on the quantity
/// read at the start of the attempt; a concurrent writer aborts the whole
/// attempt, which is retried a bounded number of times.
pub struct StockMovementService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    /// Inbound movements to the same location serialize through this table so
    /// that occupancy derivation and the subsequent append cannot interleave.
    location_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl StockMovementService {
    /// Creates a new stock movement service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
            location_locks: DashMap::new(),
        }
    }

    /// Processes a proposed movement on behalf of `acting_user_id`.
    ///
    /// Business rejections (`ReferenceUnavailable`, `InsufficientStock`,
    /// `ExceedsCapacity`) leave no trace in storage. On success the returned
    /// record carries the persisted ledger row and the resolved product (with
    /// its new quantity) and location.
    #[instrument(skip(self, request), fields(product_id = %request.product_id, location_id = %request.location_id))]
    pub async fn process_movement(
        &self,
        request: NewStockMovement,
        acting_user_id: Uuid,
    ) -> Result<StockMovementRecord, ServiceError> {
        if request.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "movement quantity must be greater than zero".to_string(),
            ));
        }

        // Serialize the occupancy check and append per location for inbound
        // movements; outbound movements are not capacity-checked and only
        // contend on the product quantity, which the conditional write covers.
        let _location_guard = match request.movement_type {
            MovementType::In => {
                let lock = self
                    .location_locks
                    .entry(request.location_id)
                    .or_insert_with(|| Arc::new(Mutex::new(())))
                    .clone();
                Some(lock.lock_owned().await)
            }
            MovementType::Out => None,
        };

        let mut attempt = 0;
        let (movement, updated_product, resolved_location) = loop {
            attempt += 1;
            match self.try_process(&request, acting_user_id).await {
                Err(ServiceError::ConcurrentModification(product_id))
                    if attempt < QUANTITY_WRITE_ATTEMPTS =>
                {
                    warn!(
                        product_id = %product_id,
                        attempt = attempt,
                        "Concurrent quantity update detected, retrying movement"
                    );
                    continue;
                }
                other => break other?,
            }
        };

        self.event_sender
            .send(Event::StockMovementRecorded {
                movement_id: movement.id,
                product_id: updated_product.id,
                location_id: resolved_location.id,
                movement_type: request.movement_type,
                quantity: movement.quantity,
                new_product_quantity: updated_product.quantity,
            })
            .await
            .map_err(ServiceError::EventError)?;

        info!(
            movement_id = %movement.id,
            movement_type = request.movement_type.as_str(),
            quantity = movement.quantity,
            new_product_quantity = updated_product.quantity,
            "Stock movement recorded"
        );

        Ok(StockMovementRecord {
            movement,
            product: Some(updated_product),
            location: Some(resolved_location),
            user: None,
        })
    }

    /// One attempt of the movement transaction: resolve → (derive) → validate
    /// → append → conditional quantity write. Either everything commits or
    /// nothing is observable.
    async fn try_process(
        &self,
        request: &NewStockMovement,
        acting_user_id: Uuid,
    ) -> Result<(stock_movement::Model, product::Model, location::Model), ServiceError> {
        let db = self.db_pool.as_ref();
        let request = request.clone();

        db.transaction::<_, (stock_movement::Model, product::Model, location::Model), ServiceError>(
            move |txn| {
                Box::pin(async move {
                    let product = Product::find_by_id(request.product_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::DatabaseError)?
                        .ok_or_else(|| {
                            ServiceError::ReferenceUnavailable(format!(
                                "product {} not found",
                                request.product_id
                            ))
                        })?;

                    let location = Location::find_by_id(request.location_id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::DatabaseError)?
                        .ok_or_else(|| {
                            ServiceError::ReferenceUnavailable(format!(
                                "location {} not found",
                                request.location_id
                            ))
                        })?;

                    let occupancy = match request.movement_type {
                        MovementType::In => {
                            Some(Self::derive_occupancy(txn, location.id).await?)
                        }
                        MovementType::Out => None,
                    };

                    let new_quantity = validate_movement(
                        request.movement_type,
                        request.quantity,
                        &product,
                        &location,
                        occupancy,
                    )?;

                    let movement = stock_movement::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        product_id: Set(product.id),
                        location_id: Set(location.id),
                        user_id: Set(acting_user_id),
                        r#type: Set(request.movement_type.as_str().to_string()),
                        quantity: Set(request.quantity),
                        reference: Set(request.reference.clone()),
                        notes: Set(request.notes.clone()),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::DatabaseError)?;

                    // Conditional write: only advance the aggregate if nobody
                    // else did since we read it. Zero rows affected rolls the
                    // append back with the rest of the attempt.
                    let update = Product::update_many()
                        .col_expr(product::Column::Quantity, Expr::value(new_quantity))
                        .col_expr(product::Column::UpdatedAt, Expr::value(Utc::now()))
                        .filter(product::Column::Id.eq(product.id))
                        .filter(product::Column::Quantity.eq(product.quantity))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::DatabaseError)?;

                    if update.rows_affected == 0 {
                        return Err(ServiceError::ConcurrentModification(product.id));
                    }

                    let mut updated_product = product;
                    updated_product.quantity = new_quantity;

                    Ok((movement, updated_product, location))
                })
            },
        )
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }

    /// Derives a location's current occupancy by replaying every ledger entry
    /// for it: the signed sum of quantities, +IN / -OUT.
    ///
    /// No cached counter is consulted; the figure is recomputed from the full
    /// history on every inbound check so it can never drift from the ledger.
    #[instrument(skip(self))]
    pub async fn location_occupancy(&self, location_id: Uuid) -> Result<i64, ServiceError> {
        Self::derive_occupancy(self.db_pool.as_ref(), location_id).await
    }

    async fn derive_occupancy<C: ConnectionTrait>(
        conn: &C,
        location_id: Uuid,
    ) -> Result<i64, ServiceError> {
        let entries = StockMovement::find()
            .filter(stock_movement::Column::LocationId.eq(location_id))
            .all(conn)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(entries.iter().map(stock_movement::Model::signed_quantity).sum())
    }

    /// Fetches a single ledger entry by id, enriched with its relations.
    #[instrument(skip(self))]
    pub async fn get_movement(&self, id: Uuid) -> Result<StockMovementRecord, ServiceError> {
        let db = self.db_pool.as_ref();

        let movement = StockMovement::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("stock movement {} not found", id)))?;

        let mut records = Self::enrich(db, vec![movement]).await?;
        Ok(records.remove(0))
    }

    /// Lists ledger entries matching the filter, most recent first, together
    /// with the total number of matching entries.
    #[instrument(skip(self, filter))]
    pub async fn list_movements(
        &self,
        filter: &StockMovementFilter,
    ) -> Result<(Vec<StockMovementRecord>, u64), ServiceError> {
        let db = self.db_pool.as_ref();

        let mut query = StockMovement::find();

        if let Some(product_id) = filter.product_id {
            query = query.filter(stock_movement::Column::ProductId.eq(product_id));
        }
        if let Some(location_id) = filter.location_id {
            query = query.filter(stock_movement::Column::LocationId.eq(location_id));
        }
        if let Some(user_id) = filter.user_id {
            query = query.filter(stock_movement::Column::UserId.eq(user_id));
        }
        if let Some(movement_type) = filter.movement_type {
            query = query.filter(stock_movement::Column::Type.eq(movement_type.as_str()));
        }
        if let Some(date_from) = filter.date_from {
            query = query.filter(stock_movement::Column::CreatedAt.gte(date_from));
        }
        if let Some(date_to) = filter.date_to {
            query = query.filter(stock_movement::Column::CreatedAt.lte(date_to));
        }

        let total = query
            .clone()
            .count(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let limit = if filter.limit == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            filter.limit
        };

        let movements = query
            .order_by_desc(stock_movement::Column::CreatedAt)
            .order_by_desc(stock_movement::Column::Id)
            .limit(limit)
            .offset(filter.offset)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let records = Self::enrich(db, movements).await?;
        Ok((records, total))
    }

    /// Convenience specialization of `list_movements` for one product.
    pub async fn movements_by_product(
        &self,
        product_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<StockMovementRecord>, u64), ServiceError> {
        self.list_movements(&StockMovementFilter {
            product_id: Some(product_id),
            limit,
            offset,
            ..Default::default()
        })
        .await
    }

    /// Convenience specialization of `list_movements` for one location.
    pub async fn movements_by_location(
        &self,
        location_id: Uuid,
        limit: u64,
        offset: u64,
    ) -> Result<(Vec<StockMovementRecord>, u64), ServiceError> {
        self.list_movements(&StockMovementFilter {
            location_id: Some(location_id),
            limit,
            offset,
            ..Default::default()
        })
        .await
    }

    /// Attaches the related product, location and user to each ledger row,
    /// batching one lookup per entity.
    async fn enrich(
        db: &DbPool,
        movements: Vec<stock_movement::Model>,
    ) -> Result<Vec<StockMovementRecord>, ServiceError> {
        if movements.is_empty() {
            return Ok(Vec::new());
        }

        let product_ids: HashSet<Uuid> = movements.iter().map(|m| m.product_id).collect();
        let location_ids: HashSet<Uuid> = movements.iter().map(|m| m.location_id).collect();
        let user_ids: HashSet<Uuid> = movements.iter().map(|m| m.user_id).collect();

        let products: HashMap<Uuid, product::Model> = Product::find()
            .filter(product::Column::Id.is_in(product_ids))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        let locations: HashMap<Uuid, location::Model> = Location::find()
            .filter(location::Column::Id.is_in(location_ids))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|l| (l.id, l))
            .collect();

        let users: HashMap<Uuid, user::Model> = User::find()
            .filter(user::Column::Id.is_in(user_ids))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        Ok(movements
            .into_iter()
            .map(|movement| {
                let product = products.get(&movement.product_id).cloned();
                let location = locations.get(&movement.location_id).cloned();
                let user = users.get(&movement.user_id).cloned();
                StockMovementRecord {
                    movement,
                    product,
                    location,
                    user,
                }
            })
            .collect())
    }
}

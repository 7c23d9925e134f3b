use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::product::{self, Column as ProductColumn, Entity as Product},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Input for creating a product. The SKU is an immutable business key; the
/// initial quantity seeds the aggregate before any ledger history exists.
#[derive(Debug, Clone)]
pub struct CreateProduct {
    pub sku: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub weight_kg: Decimal,
    pub dimensions_cm: Option<String>,
    pub category: String,
    pub quantity: i32,
}

/// Partial update; `None` leaves a field untouched. The SKU is immutable and
/// the quantity is only written through `set_quantity` or the movement
/// processor.
#[derive(Debug, Clone, Default)]
pub struct UpdateProduct {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub weight_kg: Option<Decimal>,
    pub dimensions_cm: Option<String>,
    pub category: Option<String>,
    pub is_active: Option<bool>,
}

/// Service for managing the product catalog
pub struct ProductService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ProductService {
    /// Creates a new product service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Create a new product
    #[instrument(skip(self, input), fields(sku = %input.sku))]
    pub async fn create_product(&self, input: CreateProduct) -> Result<product::Model, ServiceError> {
        let db = &*self.db_pool;

        if input.quantity < 0 {
            return Err(ServiceError::ValidationError(
                "initial quantity cannot be negative".to_string(),
            ));
        }

        let existing = Product::find()
            .filter(ProductColumn::Sku.eq(&input.sku))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if existing.is_some() {
            let msg = format!("Product with SKU '{}' already exists", input.sku);
            error!(%msg);
            return Err(ServiceError::Conflict(msg));
        }

        let now = Utc::now();
        let product = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            sku: Set(input.sku.clone()),
            name: Set(input.name),
            description: Set(input.description),
            price: Set(input.price),
            weight_kg: Set(input.weight_kg),
            dimensions_cm: Set(input.dimensions_cm),
            category: Set(input.category),
            quantity: Set(input.quantity),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let result = product
            .insert(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        self.event_sender
            .send(Event::ProductCreated(result.id))
            .await
            .map_err(ServiceError::EventError)?;

        info!(product_id = %result.id, sku = %input.sku, "Product created successfully");

        Ok(result)
    }

    /// Get a product by ID
    #[instrument(skip(self))]
    pub async fn get_product(&self, id: &Uuid) -> Result<Option<product::Model>, ServiceError> {
        let db = &*self.db_pool;

        Product::find_by_id(*id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Get a product by SKU
    #[instrument(skip(self))]
    pub async fn get_product_by_sku(&self, sku: &str) -> Result<Option<product::Model>, ServiceError> {
        let db = &*self.db_pool;

        Product::find()
            .filter(ProductColumn::Sku.eq(sku))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// List products with pagination; `search` matches name, SKU or category.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: u64,
        limit: u64,
        is_active: Option<bool>,
        search: Option<String>,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = Product::find();

        if let Some(is_active) = is_active {
            query = query.filter(ProductColumn::IsActive.eq(is_active));
        }

        if let Some(search) = search.filter(|s| !s.trim().is_empty()) {
            query = query.filter(
                ProductColumn::Name
                    .contains(&search)
                    .or(ProductColumn::Sku.contains(&search))
                    .or(ProductColumn::Category.contains(&search)),
            );
        }

        let paginator = query
            .order_by_desc(ProductColumn::CreatedAt)
            .paginate(db, limit.max(1));

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::DatabaseError)?;

        let products = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok((products, total))
    }

    /// Update a product
    #[instrument(skip(self, input))]
    pub async fn update_product(
        &self,
        id: Uuid,
        input: UpdateProduct,
    ) -> Result<product::Model, ServiceError> {
        let db = &*self.db_pool;

        let product = Product::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product with ID {} not found", id)))?;

        let mut product: product::ActiveModel = product.into();

        if let Some(name) = input.name {
            product.name = Set(name);
        }
        if let Some(description) = input.description {
            product.description = Set(Some(description));
        }
        if let Some(price) = input.price {
            product.price = Set(price);
        }
        if let Some(weight_kg) = input.weight_kg {
            product.weight_kg = Set(weight_kg);
        }
        if let Some(dimensions_cm) = input.dimensions_cm {
            product.dimensions_cm = Set(Some(dimensions_cm));
        }
        if let Some(category) = input.category {
            product.category = Set(category);
        }
        if let Some(is_active) = input.is_active {
            product.is_active = Set(is_active);
        }

        product.updated_at = Set(Utc::now());

        let updated = product
            .update(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        self.event_sender
            .send(Event::ProductUpdated(updated.id))
            .await
            .map_err(ServiceError::EventError)?;

        info!(product_id = %updated.id, "Product updated successfully");

        Ok(updated)
    }

    /// Write the product's absolute on-hand quantity.
    ///
    /// This is the Reference Store's narrow quantity hook: overwrite
    /// semantics, not a delta. The movement processor does not use it (its
    /// write is conditional inside the movement transaction); it exists for
    /// administrative corrections.
    #[instrument(skip(self))]
    pub async fn set_quantity(&self, id: Uuid, quantity: i32) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        if quantity < 0 {
            return Err(ServiceError::ValidationError(
                "quantity cannot be negative".to_string(),
            ));
        }

        let result = Product::update_many()
            .col_expr(ProductColumn::Quantity, sea_orm::sea_query::Expr::value(quantity))
            .col_expr(
                ProductColumn::UpdatedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(ProductColumn::Id.eq(id))
            .exec(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Product with ID {} not found",
                id
            )));
        }

        Ok(())
    }

    /// Deactivate a product. The row is kept: the movement ledger references
    /// it and history must stay resolvable.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let product = Product::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product with ID {} not found", id)))?;

        let mut product: product::ActiveModel = product.into();
        product.is_active = Set(false);
        product.updated_at = Set(Utc::now());

        product
            .update(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        self.event_sender
            .send(Event::ProductDeleted(id))
            .await
            .map_err(ServiceError::EventError)?;

        info!(product_id = %id, "Product deactivated");

        Ok(())
    }
}

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::location::{self, Column as LocationColumn, Entity as Location},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Input for creating a storage location. The code is an immutable business
/// key derived from the Zone/Aisle/Rack/Shelf hierarchy.
#[derive(Debug, Clone)]
pub struct CreateLocation {
    pub code: String,
    pub name: String,
    pub zone: String,
    pub aisle: String,
    pub rack: String,
    pub shelf: String,
    pub capacity: i32,
    pub temperature: Option<f64>,
}

/// Partial update; `None` leaves a field untouched. The code is immutable.
#[derive(Debug, Clone, Default)]
pub struct UpdateLocation {
    pub name: Option<String>,
    pub zone: Option<String>,
    pub aisle: Option<String>,
    pub rack: Option<String>,
    pub shelf: Option<String>,
    pub capacity: Option<i32>,
    pub temperature: Option<f64>,
    pub is_active: Option<bool>,
}

/// Service for managing storage locations
pub struct LocationService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl LocationService {
    /// Creates a new location service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Create a new location
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_location(
        &self,
        input: CreateLocation,
    ) -> Result<location::Model, ServiceError> {
        let db = &*self.db_pool;

        if input.capacity <= 0 {
            return Err(ServiceError::ValidationError(
                "location capacity must be greater than zero".to_string(),
            ));
        }

        let existing = Location::find()
            .filter(LocationColumn::Code.eq(&input.code))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        if existing.is_some() {
            let msg = format!("Location with code '{}' already exists", input.code);
            error!(%msg);
            return Err(ServiceError::Conflict(msg));
        }

        let now = Utc::now();
        let location = location::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(input.code.clone()),
            name: Set(input.name),
            zone: Set(input.zone),
            aisle: Set(input.aisle),
            rack: Set(input.rack),
            shelf: Set(input.shelf),
            capacity: Set(input.capacity),
            temperature: Set(input.temperature),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let result = location
            .insert(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        self.event_sender
            .send(Event::LocationCreated(result.id))
            .await
            .map_err(ServiceError::EventError)?;

        info!(location_id = %result.id, code = %input.code, "Location created successfully");

        Ok(result)
    }

    /// Get a location by ID
    #[instrument(skip(self))]
    pub async fn get_location(&self, id: &Uuid) -> Result<Option<location::Model>, ServiceError> {
        let db = &*self.db_pool;

        Location::find_by_id(*id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Get a location by its code
    #[instrument(skip(self))]
    pub async fn get_location_by_code(
        &self,
        code: &str,
    ) -> Result<Option<location::Model>, ServiceError> {
        let db = &*self.db_pool;

        Location::find()
            .filter(LocationColumn::Code.eq(code))
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// List locations with pagination, optionally restricted to one zone.
    #[instrument(skip(self))]
    pub async fn list_locations(
        &self,
        page: u64,
        limit: u64,
        zone: Option<String>,
        is_active: Option<bool>,
    ) -> Result<(Vec<location::Model>, u64), ServiceError> {
        let db = &*self.db_pool;

        let mut query = Location::find();

        if let Some(zone) = zone.filter(|z| !z.trim().is_empty()) {
            query = query.filter(LocationColumn::Zone.eq(zone));
        }

        if let Some(is_active) = is_active {
            query = query.filter(LocationColumn::IsActive.eq(is_active));
        }

        let paginator = query
            .order_by_asc(LocationColumn::Code)
            .paginate(db, limit.max(1));

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::DatabaseError)?;

        let locations = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok((locations, total))
    }

    /// Update a location
    #[instrument(skip(self, input))]
    pub async fn update_location(
        &self,
        id: Uuid,
        input: UpdateLocation,
    ) -> Result<location::Model, ServiceError> {
        let db = &*self.db_pool;

        let location = Location::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Location with ID {} not found", id)))?;

        if let Some(capacity) = input.capacity {
            if capacity <= 0 {
                return Err(ServiceError::ValidationError(
                    "location capacity must be greater than zero".to_string(),
                ));
            }
        }

        let mut location: location::ActiveModel = location.into();

        if let Some(name) = input.name {
            location.name = Set(name);
        }
        if let Some(zone) = input.zone {
            location.zone = Set(zone);
        }
        if let Some(aisle) = input.aisle {
            location.aisle = Set(aisle);
        }
        if let Some(rack) = input.rack {
            location.rack = Set(rack);
        }
        if let Some(shelf) = input.shelf {
            location.shelf = Set(shelf);
        }
        if let Some(capacity) = input.capacity {
            location.capacity = Set(capacity);
        }
        if let Some(temperature) = input.temperature {
            location.temperature = Set(Some(temperature));
        }
        if let Some(is_active) = input.is_active {
            location.is_active = Set(is_active);
        }

        location.updated_at = Set(Utc::now());

        let updated = location
            .update(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        self.event_sender
            .send(Event::LocationUpdated(updated.id))
            .await
            .map_err(ServiceError::EventError)?;

        info!(location_id = %updated.id, "Location updated successfully");

        Ok(updated)
    }

    /// Deactivate a location. The row is kept: the movement ledger references
    /// it and history must stay resolvable.
    #[instrument(skip(self))]
    pub async fn delete_location(&self, id: Uuid) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        let location = Location::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .ok_or_else(|| ServiceError::NotFound(format!("Location with ID {} not found", id)))?;

        let mut location: location::ActiveModel = location.into();
        location.is_active = Set(false);
        location.updated_at = Set(Utc::now());

        location
            .update(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        self.event_sender
            .send(Event::LocationDeleted(id))
            .await
            .map_err(ServiceError::EventError)?;

        info!(location_id = %id, "Location deactivated");

        Ok(())
    }
}

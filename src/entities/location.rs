use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Physical storage location inside the warehouse.
///
/// The code is a unique, immutable business key built from the
/// Zone/Aisle/Rack/Shelf hierarchy, e.g. "A-01-02-03". `capacity` is the
/// ceiling on the aggregate quantity the location may hold; the derived
/// occupancy of the movement ledger is checked against it on every inbound
/// movement.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "locations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    pub zone: String,
    pub aisle: String,
    pub rack: String,
    pub shelf: String,
    pub capacity: i32,
    /// Optional temperature requirement in degrees Celsius
    pub temperature: Option<f64>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::stock_movement::Entity")]
    StockMovements,
}

impl Related<super::stock_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockMovements.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

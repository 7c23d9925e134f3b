use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// Direction of a stock movement. Quantity is always positive; the direction
/// is carried here, never by sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub enum MovementType {
    #[serde(rename = "IN")]
    In,
    #[serde(rename = "OUT")]
    Out,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "IN" => Some(MovementType::In),
            "OUT" => Some(MovementType::Out),
            _ => None,
        }
    }

    /// Sign applied to the quantity when deriving location occupancy or
    /// replaying the ledger into an aggregate.
    pub fn sign(&self) -> i64 {
        match self {
            MovementType::In => 1,
            MovementType::Out => -1,
        }
    }
}

/// One row of the stock movement ledger.
///
/// Rows are append-only: created exactly once by the movement processor after
/// a successful validation and never updated or deleted. The ledger is the
/// system's source of truth; `products.quantity` is a cached projection of it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub location_id: Uuid,
    /// The acting user
    pub user_id: Uuid,
    /// Stored as "IN"/"OUT"; convert with [`MovementType`]
    pub r#type: String,
    /// Strictly positive
    pub quantity: i32,
    /// Reference number (PO, SO, etc.)
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn movement_type(&self) -> Option<MovementType> {
        MovementType::parse(&self.r#type)
    }

    /// Contribution of this row to its location's derived occupancy.
    pub fn signed_quantity(&self) -> i64 {
        match self.movement_type() {
            Some(t) => t.sign() * i64::from(self.quantity),
            None => 0,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
    #[sea_orm(
        belongs_to = "super::location::Entity",
        from = "Column::LocationId",
        to = "super::location::Column::Id"
    )]
    Location,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl Related<super::location::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Location.def()
    }
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    /// The ledger assigns the creation timestamp at insert time.
    async fn before_save<C: ConnectionTrait>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_type_round_trips_through_storage_form() {
        assert_eq!(MovementType::parse("IN"), Some(MovementType::In));
        assert_eq!(MovementType::parse("OUT"), Some(MovementType::Out));
        assert_eq!(MovementType::parse("TRANSFER"), None);
        assert_eq!(MovementType::In.as_str(), "IN");
        assert_eq!(MovementType::Out.as_str(), "OUT");
    }

    #[test]
    fn signed_quantity_follows_direction() {
        assert_eq!(MovementType::In.sign(), 1);
        assert_eq!(MovementType::Out.sign(), -1);
    }
}

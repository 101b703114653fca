use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seat_type")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub ship_id: Uuid,
    // Surcharge on top of the trip base price; the original API spelled
    // this field "aditionalPrice" and clients depend on it.
    #[serde(rename = "aditionalPrice")]
    pub additional_price: f64,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ship::Entity",
        from = "Column::ShipId",
        to = "super::ship::Column::Id"
    )]
    Ship,
    #[sea_orm(has_many = "super::seat::Entity")]
    Seats,
}

impl Related<super::ship::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ship.def()
    }
}

impl Related<super::seat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seats.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

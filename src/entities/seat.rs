use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seat")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub seat_type_id: Uuid,
    pub number: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::seat_type::Entity",
        from = "Column::SeatTypeId",
        to = "super::seat_type::Column::Id"
    )]
    SeatType,
    #[sea_orm(has_many = "super::trip::Entity")]
    Trips,
    #[sea_orm(has_many = "super::trip_seat::Entity")]
    TripSeats,
}

impl Related<super::seat_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SeatType.def()
    }
}

impl Related<super::trip::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trips.def()
    }
}

impl Related<super::trip_seat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::TripSeats.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

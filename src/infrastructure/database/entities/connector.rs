//! Connector entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "connectors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub station_id: String,

    /// 0 is the station itself; >= 1 are physical outlets.
    /// Unique together with station_id.
    pub connector_id: i32,

    /// Status: Available, Preparing, Charging, ...
    pub status: String,

    #[sea_orm(nullable)]
    pub error_code: Option<String>,

    /// Internal key of the bound transaction, while occupied
    #[sea_orm(nullable)]
    pub current_transaction_key: Option<String>,

    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::station::Entity",
        from = "Column::StationId",
        to = "super::station::Column::Id",
        on_delete = "Cascade"
    )]
    Station,
}

impl Related<super::station::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Station.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

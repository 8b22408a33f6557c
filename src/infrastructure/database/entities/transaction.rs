//! Transaction entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Internal globally-unique key (UUID)
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,

    pub station_id: String,

    pub connector_id: i32,

    /// On-wire id for OCPP 1.6; unique per station
    #[sea_orm(nullable)]
    pub wire_id_v16: Option<i32>,

    /// On-wire id for OCPP 2.0.1; unique per station
    #[sea_orm(nullable)]
    pub wire_id_v201: Option<String>,

    pub id_token: String,

    /// Meter reading at start (Wh)
    pub meter_start: i32,

    #[sea_orm(nullable)]
    pub meter_stop: Option<i32>,

    pub started_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub stopped_at: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub stop_reason: Option<String>,

    /// Status: Active, Completed, Aborted
    pub status: String,
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
    #[sea_orm(has_many = "super::meter_sample::Entity")]
    MeterSamples,
}

impl Related<super::station::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Station.def()
    }
}

impl Related<super::meter_sample::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MeterSamples.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

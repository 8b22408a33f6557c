//! Station entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "stations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    #[sea_orm(nullable)]
    pub vendor: Option<String>,

    #[sea_orm(nullable)]
    pub model: Option<String>,

    #[sea_orm(nullable)]
    pub firmware_version: Option<String>,

    /// Negotiated OCPP protocol version: "V16", "V201"
    #[sea_orm(nullable)]
    pub ocpp_version: Option<String>,

    /// Status: Online, Offline, Faulted, Unknown
    pub status: String,

    /// Heartbeat interval granted at boot (seconds)
    pub heartbeat_interval: i32,

    /// Blocked stations get Rejected at boot
    pub is_blocked: bool,

    /// Free-form geographic hint
    #[sea_orm(nullable)]
    pub location: Option<String>,

    #[sea_orm(nullable)]
    pub last_boot_at: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub last_heartbeat: Option<DateTimeUtc>,

    #[sea_orm(nullable)]
    pub last_charging_profile_id: Option<i32>,

    pub registered_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::connector::Entity")]
    Connectors,
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::connector::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Connectors.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

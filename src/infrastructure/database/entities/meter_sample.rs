//! Meter sample entity (per-transaction time series)

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "meter_samples")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub transaction_key: String,

    pub timestamp: DateTimeUtc,

    /// Energy.Active.Import.Register (Wh)
    #[sea_orm(nullable)]
    pub energy_wh: Option<f64>,

    /// Power.Active.Import (W)
    #[sea_orm(nullable)]
    pub power_w: Option<f64>,

    /// State of charge (%)
    #[sea_orm(nullable)]
    pub soc: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::transaction::Entity",
        from = "Column::TransactionKey",
        to = "super::transaction::Column::Key",
        on_delete = "Cascade"
    )]
    Transaction,
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

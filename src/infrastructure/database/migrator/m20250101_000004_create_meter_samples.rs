//! Create meter_samples table

use sea_orm_migration::prelude::*;

use super::m20250101_000003_create_transactions::Transactions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MeterSamples::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MeterSamples::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MeterSamples::TransactionKey)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(MeterSamples::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(MeterSamples::EnergyWh).double())
                    .col(ColumnDef::new(MeterSamples::PowerW).double())
                    .col(ColumnDef::new(MeterSamples::Soc).integer())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_meter_samples_transaction")
                            .from(MeterSamples::Table, MeterSamples::TransactionKey)
                            .to(Transactions::Table, Transactions::Key)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_meter_samples_transaction")
                    .table(MeterSamples::Table)
                    .col(MeterSamples::TransactionKey)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MeterSamples::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum MeterSamples {
    Table,
    Id,
    TransactionKey,
    Timestamp,
    EnergyWh,
    PowerW,
    Soc,
}

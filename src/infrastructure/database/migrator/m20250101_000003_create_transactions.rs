//! Create transactions table

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_stations::Stations;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Key)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::StationId).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::ConnectorId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::WireIdV16).integer())
                    .col(ColumnDef::new(Transactions::WireIdV201).string())
                    .col(ColumnDef::new(Transactions::IdToken).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::MeterStart)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::MeterStop).integer())
                    .col(
                        ColumnDef::new(Transactions::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::StoppedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Transactions::StopReason).string())
                    .col(
                        ColumnDef::new(Transactions::Status)
                            .string()
                            .not_null()
                            .default("Active"),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_station")
                            .from(Transactions::Table, Transactions::StationId)
                            .to(Stations::Table, Stations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // The two on-wire id spaces each get a per-station unique index.
        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_wire_v16")
                    .table(Transactions::Table)
                    .col(Transactions::StationId)
                    .col(Transactions::WireIdV16)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_wire_v201")
                    .table(Transactions::Table)
                    .col(Transactions::StationId)
                    .col(Transactions::WireIdV201)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_status")
                    .table(Transactions::Table)
                    .col(Transactions::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Transactions {
    Table,
    Key,
    StationId,
    ConnectorId,
    WireIdV16,
    WireIdV201,
    IdToken,
    MeterStart,
    MeterStop,
    StartedAt,
    StoppedAt,
    StopReason,
    Status,
}

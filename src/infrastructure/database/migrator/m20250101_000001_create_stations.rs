//! Create stations table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Stations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Stations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Stations::Vendor).string())
                    .col(ColumnDef::new(Stations::Model).string())
                    .col(ColumnDef::new(Stations::FirmwareVersion).string())
                    .col(ColumnDef::new(Stations::OcppVersion).string())
                    .col(
                        ColumnDef::new(Stations::Status)
                            .string()
                            .not_null()
                            .default("Unknown"),
                    )
                    .col(
                        ColumnDef::new(Stations::HeartbeatInterval)
                            .integer()
                            .not_null()
                            .default(300),
                    )
                    .col(
                        ColumnDef::new(Stations::IsBlocked)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Stations::Location).string())
                    .col(ColumnDef::new(Stations::LastBootAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Stations::LastHeartbeat).timestamp_with_time_zone())
                    .col(ColumnDef::new(Stations::LastChargingProfileId).integer())
                    .col(
                        ColumnDef::new(Stations::RegisteredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Stations::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stations_status")
                    .table(Stations::Table)
                    .col(Stations::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Stations::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Stations {
    Table,
    Id,
    Vendor,
    Model,
    FirmwareVersion,
    OcppVersion,
    Status,
    HeartbeatInterval,
    IsBlocked,
    Location,
    LastBootAt,
    LastHeartbeat,
    LastChargingProfileId,
    RegisteredAt,
    UpdatedAt,
}

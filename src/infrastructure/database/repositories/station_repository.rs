//! SeaORM implementation of StationRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};

use crate::domain::{
    Connector, ConnectorStatus, DomainResult, OcppVersion, Station, StationRepository,
    StationStatus,
};
use crate::infrastructure::database::entities::{connector, station};

use super::db_err;

pub struct SeaOrmStationRepository {
    db: DatabaseConnection,
}

impl SeaOrmStationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn station_from_model(model: station::Model, connectors: Vec<Connector>) -> Station {
    Station {
        id: model.id,
        ocpp_version: model.ocpp_version.as_deref().and_then(OcppVersion::from_tag),
        vendor: model.vendor,
        model: model.model,
        firmware_version: model.firmware_version,
        status: StationStatus::from(model.status.as_str()),
        heartbeat_interval: model.heartbeat_interval.max(0) as u32,
        is_blocked: model.is_blocked,
        location: model.location,
        last_boot_at: model.last_boot_at,
        last_heartbeat: model.last_heartbeat,
        last_charging_profile_id: model.last_charging_profile_id,
        registered_at: model.registered_at,
        connectors,
    }
}

fn station_to_active(station: &Station, now: DateTime<Utc>) -> station::ActiveModel {
    station::ActiveModel {
        id: Set(station.id.clone()),
        vendor: Set(station.vendor.clone()),
        model: Set(station.model.clone()),
        firmware_version: Set(station.firmware_version.clone()),
        ocpp_version: Set(station.ocpp_version.map(|v| v.as_tag().to_string())),
        status: Set(station.status.as_str().to_string()),
        heartbeat_interval: Set(station.heartbeat_interval as i32),
        is_blocked: Set(station.is_blocked),
        location: Set(station.location.clone()),
        last_boot_at: Set(station.last_boot_at),
        last_heartbeat: Set(station.last_heartbeat),
        last_charging_profile_id: Set(station.last_charging_profile_id),
        registered_at: Set(station.registered_at),
        updated_at: Set(Some(now)),
    }
}

fn connector_from_model(model: connector::Model) -> Connector {
    Connector {
        id: model.connector_id.max(0) as u32,
        status: ConnectorStatus::parse(&model.status).unwrap_or(ConnectorStatus::Unavailable),
        error_code: model.error_code,
        current_transaction: model.current_transaction_key,
        updated_at: model.updated_at,
    }
}

#[async_trait]
impl StationRepository for SeaOrmStationRepository {
    async fn save(&self, station: Station) -> DomainResult<()> {
        let active = station_to_active(&station, Utc::now());
        let exists = station::Entity::find_by_id(&station.id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .is_some();

        if exists {
            active.update(&self.db).await.map_err(db_err)?;
        } else {
            active.insert(&self.db).await.map_err(db_err)?;
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Station>> {
        let model = station::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        match model {
            Some(model) => {
                let connectors = connector::Entity::find()
                    .filter(connector::Column::StationId.eq(id))
                    .order_by_asc(connector::Column::ConnectorId)
                    .all(&self.db)
                    .await
                    .map_err(db_err)?
                    .into_iter()
                    .map(connector_from_model)
                    .collect();
                Ok(Some(station_from_model(model, connectors)))
            }
            None => Ok(None),
        }
    }

    async fn find_all(&self) -> DomainResult<Vec<Station>> {
        let models = station::Entity::find()
            .order_by_asc(station::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let mut out = Vec::with_capacity(models.len());
        for model in models {
            let connectors = connector::Entity::find()
                .filter(connector::Column::StationId.eq(model.id.as_str()))
                .order_by_asc(connector::Column::ConnectorId)
                .all(&self.db)
                .await
                .map_err(db_err)?
                .into_iter()
                .map(connector_from_model)
                .collect();
            out.push(station_from_model(model, connectors));
        }
        Ok(out)
    }

    async fn update_status(&self, id: &str, status: StationStatus) -> DomainResult<()> {
        if let Some(model) = station::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
        {
            let mut active = model.into_active_model();
            active.status = Set(status.as_str().to_string());
            active.updated_at = Set(Some(Utc::now()));
            active.update(&self.db).await.map_err(db_err)?;
        }
        Ok(())
    }

    async fn record_heartbeat(&self, id: &str, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(model) = station::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
        {
            let mut active = model.into_active_model();
            active.last_heartbeat = Set(Some(now));
            active.status = Set(StationStatus::Online.as_str().to_string());
            active.updated_at = Set(Some(now));
            active.update(&self.db).await.map_err(db_err)?;
        }
        Ok(())
    }

    async fn set_blocked(&self, id: &str, blocked: bool) -> DomainResult<()> {
        if let Some(model) = station::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
        {
            let mut active = model.into_active_model();
            active.is_blocked = Set(blocked);
            active.updated_at = Set(Some(Utc::now()));
            active.update(&self.db).await.map_err(db_err)?;
        }
        Ok(())
    }

    async fn set_last_charging_profile(&self, id: &str, profile_id: i32) -> DomainResult<()> {
        if let Some(model) = station::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
        {
            let mut active = model.into_active_model();
            active.last_charging_profile_id = Set(Some(profile_id));
            active.updated_at = Set(Some(Utc::now()));
            active.update(&self.db).await.map_err(db_err)?;
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        station::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn upsert_connector(&self, station_id: &str, c: Connector) -> DomainResult<()> {
        let existing = connector::Entity::find()
            .filter(connector::Column::StationId.eq(station_id))
            .filter(connector::Column::ConnectorId.eq(c.id as i32))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        match existing {
            Some(model) => {
                let mut active = model.into_active_model();
                active.status = Set(c.status.as_str().to_string());
                active.error_code = Set(c.error_code);
                active.current_transaction_key = Set(c.current_transaction);
                active.updated_at = Set(c.updated_at);
                active.update(&self.db).await.map_err(db_err)?;
            }
            None => {
                let active = connector::ActiveModel {
                    station_id: Set(station_id.to_string()),
                    connector_id: Set(c.id as i32),
                    status: Set(c.status.as_str().to_string()),
                    error_code: Set(c.error_code),
                    current_transaction_key: Set(c.current_transaction),
                    updated_at: Set(c.updated_at),
                    ..Default::default()
                };
                active.insert(&self.db).await.map_err(db_err)?;
            }
        }
        Ok(())
    }

    async fn find_connector(
        &self,
        station_id: &str,
        connector_id: u32,
    ) -> DomainResult<Option<Connector>> {
        let model = connector::Entity::find()
            .filter(connector::Column::StationId.eq(station_id))
            .filter(connector::Column::ConnectorId.eq(connector_id as i32))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(connector_from_model))
    }
}

//! SeaORM implementation of TransactionRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::domain::{
    DomainResult, MeterSample, Transaction, TransactionFilter, TransactionRepository,
    TransactionStatus,
};
use crate::infrastructure::database::entities::{meter_sample, transaction};

use super::db_err;

pub struct SeaOrmTransactionRepository {
    db: DatabaseConnection,
}

impl SeaOrmTransactionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn tx_from_model(model: transaction::Model) -> Transaction {
    Transaction {
        key: model.key,
        station_id: model.station_id,
        connector_id: model.connector_id.max(0) as u32,
        wire_id_v16: model.wire_id_v16,
        wire_id_v201: model.wire_id_v201,
        id_token: model.id_token,
        meter_start: model.meter_start,
        meter_stop: model.meter_stop,
        started_at: model.started_at,
        stopped_at: model.stopped_at,
        stop_reason: model.stop_reason,
        status: TransactionStatus::from(model.status.as_str()),
    }
}

fn tx_to_active(tx: &Transaction) -> transaction::ActiveModel {
    transaction::ActiveModel {
        key: Set(tx.key.clone()),
        station_id: Set(tx.station_id.clone()),
        connector_id: Set(tx.connector_id as i32),
        wire_id_v16: Set(tx.wire_id_v16),
        wire_id_v201: Set(tx.wire_id_v201.clone()),
        id_token: Set(tx.id_token.clone()),
        meter_start: Set(tx.meter_start),
        meter_stop: Set(tx.meter_stop),
        started_at: Set(tx.started_at),
        stopped_at: Set(tx.stopped_at),
        stop_reason: Set(tx.stop_reason.clone()),
        status: Set(tx.status.as_str().to_string()),
    }
}

#[async_trait]
impl TransactionRepository for SeaOrmTransactionRepository {
    async fn insert(&self, tx: Transaction) -> DomainResult<()> {
        tx_to_active(&tx).insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn update(&self, tx: Transaction) -> DomainResult<()> {
        tx_to_active(&tx).update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_key(&self, key: &str) -> DomainResult<Option<Transaction>> {
        let model = transaction::Entity::find_by_id(key)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(tx_from_model))
    }

    async fn find_by_wire_id_v16(
        &self,
        station_id: &str,
        wire_id: i32,
    ) -> DomainResult<Option<Transaction>> {
        let model = transaction::Entity::find()
            .filter(transaction::Column::StationId.eq(station_id))
            .filter(transaction::Column::WireIdV16.eq(wire_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(tx_from_model))
    }

    async fn find_by_wire_id_v201(
        &self,
        station_id: &str,
        wire_id: &str,
    ) -> DomainResult<Option<Transaction>> {
        let model = transaction::Entity::find()
            .filter(transaction::Column::StationId.eq(station_id))
            .filter(transaction::Column::WireIdV201.eq(wire_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(tx_from_model))
    }

    async fn find_active_for_connector(
        &self,
        station_id: &str,
        connector_id: u32,
    ) -> DomainResult<Option<Transaction>> {
        let model = transaction::Entity::find()
            .filter(transaction::Column::StationId.eq(station_id))
            .filter(transaction::Column::ConnectorId.eq(connector_id as i32))
            .filter(transaction::Column::Status.eq(TransactionStatus::Active.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(tx_from_model))
    }

    async fn find_active_for_token(&self, id_token: &str) -> DomainResult<Option<Transaction>> {
        let model = transaction::Entity::find()
            .filter(transaction::Column::IdToken.eq(id_token))
            .filter(transaction::Column::Status.eq(TransactionStatus::Active.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(tx_from_model))
    }

    async fn next_wire_id(&self, station_id: &str) -> DomainResult<i32> {
        let max: Option<Option<i32>> = transaction::Entity::find()
            .filter(transaction::Column::StationId.eq(station_id))
            .select_only()
            .column_as(transaction::Column::WireIdV16.max(), "max_wire_id")
            .into_tuple()
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(max.flatten().unwrap_or(0) + 1)
    }

    async fn list(&self, filter: TransactionFilter) -> DomainResult<Vec<Transaction>> {
        let mut query = transaction::Entity::find();
        if let Some(station_id) = &filter.station_id {
            query = query.filter(transaction::Column::StationId.eq(station_id.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(transaction::Column::Status.eq(status.as_str()));
        }
        query = query.order_by_desc(transaction::Column::StartedAt);
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        let models = query.all(&self.db).await.map_err(db_err)?;
        Ok(models.into_iter().map(tx_from_model).collect())
    }

    async fn append_samples(
        &self,
        transaction_key: &str,
        samples: &[MeterSample],
        cap: usize,
    ) -> DomainResult<()> {
        if samples.is_empty() {
            return Ok(());
        }

        let rows: Vec<meter_sample::ActiveModel> = samples
            .iter()
            .map(|s| meter_sample::ActiveModel {
                transaction_key: Set(transaction_key.to_string()),
                timestamp: Set(s.timestamp),
                energy_wh: Set(s.energy_wh),
                power_w: Set(s.power_w),
                soc: Set(s.soc),
                ..Default::default()
            })
            .collect();
        meter_sample::Entity::insert_many(rows)
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        // Bounded buffer: drop the oldest rows past the cap.
        let count = meter_sample::Entity::find()
            .filter(meter_sample::Column::TransactionKey.eq(transaction_key))
            .count(&self.db)
            .await
            .map_err(db_err)?;

        if count as usize > cap {
            let excess = count as usize - cap;
            let stale: Vec<i32> = meter_sample::Entity::find()
                .filter(meter_sample::Column::TransactionKey.eq(transaction_key))
                .order_by_asc(meter_sample::Column::Id)
                .limit(excess as u64)
                .all(&self.db)
                .await
                .map_err(db_err)?
                .into_iter()
                .map(|m| m.id)
                .collect();
            meter_sample::Entity::delete_many()
                .filter(meter_sample::Column::Id.is_in(stale))
                .exec(&self.db)
                .await
                .map_err(db_err)?;
        }

        Ok(())
    }

    async fn samples_for(&self, transaction_key: &str) -> DomainResult<Vec<MeterSample>> {
        let models = meter_sample::Entity::find()
            .filter(meter_sample::Column::TransactionKey.eq(transaction_key))
            .order_by_asc(meter_sample::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(models
            .into_iter()
            .map(|m| MeterSample {
                timestamp: m.timestamp,
                energy_wh: m.energy_wh,
                power_w: m.power_w,
                soc: m.soc,
            })
            .collect())
    }
}

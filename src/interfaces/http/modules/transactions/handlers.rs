//! Transaction REST handlers

use axum::extract::{Path, Query, State};
use axum::Json;

use crate::domain::{TransactionFilter, TransactionStatus};
use crate::interfaces::http::error::ApiError;
use crate::interfaces::http::router::ApiState;

use super::dto::{ListTransactionsQuery, MeterSampleDto, TransactionDetailDto, TransactionDto};

pub async fn list_transactions(
    State(state): State<ApiState>,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<Vec<TransactionDto>>, ApiError> {
    let status = match query.status.as_deref() {
        None => None,
        Some("Active") => Some(TransactionStatus::Active),
        Some("Completed") => Some(TransactionStatus::Completed),
        Some("Aborted") => Some(TransactionStatus::Aborted),
        Some(other) => {
            return Err(ApiError::bad_request(format!(
                "unknown transaction status: {}",
                other
            )))
        }
    };

    let filter = TransactionFilter {
        station_id: query.station_id,
        status,
        limit: Some(query.limit.unwrap_or(100).min(1000)),
    };

    let transactions = state.services.transactions.list(filter).await?;
    Ok(Json(transactions.iter().map(TransactionDto::from).collect()))
}

pub async fn get_transaction(
    State(state): State<ApiState>,
    Path(key): Path<String>,
) -> Result<Json<TransactionDetailDto>, ApiError> {
    let tx = state
        .services
        .transactions
        .get_by_key(&key)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("transaction not found: {}", key)))?;

    let samples = state.services.transactions.samples_for(&key).await?;

    Ok(Json(TransactionDetailDto {
        transaction: TransactionDto::from(&tx),
        samples: samples.iter().map(MeterSampleDto::from).collect(),
    }))
}

//! Station REST handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use validator::Validate;

use crate::interfaces::http::error::ApiError;
use crate::interfaces::http::router::ApiState;

use super::dto::{RegisterStationRequest, StationDto};

pub async fn list_stations(
    State(state): State<ApiState>,
) -> Result<Json<Vec<StationDto>>, ApiError> {
    let stations = state.services.stations.list_stations().await?;
    let dtos = stations
        .iter()
        .map(|s| StationDto::from_station(s, state.registry.is_connected(&s.id)))
        .collect();
    Ok(Json(dtos))
}

pub async fn get_station(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<StationDto>, ApiError> {
    let station = state
        .services
        .stations
        .get_station(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("station not found: {}", id)))?;
    Ok(Json(StationDto::from_station(
        &station,
        state.registry.is_connected(&id),
    )))
}

pub async fn register_station(
    State(state): State<ApiState>,
    Json(body): Json<RegisterStationRequest>,
) -> Result<(StatusCode, Json<StationDto>), ApiError> {
    body.validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    let station = state
        .services
        .stations
        .register_station(&body.station_id, body.location)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(StationDto::from_station(&station, false)),
    ))
}

pub async fn block_station(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.services.stations.set_blocked(&id, true).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unblock_station(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.services.stations.set_blocked(&id, false).await?;
    Ok(StatusCode::NO_CONTENT)
}

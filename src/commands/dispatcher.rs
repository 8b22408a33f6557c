//! Command dispatcher — resolves the station's OCPP version and
//! delegates to the v16 or v201 implementation.
//!
//! Single entry point for HTTP handlers to issue CSMS -> CP commands.

use std::sync::Arc;

use tracing::info;

use crate::commands::{v16, v201, Availability, ConfigurationResult, DataTransferResult, ResetKind, TriggerType};
use crate::dispatch::outbound::{CommandError, SharedCommandSender};
use crate::domain::OcppVersion;
use crate::services::StationService;
use crate::session::ConnectionRegistry;

pub use crate::commands::v201::get_variables::GetVariablesResult;
pub use crate::commands::v201::set_variables::SetVariablesResult;

/// Version-aware command dispatcher.
pub struct CommandDispatcher {
    command_sender: SharedCommandSender,
    registry: Arc<ConnectionRegistry>,
    stations: Arc<StationService>,
}

impl CommandDispatcher {
    pub fn new(
        command_sender: SharedCommandSender,
        registry: Arc<ConnectionRegistry>,
        stations: Arc<StationService>,
    ) -> Self {
        Self {
            command_sender,
            registry,
            stations,
        }
    }

    fn resolve_version(&self, station_id: &str) -> Result<OcppVersion, CommandError> {
        self.registry
            .get_version(station_id)
            .ok_or_else(|| CommandError::StationNotConnected(station_id.to_string()))
    }

    pub fn command_sender(&self) -> &SharedCommandSender {
        &self.command_sender
    }

    // ─── Remote start / stop ───────────────────────────────────────────

    pub async fn remote_start(
        &self,
        station_id: &str,
        id_tag: &str,
        connector_id: Option<u32>,
    ) -> Result<String, CommandError> {
        let version = self.resolve_version(station_id)?;
        info!(%version, "Dispatching RemoteStart");

        match version {
            OcppVersion::V16 => {
                v16::remote_start::remote_start_transaction(
                    &self.command_sender,
                    station_id,
                    id_tag,
                    connector_id,
                )
                .await
            }
            OcppVersion::V201 => {
                let evse_id = connector_id.map(|c| c as i32);
                v201::remote_start::remote_start_transaction(
                    &self.command_sender,
                    station_id,
                    id_tag,
                    evse_id,
                )
                .await
            }
        }
    }

    /// `transaction_id` is the 1.6 integer wire id; for a 2.0.1 station
    /// the transaction's string wire id must be supplied instead.
    pub async fn remote_stop(
        &self,
        station_id: &str,
        transaction_id: &str,
    ) -> Result<String, CommandError> {
        let version = self.resolve_version(station_id)?;
        info!(%version, "Dispatching RemoteStop");

        match version {
            OcppVersion::V16 => {
                let wire_id: i32 = transaction_id.parse().map_err(|_| {
                    CommandError::ValidationError(format!(
                        "'{}' is not a 1.6 integer transaction id",
                        transaction_id
                    ))
                })?;
                v16::remote_stop::remote_stop_transaction(
                    &self.command_sender,
                    station_id,
                    wire_id,
                )
                .await
            }
            OcppVersion::V201 => {
                v201::remote_stop::remote_stop_transaction(
                    &self.command_sender,
                    station_id,
                    transaction_id,
                )
                .await
            }
        }
    }

    // ─── Reset ─────────────────────────────────────────────────────────

    pub async fn reset(
        &self,
        station_id: &str,
        reset_type: ResetKind,
    ) -> Result<String, CommandError> {
        let version = self.resolve_version(station_id)?;
        info!(%version, "Dispatching Reset");

        match version {
            OcppVersion::V16 => {
                v16::reset::reset(&self.command_sender, station_id, reset_type).await
            }
            OcppVersion::V201 => {
                v201::reset::reset(&self.command_sender, station_id, reset_type, None).await
            }
        }
    }

    // ─── Change availability ───────────────────────────────────────────

    pub async fn change_availability(
        &self,
        station_id: &str,
        connector_id: u32,
        availability: Availability,
    ) -> Result<String, CommandError> {
        let version = self.resolve_version(station_id)?;
        info!(%version, "Dispatching ChangeAvailability");

        match version {
            OcppVersion::V16 => {
                v16::change_availability::change_availability(
                    &self.command_sender,
                    station_id,
                    connector_id,
                    availability,
                )
                .await
            }
            OcppVersion::V201 => {
                v201::change_availability::change_availability(
                    &self.command_sender,
                    station_id,
                    connector_id as i32,
                    availability,
                )
                .await
            }
        }
    }

    // ─── Unlock connector ──────────────────────────────────────────────

    pub async fn unlock_connector(
        &self,
        station_id: &str,
        connector_id: u32,
    ) -> Result<String, CommandError> {
        let version = self.resolve_version(station_id)?;
        info!(%version, "Dispatching UnlockConnector");

        match version {
            OcppVersion::V16 => {
                v16::unlock_connector::unlock_connector(
                    &self.command_sender,
                    station_id,
                    connector_id,
                )
                .await
            }
            OcppVersion::V201 => {
                // One connector per EVSE: the domain connector id is the
                // EVSE id, the connector within it is 1.
                v201::unlock_connector::unlock_connector(
                    &self.command_sender,
                    station_id,
                    connector_id as i32,
                    1,
                )
                .await
            }
        }
    }

    // ─── Clear cache ───────────────────────────────────────────────────

    pub async fn clear_cache(&self, station_id: &str) -> Result<String, CommandError> {
        let version = self.resolve_version(station_id)?;
        info!(%version, "Dispatching ClearCache");

        match version {
            OcppVersion::V16 => {
                v16::clear_cache::clear_cache(&self.command_sender, station_id).await
            }
            OcppVersion::V201 => {
                v201::clear_cache::clear_cache(&self.command_sender, station_id).await
            }
        }
    }

    // ─── Trigger message ───────────────────────────────────────────────

    pub async fn trigger_message(
        &self,
        station_id: &str,
        requested_message: TriggerType,
        connector_id: Option<u32>,
    ) -> Result<String, CommandError> {
        let version = self.resolve_version(station_id)?;
        info!(%version, "Dispatching TriggerMessage");

        match version {
            OcppVersion::V16 => {
                v16::trigger_message::trigger_message(
                    &self.command_sender,
                    station_id,
                    requested_message,
                    connector_id,
                )
                .await
            }
            OcppVersion::V201 => {
                let evse_id = connector_id.map(|c| c as i32);
                v201::trigger_message::trigger_message(
                    &self.command_sender,
                    station_id,
                    requested_message,
                    evse_id,
                )
                .await
            }
        }
    }

    // ─── Data transfer ─────────────────────────────────────────────────

    pub async fn data_transfer(
        &self,
        station_id: &str,
        vendor_id: String,
        message_id: Option<String>,
        data: Option<String>,
    ) -> Result<DataTransferResult, CommandError> {
        let version = self.resolve_version(station_id)?;
        info!(%version, "Dispatching DataTransfer");

        match version {
            OcppVersion::V16 => {
                v16::data_transfer::data_transfer(
                    &self.command_sender,
                    station_id,
                    vendor_id,
                    message_id,
                    data,
                )
                .await
            }
            OcppVersion::V201 => {
                v201::data_transfer::data_transfer(
                    &self.command_sender,
                    station_id,
                    vendor_id,
                    message_id,
                    data,
                )
                .await
            }
        }
    }

    // ─── Configuration (v1.6) / variables (v2.0.1) ─────────────────────

    /// GetConfiguration — v1.6 only; use [`Self::get_variables`] for
    /// 2.0.1 stations.
    pub async fn get_configuration(
        &self,
        station_id: &str,
        keys: Option<Vec<String>>,
    ) -> Result<ConfigurationResult, CommandError> {
        match self.resolve_version(station_id)? {
            OcppVersion::V16 => {
                v16::get_configuration::get_configuration(&self.command_sender, station_id, keys)
                    .await
            }
            OcppVersion::V201 => Err(CommandError::NotSupported(
                "GetConfiguration is not available in OCPP 2.0.1; use GetVariables".to_string(),
            )),
        }
    }

    /// ChangeConfiguration — v1.6 only; use [`Self::set_variables`] for
    /// 2.0.1 stations.
    pub async fn change_configuration(
        &self,
        station_id: &str,
        key: String,
        value: String,
    ) -> Result<String, CommandError> {
        match self.resolve_version(station_id)? {
            OcppVersion::V16 => {
                v16::change_configuration::change_configuration(
                    &self.command_sender,
                    station_id,
                    key,
                    value,
                )
                .await
            }
            OcppVersion::V201 => Err(CommandError::NotSupported(
                "ChangeConfiguration is not available in OCPP 2.0.1; use SetVariables".to_string(),
            )),
        }
    }

    /// GetVariables — v2.0.1 only.
    pub async fn get_variables(
        &self,
        station_id: &str,
        variables: Vec<(String, String)>,
    ) -> Result<GetVariablesResult, CommandError> {
        match self.resolve_version(station_id)? {
            OcppVersion::V16 => Err(CommandError::NotSupported(
                "GetVariables is not available in OCPP 1.6; use GetConfiguration".to_string(),
            )),
            OcppVersion::V201 => {
                v201::get_variables::get_variables(&self.command_sender, station_id, variables)
                    .await
            }
        }
    }

    /// SetVariables — v2.0.1 only.
    pub async fn set_variables(
        &self,
        station_id: &str,
        variables: Vec<(String, String, String)>,
    ) -> Result<SetVariablesResult, CommandError> {
        match self.resolve_version(station_id)? {
            OcppVersion::V16 => Err(CommandError::NotSupported(
                "SetVariables is not available in OCPP 1.6; use ChangeConfiguration".to_string(),
            )),
            OcppVersion::V201 => {
                v201::set_variables::set_variables(&self.command_sender, station_id, variables)
                    .await
            }
        }
    }

    // ─── Set charging profile ──────────────────────────────────────────

    /// SetChargingProfile — pass-through to the station; the last-sent
    /// profile id is remembered on the station row.
    pub async fn set_charging_profile(
        &self,
        station_id: &str,
        connector_or_evse_id: i32,
        charging_profile_json: serde_json::Value,
    ) -> Result<String, CommandError> {
        let version = self.resolve_version(station_id)?;
        info!(%version, "Dispatching SetChargingProfile");

        let (status, profile_id) = match version {
            OcppVersion::V16 => {
                v16::set_charging_profile::set_charging_profile(
                    &self.command_sender,
                    station_id,
                    connector_or_evse_id,
                    charging_profile_json,
                )
                .await?
            }
            OcppVersion::V201 => {
                v201::set_charging_profile::set_charging_profile(
                    &self.command_sender,
                    station_id,
                    connector_or_evse_id,
                    charging_profile_json,
                )
                .await?
            }
        };

        if let Err(e) = self.stations.record_charging_profile(station_id, profile_id).await {
            tracing::warn!(station_id, profile_id, error = %e, "Failed to record charging profile id");
        }

        Ok(status)
    }
}

/// Shared, reference-counted command dispatcher.
pub type SharedCommandDispatcher = Arc<CommandDispatcher>;

pub fn create_command_dispatcher(
    command_sender: SharedCommandSender,
    registry: Arc<ConnectionRegistry>,
    stations: Arc<StationService>,
) -> SharedCommandDispatcher {
    Arc::new(CommandDispatcher::new(command_sender, registry, stations))
}

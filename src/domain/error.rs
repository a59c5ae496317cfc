// Domain errors surfaced by the monitoring core
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    #[error("no schematic available for vehicle type '{0}'")]
    UnknownVehicleType(String),

    #[error("position '{0}' is not part of the active topology")]
    UnknownPosition(String),

    #[error("vehicle '{0}' is not registered")]
    UnknownVehicle(String),

    #[error("no vehicle is selected for monitoring")]
    NoVehicleSelected,

    #[error("position '{0}' appears more than once in a topology")]
    DuplicatePosition(String),
}

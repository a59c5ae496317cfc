// Domain layer - Pure tire telemetry model
pub mod alert;
pub mod dashboard;
pub mod error;
pub mod reading;
pub mod session;
pub mod topology;
pub mod vehicle;

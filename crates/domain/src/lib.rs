pub mod entities;
pub mod ports;
pub mod repositories;

pub use entities::*;
pub use ports::*;
pub use repositories::*;
pub use telemetry_core::{TelemetryError, TelemetryResult};

pub mod config;
pub mod errors;
pub mod logging;
pub mod timing;

pub use errors::{TelemetryError, TelemetryResult};
pub use logging::{LogFormat, LogLevel};
pub use timing::StageTimer;

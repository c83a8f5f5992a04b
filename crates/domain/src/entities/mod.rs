mod device;
mod metrics;

pub use device::*;
pub use metrics::*;

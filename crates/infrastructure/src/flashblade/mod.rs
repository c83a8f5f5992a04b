//! FlashBlade REST client and collector.

mod client;
mod collector;
pub mod types;

pub use client::{file_system_performance_endpoint, FlashBladeApi, FlashBladeClient};
pub use collector::FlashBladeCollector;

//! FlashArray REST client and collector.

mod client;
mod collector;
pub mod types;

pub use client::{FlashArrayApi, FlashArrayClient};
pub use collector::FlashArrayCollector;

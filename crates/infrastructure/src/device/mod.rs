//! Unified protocol client shared by every device family.

mod client;
mod family;

pub use client::{first_item, DeviceClient, DeviceResponse};
pub use family::{
    select_api_version, DeviceClientSettings, DeviceFamily, SessionAuth, FLASH_ARRAY, FLASH_BLADE,
    REQUEST_ATTEMPT_COUNT, SERVER_ERROR_BACKOFF,
};

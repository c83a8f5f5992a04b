//! Device protocol clients, collectors and the store/metadata
//! collaborators behind the domain traits.

pub mod device;
pub mod factory;
pub mod flasharray;
pub mod flashblade;
pub mod join;
pub mod metadata;
pub mod store;

pub use device::{DeviceClient, DeviceClientSettings, DeviceFamily, SessionAuth};
pub use factory::RestCollectorFactory;
pub use flasharray::{FlashArrayClient, FlashArrayCollector};
pub use flashblade::{FlashBladeClient, FlashBladeCollector};
pub use join::join_all_named;
pub use metadata::{ApiServerConnection, InMemoryMetadata};
pub use store::{Clock, FileMetricsStore, InMemoryMetricsStore};

//! Array metadata and discovery collaborators.

mod apiserver;
mod memory;

pub use apiserver::ApiServerConnection;
pub use memory::InMemoryMetadata;

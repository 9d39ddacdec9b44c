// ABOUTME: Host-manager registry boundary: trait, errors, and adapters.
// ABOUTME: HTTP adapter for a real admin endpoint, memory adapter for tests.

mod error;
mod http;
mod memory;
mod registry;

pub use error::{RegistryError, RegistryErrorKind};
pub use http::HttpRegistry;
pub use memory::{AppRecord, FailPoint, MemoryRegistry, PoolRecord, SiteRecord};
pub use registry::HostRegistry;

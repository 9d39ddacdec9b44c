// ABOUTME: Validated domain types shared across the crate.
// ABOUTME: Pool names, virtual paths, and phantom-typed registry handles.

mod id;
mod pool_name;
mod virtual_path;

pub use id::{AppHandle, AppMarker, Id, PoolHandle, PoolMarker, SiteHandle, SiteMarker};
pub use pool_name::{PoolName, PoolNameError};
pub use virtual_path::{VirtualPath, VirtualPathError};

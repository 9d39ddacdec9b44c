// ABOUTME: Registry error types with SNAFU pattern.
// ABOUTME: Unifies transport and resource errors for programmatic handling.

use snafu::Snafu;

/// Unified error for host-manager registry operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RegistryError {
    #[snafu(display("pool not found: {name}"))]
    PoolNotFound { name: String },

    #[snafu(display("site not found: {name}"))]
    SiteNotFound { name: String },

    #[snafu(display("application not found: {path}"))]
    ApplicationNotFound { path: String },

    #[snafu(display("resource already exists: {name}"))]
    AlreadyExists { name: String },

    #[snafu(display("registry access denied: {message}"))]
    Denied { message: String },

    #[snafu(display("registry transport failure: {message}"))]
    Transport { message: String },

    #[snafu(display("unexpected registry response: {message}"))]
    Protocol { message: String },
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryErrorKind {
    /// The named pool, site, or application does not exist.
    NotFound,
    /// A resource with the requested name already exists.
    AlreadyExists,
    /// The caller lacks permission on the admin surface.
    Denied,
    /// Network or IPC failure talking to the registry.
    Transport,
    /// The registry answered with something the adapter cannot interpret.
    Protocol,
}

impl RegistryError {
    /// Returns the error kind for programmatic handling.
    pub fn kind(&self) -> RegistryErrorKind {
        match self {
            RegistryError::PoolNotFound { .. }
            | RegistryError::SiteNotFound { .. }
            | RegistryError::ApplicationNotFound { .. } => RegistryErrorKind::NotFound,
            RegistryError::AlreadyExists { .. } => RegistryErrorKind::AlreadyExists,
            RegistryError::Denied { .. } => RegistryErrorKind::Denied,
            RegistryError::Transport { .. } => RegistryErrorKind::Transport,
            RegistryError::Protocol { .. } => RegistryErrorKind::Protocol,
        }
    }
}

// ABOUTME: Library root for testdock - test-harness deployment orchestration.
// ABOUTME: The main binary is in main.rs.

pub mod deploy;
pub mod diagnostics;
pub mod error;
pub mod host;
pub mod params;
pub mod publish;
pub mod types;
pub mod webconfig;

//! Client log discovery.
//!
//! Resolves the absolute path of the game's `Client.txt` by checking, in
//! order: an explicit override, the known Steam library layouts, and a
//! bounded probe of Wine/Proton prefixes used by third-party launchers.
//! Resolution is read-only and returns `Ok(None)` when nothing matches;
//! callers retry later.

pub mod layouts;
pub mod library;
pub mod locator;
pub mod paths;
pub mod probe;

use std::path::PathBuf;

pub use layouts::{Base, GameInstall, ProbeRoot, RootTemplate};
pub use locator::{FixedPath, Locate, Locator, LocatorConfig};

/// Environment variable carrying an explicit client log path.
pub const OVERRIDE_ENV: &str = "ZONEWATCH_CLIENT_LOG";

/// Errors for log discovery.
///
/// A failed search is not an error; only a broken explicit override is.
#[derive(Debug, thiserror::Error)]
pub enum LocateError {
    #[error("client log override from {source_name} is invalid: {}: {reason}", path.display())]
    InvalidOverride {
        source_name: String,
        path: PathBuf,
        reason: String,
    },
}

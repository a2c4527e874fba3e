//! Mirror configuration
//!
//! Configuration is read once from a `cms-mirror.toml` file, overridden from
//! the command line, and validated before any network or disk access.

mod fetch;
mod settings;

pub use fetch::FetchSettings;
pub use settings::{DEFAULT_CONFIG_FILE, DomainSettings, MirrorConfig};

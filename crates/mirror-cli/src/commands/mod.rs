//! Command implementations

mod status;
mod sync;

use std::path::Path;

use mirror_core::MirrorConfig;
use mirror_core::config::DEFAULT_CONFIG_FILE;

use crate::error::Result;

pub use status::run_status;
pub use sync::{SyncOptions, run_sync};

/// Load the configuration named on the command line, or the default file
/// from the working directory when it exists.
fn load_config(path: Option<&Path>) -> Result<MirrorConfig> {
    let config = match path {
        Some(path) => MirrorConfig::load(path)?,
        None => MirrorConfig::load_or_default(Path::new(DEFAULT_CONFIG_FILE))?,
    };
    Ok(config)
}

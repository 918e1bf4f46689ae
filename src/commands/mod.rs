pub mod config;
pub mod convert;
pub mod page;

use rolys::config::Config;
use rolys::Result;

use crate::cli::Cli;

/// Load config and apply global CLI overrides
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load()?;
    if let Some(ref dir) = cli.download_dir {
        config.downloads.dir = Some(dir.clone());
    }
    if let Some(ref selector) = cli.selector {
        config.page.region_selector = selector.clone();
    }
    Ok(config)
}

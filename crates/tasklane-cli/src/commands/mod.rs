pub mod consume;
pub mod describe;
pub mod reconcile;

use std::path::Path;

use anyhow::{Context, Result};
use tasklane_core::app::{App, AppBuilder};
use tasklane_core::config::ConfigLoader;

pub fn load_app(config: Option<&Path>) -> Result<App> {
    let config = ConfigLoader::new()
        .load(config)
        .context("failed to load configuration")?;
    AppBuilder::new(config)
        .build()
        .context("failed to build application")
}

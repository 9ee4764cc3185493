//! Application context shared across route handlers via axum state.

use std::sync::Arc;

use mf_av::ToolRegistry;
use mf_core::config::Config;
use mf_pipeline::{AssetSource, Dispatcher};

use crate::storage::FsAssetSource;

/// Everything a request needs, cheap to clone.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub dispatcher: Dispatcher,
    pub assets: Arc<dyn AssetSource>,
    pub tools: ToolRegistry,
}

impl AppContext {
    pub fn new(config: Config, tools: ToolRegistry, assets: Arc<dyn AssetSource>) -> Self {
        let dispatcher = Dispatcher::from_config(&config.pipeline, tools.clone());
        Self {
            config: Arc::new(config),
            dispatcher,
            assets,
            tools,
        }
    }

    /// Discover tools and serve assets from the configured storage root.
    pub fn from_config(config: Config) -> Self {
        let tools = ToolRegistry::discover(&config.tools);
        let assets = Arc::new(FsAssetSource::new(config.storage.root.clone()));
        Self::new(config, tools, assets)
    }
}

// Store connection settings, read from an optional config file with
// environment overrides (TRIPOD_SERVER and friends).

use serde::Deserialize;
use tracing::info;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Base URL of the store, e.g. `http://localhost:7200`.
    pub server: String,
    /// Repository name under the server.
    pub repository: String,
    /// Name of the shared prefix context to attach to.
    pub context: String,
    /// IRI of the named graph entities live in.
    pub graph: String,
}

impl StoreConfig {
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("server", "http://localhost:7200")?
            .set_default("repository", "tripod")?
            .set_default("context", "default")?
            .set_default("graph", "http://tripod.dev/graph/data")?;
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        builder = builder.add_source(config::Environment::with_prefix("TRIPOD"));
        let settings: StoreConfig = builder.build()?.try_deserialize()?;
        info!(
            server = settings.server,
            repository = settings.repository,
            "loaded store configuration"
        );
        Ok(settings)
    }
}

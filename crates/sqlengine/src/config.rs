//! Engine configuration loaded from JSON.
//!
//! ```json
//! {
//!   "mode": "read_write",
//!   "pool": { "max_size": 10, "idle_time_ms": 30000 },
//!   "sources": [
//!     "sqlite:///var/lib/app/app.db#main",
//!     { "id": "reports", "dialect": "SQLITE", "db": "/var/lib/app/reports.db" }
//!   ]
//! }
//! ```

use crate::engine::Mode;
use serde::{Deserialize, Serialize};
use sqlengine_core::{DialectRegistry, DriverRegistry, Error, Result, SqlSource};
use sqlengine_pool::{ConnectionPool, PoolConfig};
use std::path::Path;
use std::sync::Arc;

/// Pool tuning, data sources and the default engine mode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineConfig {
    pub mode: Mode,
    pub pool: PoolConfig,
    pub sources: Vec<SqlSource>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SourceEntry {
    Url(String),
    Full(SqlSource),
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    mode: Mode,
    pool: PoolConfig,
    sources: Vec<SourceEntry>,
}

impl EngineConfig {
    /// Read and parse a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loading engine configuration");
        Self::from_json(&text)
    }

    /// Parse a JSON configuration.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(text)?;
        let sources = raw
            .sources
            .into_iter()
            .map(|entry| match entry {
                SourceEntry::Url(url) => SqlSource::parse(&url),
                SourceEntry::Full(mut source) => {
                    source.dialect = source.dialect.to_uppercase();
                    source.driver = source.driver.to_uppercase();
                    if source.id.is_empty() {
                        source.id = source.format(true);
                    }
                    Ok(source)
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let mut seen = std::collections::BTreeSet::new();
        for source in &sources {
            if !seen.insert(source.id.as_str()) {
                return Err(Error::config(format!("Duplicate source id: {}", source.id)));
            }
        }

        Ok(Self {
            mode: raw.mode,
            pool: raw.pool,
            sources,
        })
    }

    /// Find a configured source by id.
    pub fn source(&self, id: &str) -> Option<&SqlSource> {
        self.sources.iter().find(|s| s.id == id)
    }

    /// Start a pool with every configured source registered.
    pub fn build_pool(
        &self,
        drivers: Arc<DriverRegistry>,
        dialects: Arc<DialectRegistry>,
    ) -> Result<Arc<ConnectionPool>> {
        let pool = ConnectionPool::new(self.pool.clone(), drivers, dialects)?;
        for source in &self.sources {
            pool.add_source(source.clone())?;
        }
        Ok(Arc::new(pool))
    }
}

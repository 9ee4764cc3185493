//! Filesystem asset storage.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use mf_core::{Error, Result};
use mf_pipeline::AssetSource;

/// Reads assets from files directly under a root directory.
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a public id to a file below the root.
    ///
    /// Only plain relative paths are accepted; `..`, absolute paths and
    /// backslashes are rejected.
    pub fn resolve(&self, public_id: &str) -> Result<PathBuf> {
        if public_id.is_empty() || public_id.contains('\\') {
            return Err(Error::Validation(format!("Invalid asset id: {public_id:?}")));
        }
        let relative = Path::new(public_id);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(Error::Validation(format!("Invalid asset id: {public_id:?}")));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AssetSource for FsAssetSource {
    async fn read_asset(&self, public_id: &str) -> Result<Bytes> {
        let path = self.resolve(public_id)?;
        match tokio::fs::read(&path).await {
            Ok(data) => {
                debug!("Read asset {} ({} bytes)", path.display(), data.len());
                Ok(Bytes::from(data))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::not_found("asset", public_id))
            }
            Err(e) => Err(Error::Io { source: e }),
        }
    }
}

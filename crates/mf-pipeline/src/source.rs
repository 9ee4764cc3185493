//! Asset source collaborator.

use async_trait::async_trait;
use bytes::Bytes;

use mf_core::Result;

/// Reads stored source assets by public id.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Return the bytes of `public_id`, failing with
    /// [`mf_core::Error::NotFound`] when it does not exist.
    async fn read_asset(&self, public_id: &str) -> Result<Bytes>;
}

#[cfg(test)]
pub(crate) use memory::MemoryAssetSource;

//! RecordStore port - operation record の永続化
//!
//! Each stage persists its record twice: once pending (create, the store
//! assigns the id) and once final (update of the same id).

use async_trait::async_trait;

use crate::domain::{BuildRecord, DeploymentRecord, PushedArtifactRecord, ReleaseRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// RecordStore は operation record の正本（source of truth）
///
/// # 設計原則
/// - `id` が `None` の record は create、`Some` なら同じ id への update
/// - 戻り値は永続化された record（create 時は採番済み）
/// - update は冪等（同じ内容を何度 upsert しても 1 件）
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn upsert_build(&self, build: BuildRecord) -> Result<BuildRecord, StoreError>;

    async fn upsert_pushed_artifact(
        &self,
        artifact: PushedArtifactRecord,
    ) -> Result<PushedArtifactRecord, StoreError>;

    async fn upsert_deployment(
        &self,
        deployment: DeploymentRecord,
    ) -> Result<DeploymentRecord, StoreError>;

    async fn upsert_release(&self, release: ReleaseRecord) -> Result<ReleaseRecord, StoreError>;
}

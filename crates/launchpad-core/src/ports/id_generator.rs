//! IdGenerator port - ID 生成の抽象化
//!
//! Record stores assign ids on first persist through this trait.
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ids::{BuildId, DeploymentId, PushedArtifactId, ReleaseId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は record の ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数スレッドから使える）
pub trait IdGenerator: Send + Sync {
    fn generate_build_id(&self) -> BuildId;

    fn generate_pushed_artifact_id(&self) -> PushedArtifactId;

    fn generate_deployment_id(&self) -> DeploymentId;

    fn generate_release_id(&self) -> ReleaseId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// これにより、テスト時に FixedClock を使って timestamp 部分を固定できます。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis() as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_build_id(&self) -> BuildId {
        BuildId::from(self.next())
    }

    fn generate_pushed_artifact_id(&self) -> PushedArtifactId {
        PushedArtifactId::from(self.next())
    }

    fn generate_deployment_id(&self) -> DeploymentId {
        DeploymentId::from(self.next())
    }

    fn generate_release_id(&self) -> ReleaseId {
        ReleaseId::from(self.next())
    }
}

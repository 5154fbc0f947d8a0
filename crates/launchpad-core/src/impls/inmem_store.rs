//! InMemoryRecordStore - 開発用・テスト用の record store
//!
//! Records live in one `BTreeMap` per record kind behind a tokio `Mutex`.
//! Ids come from an `IdGenerator`, so they sort by creation time.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    BuildId, BuildRecord, DeploymentId, DeploymentRecord, PushedArtifactId, PushedArtifactRecord,
    ReleaseId, ReleaseRecord,
};
use crate::ports::{IdGenerator, RecordStore, StoreError, SystemClock, UlidGenerator};

/// A record kind with a store-assigned id.
trait Stored: Clone {
    type Id: Ord + Copy + fmt::Display;

    fn id_slot(&mut self) -> &mut Option<Self::Id>;
}

impl Stored for BuildRecord {
    type Id = BuildId;

    fn id_slot(&mut self) -> &mut Option<BuildId> {
        &mut self.id
    }
}

impl Stored for PushedArtifactRecord {
    type Id = PushedArtifactId;

    fn id_slot(&mut self) -> &mut Option<PushedArtifactId> {
        &mut self.id
    }
}

impl Stored for DeploymentRecord {
    type Id = DeploymentId;

    fn id_slot(&mut self) -> &mut Option<DeploymentId> {
        &mut self.id
    }
}

impl Stored for ReleaseRecord {
    type Id = ReleaseId;

    fn id_slot(&mut self) -> &mut Option<ReleaseId> {
        &mut self.id
    }
}

/// Create when the record has no id yet, otherwise replace the stored copy.
fn upsert<R: Stored>(
    records: &mut BTreeMap<R::Id, R>,
    mut record: R,
    next_id: impl FnOnce() -> R::Id,
) -> Result<R, StoreError> {
    let current = *record.id_slot();
    let id = match current {
        Some(id) if records.contains_key(&id) => id,
        Some(id) => return Err(StoreError::NotFound(id.to_string())),
        None => {
            let id = next_id();
            *record.id_slot() = Some(id);
            id
        }
    };
    records.insert(id, record.clone());
    Ok(record)
}

#[derive(Default)]
struct State {
    builds: BTreeMap<BuildId, BuildRecord>,
    artifacts: BTreeMap<PushedArtifactId, PushedArtifactRecord>,
    deployments: BTreeMap<DeploymentId, DeploymentRecord>,
    releases: BTreeMap<ReleaseId, ReleaseRecord>,
}

pub struct InMemoryRecordStore {
    state: Arc<Mutex<State>>,
    ids: Arc<dyn IdGenerator>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::with_id_generator(Arc::new(UlidGenerator::new(SystemClock)))
    }

    pub fn with_id_generator(ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            ids,
        }
    }

    pub async fn build(&self, id: BuildId) -> Option<BuildRecord> {
        self.state.lock().await.builds.get(&id).cloned()
    }

    /// All builds, oldest first.
    pub async fn builds(&self) -> Vec<BuildRecord> {
        self.state.lock().await.builds.values().cloned().collect()
    }

    pub async fn pushed_artifacts(&self) -> Vec<PushedArtifactRecord> {
        self.state.lock().await.artifacts.values().cloned().collect()
    }

    pub async fn deployments(&self) -> Vec<DeploymentRecord> {
        self.state.lock().await.deployments.values().cloned().collect()
    }

    pub async fn releases(&self) -> Vec<ReleaseRecord> {
        self.state.lock().await.releases.values().cloned().collect()
    }
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn upsert_build(&self, build: BuildRecord) -> Result<BuildRecord, StoreError> {
        let mut state = self.state.lock().await;
        upsert(&mut state.builds, build, || self.ids.generate_build_id())
    }

    async fn upsert_pushed_artifact(
        &self,
        artifact: PushedArtifactRecord,
    ) -> Result<PushedArtifactRecord, StoreError> {
        let mut state = self.state.lock().await;
        upsert(&mut state.artifacts, artifact, || {
            self.ids.generate_pushed_artifact_id()
        })
    }

    async fn upsert_deployment(
        &self,
        deployment: DeploymentRecord,
    ) -> Result<DeploymentRecord, StoreError> {
        let mut state = self.state.lock().await;
        upsert(&mut state.deployments, deployment, || {
            self.ids.generate_deployment_id()
        })
    }

    async fn upsert_release(&self, release: ReleaseRecord) -> Result<ReleaseRecord, StoreError> {
        let mut state = self.state.lock().await;
        upsert(&mut state.releases, release, || self.ids.generate_release_id())
    }
}

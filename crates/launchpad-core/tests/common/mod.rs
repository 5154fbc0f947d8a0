//! Shared fixtures for the integration suite.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::Serialize;

use launchpad_core::ProjectBuilder;
use launchpad_core::app::Project;
use launchpad_core::component::{
    Artifact, Builder, Component, Deployment, Platform, Registry, Release, ReleaseManager, Role,
    Source,
};
use launchpad_core::domain::{
    BoxError, BuildRecord, DeploymentRecord, LabelSet, Payload, PushedArtifactRecord,
    ReleaseRecord, StatusState,
};
use launchpad_core::impls::InMemoryRecordStore;
use launchpad_core::invoke::DynFunc;
use launchpad_core::ports::{RecordStore, StoreError};

#[derive(Debug, Clone, Serialize)]
pub struct Bundle {
    pub app: String,
}

impl Artifact for Bundle {
    fn payload(&self) -> Result<Payload, BoxError> {
        Ok(Payload::encode("fixture.Bundle", self)?)
    }
}

#[derive(Debug, Serialize)]
pub struct Running {
    pub id: String,
}

impl Deployment for Running {
    fn payload(&self) -> Result<Payload, BoxError> {
        Ok(Payload::encode("fixture.Running", self)?)
    }
}

impl Release for Running {
    fn payload(&self) -> Result<Payload, BoxError> {
        Ok(Payload::encode("fixture.Route", self)?)
    }

    fn url(&self) -> Option<String> {
        Some(format!("http://{}.localhost", self.id))
    }
}

/// How a `FixtureBuilder`'s build function behaves.
#[derive(Debug, Clone, Copy)]
pub enum BuildMode {
    /// Returns a `Bundle` named after the app.
    Bundle,
    /// Returns a string, which is not an artifact.
    NotAnArtifact,
    /// Fails with "compile failed".
    Fail,
    /// Sleeps far longer than any test waits.
    Hang,
    /// Returns a `Bundle` named after the component's `tier` label.
    Labelled,
}

/// Builder that counts how often its build function runs.
pub struct FixtureBuilder {
    mode: BuildMode,
    calls: Arc<AtomicUsize>,
}

impl Component for FixtureBuilder {
    fn as_builder(&self) -> Option<&dyn Builder> {
        Some(self)
    }
}

impl Builder for FixtureBuilder {
    fn build_func(&self) -> DynFunc {
        let mode = self.mode;
        let calls = self.calls.clone();
        match mode {
            BuildMode::NotAnArtifact => DynFunc::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, BoxError>("not an artifact".to_string()) }
            }),
            BuildMode::Labelled => DynFunc::new(move |labels: LabelSet| {
                calls.fetch_add(1, Ordering::SeqCst);
                let app = labels.get("tier").unwrap_or("unlabelled").to_string();
                async move { Ok::<_, BoxError>(Arc::new(Bundle { app }) as Arc<dyn Artifact>) }
            }),
            _ => DynFunc::new(move |src: Source| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    match mode {
                        BuildMode::Fail => Err::<Arc<dyn Artifact>, BoxError>("compile failed".into()),
                        BuildMode::Hang => {
                            tokio::time::sleep(std::time::Duration::from_secs(30)).await;
                            Ok(Arc::new(Bundle { app: src.app }) as Arc<dyn Artifact>)
                        }
                        _ => Ok(Arc::new(Bundle { app: src.app }) as Arc<dyn Artifact>),
                    }
                }
            }),
        }
    }
}

/// Constructor for a `FixtureBuilder`, plus the counter of its build calls.
pub fn builder(mode: BuildMode) -> (DynFunc, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let shared = calls.clone();
    let ctor = DynFunc::new(move || {
        let calls = shared.clone();
        async move {
            Ok::<_, BoxError>(Arc::new(FixtureBuilder { mode, calls }) as Arc<dyn Component>)
        }
    });
    (ctor, calls)
}

/// Platform deploying a `Bundle` and offering itself as default releaser.
pub struct FixturePlatform;

impl Component for FixturePlatform {
    fn as_platform(&self) -> Option<&dyn Platform> {
        Some(self)
    }
}

impl Platform for FixturePlatform {
    fn deploy_func(&self) -> DynFunc {
        DynFunc::new(|artifact: Payload| async move {
            let app = artifact.value["app"]
                .as_str()
                .ok_or("artifact has no app")?
                .to_string();
            Ok::<_, BoxError>(Arc::new(Running { id: app }) as Arc<dyn Deployment>)
        })
    }

    fn default_releaser_func(&self) -> Option<DynFunc> {
        Some(DynFunc::new(|| async {
            Ok::<_, BoxError>(Arc::new(FixtureRouter) as Arc<dyn Component>)
        }))
    }
}

pub struct FixtureRouter;

impl Component for FixtureRouter {
    fn as_release_manager(&self) -> Option<&dyn ReleaseManager> {
        Some(self)
    }
}

impl ReleaseManager for FixtureRouter {
    fn release_func(&self) -> DynFunc {
        DynFunc::new(|deployment: Payload| async move {
            let id = deployment.value["id"]
                .as_str()
                .ok_or("deployment has no id")?
                .to_string();
            Ok::<_, BoxError>(Arc::new(Running { id }) as Arc<dyn Release>)
        })
    }
}

/// Registry whose push always fails with "registry unreachable".
pub struct FailingRegistry;

impl Component for FailingRegistry {
    fn as_registry(&self) -> Option<&dyn Registry> {
        Some(self)
    }
}

impl Registry for FailingRegistry {
    fn push_func(&self) -> DynFunc {
        DynFunc::new(|_artifact: Payload| async {
            Err::<Arc<dyn Artifact>, BoxError>("registry unreachable".into())
        })
    }
}

/// Project with a "bundle" builder in `mode` and a "local" platform.
pub fn project(root: &Path, mode: BuildMode) -> (ProjectBuilder, Arc<AtomicUsize>) {
    let (ctor, calls) = builder(mode);
    let project = Project::builder("fixture", root)
        .register(Role::Builder, "bundle", ctor)
        .unwrap()
        .register(
            Role::Platform,
            "local",
            DynFunc::new(|| async {
                Ok::<_, BoxError>(Arc::new(FixturePlatform) as Arc<dyn Component>)
            }),
        )
        .unwrap();
    (project, calls)
}

/// RecordStore that logs every upsert before delegating to an in-memory store.
///
/// With `fail_on` set, the n-th upsert (1-based) fails instead.
pub struct RecordingStore {
    inner: InMemoryRecordStore,
    upserts: Mutex<Vec<Option<StatusState>>>,
    fail_on: Option<usize>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryRecordStore::new(),
            upserts: Mutex::new(Vec::new()),
            fail_on: None,
        }
    }

    pub fn failing_on(n: usize) -> Self {
        Self {
            fail_on: Some(n),
            ..Self::new()
        }
    }

    pub fn inner(&self) -> &InMemoryRecordStore {
        &self.inner
    }

    /// Status state of every upsert seen, in order.
    pub fn upserts(&self) -> Vec<Option<StatusState>> {
        self.upserts.lock().unwrap().clone()
    }

    fn log(&self, state: Option<StatusState>) -> Result<(), StoreError> {
        let mut upserts = self.upserts.lock().unwrap();
        upserts.push(state);
        if self.fail_on == Some(upserts.len()) {
            return Err(StoreError::Unavailable("disk full".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for RecordingStore {
    async fn upsert_build(&self, build: BuildRecord) -> Result<BuildRecord, StoreError> {
        self.log(build.status.as_ref().map(|s| s.state))?;
        self.inner.upsert_build(build).await
    }

    async fn upsert_pushed_artifact(
        &self,
        artifact: PushedArtifactRecord,
    ) -> Result<PushedArtifactRecord, StoreError> {
        self.log(artifact.status.as_ref().map(|s| s.state))?;
        self.inner.upsert_pushed_artifact(artifact).await
    }

    async fn upsert_deployment(
        &self,
        deployment: DeploymentRecord,
    ) -> Result<DeploymentRecord, StoreError> {
        self.log(deployment.status.as_ref().map(|s| s.state))?;
        self.inner.upsert_deployment(deployment).await
    }

    async fn upsert_release(&self, release: ReleaseRecord) -> Result<ReleaseRecord, StoreError> {
        self.log(release.status.as_ref().map(|s| s.state))?;
        self.inner.upsert_release(release).await
    }
}

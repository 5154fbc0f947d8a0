use std::sync::Arc;

use async_trait::async_trait;
use tracing::Span;

use super::App;
use super::operation::Operation;
use crate::component::{Artifact, ArtifactCapability, Role};
use crate::domain::{AppError, BoxError, BuildRecord, Payload, PushedArtifactRecord};
use crate::invoke::{Args, InvocationContext};
use crate::ports::{RecordStore, StoreError};

/// Options for `App::build`.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    push: bool,
}

impl BuildOptions {
    pub fn new() -> Self {
        Self { push: true }
    }

    /// Whether to push the artifact once built. Defaults to `true`.
    pub fn push(mut self, push: bool) -> Self {
        self.push = push;
        self
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct BuildResult {
    pub build: BuildRecord,
    pub artifact: Arc<dyn Artifact>,
    /// Set when the build was pushed.
    pub pushed: Option<PushedArtifactRecord>,
}

impl App {
    /// Build the app's artifact from source, then push it unless disabled.
    ///
    /// If the build succeeds but the push fails, the error is
    /// `AppError::PushFailed` and carries the persisted build record.
    pub async fn build(
        &self,
        ctx: &InvocationContext,
        opts: BuildOptions,
    ) -> Result<BuildResult, AppError> {
        let span = tracing::info_span!(parent: &self.span, "build");
        let (artifact, build) = self.do_operation(ctx, &span, &BuildOperation).await?;

        if !opts.push {
            return Ok(BuildResult {
                build,
                artifact,
                pushed: None,
            });
        }

        match self.push_build(ctx, &build).await {
            Ok(pushed) => Ok(BuildResult {
                build,
                artifact,
                pushed: Some(pushed),
            }),
            Err(source) => Err(AppError::PushFailed {
                build: Box::new(build),
                source: Box::new(source),
            }),
        }
    }
}

struct BuildOperation;

#[async_trait]
impl Operation for BuildOperation {
    type Record = BuildRecord;
    type Output = Arc<dyn Artifact>;

    const NAME: &'static str = "build";

    fn role(&self) -> Role {
        Role::Builder
    }

    fn init(&self, app: &App) -> Result<BuildRecord, AppError> {
        let info = app
            .component_info_for(Role::Builder)
            .ok_or_else(|| AppError::not_found("no builder configured"))?;
        Ok(BuildRecord::new(
            app.reference.clone(),
            app.workspace.clone(),
            info.clone(),
        ))
    }

    async fn upsert(
        &self,
        store: &dyn RecordStore,
        record: BuildRecord,
    ) -> Result<BuildRecord, StoreError> {
        store.upsert_build(record).await
    }

    async fn run(
        &self,
        ctx: &InvocationContext,
        span: &Span,
        app: &App,
        _record: &BuildRecord,
    ) -> Result<Arc<dyn Artifact>, AppError> {
        let (handle, func) = app
            .slots
            .get(&Role::Builder)
            .and_then(|s| Some((s.handle, s.component.as_builder()?.build_func())))
            .ok_or_else(|| AppError::not_found("no builder configured"))?;

        app.call_dynamic::<ArtifactCapability>(ctx, span, handle, &func, Args::new())
            .await
    }

    fn encode(&self, output: &Arc<dyn Artifact>) -> Result<Payload, BoxError> {
        output.payload()
    }
}

use async_trait::async_trait;
use tracing::Span;

use super::App;
use super::operation::Operation;
use crate::component::{ArtifactCapability, Role};
use crate::domain::{ActionError, AppError, BoxError, BuildRecord, Payload, PushedArtifactRecord};
use crate::invoke::{Args, InvocationContext};
use crate::ports::{RecordStore, StoreError};

impl App {
    /// Push a build's artifact to the configured registry.
    ///
    /// Without a registry the build's artifact is recorded as the pushed
    /// artifact unchanged.
    pub async fn push_build(
        &self,
        ctx: &InvocationContext,
        build: &BuildRecord,
    ) -> Result<PushedArtifactRecord, AppError> {
        let span = tracing::info_span!(parent: &self.span, "push");
        let (_, record) = self
            .do_operation(ctx, &span, &PushOperation { build })
            .await?;
        Ok(record)
    }
}

struct PushOperation<'a> {
    build: &'a BuildRecord,
}

#[async_trait]
impl<'a> Operation for PushOperation<'a> {
    type Record = PushedArtifactRecord;
    type Output = Payload;

    const NAME: &'static str = "push";

    fn role(&self) -> Role {
        Role::Registry
    }

    fn init(&self, app: &App) -> Result<PushedArtifactRecord, AppError> {
        let component = app
            .component_info_for(Role::Registry)
            .cloned()
            .unwrap_or_else(|| self.build.component.clone());
        Ok(PushedArtifactRecord {
            id: None,
            application: app.reference.clone(),
            workspace: app.workspace.clone(),
            component,
            build_id: self.build.id,
            labels: Default::default(),
            status: None,
            artifact: None,
        })
    }

    async fn upsert(
        &self,
        store: &dyn RecordStore,
        record: PushedArtifactRecord,
    ) -> Result<PushedArtifactRecord, StoreError> {
        store.upsert_pushed_artifact(record).await
    }

    async fn run(
        &self,
        ctx: &InvocationContext,
        span: &Span,
        app: &App,
        _record: &PushedArtifactRecord,
    ) -> Result<Payload, AppError> {
        let artifact = self
            .build
            .artifact
            .clone()
            .ok_or_else(|| AppError::not_found("build has no artifact to push"))?;

        let Some(registry) = app.slots.get(&Role::Registry) else {
            tracing::debug!(parent: span, "no registry configured, using the build artifact");
            return Ok(artifact);
        };
        let func = registry
            .component
            .as_registry()
            .ok_or_else(|| AppError::not_found("no registry configured"))?
            .push_func();

        let pushed = app
            .call_dynamic::<ArtifactCapability>(
                ctx,
                span,
                registry.handle,
                &func,
                Args::new().typed(artifact),
            )
            .await?;
        pushed.payload().map_err(|e| ActionError::new(e).into())
    }

    fn encode(&self, output: &Payload) -> Result<Payload, BoxError> {
        Ok(output.clone())
    }
}

use std::sync::Arc;

use async_trait::async_trait;
use tracing::Span;

use super::App;
use super::operation::Operation;
use crate::component::{Release, ReleaseCapability, Role};
use crate::domain::{AppError, BoxError, DeploymentRecord, Payload, ReleaseRecord};
use crate::invoke::{Args, InvocationContext};
use crate::ports::{RecordStore, StoreError};

impl App {
    /// Release a deployment with the release manager.
    ///
    /// When no release manager is configured, the platform's default one is
    /// used if it has one.
    pub async fn release(
        &self,
        ctx: &InvocationContext,
        deployment: &DeploymentRecord,
    ) -> Result<(ReleaseRecord, Arc<dyn Release>), AppError> {
        let span = tracing::info_span!(parent: &self.span, "release");
        let (release, record) = self
            .do_operation(ctx, &span, &ReleaseOperation { deployment })
            .await?;
        if let Some(url) = release.url() {
            self.ui.output(&format!("released at {url}"));
        }
        Ok((record, release))
    }
}

struct ReleaseOperation<'a> {
    deployment: &'a DeploymentRecord,
}

#[async_trait]
impl<'a> Operation for ReleaseOperation<'a> {
    type Record = ReleaseRecord;
    type Output = Arc<dyn Release>;

    const NAME: &'static str = "release";

    fn role(&self) -> Role {
        Role::ReleaseManager
    }

    fn init(&self, app: &App) -> Result<ReleaseRecord, AppError> {
        let info = app
            .component_info_for(Role::ReleaseManager)
            .ok_or_else(|| AppError::not_found("no release manager configured"))?;
        Ok(ReleaseRecord {
            id: None,
            application: app.reference.clone(),
            workspace: app.workspace.clone(),
            component: info.clone(),
            deployment_id: self.deployment.id,
            labels: Default::default(),
            status: None,
            release: None,
        })
    }

    async fn upsert(
        &self,
        store: &dyn RecordStore,
        record: ReleaseRecord,
    ) -> Result<ReleaseRecord, StoreError> {
        store.upsert_release(record).await
    }

    async fn run(
        &self,
        ctx: &InvocationContext,
        span: &Span,
        app: &App,
        _record: &ReleaseRecord,
    ) -> Result<Arc<dyn Release>, AppError> {
        let deployment = self
            .deployment
            .deployment
            .clone()
            .ok_or_else(|| AppError::not_found("deployment has no payload"))?;
        let (handle, func) = app
            .slots
            .get(&Role::ReleaseManager)
            .and_then(|s| Some((s.handle, s.component.as_release_manager()?.release_func())))
            .ok_or_else(|| AppError::not_found("no release manager configured"))?;

        app.call_dynamic::<ReleaseCapability>(ctx, span, handle, &func, Args::new().typed(deployment))
            .await
    }

    fn encode(&self, output: &Arc<dyn Release>) -> Result<Payload, BoxError> {
        output.payload()
    }
}

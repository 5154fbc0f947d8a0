use std::sync::Arc;

use async_trait::async_trait;
use tracing::Span;

use super::App;
use super::operation::Operation;
use crate::component::{Deployment, DeploymentCapability, Role};
use crate::domain::{AppError, BoxError, DeploymentRecord, Payload, PushedArtifactRecord};
use crate::invoke::{Args, InvocationContext};
use crate::ports::{RecordStore, StoreError};

impl App {
    /// Deploy a pushed artifact with the configured platform.
    ///
    /// The platform's deploy function is given the artifact's `Payload`.
    pub async fn deploy(
        &self,
        ctx: &InvocationContext,
        artifact: &PushedArtifactRecord,
    ) -> Result<(DeploymentRecord, Arc<dyn Deployment>), AppError> {
        let span = tracing::info_span!(parent: &self.span, "deploy");
        let (deployment, record) = self
            .do_operation(ctx, &span, &DeployOperation { artifact })
            .await?;
        Ok((record, deployment))
    }
}

struct DeployOperation<'a> {
    artifact: &'a PushedArtifactRecord,
}

#[async_trait]
impl<'a> Operation for DeployOperation<'a> {
    type Record = DeploymentRecord;
    type Output = Arc<dyn Deployment>;

    const NAME: &'static str = "deploy";

    fn role(&self) -> Role {
        Role::Platform
    }

    fn init(&self, app: &App) -> Result<DeploymentRecord, AppError> {
        let info = app
            .component_info_for(Role::Platform)
            .ok_or_else(|| AppError::not_found("no platform configured"))?;
        Ok(DeploymentRecord {
            id: None,
            application: app.reference.clone(),
            workspace: app.workspace.clone(),
            component: info.clone(),
            artifact_id: self.artifact.id,
            labels: Default::default(),
            status: None,
            deployment: None,
        })
    }

    async fn upsert(
        &self,
        store: &dyn RecordStore,
        record: DeploymentRecord,
    ) -> Result<DeploymentRecord, StoreError> {
        store.upsert_deployment(record).await
    }

    async fn run(
        &self,
        ctx: &InvocationContext,
        span: &Span,
        app: &App,
        _record: &DeploymentRecord,
    ) -> Result<Arc<dyn Deployment>, AppError> {
        let artifact = self
            .artifact
            .artifact
            .clone()
            .ok_or_else(|| AppError::not_found("pushed artifact has no payload"))?;
        let (handle, func) = app
            .slots
            .get(&Role::Platform)
            .and_then(|s| Some((s.handle, s.component.as_platform()?.deploy_func())))
            .ok_or_else(|| AppError::not_found("no platform configured"))?;

        app.call_dynamic::<DeploymentCapability>(ctx, span, handle, &func, Args::new().typed(artifact))
            .await
    }

    fn encode(&self, output: &Arc<dyn Deployment>) -> Result<Payload, BoxError> {
        output.payload()
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::project;
    use super::*;
    use crate::config::{AppConfig, BuildConfig, EvalContext, OperationConfig};
    use crate::domain::{ErrorKind, StatusState};
    use crate::impls::InMemoryRecordStore;

    fn config() -> AppConfig {
        let mut cfg = AppConfig::new("web");
        cfg.build = Some(BuildConfig {
            operation: OperationConfig::using("image"),
            registry: None,
        });
        cfg.deploy = Some(OperationConfig::using("local").with_label("tier", "frontend"));
        cfg
    }

    #[tokio::test]
    async fn deploy_records_the_deployment() {
        let root = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryRecordStore::new());
        let project = project(root.path()).store(store.clone()).build().unwrap();
        let app = project
            .app(&InvocationContext::background(), config(), &EvalContext::new())
            .await
            .unwrap();
        let ctx = InvocationContext::background();

        let built = app.build(&ctx, Default::default()).await.unwrap();
        let pushed = built.pushed.unwrap();
        let (record, deployment) = app.deploy(&ctx, &pushed).await.unwrap();

        assert_eq!(record.artifact_id, pushed.id);
        assert_eq!(record.status.as_ref().unwrap().state, StatusState::Success);
        assert_eq!(record.deployment, Some(deployment.payload().unwrap()));
        assert_eq!(record.labels.get("tier").map(String::as_str), Some("frontend"));
        assert_eq!(store.deployments().await, vec![record]);
    }

    #[tokio::test]
    async fn deploy_without_platform_is_not_found() {
        let root = tempfile::tempdir().unwrap();
        let project = project(root.path()).build().unwrap();
        let mut cfg = config();
        cfg.deploy = None;
        let app = project
            .app(&InvocationContext::background(), cfg, &EvalContext::new())
            .await
            .unwrap();
        let ctx = InvocationContext::background();
        let pushed = app
            .build(&ctx, Default::default())
            .await
            .unwrap()
            .pushed
            .unwrap();

        let err = app.deploy(&ctx, &pushed).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}

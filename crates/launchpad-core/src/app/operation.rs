//! Operation lifecycle - ステージ共通のライフサイクル
//!
//! Every stage runs through the same steps:
//!
//! 1. **Init**: seed the record with identity fields and merged labels
//! 2. **PersistPending**: mark it running and upsert it (the store assigns the id)
//! 3. **Execute**: before hooks, the stage action, after hooks
//! 4. **Finalize**: store the encoded result and the final status
//! 5. **PersistFinal**: upsert the record again under the same id
//!
//! A failing Execute still reaches PersistFinal. A persistence failure wins
//! over the Execute error.

use async_trait::async_trait;
use tracing::Span;

use super::App;
use crate::component::Role;
use crate::config::{HookTable, HookWhen, OnFailure};
use crate::domain::{ActionError, AppError, BoxError, Labels, OperationRecord, Payload, Status};
use crate::invoke::InvocationContext;
use crate::ports::{RecordStore, StoreError};

/// One pipeline stage, as seen by the lifecycle driver.
#[async_trait]
pub(crate) trait Operation: Send + Sync {
    type Record: OperationRecord;
    type Output: Send + Sync;

    const NAME: &'static str;

    /// The role whose component performs this stage.
    fn role(&self) -> Role;

    /// A fresh record with its identity fields set.
    fn init(&self, app: &App) -> Result<Self::Record, AppError>;

    fn hooks(&self, app: &App) -> HookTable {
        app.meta_for(self.role())
            .map(|m| m.hooks.clone())
            .unwrap_or_default()
    }

    /// Labels declared on the component, before merging.
    fn labels(&self, app: &App) -> Labels {
        app.meta_for(self.role())
            .map(|m| m.labels.clone())
            .unwrap_or_default()
    }

    async fn upsert(
        &self,
        store: &dyn RecordStore,
        record: Self::Record,
    ) -> Result<Self::Record, StoreError>;

    async fn run(
        &self,
        ctx: &InvocationContext,
        span: &Span,
        app: &App,
        record: &Self::Record,
    ) -> Result<Self::Output, AppError>;

    fn encode(&self, output: &Self::Output) -> Result<Payload, BoxError>;
}

impl App {
    pub(super) async fn do_operation<O: Operation>(
        &self,
        ctx: &InvocationContext,
        span: &Span,
        op: &O,
    ) -> Result<(O::Output, O::Record), AppError> {
        // Init
        let mut record = op.init(self)?;
        record.set_labels(self.merged_labels(&op.labels(self)));

        // PersistPending
        *record.status_mut() = Some(Status::running(self.clock.now()));
        let mut record = op.upsert(self.store.as_ref(), record).await?;

        // Execute
        let result = self.execute(ctx, span, op, &record).await;

        // Finalize
        let now = self.clock.now();
        let result = result.and_then(|output| {
            op.encode(&output)
                .map(|payload| (output, payload))
                .map_err(|err| AppError::from(ActionError::new(err)))
        });
        let result = match result {
            Ok((output, payload)) => {
                *record.payload_mut() = Some(payload);
                if let Some(status) = record.status_mut() {
                    status.set_success(now);
                }
                tracing::info!(parent: span, operation = O::NAME, "operation succeeded");
                Ok(output)
            }
            Err(err) => {
                *record.payload_mut() = None;
                if let Some(status) = record.status_mut() {
                    status.set_error(&err, now);
                }
                tracing::warn!(parent: span, operation = O::NAME, error = %err, "operation failed");
                Err(err)
            }
        };

        // PersistFinal
        let record = op.upsert(self.store.as_ref(), record).await?;

        result.map(|output| (output, record))
    }

    async fn execute<O: Operation>(
        &self,
        ctx: &InvocationContext,
        span: &Span,
        op: &O,
        record: &O::Record,
    ) -> Result<O::Output, AppError> {
        let hooks = op.hooks(self);
        self.run_hooks(span, HookWhen::Before, &hooks).await?;
        let output = op.run(ctx, span, self, record).await?;
        self.run_hooks(span, HookWhen::After, &hooks).await?;
        Ok(output)
    }

    async fn run_hooks(&self, span: &Span, when: HookWhen, hooks: &HookTable) -> Result<(), AppError> {
        for hook in hooks.get(&when).into_iter().flatten() {
            tracing::info!(parent: span, ?when, command = ?hook.command, "running hook");
            if let Err(err) = self.hook_runner.run(hook, &self.source.path).await {
                match hook.on_failure {
                    OnFailure::Fail => return Err(err.into()),
                    OnFailure::Continue => {
                        tracing::warn!(parent: span, error = %err, "hook failed, continuing");
                    }
                }
            }
        }
        Ok(())
    }
}

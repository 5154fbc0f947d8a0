//! App - アプリケーション層
//!
//! An `App` is one configured application: the components bound to its
//! roles, the mapper chain used to feed them, and the pipeline stages
//! (build, push, deploy, release) that drive them.
//!
//! # 構成
//! - **project**: `Project` and its builder, the parent of every app
//! - **binder**: constructing and configuring components
//! - **invoker**: calling component functions with injected arguments
//! - **operation**: the lifecycle every stage goes through
//! - **build / push / deploy / release**: the stages themselves

mod binder;
mod build;
mod deploy;
mod invoker;
mod operation;
mod project;
mod push;
mod release;

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::Span;

pub use self::build::{BuildOptions, BuildResult};
pub use self::project::{Project, ProjectBuilder};
use crate::component::{Component, JobInfo, Role, Source};
use crate::config::{AppConfig, EvalContext, HookTable};
use crate::datadir::{AppDir, ComponentDir};
use crate::domain::{
    AppError, ApplicationRef, ComponentInfo, Labels, WORKSPACE_LABEL, WorkspaceRef, merge_labels,
};
use crate::factory::{Disposer, Factory};
use crate::invoke::{DynFunc, InvocationContext};
use crate::ports::{Clock, HookRunner, RecordStore, Ui};

/// Identity of a bound component within one app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentHandle(u32);

impl fmt::Display for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "component#{}", self.0)
    }
}

/// What the app knows about a bound component.
#[derive(Debug, Clone)]
pub struct ComponentMeta {
    pub info: ComponentInfo,
    pub dir: ComponentDir,
    /// As declared; not merged with project or app labels.
    pub labels: Labels,
    pub hooks: HookTable,
}

#[derive(Clone)]
struct Slot {
    component: Arc<dyn Component>,
    handle: ComponentHandle,
}

pub struct App {
    reference: ApplicationRef,
    workspace: WorkspaceRef,
    config: AppConfig,
    source: Source,
    job: JobInfo,
    dir: AppDir,
    span: Span,

    ui: Arc<dyn Ui>,
    store: Arc<dyn RecordStore>,
    hook_runner: Arc<dyn HookRunner>,
    clock: Arc<dyn Clock>,

    project_labels: Labels,
    factories: HashMap<Role, Factory>,

    slots: BTreeMap<Role, Slot>,
    components: BTreeMap<ComponentHandle, ComponentMeta>,
    mappers: Vec<DynFunc>,
    closers: Vec<(String, Disposer)>,
    next_handle: u32,
}

impl App {
    pub(crate) async fn new(
        ctx: &InvocationContext,
        project: &Project,
        config: AppConfig,
        eval: &EvalContext,
    ) -> Result<Self, AppError> {
        let span = tracing::info_span!("app", name = %config.name);
        let path = match &config.path {
            Some(path) => project.root.join(path),
            None => project.root.clone(),
        };
        let dir = project.dir.app(&config.name)?;

        let mut app = App {
            reference: ApplicationRef::new(&project.name, &config.name),
            workspace: project.workspace.clone(),
            source: Source {
                app: config.name.clone(),
                path,
            },
            config,
            job: project.job.clone(),
            dir,
            span,
            ui: project.ui.clone(),
            store: project.store.clone(),
            hook_runner: project.hook_runner.clone(),
            clock: project.clock.clone(),
            project_labels: project.labels.clone(),
            factories: project.factories.clone(),
            slots: BTreeMap::new(),
            components: BTreeMap::new(),
            mappers: project.mappers.clone(),
            closers: Vec::new(),
            next_handle: 0,
        };

        if let Err(err) = app.init(ctx, &project.mapper_plugins, eval).await {
            app.run_closers();
            return Err(err);
        }
        Ok(app)
    }

    async fn init(
        &mut self,
        ctx: &InvocationContext,
        mapper_plugins: &Factory,
        eval: &EvalContext,
    ) -> Result<(), AppError> {
        for role in Role::ALL {
            let Some(op) = self.config.operation(role).cloned() else {
                continue;
            };
            self.bind(ctx, role, &op, eval).await?;
        }
        self.init_mappers(ctx, mapper_plugins).await?;
        self.default_releaser(ctx).await
    }

    /// Run every registered cleanup, in registration order.
    ///
    /// Failures are logged and do not stop the remaining cleanups.
    pub fn close(mut self) {
        self.run_closers();
    }

    fn run_closers(&mut self) {
        let span = self.span.clone();
        for (name, closer) in std::mem::take(&mut self.closers) {
            if let Err(err) = closer() {
                tracing::warn!(parent: &span, component = %name, error = %err, "cleanup failed");
            }
        }
    }

    pub fn reference(&self) -> &ApplicationRef {
        &self.reference
    }

    pub fn workspace(&self) -> &WorkspaceRef {
        &self.workspace
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Handles of every component bound so far, including replaced ones.
    pub fn components(&self) -> Vec<ComponentHandle> {
        self.components.keys().copied().collect()
    }

    pub fn component_meta(&self, handle: ComponentHandle) -> Option<&ComponentMeta> {
        self.components.get(&handle)
    }

    pub fn component_info(&self, handle: ComponentHandle) -> Option<&ComponentInfo> {
        self.component_meta(handle).map(|m| &m.info)
    }

    /// Info of the component currently filling `role`.
    pub fn component_info_for(&self, role: Role) -> Option<&ComponentInfo> {
        self.handle_for(role).and_then(|h| self.component_info(h))
    }

    pub fn handle_for(&self, role: Role) -> Option<ComponentHandle> {
        self.slots.get(&role).map(|s| s.handle)
    }

    pub fn component(&self, role: Role) -> Option<&Arc<dyn Component>> {
        self.slots.get(&role).map(|s| &s.component)
    }

    /// The app's mapper chain, in the order converters are tried.
    pub fn mappers(&self) -> &[DynFunc] {
        &self.mappers
    }

    pub fn ui(&self) -> &Arc<dyn Ui> {
        &self.ui
    }

    fn meta_for(&self, role: Role) -> Option<&ComponentMeta> {
        self.handle_for(role).and_then(|h| self.components.get(&h))
    }

    /// Project, app and component labels (later wins) plus the workspace label.
    fn merged_labels(&self, component: &Labels) -> Labels {
        let mut labels = merge_labels([&self.project_labels, &self.config.labels, component]);
        labels.insert(WORKSPACE_LABEL.to_string(), self.workspace.workspace.clone());
        labels
    }

    fn next_handle(&mut self) -> ComponentHandle {
        let handle = ComponentHandle(self.next_handle);
        self.next_handle += 1;
        handle
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.run_closers();
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("reference", &self.reference)
            .field("workspace", &self.workspace)
            .field("components", &self.components)
            .field("mappers", &self.mappers.len())
            .finish()
    }
}

//! Project - App を生成する親スコープ
//!
//! A `Project` owns what every app of a project shares: the registered
//! plugin constructors, project-wide mappers and labels, and the ports the
//! apps talk through.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::App;
use crate::component::{JobInfo, Role};
use crate::config::{AppConfig, EvalContext};
use crate::datadir::ProjectDir;
use crate::domain::{AppError, Labels, WorkspaceRef};
use crate::factory::{Factory, FactoryError};
use crate::impls::{CommandHookRunner, InMemoryRecordStore, TracingUi};
use crate::invoke::{DynFunc, InvocationContext};
use crate::ports::{Clock, HookRunner, RecordStore, SystemClock, Ui};

pub struct Project {
    pub(super) name: String,
    pub(super) root: PathBuf,
    pub(super) workspace: WorkspaceRef,
    pub(super) labels: Labels,
    pub(super) factories: HashMap<Role, Factory>,
    pub(super) mapper_plugins: Factory,
    pub(super) mappers: Vec<DynFunc>,
    pub(super) store: Arc<dyn RecordStore>,
    pub(super) ui: Arc<dyn Ui>,
    pub(super) hook_runner: Arc<dyn HookRunner>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) job: JobInfo,
    pub(super) dir: ProjectDir,
}

impl Project {
    pub fn builder(name: impl Into<String>, root: impl Into<PathBuf>) -> ProjectBuilder {
        ProjectBuilder::new(name, root)
    }

    /// Create and initialize the app described by `config`.
    ///
    /// Every configured component is constructed and configured here; the
    /// first failure is returned and whatever was already set up is cleaned up.
    pub async fn app(
        &self,
        ctx: &InvocationContext,
        config: AppConfig,
        eval: &EvalContext,
    ) -> Result<App, AppError> {
        App::new(ctx, self, config, eval).await
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn workspace(&self) -> &WorkspaceRef {
        &self.workspace
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn dir(&self) -> &ProjectDir {
        &self.dir
    }
}

/// Builder for `Project`.
///
/// ```ignore
/// let project = Project::builder("demo", ".")
///     .register(Role::Builder, "docker", docker_constructor())?
///     .label("team", "infra")
///     .build()?;
/// ```
///
/// Unset ports default to the in-process implementations: an in-memory
/// record store, a tracing UI, hooks run as local commands, and the system
/// clock. Data directories default to `<root>/.launchpad`.
pub struct ProjectBuilder {
    name: String,
    root: PathBuf,
    workspace: WorkspaceRef,
    labels: Labels,
    factories: HashMap<Role, Factory>,
    mapper_plugins: Factory,
    mappers: Vec<DynFunc>,
    store: Option<Arc<dyn RecordStore>>,
    ui: Option<Arc<dyn Ui>>,
    hook_runner: Option<Arc<dyn HookRunner>>,
    clock: Option<Arc<dyn Clock>>,
    job: JobInfo,
    data_root: Option<PathBuf>,
}

impl ProjectBuilder {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            workspace: WorkspaceRef::default(),
            labels: Labels::new(),
            factories: HashMap::new(),
            mapper_plugins: Factory::new(),
            mappers: Vec::new(),
            store: None,
            ui: None,
            hook_runner: None,
            clock: None,
            job: JobInfo::local(),
            data_root: None,
        }
    }

    /// Register the constructor for component type `name` under `role`.
    pub fn register(
        mut self,
        role: Role,
        name: impl Into<String>,
        constructor: DynFunc,
    ) -> Result<Self, FactoryError> {
        self.factories
            .entry(role)
            .or_default()
            .register(name, constructor)?;
        Ok(self)
    }

    /// Register a plugin whose only job is to contribute mappers.
    ///
    /// Every mapper plugin is constructed when an app is created.
    pub fn register_mapper_plugin(
        mut self,
        name: impl Into<String>,
        constructor: DynFunc,
    ) -> Result<Self, FactoryError> {
        self.mapper_plugins.register(name, constructor)?;
        Ok(self)
    }

    /// Add a project-wide mapper, visible to every app.
    pub fn mapper(mut self, mapper: DynFunc) -> Self {
        self.mappers.push(mapper);
        self
    }

    pub fn workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = WorkspaceRef::new(workspace);
        self
    }

    pub fn label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn ui(mut self, ui: Arc<dyn Ui>) -> Self {
        self.ui = Some(ui);
        self
    }

    pub fn hook_runner(mut self, runner: Arc<dyn HookRunner>) -> Self {
        self.hook_runner = Some(runner);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn job(mut self, job: JobInfo) -> Self {
        self.job = job;
        self
    }

    /// Where project data and cache directories are kept.
    pub fn data_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_root = Some(dir.into());
        self
    }

    pub fn build(self) -> Result<Project, AppError> {
        let data_root = self
            .data_root
            .unwrap_or_else(|| self.root.join(".launchpad"));
        let dir = ProjectDir::new(data_root)?;

        Ok(Project {
            name: self.name,
            root: self.root,
            workspace: self.workspace,
            labels: self.labels,
            factories: self.factories,
            mapper_plugins: self.mapper_plugins,
            mappers: self.mappers,
            store: self
                .store
                .unwrap_or_else(|| Arc::new(InMemoryRecordStore::new())),
            ui: self.ui.unwrap_or_else(|| Arc::new(TracingUi::new())),
            hook_runner: self
                .hook_runner
                .unwrap_or_else(|| Arc::new(CommandHookRunner::new())),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            job: self.job,
            dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::domain::BoxError;

    struct Noop;
    impl Component for Noop {}

    fn noop() -> DynFunc {
        DynFunc::new(|| async { Ok::<_, BoxError>(std::sync::Arc::new(Noop) as Arc<dyn Component>) })
    }

    #[test]
    fn build_lays_out_the_data_root() {
        let root = tempfile::tempdir().unwrap();
        let project = Project::builder("demo", root.path())
            .workspace("staging")
            .label("team", "infra")
            .build()
            .unwrap();

        assert_eq!(project.name(), "demo");
        assert_eq!(project.workspace().workspace, "staging");
        assert_eq!(project.labels().get("team").map(String::as_str), Some("infra"));
        assert!(root.path().join(".launchpad/data").is_dir());
        assert!(root.path().join(".launchpad/cache").is_dir());
    }

    #[test]
    fn same_type_name_may_serve_different_roles() {
        let root = tempfile::tempdir().unwrap();
        let project = Project::builder("demo", root.path())
            .register(Role::Platform, "kubernetes", noop())
            .unwrap()
            .register(Role::ReleaseManager, "kubernetes", noop())
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(project.factories.len(), 2);
    }

    #[test]
    fn duplicate_constructor_is_rejected() {
        let res = Project::builder("demo", ".")
            .register(Role::Builder, "docker", noop())
            .unwrap()
            .register(Role::Builder, "docker", noop());

        assert!(matches!(res, Err(FactoryError::AlreadyRegistered(name)) if name == "docker"));
    }
}

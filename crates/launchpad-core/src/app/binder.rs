//! Component binding - コンポーネントの生成と設定

use tracing::{Instrument, Span};

use super::{App, ComponentHandle, ComponentMeta, Slot};
use crate::component::{self, ReleaseManagerCapability, Role};
use crate::config::{EvalContext, OperationConfig, group_hooks};
use crate::domain::{AppError, ComponentInfo};
use crate::factory::{Factory, PluginInstance};
use crate::invoke::{self, Args, InvocationContext};

impl App {
    /// Construct, check and configure the component `op` declares for `role`.
    ///
    /// Returns `None` when `op` does not name a component. Binding a role
    /// that is already bound replaces the component in the slot under a new
    /// handle; the old handle's metadata is kept.
    pub async fn bind(
        &mut self,
        ctx: &InvocationContext,
        role: Role,
        op: &OperationConfig,
        eval: &EvalContext,
    ) -> Result<Option<ComponentHandle>, AppError> {
        let Some(use_) = &op.use_ else {
            return Ok(None);
        };
        let span = tracing::info_span!(parent: &self.span, "component", role = %role);

        let constructor = self
            .factories
            .get(&role)
            .and_then(|f| f.func(&use_.kind))
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("unknown type: {:?}", use_.kind)))?;

        let dir = self.dir.component(role.as_str(), &use_.kind)?;

        let args = Args::new()
            .typed(ctx.clone())
            .typed(span.clone())
            .typed(self.source.clone())
            .typed(dir.clone());
        let raw = invoke::call(ctx, &constructor, &args)
            .instrument(span.clone())
            .await?;
        let instance = PluginInstance::from_value(raw)?;
        tracing::info!(parent: &span, kind = %use_.kind, "initialized component");

        self.adopt(&span, &use_.kind, &instance);

        if !role.accepts(instance.component.as_ref()) {
            return Err(AppError::TypeMismatch {
                expected: role.capability().to_string(),
                actual: instance.component.type_name().to_string(),
            });
        }

        component::configure(instance.component.as_ref(), &use_.body, eval)
            .await
            .map_err(AppError::ConfigurationInvalid)?;

        let handle = self.next_handle();
        self.components.insert(
            handle,
            ComponentMeta {
                info: ComponentInfo::new(role, &use_.kind),
                dir,
                labels: op.labels.clone(),
                hooks: group_hooks(&op.hooks),
            },
        );
        self.slots.insert(
            role,
            Slot {
                component: instance.component,
                handle,
            },
        );
        Ok(Some(handle))
    }

    /// Construct every mapper plugin and take over its mappers.
    pub(super) async fn init_mappers(
        &mut self,
        ctx: &InvocationContext,
        plugins: &Factory,
    ) -> Result<(), AppError> {
        let span = self.span.clone();
        for name in plugins.registered() {
            let Some(constructor) = plugins.func(&name) else {
                continue;
            };
            tracing::debug!(parent: &span, name = %name, "loading mapper plugin");

            let args = Args::new().typed(ctx.clone()).typed(span.clone());
            let raw = invoke::call(ctx, constructor, &args).await?;
            tracing::info!(parent: &span, name = %name, "initialized mapper plugin");

            if let Some(instance) = raw.downcast_ref::<PluginInstance>() {
                self.adopt(&span, &name, instance);
            }
        }
        Ok(())
    }

    /// Use the platform as release manager when none is configured and the
    /// platform offers a default one.
    pub(super) async fn default_releaser(&mut self, ctx: &InvocationContext) -> Result<(), AppError> {
        if self.slots.contains_key(&Role::ReleaseManager) {
            return Ok(());
        }
        let Some(platform) = self.slots.get(&Role::Platform).cloned() else {
            return Ok(());
        };
        tracing::trace!(parent: &self.span, "no releaser configured, checking if platform supports release");

        let Some(func) = platform
            .component
            .as_platform()
            .and_then(|p| p.default_releaser_func())
        else {
            tracing::info!(
                parent: &self.span,
                platform = platform.component.type_name(),
                "no releaser configured, platform does not support a default releaser"
            );
            return Ok(());
        };

        tracing::info!(parent: &self.span, "platform capable of release, using platform for release");
        let span = self.span.clone();
        let releaser = self
            .call_dynamic::<ReleaseManagerCapability>(ctx, &span, platform.handle, &func, Args::new())
            .await?;
        self.slots.insert(
            Role::ReleaseManager,
            Slot {
                component: releaser,
                handle: platform.handle,
            },
        );
        Ok(())
    }

    /// Take over the mappers and disposer a plugin brought along.
    fn adopt(&mut self, span: &Span, name: &str, instance: &PluginInstance) {
        if !instance.mappers.is_empty() {
            self.mappers.extend(instance.mappers.iter().cloned());
            tracing::info!(parent: span, len = instance.mappers.len(), "registered component-specific mappers");
        }
        if let Some(disposer) = &instance.disposer {
            self.closers.push((name.to_string(), disposer.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::json;

    use super::super::Project;
    use super::super::testing::{ImageBuilder, project};
    use super::*;
    use crate::component::{Component, Configurable};
    use crate::config::{AppConfig, BuildConfig, Diagnostic, Diagnostics};
    use crate::datadir::ComponentDir;
    use crate::domain::{BoxError, ErrorKind};
    use crate::invoke::DynFunc;

    fn ctx() -> InvocationContext {
        InvocationContext::background()
    }

    fn builds_with(kind: &str) -> AppConfig {
        let mut cfg = AppConfig::new("web");
        cfg.build = Some(BuildConfig {
            operation: OperationConfig::using(kind).with_label("tier", "web"),
            registry: None,
        });
        cfg
    }

    #[tokio::test]
    async fn unconfigured_role_is_a_no_op() {
        let root = tempfile::tempdir().unwrap();
        let project = project(root.path()).build().unwrap();
        let mut app = project
            .app(&ctx(), AppConfig::new("web"), &EvalContext::new())
            .await
            .unwrap();

        let handle = app
            .bind(&ctx(), Role::Builder, &OperationConfig::default(), &EvalContext::new())
            .await
            .unwrap();

        assert!(handle.is_none());
        assert!(app.components().is_empty());
    }

    #[tokio::test]
    async fn bound_component_gets_metadata_and_directory() {
        let root = tempfile::tempdir().unwrap();
        let project = project(root.path()).build().unwrap();
        let app = project
            .app(&ctx(), builds_with("image"), &EvalContext::new())
            .await
            .unwrap();

        let handle = app.handle_for(Role::Builder).unwrap();
        let meta = app.component_meta(handle).unwrap();
        assert_eq!(meta.info, ComponentInfo::new(Role::Builder, "image"));
        assert_eq!(meta.labels.get("tier").map(String::as_str), Some("web"));
        assert!(meta.dir.data_dir().ends_with("app/web/component/builder/image"));
        assert!(meta.dir.data_dir().is_dir());
    }

    #[tokio::test]
    async fn rebinding_keeps_the_old_handle() {
        let root = tempfile::tempdir().unwrap();
        let project = project(root.path()).build().unwrap();
        let mut app = project
            .app(&ctx(), builds_with("image"), &EvalContext::new())
            .await
            .unwrap();
        let first = app.handle_for(Role::Builder).unwrap();

        let second = app
            .bind(&ctx(), Role::Builder, &OperationConfig::using("image"), &EvalContext::new())
            .await
            .unwrap()
            .unwrap();

        assert_ne!(first, second);
        assert_eq!(app.components(), vec![first, second]);
        assert_eq!(app.handle_for(Role::Builder), Some(second));
    }

    #[tokio::test]
    async fn wrong_capability_is_a_type_mismatch() {
        let root = tempfile::tempdir().unwrap();
        let project = project(root.path())
            .register(
                Role::Builder,
                "platform-only",
                DynFunc::new(|| async {
                    Ok::<_, BoxError>(
                        Arc::new(super::super::testing::SelfReleasingPlatform) as Arc<dyn Component>
                    )
                }),
            )
            .unwrap()
            .build()
            .unwrap();

        let err = project
            .app(&ctx(), builds_with("platform-only"), &EvalContext::new())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert!(err.to_string().contains("Builder"));
    }

    #[tokio::test]
    async fn constructor_receives_its_scoped_directory() {
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();
        let root = tempfile::tempdir().unwrap();
        let project = Project::builder("demo", root.path())
            .register(
                Role::Builder,
                "image",
                DynFunc::new(move |dir: ComponentDir, _span: Span| {
                    *sink.lock().unwrap() = Some(dir.data_dir().to_path_buf());
                    async { Ok::<_, BoxError>(Arc::new(ImageBuilder::default()) as Arc<dyn Component>) }
                }),
            )
            .unwrap()
            .build()
            .unwrap();

        project
            .app(&ctx(), builds_with("image"), &EvalContext::new())
            .await
            .unwrap();

        let dir = seen.lock().unwrap().clone().unwrap();
        assert!(dir.ends_with("component/builder/image"));
    }

    #[derive(Default)]
    struct Strict {
        applied: Mutex<Option<serde_json::Value>>,
    }

    impl Component for Strict {
        fn as_builder(&self) -> Option<&dyn crate::component::Builder> {
            Some(self)
        }

        fn as_configurable(&self) -> Option<&dyn Configurable> {
            Some(self)
        }
    }

    impl crate::component::Builder for Strict {
        fn build_func(&self) -> DynFunc {
            DynFunc::new(|| async { Err::<(), _>("not used") })
        }
    }

    #[async_trait]
    impl Configurable for Strict {
        async fn configure(
            &self,
            body: &serde_json::Value,
            _eval: &EvalContext,
        ) -> Result<(), Diagnostics> {
            if body.get("dockerfile").is_none() {
                return Err(Diagnostic::error("missing required field").at("dockerfile").into());
            }
            *self.applied.lock().unwrap() = Some(body.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn invalid_configuration_aborts_binding() {
        let disposed = Arc::new(AtomicUsize::new(0));
        let counter = disposed.clone();
        let root = tempfile::tempdir().unwrap();
        let project = Project::builder("demo", root.path())
            .register(
                Role::Builder,
                "strict",
                DynFunc::new(move || {
                    let counter = counter.clone();
                    async move {
                        Ok::<_, BoxError>(
                            PluginInstance::new(Arc::new(Strict::default())).with_disposer(
                                move || {
                                    counter.fetch_add(1, Ordering::SeqCst);
                                    Ok(())
                                },
                            ),
                        )
                    }
                }),
            )
            .unwrap()
            .build()
            .unwrap();

        let mut cfg = builds_with("strict");
        if let Some(build) = cfg.build.as_mut() {
            build.operation = build.operation.clone().with_body(json!({ "context": "." }));
        }

        let err = project.app(&ctx(), cfg, &EvalContext::new()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);
        assert!(err.to_string().contains("dockerfile"));
        assert_eq!(disposed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn plugin_mappers_are_app_scoped() {
        let root = tempfile::tempdir().unwrap();
        let project = Project::builder("demo", root.path())
            .mapper(DynFunc::new(|n: u8| async move { Ok::<_, BoxError>(n as u16) }))
            .register(
                Role::Builder,
                "image",
                DynFunc::new(|| async {
                    Ok::<_, BoxError>(
                        PluginInstance::new(Arc::new(ImageBuilder::default())).with_mapper(
                            DynFunc::new(|n: u16| async move { Ok::<_, BoxError>(n as u32) }),
                        ),
                    )
                }),
            )
            .unwrap()
            .build()
            .unwrap();

        let with_builder = project
            .app(&ctx(), builds_with("image"), &EvalContext::new())
            .await
            .unwrap();
        let without = project
            .app(&ctx(), AppConfig::new("api"), &EvalContext::new())
            .await
            .unwrap();

        assert_eq!(with_builder.mappers().len(), 2);
        assert_eq!(without.mappers().len(), 1);
    }

    #[tokio::test]
    async fn mapper_plugins_are_loaded_at_creation() {
        let root = tempfile::tempdir().unwrap();
        let project = Project::builder("demo", root.path())
            .register_mapper_plugin(
                "units",
                DynFunc::new(|_ctx: InvocationContext| async {
                    Ok::<_, BoxError>(
                        PluginInstance::new(Arc::new(ImageBuilder::default()))
                            .with_mapper(DynFunc::new(|n: u8| async move { Ok::<_, BoxError>(n as u64) })),
                    )
                }),
            )
            .unwrap()
            .build()
            .unwrap();

        let app = project
            .app(&ctx(), AppConfig::new("web"), &EvalContext::new())
            .await
            .unwrap();

        assert_eq!(app.mappers().len(), 1);
        assert!(app.components().is_empty());
    }
}

//! Dynamic calls into bound components - 引数注入つき呼び出し

use std::sync::Arc;

use tracing::{Instrument, Span};

use super::{App, ComponentHandle};
use crate::component::Capability;
use crate::domain::{AppError, LabelSet};
use crate::invoke::{self, Args, DynFunc, InvocationContext, Value};
use crate::ports::StatusScope;

/// Closes the UI status scope when dropped, whatever way the call ends.
struct StatusGuard(Arc<dyn StatusScope>);

impl Drop for StatusGuard {
    fn drop(&mut self) {
        self.0.close();
    }
}

impl App {
    /// Call `func` on behalf of the component behind `handle`.
    ///
    /// Arguments are looked up in this order: `extra`, the `"labels"` named
    /// value (the component's own labels), the app's mapper chain, and the
    /// ambient values (context, span, source, job, app directory, component
    /// directory, UI).
    pub(crate) async fn call_dynamic_raw(
        &self,
        ctx: &InvocationContext,
        span: &Span,
        handle: ComponentHandle,
        func: &DynFunc,
        extra: Args,
    ) -> Result<Value, AppError> {
        let meta = self.components.get(&handle).ok_or_else(|| {
            AppError::not_found(format!("component directory not found for: {handle}"))
        })?;

        let _status = StatusGuard(self.ui.status());

        let args = extra
            .named("labels", LabelSet::new(meta.labels.clone()))
            .converters(self.mappers.iter().cloned())
            .typed(ctx.clone())
            .typed(span.clone())
            .typed(self.source.clone())
            .typed(self.job.clone())
            .typed(self.dir.clone())
            .typed(meta.dir.clone())
            .typed(self.ui.clone());

        invoke::call(ctx, func, &args).instrument(span.clone()).await
    }

    /// Like `call_dynamic_raw`, then require the result to have capability `C`.
    pub(crate) async fn call_dynamic<C: Capability>(
        &self,
        ctx: &InvocationContext,
        span: &Span,
        handle: ComponentHandle,
        func: &DynFunc,
        extra: Args,
    ) -> Result<C::Output, AppError> {
        let raw = self.call_dynamic_raw(ctx, span, handle, func, extra).await?;
        C::check(raw)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::super::testing::project;
    use super::*;
    use crate::component::{ArtifactCapability, JobInfo, Role, Source};
    use crate::config::{AppConfig, BuildConfig, EvalContext, OperationConfig};
    use crate::datadir::{AppDir, ComponentDir};
    use crate::domain::{BoxError, ErrorKind};
    use crate::ports::Ui;

    #[derive(Default)]
    struct RecordingUi {
        opened: AtomicUsize,
        closed: Arc<AtomicBool>,
    }

    struct Scope(Arc<AtomicBool>);

    impl StatusScope for Scope {
        fn update(&self, _msg: &str) {}

        fn close(&self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    impl Ui for RecordingUi {
        fn output(&self, _msg: &str) {}

        fn status(&self) -> Arc<dyn StatusScope> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            self.closed.store(false, Ordering::SeqCst);
            Arc::new(Scope(self.closed.clone()))
        }
    }

    async fn app_with(ui: Arc<dyn Ui>) -> (tempfile::TempDir, App) {
        let root = tempfile::tempdir().unwrap();
        let project = project(root.path()).ui(ui).build().unwrap();
        let mut cfg = AppConfig::new("web");
        cfg.build = Some(BuildConfig {
            operation: OperationConfig::using("image").with_label("tier", "web"),
            registry: None,
        });
        let app = project
            .app(&InvocationContext::background(), cfg, &EvalContext::new())
            .await
            .unwrap();
        (root, app)
    }

    #[tokio::test]
    async fn ambient_values_are_injected() {
        let (_root, app) = app_with(Arc::new(RecordingUi::default())).await;
        let handle = app.handle_for(Role::Builder).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let func = DynFunc::new(
            move |src: Source, job: JobInfo, _app: AppDir, comp: ComponentDir, labels: LabelSet| {
                sink.lock().unwrap().push(format!(
                    "{} local={} tier={} {}",
                    src.app,
                    job.local,
                    labels.get("tier").unwrap_or("-"),
                    comp.data_dir().ends_with("builder/image"),
                ));
                async { Ok::<_, BoxError>(()) }
            },
        )
        .with_param_name(4, "labels");

        app.call_dynamic_raw(
            &InvocationContext::background(),
            &Span::none(),
            handle,
            &func,
            Args::new(),
        )
        .await
        .unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["web local=true tier=web true"]);
    }

    #[tokio::test]
    async fn labels_reach_a_parameter_without_a_name() {
        let (_root, app) = app_with(Arc::new(RecordingUi::default())).await;
        let handle = app.handle_for(Role::Builder).unwrap();
        let func = DynFunc::new(|labels: LabelSet| async move {
            Ok::<_, BoxError>(labels.get("tier").unwrap_or("-").to_string())
        });

        let out = app
            .call_dynamic_raw(
                &InvocationContext::background(),
                &Span::none(),
                handle,
                &func,
                Args::new(),
            )
            .await
            .unwrap();

        assert_eq!(out.downcast_ref::<String>().map(String::as_str), Some("web"));
    }

    #[tokio::test]
    async fn status_is_closed_when_the_function_panics() {
        let ui = Arc::new(RecordingUi::default());
        let (_root, app) = app_with(ui.clone()).await;
        let handle = app.handle_for(Role::Builder).unwrap();
        let func = DynFunc::new(|| async {
            if std::hint::black_box(true) {
                panic!("plugin crashed");
            }
            Ok::<_, BoxError>(())
        });

        let task = tokio::spawn(async move {
            app.call_dynamic_raw(
                &InvocationContext::background(),
                &Span::none(),
                handle,
                &func,
                Args::new(),
            )
            .await
        });

        let err = task.await.unwrap_err();
        assert!(err.is_panic());
        assert_eq!(ui.opened.load(Ordering::SeqCst), 1);
        assert!(ui.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn extra_args_win_over_ambient_values() {
        let (_root, app) = app_with(Arc::new(RecordingUi::default())).await;
        let handle = app.handle_for(Role::Builder).unwrap();
        let func = DynFunc::new(|src: Source| async move { Ok::<_, BoxError>(src.app) });

        let extra = Args::new().typed(Source {
            app: "override".into(),
            path: ".".into(),
        });
        let out = app
            .call_dynamic_raw(&InvocationContext::background(), &Span::none(), handle, &func, extra)
            .await
            .unwrap();

        assert_eq!(out.downcast_ref::<String>().map(String::as_str), Some("override"));
    }

    #[tokio::test]
    async fn unknown_handle_is_not_found() {
        let (_root, app) = app_with(Arc::new(RecordingUi::default())).await;
        let func = DynFunc::new(|| async { Ok::<_, BoxError>(()) });

        let err = app
            .call_dynamic_raw(
                &InvocationContext::background(),
                &Span::none(),
                ComponentHandle(99),
                &func,
                Args::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.to_string(), "component directory not found for: component#99");
    }

    #[tokio::test]
    async fn mismatch_calls_once_and_closes_status() {
        let ui = Arc::new(RecordingUi::default());
        let (_root, app) = app_with(ui.clone()).await;
        let handle = app.handle_for(Role::Builder).unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let func = DynFunc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, BoxError>(42u32) }
        });

        let err = app
            .call_dynamic::<ArtifactCapability>(
                &InvocationContext::background(),
                &Span::none(),
                handle,
                &func,
                Args::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(ui.opened.load(Ordering::SeqCst), 1);
        assert!(ui.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn status_is_closed_on_failure() {
        let ui = Arc::new(RecordingUi::default());
        let (_root, app) = app_with(ui.clone()).await;
        let handle = app.handle_for(Role::Builder).unwrap();
        let func = DynFunc::new(|| async { Err::<(), _>("boom") });

        let err = app
            .call_dynamic_raw(
                &InvocationContext::background(),
                &Span::none(),
                handle,
                &func,
                Args::new(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ActionFailure);
        assert!(ui.closed.load(Ordering::SeqCst));
    }
}

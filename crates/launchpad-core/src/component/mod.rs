//! Components - プラグインの役割と能力
//!
//! A component is whatever a plugin constructor returns. It fills one or
//! more roles (builder, registry, platform, release manager) by answering the
//! matching `as_*` query, and each role hands out the `DynFunc` that performs
//! its stage.

mod capability;
mod role;

use std::any::Any;
use std::path::PathBuf;

use async_trait::async_trait;

pub use self::capability::{
    Artifact, ArtifactCapability, Capability, Deployment, DeploymentCapability, Release,
    ReleaseCapability, ReleaseManagerCapability,
};
pub use self::role::Role;
use crate::config::{Diagnostic, Diagnostics, EvalContext};
use crate::invoke::DynFunc;

/// A constructed plugin component.
///
/// Every method has a default so a component only implements the roles it
/// actually fills.
pub trait Component: Any + Send + Sync {
    fn as_builder(&self) -> Option<&dyn Builder> {
        None
    }

    fn as_registry(&self) -> Option<&dyn Registry> {
        None
    }

    fn as_platform(&self) -> Option<&dyn Platform> {
        None
    }

    fn as_release_manager(&self) -> Option<&dyn ReleaseManager> {
        None
    }

    fn as_configurable(&self) -> Option<&dyn Configurable> {
        None
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

pub trait Builder: Send + Sync {
    /// Produces an `Arc<dyn Artifact>`.
    fn build_func(&self) -> DynFunc;
}

pub trait Registry: Send + Sync {
    /// Produces an `Arc<dyn Artifact>`; the build's artifact payload is supplied.
    fn push_func(&self) -> DynFunc;
}

pub trait Platform: Send + Sync {
    /// Produces an `Arc<dyn Deployment>`; the artifact payload is supplied.
    fn deploy_func(&self) -> DynFunc;

    /// Produces an `Arc<dyn Component>` acting as release manager, used when
    /// no release manager is configured.
    fn default_releaser_func(&self) -> Option<DynFunc> {
        None
    }
}

pub trait ReleaseManager: Send + Sync {
    /// Produces an `Arc<dyn Release>`; the deployment payload is supplied.
    fn release_func(&self) -> DynFunc;
}

/// A component that takes a configuration body.
#[async_trait]
pub trait Configurable: Send + Sync {
    /// `body` has already had its variable references evaluated.
    async fn configure(&self, body: &serde_json::Value, eval: &EvalContext)
    -> Result<(), Diagnostics>;
}

/// Apply `body` to `component`.
///
/// A component that is not configurable only accepts an empty body.
pub async fn configure(
    component: &dyn Component,
    body: &serde_json::Value,
    eval: &EvalContext,
) -> Result<(), Diagnostics> {
    match component.as_configurable() {
        Some(target) => {
            let body = eval.evaluate(body)?;
            target.configure(&body, eval).await
        }
        None if is_empty(body) => Ok(()),
        None => Err(Diagnostic::error("component does not take a configuration body")
            .with_detail(component.type_name())
            .into()),
    }
}

fn is_empty(body: &serde_json::Value) -> bool {
    match body {
        serde_json::Value::Null => true,
        serde_json::Value::Object(fields) => fields.is_empty(),
        _ => false,
    }
}

/// Where the application's source lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub app: String,
    pub path: PathBuf,
}

/// The job an operation runs under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub id: Option<String>,
    /// Running on the user's machine rather than a remote runner.
    pub local: bool,
}

impl JobInfo {
    pub fn local() -> Self {
        Self {
            id: None,
            local: true,
        }
    }
}

impl Default for JobInfo {
    fn default() -> Self {
        Self::local()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;

    struct Plain;
    impl Component for Plain {}

    #[derive(Default)]
    struct Tunable {
        image: Mutex<Option<String>>,
    }

    impl Component for Tunable {
        fn as_configurable(&self) -> Option<&dyn Configurable> {
            Some(self)
        }
    }

    #[async_trait]
    impl Configurable for Tunable {
        async fn configure(
            &self,
            body: &serde_json::Value,
            _eval: &EvalContext,
        ) -> Result<(), Diagnostics> {
            let image = body
                .get("image")
                .and_then(|v| v.as_str())
                .ok_or_else(|| Diagnostic::error("missing field").at("image"))?;
            *self.image.lock().unwrap() = Some(image.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn configurable_component_gets_evaluated_body() {
        let c = Tunable::default();
        let eval = EvalContext::new().with_variable("app", "web");

        configure(&c, &json!({ "image": "${app}:v1" }), &eval)
            .await
            .unwrap();

        assert_eq!(c.image.lock().unwrap().as_deref(), Some("web:v1"));
    }

    #[tokio::test]
    async fn plain_component_accepts_empty_body_only() {
        let eval = EvalContext::new();

        assert!(configure(&Plain, &json!(null), &eval).await.is_ok());
        assert!(configure(&Plain, &json!({}), &eval).await.is_ok());

        let err = configure(&Plain, &json!({ "x": 1 }), &eval).await.unwrap_err();
        assert!(err.has_errors());
    }

    #[tokio::test]
    async fn unknown_variable_never_reaches_the_component() {
        let c = Tunable::default();

        let err = configure(&c, &json!({ "image": "${nope}" }), &EvalContext::new())
            .await
            .unwrap_err();

        assert_eq!(err.len(), 1);
        assert!(c.image.lock().unwrap().is_none());
    }

    #[test]
    fn roles_follow_the_as_queries() {
        assert!(!Role::Builder.accepts(&Plain));
        assert!(!Role::ReleaseManager.accepts(&Tunable::default()));
    }
}

//! Capability checks on values returned by plugin functions.

use std::fmt::Debug;
use std::sync::Arc;

use super::Component;
use crate::domain::{AppError, BoxError, Payload};
use crate::invoke::Value;

/// The result of a build or a push.
pub trait Artifact: Debug + Send + Sync {
    /// Encoded form stored on the operation record.
    fn payload(&self) -> Result<Payload, BoxError>;
}

/// A deployed instance of an artifact.
pub trait Deployment: Debug + Send + Sync {
    fn payload(&self) -> Result<Payload, BoxError>;
}

/// A deployment made reachable.
pub trait Release: Debug + Send + Sync {
    fn payload(&self) -> Result<Payload, BoxError>;

    /// Public URL of the release, when the release manager has one.
    fn url(&self) -> Option<String> {
        None
    }
}

/// What a dynamic call is expected to return.
///
/// Plugin functions return values as trait-object handles
/// (`Arc<dyn Artifact>` and so on); a capability accepts a value when it holds
/// such a handle.
pub trait Capability {
    const NAME: &'static str;
    type Output: Send + Sync + 'static;

    fn accept(value: &Value) -> Option<Self::Output>;

    fn check(value: Value) -> Result<Self::Output, AppError> {
        Self::accept(&value).ok_or_else(|| AppError::TypeMismatch {
            expected: Self::NAME.to_string(),
            actual: value.type_name().to_string(),
        })
    }
}

pub struct ArtifactCapability;

impl Capability for ArtifactCapability {
    const NAME: &'static str = "Artifact";
    type Output = Arc<dyn Artifact>;

    fn accept(value: &Value) -> Option<Self::Output> {
        value.downcast_ref::<Arc<dyn Artifact>>().cloned()
    }
}

pub struct DeploymentCapability;

impl Capability for DeploymentCapability {
    const NAME: &'static str = "Deployment";
    type Output = Arc<dyn Deployment>;

    fn accept(value: &Value) -> Option<Self::Output> {
        value.downcast_ref::<Arc<dyn Deployment>>().cloned()
    }
}

pub struct ReleaseCapability;

impl Capability for ReleaseCapability {
    const NAME: &'static str = "Release";
    type Output = Arc<dyn Release>;

    fn accept(value: &Value) -> Option<Self::Output> {
        value.downcast_ref::<Arc<dyn Release>>().cloned()
    }
}

/// A component able to act as release manager.
pub struct ReleaseManagerCapability;

impl Capability for ReleaseManagerCapability {
    const NAME: &'static str = "ReleaseManager";
    type Output = Arc<dyn Component>;

    fn accept(value: &Value) -> Option<Self::Output> {
        value
            .downcast_ref::<Arc<dyn Component>>()
            .filter(|c| c.as_release_manager().is_some())
            .cloned()
    }
}

//! Operation records: the persisted result of one pipeline stage.
//!
//! Every record shares the same bookkeeping shape (identity, labels, status,
//! payload slot). `OperationRecord` exposes that shape so the lifecycle driver
//! can treat builds, pushes, deployments and releases uniformly.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::ids::{BuildId, DeploymentId, PushedArtifactId, ReleaseId};
use super::labels::Labels;
use crate::component::Role;

/// Stable reference to an application within a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationRef {
    pub project: String,
    pub application: String,
}

impl ApplicationRef {
    pub fn new(project: impl Into<String>, application: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            application: application.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkspaceRef {
    pub workspace: String,
}

impl WorkspaceRef {
    pub fn new(workspace: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
        }
    }
}

impl Default for WorkspaceRef {
    fn default() -> Self {
        Self::new("default")
    }
}

/// Which component produced a record: its role and declared type name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentInfo {
    pub role: Role,
    pub name: String,
}

impl ComponentInfo {
    pub fn new(role: Role, name: impl Into<String>) -> Self {
        Self {
            role,
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusState {
    Running,
    Success,
    Error,
}

/// Status sub-structure of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub state: StatusState,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub start_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete_time: Option<DateTime<Utc>>,
}

impl Status {
    pub fn running(now: DateTime<Utc>) -> Self {
        Self {
            state: StatusState::Running,
            error: None,
            start_time: now,
            complete_time: None,
        }
    }

    pub fn set_success(&mut self, now: DateTime<Utc>) {
        self.state = StatusState::Success;
        self.error = None;
        self.complete_time = Some(now);
    }

    pub fn set_error(&mut self, error: &dyn std::fmt::Display, now: DateTime<Utc>) {
        self.state = StatusState::Error;
        self.error = Some(error.to_string());
        self.complete_time = Some(now);
    }

    pub fn is_complete(&self) -> bool {
        self.complete_time.is_some()
    }
}

/// Opaque, self-describing encoding of a stage result.
///
/// `type_name` identifies the producer's type so that plugin mappers can
/// decode the payload back into their own types on a later stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payload {
    pub type_name: String,
    pub value: serde_json::Value,
}

impl Payload {
    pub fn encode<T: Serialize>(
        type_name: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            type_name: type_name.into(),
            value: serde_json::to_value(value)?,
        })
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.value.clone())
    }

    pub fn is(&self, type_name: &str) -> bool {
        self.type_name == type_name
    }
}

/// Uniform access to the bookkeeping fields of a record.
pub trait OperationRecord: Clone + Send + Sync + 'static {
    fn status(&self) -> Option<&Status>;
    fn status_mut(&mut self) -> &mut Option<Status>;
    fn payload(&self) -> Option<&Payload>;
    fn payload_mut(&mut self) -> &mut Option<Payload>;
    fn set_labels(&mut self, labels: Labels);
}

macro_rules! impl_operation_record {
    ($record:ty, $payload:ident) => {
        impl OperationRecord for $record {
            fn status(&self) -> Option<&Status> {
                self.status.as_ref()
            }

            fn status_mut(&mut self) -> &mut Option<Status> {
                &mut self.status
            }

            fn payload(&self) -> Option<&Payload> {
                self.$payload.as_ref()
            }

            fn payload_mut(&mut self) -> &mut Option<Payload> {
                &mut self.$payload
            }

            fn set_labels(&mut self, labels: Labels) {
                self.labels = labels;
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BuildId>,
    pub application: ApplicationRef,
    pub workspace: WorkspaceRef,
    pub component: ComponentInfo,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub artifact: Option<Payload>,
}

impl BuildRecord {
    pub fn new(application: ApplicationRef, workspace: WorkspaceRef, component: ComponentInfo) -> Self {
        Self {
            id: None,
            application,
            workspace,
            component,
            labels: Labels::new(),
            status: None,
            artifact: None,
        }
    }
}

impl_operation_record!(BuildRecord, artifact);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushedArtifactRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<PushedArtifactId>,
    pub application: ApplicationRef,
    pub workspace: WorkspaceRef,
    pub component: ComponentInfo,
    pub build_id: Option<BuildId>,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub artifact: Option<Payload>,
}

impl_operation_record!(PushedArtifactRecord, artifact);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<DeploymentId>,
    pub application: ApplicationRef,
    pub workspace: WorkspaceRef,
    pub component: ComponentInfo,
    pub artifact_id: Option<PushedArtifactId>,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub deployment: Option<Payload>,
}

impl_operation_record!(DeploymentRecord, deployment);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReleaseRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ReleaseId>,
    pub application: ApplicationRef,
    pub workspace: WorkspaceRef,
    pub component: ComponentInfo,
    pub deployment_id: Option<DeploymentId>,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub release: Option<Payload>,
}

impl_operation_record!(ReleaseRecord, release);

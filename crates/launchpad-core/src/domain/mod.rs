//! Domain model (IDs, labels, records, errors).

pub mod errors;
pub mod ids;
pub mod labels;
pub mod record;

pub use self::errors::{ActionError, AppError, BoxError, ErrorKind};
pub use self::ids::{BuildId, DeploymentId, Id, IdMarker, PushedArtifactId, ReleaseId};
pub use self::labels::{LabelSet, Labels, WORKSPACE_LABEL, merge_labels};
pub use self::record::{
    ApplicationRef, BuildRecord, ComponentInfo, DeploymentRecord, OperationRecord, Payload,
    PushedArtifactRecord, ReleaseRecord, Status, StatusState, WorkspaceRef,
};

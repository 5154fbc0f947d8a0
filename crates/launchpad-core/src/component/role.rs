use std::fmt;

use serde::{Deserialize, Serialize};

use super::Component;

/// Capability slot a component can be bound to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Builder,
    Registry,
    Platform,
    #[serde(rename = "releaser")]
    ReleaseManager,
}

impl Role {
    /// Binding order: the releaser comes last so it can default to the platform.
    pub const ALL: [Role; 4] = [
        Role::Builder,
        Role::Registry,
        Role::Platform,
        Role::ReleaseManager,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Builder => "builder",
            Role::Registry => "registry",
            Role::Platform => "platform",
            Role::ReleaseManager => "releaser",
        }
    }

    /// Name of the capability a component needs to fill this role.
    pub fn capability(&self) -> &'static str {
        match self {
            Role::Builder => "Builder",
            Role::Registry => "Registry",
            Role::Platform => "Platform",
            Role::ReleaseManager => "ReleaseManager",
        }
    }

    pub fn accepts(&self, component: &dyn Component) -> bool {
        match self {
            Role::Builder => component.as_builder().is_some(),
            Role::Registry => component.as_registry().is_some(),
            Role::Platform => component.as_platform().is_some(),
            Role::ReleaseManager => component.as_release_manager().is_some(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

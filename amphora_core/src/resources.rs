use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResourceError {
    #[error("no role provisioned for group '{0}'")]
    UnknownGroup(String),
}

/// Roles provisioned by the auth collaborator. The roles already exist; this
/// crate only attaches policy documents to them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResources {
    pub unauthenticated_role_arn: String,
    pub authenticated_role_arn: String,

    /// Role ARN per named permission group.
    #[serde(default)]
    pub group_roles: BTreeMap<String, String>,
}

impl AuthResources {
    pub fn new(
        unauthenticated_role_arn: impl Into<String>,
        authenticated_role_arn: impl Into<String>,
    ) -> Self {
        Self {
            unauthenticated_role_arn: unauthenticated_role_arn.into(),
            authenticated_role_arn: authenticated_role_arn.into(),
            group_roles: BTreeMap::new(),
        }
    }

    pub fn with_group_role(mut self, group: impl Into<String>, role_arn: impl Into<String>) -> Self {
        self.group_roles.insert(group.into(), role_arn.into());
        self
    }

    pub fn group_role(&self, group: &str) -> Result<&str, ResourceError> {
        self.group_roles
            .get(group)
            .map(String::as_str)
            .ok_or_else(|| ResourceError::UnknownGroup(group.to_string()))
    }
}

/// Declarative marker for the data collaborator. Provisioning is entirely
/// the platform's concern; only the schema identity travels through here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataResources {
    pub schema_name: String,
}

impl DataResources {
    pub fn new(schema_name: impl Into<String>) -> Self {
        Self {
            schema_name: schema_name.into(),
        }
    }
}

impl Default for DataResources {
    fn default() -> Self {
        Self::new("amphora-data")
    }
}

use crate::backend::Backend;
use crate::presets;
use crate::resources::{AuthResources, DataResources, ResourceError};
use crate::storage::{BucketSource, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("bucket must set exactly one of 'arn' or 'name'")]
    AmbiguousBucket,

    #[error("variant '{variant}' requires a group role for '{group}'")]
    MissingGroupRole { variant: String, group: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

/// Which backend configuration to build. Exactly one per project; the
/// alternates are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    PublicRead,
    PublicAdmin,
    OutputsOnly,
}

impl Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::PublicRead => "public-read",
            Variant::PublicAdmin => "public-admin",
            Variant::OutputsOnly => "outputs-only",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketConfig {
    /// ARN of a pre-existing bucket to import.
    pub arn: Option<String>,

    /// Name of a pre-existing bucket; the ARN is derived.
    pub name: Option<String>,

    pub region: String,
}

impl BucketConfig {
    pub fn source(&self) -> Result<BucketSource, ConfigError> {
        match (&self.arn, &self.name) {
            (Some(arn), None) => Ok(BucketSource::imported(arn, &self.region)?),
            (None, Some(name)) => Ok(BucketSource::named(name, &self.region)?),
            _ => Err(ConfigError::AmbiguousBucket),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub unauthenticated_role_arn: String,
    pub authenticated_role_arn: String,

    #[serde(default)]
    pub group_roles: BTreeMap<String, String>,
}

impl AuthConfig {
    fn resources(&self) -> AuthResources {
        let mut auth = AuthResources::new(
            &self.unauthenticated_role_arn,
            &self.authenticated_role_arn,
        );
        for (group, role_arn) in &self.group_roles {
            auth = auth.with_group_role(group, role_arn);
        }
        auth
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub schema: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            schema: DataResources::default().schema_name,
        }
    }
}

fn default_admin_group() -> String {
    "admin".to_string()
}

/// Project configuration, read from `amphora.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub variant: Variant,
    pub bucket: BucketConfig,
    pub auth: AuthConfig,

    #[serde(default)]
    pub data: DataConfig,

    /// Group managing the `admin/` prefix in the admin-bearing variants.
    #[serde(default = "default_admin_group")]
    pub admin_group: String,
}

impl ProjectConfig {
    /// Load and validate a configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading project config from {:?}", path);
        let content = fs::read_to_string(path)?;
        let config: ProjectConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Cross-field validation beyond what serde enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bucket.source()?;
        if self.variant == Variant::PublicAdmin
            && !self.auth.group_roles.contains_key(&self.admin_group)
        {
            return Err(ConfigError::MissingGroupRole {
                variant: self.variant.as_str().to_string(),
                group: self.admin_group.clone(),
            });
        }
        Ok(())
    }

    /// Build the configured backend variant.
    pub fn build_backend(&self) -> Result<Backend, ConfigError> {
        let bucket = self.bucket.source()?;
        let auth = self.auth.resources();
        let data = DataResources::new(&self.data.schema);

        let backend = match self.variant {
            Variant::PublicRead => presets::public_read(auth, data, bucket),
            Variant::PublicAdmin => {
                presets::public_admin(auth, data, bucket, &self.admin_group)?
            }
            Variant::OutputsOnly => {
                presets::outputs_only(auth, data, bucket, &self.admin_group)
            }
        };
        Ok(backend)
    }
}

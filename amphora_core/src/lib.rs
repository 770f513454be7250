pub mod access;
pub mod backend;
pub mod config;
pub mod policy;
pub mod presets;
pub mod resources;
pub mod storage;
pub mod verify;

pub use access::{PathAccess, PrincipalClass, StorageAction};
pub use backend::{Backend, PolicyAttachment, SynthArtifact, SynthError};
pub use config::{ConfigError, ProjectConfig, Variant};
pub use policy::{Effect, PolicyDocument, PolicyError, PolicyStatement};
pub use resources::{AuthResources, DataResources};
pub use storage::{BucketSource, StorageOutput};

use crate::policy::{PolicyDocument, PolicyError};
use crate::resources::{AuthResources, DataResources};
use crate::storage::{BucketSource, StorageOutput};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("no storage output defined")]
    MissingStorageOutput,

    #[error("invalid policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("failed to serialize artifact: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A policy document destined for inline attachment to one principal role.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyAttachment {
    pub role_arn: String,
    pub document: PolicyDocument,
}

/// The composed backend definition: auth and data collaborators, the
/// imported bucket, the storage output table, and any policy attachments.
/// Built once, synthesized once, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct Backend {
    auth: AuthResources,
    data: DataResources,
    bucket: Option<BucketSource>,
    storage_output: Option<StorageOutput>,
    attachments: Vec<PolicyAttachment>,
}

impl Backend {
    pub fn new(auth: AuthResources, data: DataResources) -> Self {
        Self {
            auth,
            data,
            bucket: None,
            storage_output: None,
            attachments: Vec::new(),
        }
    }

    pub fn auth(&self) -> &AuthResources {
        &self.auth
    }

    pub fn data(&self) -> &DataResources {
        &self.data
    }

    /// Attach the pre-existing bucket this backend builds on.
    pub fn import_bucket(&mut self, source: BucketSource) -> &mut Self {
        debug!("Importing bucket {}", source.arn());
        self.bucket = Some(source);
        self
    }

    pub fn bucket(&self) -> Option<&BucketSource> {
        self.bucket.as_ref()
    }

    /// Record the storage descriptor emitted into the generated output.
    pub fn add_storage_output(&mut self, output: StorageOutput) -> &mut Self {
        self.storage_output = Some(output);
        self
    }

    pub fn storage_output(&self) -> Option<&StorageOutput> {
        self.storage_output.as_ref()
    }

    /// Attach a policy document inline to a principal role.
    pub fn attach_policy(&mut self, role_arn: impl Into<String>, document: PolicyDocument) -> &mut Self {
        let role_arn = role_arn.into();
        debug!("Attaching policy '{}' to role {}", document.name, role_arn);
        self.attachments.push(PolicyAttachment { role_arn, document });
        self
    }

    pub fn attachments(&self) -> &[PolicyAttachment] {
        &self.attachments
    }

    /// Validate every attached document and emit the deployable artifact.
    ///
    /// The first malformed document aborts synthesis; nothing is retried and
    /// nothing partial is emitted.
    pub fn synth(&self) -> Result<SynthArtifact, SynthError> {
        for attachment in &self.attachments {
            attachment.document.validate()?;
        }

        let storage = self
            .storage_output
            .as_ref()
            .ok_or(SynthError::MissingStorageOutput)?;

        let outputs = json!({
            "version": "1",
            "data": { "schema": self.data.schema_name },
            "storage": storage,
        });

        let policies = self
            .attachments
            .iter()
            .map(|attachment| RenderedPolicy {
                name: attachment.document.name.clone(),
                role_arn: attachment.role_arn.clone(),
                document: attachment.document.to_provider_json(),
            })
            .collect();

        info!(
            "Synthesized backend with {} policy attachment(s)",
            self.attachments.len()
        );

        Ok(SynthArtifact {
            generated_at: Utc::now(),
            outputs,
            policies,
        })
    }
}

/// A validated policy document rendered to provider JSON, paired with the
/// role it attaches to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedPolicy {
    pub name: String,
    pub role_arn: String,
    pub document: serde_json::Value,
}

/// Everything the deploy step consumes: the generated output block plus the
/// rendered policy attachments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthArtifact {
    pub generated_at: DateTime<Utc>,
    pub outputs: serde_json::Value,
    pub policies: Vec<RenderedPolicy>,
}

impl SynthArtifact {
    /// Persist the artifact: `amphora_outputs.json` plus one
    /// `policy.<name>.json` per attachment.
    pub fn write_to<P: AsRef<Path>>(&self, dir: P) -> Result<(), SynthError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let outputs_path = dir.join("amphora_outputs.json");
        debug!("Writing outputs to {:?}", outputs_path);
        fs::write(&outputs_path, serde_json::to_string_pretty(&self.outputs)?)?;

        for policy in &self.policies {
            let path = dir.join(format!("policy.{}.json", policy.name));
            debug!("Writing policy document to {:?}", path);
            let rendered = json!({
                "role_arn": policy.role_arn,
                "document": policy.document,
            });
            fs::write(&path, serde_json::to_string_pretty(&rendered)?)?;
        }

        info!(
            "Wrote outputs and {} policy document(s) to {:?}",
            self.policies.len(),
            dir
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{PathAccess, PrincipalClass, StorageAction};
    use crate::policy::PolicyStatement;

    fn bucket() -> BucketSource {
        BucketSource::imported("arn:aws:s3:::demo", "us-east-1").unwrap()
    }

    fn backend_with_output() -> Backend {
        let mut backend = Backend::new(
            AuthResources::new("arn:aws:iam::1:role/unauth", "arn:aws:iam::1:role/auth"),
            DataResources::default(),
        );
        let mut paths = PathAccess::new();
        paths.grant("public/*", PrincipalClass::Guest, [StorageAction::Get]);
        let bucket = bucket();
        backend.import_bucket(bucket.clone());
        backend.add_storage_output(StorageOutput::for_bucket(&bucket, paths));
        backend
    }

    #[test]
    fn test_synth_requires_storage_output() {
        let backend = Backend::new(
            AuthResources::new("arn:aws:iam::1:role/unauth", "arn:aws:iam::1:role/auth"),
            DataResources::default(),
        );
        assert!(matches!(
            backend.synth(),
            Err(SynthError::MissingStorageOutput)
        ));
    }

    #[test]
    fn test_synth_emits_storage_block() {
        let artifact = backend_with_output().synth().unwrap();
        assert_eq!(artifact.outputs["storage"]["bucket_name"], "demo");
        assert_eq!(
            artifact.outputs["storage"]["buckets"][0]["paths"]["public/*"]["guest"],
            serde_json::json!(["get"])
        );
        assert!(artifact.policies.is_empty());
    }

    #[test]
    fn test_synth_rejects_invalid_attachment() {
        let mut backend = backend_with_output();
        backend.attach_policy(
            "arn:aws:iam::1:role/unauth",
            PolicyDocument::new("broken").with_statement(PolicyStatement::allow(
                ["s3:GetObject"],
                ["arn:aws:s3:::demo/admin/*arn:aws:s3:::demo/admin"],
            )),
        );
        assert!(matches!(
            backend.synth(),
            Err(SynthError::Policy(PolicyError::FusedResource { .. }))
        ));
    }

    #[test]
    fn test_write_to_persists_outputs_and_policies() {
        let mut backend = backend_with_output();
        backend.attach_policy(
            "arn:aws:iam::1:role/unauth",
            PolicyDocument::new("storage-guest-read").with_statement(PolicyStatement::allow(
                ["s3:GetObject"],
                ["arn:aws:s3:::demo/public/*"],
            )),
        );

        let artifact = backend.synth().unwrap();
        let dir = tempfile::tempdir().unwrap();
        artifact.write_to(dir.path()).unwrap();

        let outputs: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("amphora_outputs.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(outputs["storage"]["bucket_name"], "demo");

        let policy: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("policy.storage-guest-read.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(policy["role_arn"], "arn:aws:iam::1:role/unauth");
        assert_eq!(policy["document"]["Version"], "2012-10-17");
    }
}

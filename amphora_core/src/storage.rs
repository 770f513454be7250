use crate::access::PathAccess;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("malformed bucket ARN: '{0}'")]
    MalformedArn(String),

    #[error("bucket name cannot be empty")]
    EmptyName,
}

/// Identity of the bucket the backend builds on. The bucket always exists
/// before this crate runs; it is either imported by its full ARN or referred
/// to by name within a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BucketSource {
    Imported { arn: String, region: String },
    Named { name: String, region: String },
}

impl BucketSource {
    /// Import an existing bucket by ARN. The ARN must carry a non-empty
    /// resource field, which is the bucket name.
    pub fn imported(arn: impl Into<String>, region: impl Into<String>) -> Result<Self, StorageError> {
        let arn = arn.into();
        if bucket_name_from_arn(&arn).is_none() {
            return Err(StorageError::MalformedArn(arn));
        }
        Ok(BucketSource::Imported {
            arn,
            region: region.into(),
        })
    }

    /// Refer to an existing bucket by name; the ARN is derived.
    pub fn named(name: impl Into<String>, region: impl Into<String>) -> Result<Self, StorageError> {
        let name = name.into();
        if name.is_empty() {
            return Err(StorageError::EmptyName);
        }
        Ok(BucketSource::Named {
            name,
            region: region.into(),
        })
    }

    pub fn arn(&self) -> String {
        match self {
            BucketSource::Imported { arn, .. } => arn.clone(),
            BucketSource::Named { name, .. } => format!("arn:aws:s3:::{}", name),
        }
    }

    pub fn bucket_name(&self) -> &str {
        match self {
            // Upheld by the `imported` constructor.
            BucketSource::Imported { arn, .. } => bucket_name_from_arn(arn).unwrap_or(arn),
            BucketSource::Named { name, .. } => name,
        }
    }

    pub fn region(&self) -> &str {
        match self {
            BucketSource::Imported { region, .. } | BucketSource::Named { region, .. } => region,
        }
    }

    /// ARN of the objects matching `pattern` inside the bucket, for example
    /// `object_arn("public/*")`.
    pub fn object_arn(&self, pattern: &str) -> String {
        format!("{}/{}", self.arn(), pattern)
    }
}

fn bucket_name_from_arn(arn: &str) -> Option<&str> {
    let fields: Vec<&str> = arn.splitn(6, ':').collect();
    match fields.as_slice() {
        ["arn", _, "s3", _, _, name] if !name.is_empty() => Some(name),
        _ => None,
    }
}

/// One bucket entry in the generated storage output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketOutput {
    pub name: String,
    pub bucket_name: String,
    pub aws_region: String,
    pub paths: PathAccess,
}

/// The storage block of the generated backend output, consumed by
/// client-side configuration generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageOutput {
    pub aws_region: String,
    pub bucket_name: String,
    pub buckets: Vec<BucketOutput>,
}

impl StorageOutput {
    /// Build the output for a single bucket with the given path-permission
    /// table.
    pub fn for_bucket(source: &BucketSource, paths: PathAccess) -> Self {
        let bucket_name = source.bucket_name().to_string();
        Self {
            aws_region: source.region().to_string(),
            bucket_name: bucket_name.clone(),
            buckets: vec![BucketOutput {
                name: bucket_name.clone(),
                bucket_name,
                aws_region: source.region().to_string(),
                paths,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{PrincipalClass, StorageAction};

    #[test]
    fn test_imported_bucket_name_comes_from_arn() {
        let bucket =
            BucketSource::imported("arn:aws:s3:::demo-storage-bucket", "us-east-1").unwrap();
        assert_eq!(bucket.bucket_name(), "demo-storage-bucket");
        assert_eq!(bucket.region(), "us-east-1");
        assert_eq!(bucket.arn(), "arn:aws:s3:::demo-storage-bucket");
        assert_eq!(
            bucket.object_arn("public/*"),
            "arn:aws:s3:::demo-storage-bucket/public/*"
        );
    }

    #[test]
    fn test_imported_rejects_malformed_arn() {
        assert_eq!(
            BucketSource::imported("demo-storage-bucket", "us-east-1"),
            Err(StorageError::MalformedArn("demo-storage-bucket".into()))
        );
        assert!(BucketSource::imported("arn:aws:s3:::", "us-east-1").is_err());
        // Wrong service.
        assert!(BucketSource::imported("arn:aws:iam::123:role/x", "us-east-1").is_err());
    }

    #[test]
    fn test_named_bucket_derives_arn() {
        let bucket = BucketSource::named("demo-storage-bucket", "eu-west-1").unwrap();
        assert_eq!(bucket.arn(), "arn:aws:s3:::demo-storage-bucket");
        assert_eq!(bucket.bucket_name(), "demo-storage-bucket");
        assert!(BucketSource::named("", "eu-west-1").is_err());
    }

    #[test]
    fn test_storage_output_shape() {
        let bucket = BucketSource::imported("arn:aws:s3:::demo", "us-east-1").unwrap();
        let mut paths = PathAccess::new();
        paths.grant(
            "public/*",
            PrincipalClass::Guest,
            [StorageAction::Get, StorageAction::List],
        );

        let output = StorageOutput::for_bucket(&bucket, paths);
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "aws_region": "us-east-1",
                "bucket_name": "demo",
                "buckets": [{
                    "name": "demo",
                    "bucket_name": "demo",
                    "aws_region": "us-east-1",
                    "paths": {
                        "public/*": { "guest": ["get", "list"] }
                    }
                }]
            })
        );
    }
}

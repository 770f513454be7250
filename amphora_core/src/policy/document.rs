use super::error::PolicyError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;

/// Provider policy language version. Fixed; not configurable.
pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// A `StringLike` match block keyed by condition key (for example
/// `s3:prefix`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "StringLike")]
    pub string_like: BTreeMap<String, Vec<String>>,
}

/// One allow/deny statement: actions over resources, optionally constrained
/// by a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyStatement {
    #[serde(rename = "Effect")]
    pub effect: Effect,

    #[serde(rename = "Action")]
    pub actions: Vec<String>,

    #[serde(rename = "Resource")]
    pub resources: Vec<String>,

    #[serde(rename = "Condition", skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl PolicyStatement {
    /// Create an allow statement over the given actions and resources.
    pub fn allow<A, R>(actions: A, resources: R) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        Self {
            effect: Effect::Allow,
            actions: actions.into_iter().map(Into::into).collect(),
            resources: resources.into_iter().map(Into::into).collect(),
            condition: None,
        }
    }

    /// Constrain the statement to keys matching the given `s3:prefix`
    /// patterns.
    pub fn with_prefix_condition<P>(mut self, prefixes: P) -> Self
    where
        P: IntoIterator,
        P::Item: Into<String>,
    {
        let mut string_like = BTreeMap::new();
        string_like.insert(
            "s3:prefix".to_string(),
            prefixes.into_iter().map(Into::into).collect(),
        );
        self.condition = Some(Condition { string_like });
        self
    }
}

/// A named, declarative policy document destined for inline attachment to a
/// principal role. The name identifies the attachment; only the statements
/// are part of the provider document.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDocument {
    pub name: String,
    pub statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            statements: Vec::new(),
        }
    }

    pub fn with_statement(mut self, statement: PolicyStatement) -> Self {
        self.statements.push(statement);
        self
    }

    /// Render the provider-shape JSON document.
    pub fn to_provider_json(&self) -> serde_json::Value {
        json!({
            "Version": POLICY_VERSION,
            "Statement": self.statements,
        })
    }

    /// Validate the document before it reaches the provisioning call.
    ///
    /// A malformed statement here would otherwise surface only as a remote
    /// rejection at deploy time. The fused-ARN check exists because a
    /// resource list once shipped with two ARN literals concatenated into
    /// one entry; that class of input must never leave this crate again.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.statements.is_empty() {
            return Err(PolicyError::EmptyDocument(self.name.clone()));
        }

        for (index, statement) in self.statements.iter().enumerate() {
            if statement.actions.is_empty() {
                return Err(PolicyError::EmptyActions {
                    name: self.name.clone(),
                    index,
                });
            }
            if statement.resources.is_empty() {
                return Err(PolicyError::EmptyResources {
                    name: self.name.clone(),
                    index,
                });
            }

            for action in &statement.actions {
                // Provider actions are always service-qualified.
                if !action.contains(':') || action.starts_with(':') || action.ends_with(':') {
                    return Err(PolicyError::MalformedAction {
                        name: self.name.clone(),
                        index,
                        action: action.clone(),
                    });
                }
            }

            for resource in &statement.resources {
                if !resource.starts_with("arn:") || resource.split(':').count() < 6 {
                    return Err(PolicyError::MalformedResource {
                        name: self.name.clone(),
                        index,
                        resource: resource.clone(),
                    });
                }
                if resource[4..].contains("arn:") {
                    return Err(PolicyError::FusedResource {
                        name: self.name.clone(),
                        index,
                        resource: resource.clone(),
                    });
                }
            }

            if let Some(condition) = &statement.condition {
                for (key, values) in &condition.string_like {
                    if values.is_empty() || values.iter().any(String::is_empty) {
                        return Err(PolicyError::EmptyCondition {
                            name: self.name.clone(),
                            index,
                            key: key.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn well_formed() -> PolicyDocument {
        PolicyDocument::new("storage-guest-read")
            .with_statement(PolicyStatement::allow(
                ["s3:GetObject"],
                ["arn:aws:s3:::demo-bucket/public/*"],
            ))
            .with_statement(
                PolicyStatement::allow(
                    ["s3:ListBucket"],
                    ["arn:aws:s3:::demo-bucket", "arn:aws:s3:::demo-bucket/*"],
                )
                .with_prefix_condition(["public/", "public/*"]),
            )
    }

    #[test]
    fn test_well_formed_document_validates() {
        assert!(well_formed().validate().is_ok());
    }

    #[test]
    fn test_provider_json_shape() {
        let json = well_formed().to_provider_json();
        assert_eq!(json["Version"], POLICY_VERSION);
        assert_eq!(json["Statement"][0]["Effect"], "Allow");
        assert_eq!(json["Statement"][0]["Action"][0], "s3:GetObject");
        assert_eq!(
            json["Statement"][1]["Condition"]["StringLike"]["s3:prefix"],
            serde_json::json!(["public/", "public/*"])
        );
        // No condition on the first statement, so no Condition key at all.
        assert!(json["Statement"][0].get("Condition").is_none());
    }

    #[test]
    fn test_rejects_fused_resource_arns() {
        // The historical defect: two resource list entries written without a
        // separator, arriving as one fused literal.
        let fused = "arn:aws:s3:::demo-bucket/admin/*arn:aws:s3:::demo-bucket/admin";
        let doc = PolicyDocument::new("storage-admin-manage").with_statement(
            PolicyStatement::allow(["s3:GetObject"], [fused]),
        );

        match doc.validate() {
            Err(PolicyError::FusedResource { resource, .. }) => assert_eq!(resource, fused),
            other => panic!("expected FusedResource, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_empty_statement_lists() {
        let doc = PolicyDocument::new("empty");
        assert_eq!(doc.validate(), Err(PolicyError::EmptyDocument("empty".into())));

        let doc = PolicyDocument::new("no-actions")
            .with_statement(PolicyStatement::allow(Vec::<&str>::new(), ["arn:aws:s3:::b"]));
        assert!(matches!(doc.validate(), Err(PolicyError::EmptyActions { .. })));

        let doc = PolicyDocument::new("no-resources")
            .with_statement(PolicyStatement::allow(["s3:GetObject"], Vec::<&str>::new()));
        assert!(matches!(doc.validate(), Err(PolicyError::EmptyResources { .. })));
    }

    #[test]
    fn test_rejects_malformed_resource_and_action() {
        let doc = PolicyDocument::new("bad-resource")
            .with_statement(PolicyStatement::allow(["s3:GetObject"], ["demo-bucket/public/*"]));
        assert!(matches!(
            doc.validate(),
            Err(PolicyError::MalformedResource { .. })
        ));

        let doc = PolicyDocument::new("bad-action")
            .with_statement(PolicyStatement::allow(["GetObject"], ["arn:aws:s3:::b"]));
        assert!(matches!(
            doc.validate(),
            Err(PolicyError::MalformedAction { .. })
        ));
    }

    #[test]
    fn test_rejects_empty_condition_values() {
        let doc = PolicyDocument::new("bad-condition").with_statement(
            PolicyStatement::allow(["s3:ListBucket"], ["arn:aws:s3:::b"])
                .with_prefix_condition(Vec::<&str>::new()),
        );
        assert!(matches!(
            doc.validate(),
            Err(PolicyError::EmptyCondition { .. })
        ));
    }
}

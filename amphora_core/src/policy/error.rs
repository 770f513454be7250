use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("policy '{0}' has no statements")]
    EmptyDocument(String),

    #[error("policy '{name}' statement {index}: no actions")]
    EmptyActions { name: String, index: usize },

    #[error("policy '{name}' statement {index}: no resources")]
    EmptyResources { name: String, index: usize },

    #[error("policy '{name}' statement {index}: malformed action '{action}'")]
    MalformedAction {
        name: String,
        index: usize,
        action: String,
    },

    #[error("policy '{name}' statement {index}: malformed resource ARN '{resource}'")]
    MalformedResource {
        name: String,
        index: usize,
        resource: String,
    },

    #[error(
        "policy '{name}' statement {index}: resource '{resource}' contains two fused ARNs (missing separator between list entries?)"
    )]
    FusedResource {
        name: String,
        index: usize,
        resource: String,
    },

    #[error("policy '{name}' statement {index}: condition key '{key}' has no usable values")]
    EmptyCondition {
        name: String,
        index: usize,
        key: String,
    },
}

mod document;
mod error;

pub use document::{Condition, Effect, PolicyDocument, PolicyStatement, POLICY_VERSION};
pub use error::PolicyError;

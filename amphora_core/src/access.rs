use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// An operation a principal may perform under a storage path prefix.
///
/// The vocabulary is fixed; anything else is rejected at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageAction {
    Get,
    List,
    Write,
    Delete,
}

impl StorageAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageAction::Get => "get",
            StorageAction::List => "list",
            StorageAction::Write => "write",
            StorageAction::Delete => "delete",
        }
    }

    /// The provider-side action names backing this operation.
    pub fn provider_actions(&self) -> &'static [&'static str] {
        match self {
            StorageAction::Get => &["s3:GetObject"],
            StorageAction::List => &["s3:ListBucket"],
            StorageAction::Write => &["s3:PutObject"],
            StorageAction::Delete => &["s3:DeleteObject"],
        }
    }
}

impl fmt::Display for StorageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A category of requester: unauthenticated guest, any signed-in user, or a
/// member of a named permission group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PrincipalClass {
    Guest,
    Authenticated,
    Group(String),
}

impl PrincipalClass {
    pub fn group(name: impl Into<String>) -> Self {
        PrincipalClass::Group(name.into())
    }
}

impl fmt::Display for PrincipalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalClass::Guest => f.write_str("guest"),
            PrincipalClass::Authenticated => f.write_str("authenticated"),
            PrincipalClass::Group(name) => write!(f, "group:{}", name),
        }
    }
}

impl FromStr for PrincipalClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "guest" => Ok(PrincipalClass::Guest),
            "authenticated" => Ok(PrincipalClass::Authenticated),
            other => match other.strip_prefix("group:") {
                Some(name) if !name.is_empty() => Ok(PrincipalClass::Group(name.to_string())),
                _ => Err(format!("unknown principal class: '{}'", other)),
            },
        }
    }
}

// String-keyed so the class can sit directly in JSON object position.
impl Serialize for PrincipalClass {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PrincipalClass {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// The set of operations each principal class holds under one path pattern.
pub type GrantSet = BTreeMap<PrincipalClass, BTreeSet<StorageAction>>;

/// The path-permission table of a bucket: path prefix pattern (for example
/// `public/*`) mapped to the operations each principal class may perform
/// under it. Patterns are prefix patterns by convention; disjointness is not
/// enforced. Repeated grants for the same pattern and principal union.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathAccess {
    rules: BTreeMap<String, GrantSet>,
}

impl PathAccess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant `actions` to `principal` under `pattern`, unioning with any
    /// previous grant for the same pair.
    pub fn grant(
        &mut self,
        pattern: impl Into<String>,
        principal: PrincipalClass,
        actions: impl IntoIterator<Item = StorageAction>,
    ) -> &mut Self {
        self.rules
            .entry(pattern.into())
            .or_default()
            .entry(principal)
            .or_default()
            .extend(actions);
        self
    }

    /// Effective operations for `principal` under `pattern`.
    pub fn actions_for(&self, pattern: &str, principal: &PrincipalClass) -> BTreeSet<StorageAction> {
        self.rules
            .get(pattern)
            .and_then(|grants| grants.get(principal))
            .cloned()
            .unwrap_or_default()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn grants(&self, pattern: &str) -> Option<&GrantSet> {
        self.rules.get(pattern)
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

/// Strip the trailing wildcard from a path pattern: `public/*` -> `public/`.
pub fn pattern_prefix(pattern: &str) -> &str {
    pattern.strip_suffix('*').unwrap_or(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grants_union_for_repeated_rules() {
        let mut access = PathAccess::new();
        access.grant("public/*", PrincipalClass::Guest, [StorageAction::Get]);
        access.grant("public/*", PrincipalClass::Guest, [StorageAction::List]);

        let actions = access.actions_for("public/*", &PrincipalClass::Guest);
        assert_eq!(
            actions.into_iter().collect::<Vec<_>>(),
            vec![StorageAction::Get, StorageAction::List]
        );
    }

    #[test]
    fn test_principal_string_forms() {
        assert_eq!(PrincipalClass::Guest.to_string(), "guest");
        assert_eq!(PrincipalClass::Authenticated.to_string(), "authenticated");
        assert_eq!(PrincipalClass::group("admin").to_string(), "group:admin");

        assert_eq!(
            "group:admin".parse::<PrincipalClass>().unwrap(),
            PrincipalClass::group("admin")
        );
        assert!("group:".parse::<PrincipalClass>().is_err());
        assert!("root".parse::<PrincipalClass>().is_err());
    }

    #[test]
    fn test_path_access_json_shape() {
        let mut access = PathAccess::new();
        access.grant(
            "public/*",
            PrincipalClass::Guest,
            [StorageAction::Get, StorageAction::List],
        );
        access.grant(
            "public/*",
            PrincipalClass::Authenticated,
            [
                StorageAction::Get,
                StorageAction::List,
                StorageAction::Write,
                StorageAction::Delete,
            ],
        );

        let json = serde_json::to_value(&access).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "public/*": {
                    "guest": ["get", "list"],
                    "authenticated": ["get", "list", "write", "delete"],
                }
            })
        );

        let back: PathAccess = serde_json::from_value(json).unwrap();
        assert_eq!(back, access);
    }

    #[test]
    fn test_pattern_prefix() {
        assert_eq!(pattern_prefix("public/*"), "public/");
        assert_eq!(pattern_prefix("admin/"), "admin/");
    }
}

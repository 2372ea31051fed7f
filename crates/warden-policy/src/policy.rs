// policy.rs — The access policy: what is restricted and who may load it.
//
// A policy names a set of restricted identifiers and the trusted origins
// that may load them. Any caller frame under one of those origins
// authorizes the load; everything else is denied once the gatekeeper is
// installed.
//
// Exactly one policy is active at a time. Policies are immutable once
// built; registering a new one replaces the previous reference.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::origin::{MatchMode, OriginPath};

/// A single restriction rule set.
///
/// `allowed` entries are normalized at construction: `"app.trusted"` is
/// stored as the host path `app/trusted`. Order is preserved and
/// duplicates are kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessPolicy {
    /// Unique ID for this policy (shows up in logs).
    pub policy_id: Uuid,
    restricted: Vec<String>,
    allowed: Vec<OriginPath>,
    #[serde(default)]
    match_mode: MatchMode,
    /// When this policy was built.
    pub created_at: DateTime<Utc>,
}

impl AccessPolicy {
    /// Build a policy from restricted identifiers and trusted origins.
    ///
    /// Empty collections are accepted: an empty `restricted` list guards
    /// nothing, an empty `allowed` list denies every restricted load.
    pub fn new<R, A>(restricted: R, allowed: A) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        A: IntoIterator,
        A::Item: Into<String>,
    {
        let allowed = allowed
            .into_iter()
            .map(|raw| OriginPath::new(&raw.into()))
            .collect();
        Self {
            policy_id: Uuid::new_v4(),
            restricted: restricted.into_iter().map(Into::into).collect(),
            allowed,
            match_mode: MatchMode::default(),
            created_at: Utc::now(),
        }
    }

    /// Switch how allowed origins are compared against frames.
    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    pub fn restricted(&self) -> &[String] {
        &self.restricted
    }

    pub fn allowed(&self) -> &[OriginPath] {
        &self.allowed
    }

    pub fn match_mode(&self) -> MatchMode {
        self.match_mode
    }

    /// Check if loads of `identifier` are subject to provenance checks.
    pub fn is_restricted(&self, identifier: &str) -> bool {
        self.restricted.iter().any(|r| r == identifier)
    }

    /// Return the first allowed origin covering `frame`, if any.
    pub fn trusted_origin_for(&self, frame: &Path) -> Option<&OriginPath> {
        self.allowed
            .iter()
            .find(|origin| origin.matches(frame, self.match_mode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::MAIN_SEPARATOR;

    #[test]
    fn dotted_allowed_entries_are_normalized() {
        let policy = AccessPolicy::new(["secretlib"], ["pkg.sub", "other"]);
        let expected = format!("pkg{}sub", MAIN_SEPARATOR);
        assert_eq!(policy.allowed()[0].as_str(), expected);
        assert_eq!(policy.allowed()[1].as_str(), "other");
    }

    #[test]
    fn order_and_duplicates_are_preserved() {
        let policy = AccessPolicy::new(
            vec!["b".to_string(), "a".to_string(), "b".to_string()],
            ["x", "x"],
        );
        assert_eq!(policy.restricted(), &["b", "a", "b"]);
        assert_eq!(policy.allowed().len(), 2);
    }

    #[test]
    fn empty_collections_are_accepted() {
        let policy = AccessPolicy::new(Vec::<String>::new(), Vec::<String>::new());
        assert!(policy.restricted().is_empty());
        assert!(policy.allowed().is_empty());
        assert!(!policy.is_restricted("anything"));
    }

    #[test]
    fn restriction_is_exact_match() {
        let policy = AccessPolicy::new(["secretlib"], ["app.trusted"]);
        assert!(policy.is_restricted("secretlib"));
        assert!(!policy.is_restricted("secretlib.sub"));
        assert!(!policy.is_restricted("secret"));
    }

    #[test]
    fn trusted_origin_lookup_respects_match_mode() {
        let policy = AccessPolicy::new(["secretlib"], ["app/trusted"]);
        let evil = Path::new("/srv/app/trusted_evil/x.rs");
        assert!(policy.trusted_origin_for(evil).is_none());

        let legacy = policy.with_match_mode(MatchMode::Substring);
        assert_eq!(
            legacy.trusted_origin_for(evil).map(|o| o.as_str()),
            Some("app/trusted")
        );
    }

    #[test]
    fn policy_serializes_normalized_origins() {
        let policy = AccessPolicy::new(["secretlib"], ["app"]);
        let json = serde_json::to_value(&policy).unwrap();
        assert_eq!(json["restricted"][0], "secretlib");
        assert_eq!(json["allowed"][0]["rendered"], "app");
        assert_eq!(json["match_mode"], "segment");
    }
}

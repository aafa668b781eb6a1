//! Node and edge models for the access graph.
//!
//! Nodes are keyed solely by `id`. Edges carry a closed relationship kind whose
//! required properties are declared in [`EdgeProperties`] and checked once, at
//! construction.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Property name carried by every `HAS_ROLE` edge.
pub const ROLE_DEFINITION_ID: &str = "role_definition_id";

/// A resource, principal or scope in the access graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub location: Option<String>,
}

impl Node {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        node_type: impl Into<String>,
        location: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            node_type: node_type.into(),
            location,
        }
    }
}

/// Closed set of relationship kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipKind {
    /// A principal is attached to, or assigned into, a resource or scope.
    AssignedTo,
    /// A principal holds a role at a scope.
    HasRole,
}

impl RelationshipKind {
    /// The graph relationship type for this kind.
    pub fn label(&self) -> &'static str {
        match self {
            RelationshipKind::AssignedTo => "ASSIGNED_TO",
            RelationshipKind::HasRole => "HAS_ROLE",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for RelationshipKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ASSIGNED_TO" => Ok(Self::AssignedTo),
            "HAS_ROLE" => Ok(Self::HasRole),
            other => Err(ModelError::UnknownRelationshipKind(other.to_string())),
        }
    }
}

/// Kind-specific required properties of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeProperties {
    AssignedTo,
    HasRole { role_definition_id: String },
}

impl EdgeProperties {
    pub fn kind(&self) -> RelationshipKind {
        match self {
            EdgeProperties::AssignedTo => RelationshipKind::AssignedTo,
            EdgeProperties::HasRole { .. } => RelationshipKind::HasRole,
        }
    }

    /// The role definition carried by a `HAS_ROLE` edge.
    pub fn role_definition_id(&self) -> Option<&str> {
        match self {
            EdgeProperties::HasRole { role_definition_id } => Some(role_definition_id),
            EdgeProperties::AssignedTo => None,
        }
    }

    /// Names of the properties this kind requires.
    pub fn required_keys(kind: RelationshipKind) -> &'static [&'static str] {
        match kind {
            RelationshipKind::AssignedTo => &[],
            RelationshipKind::HasRole => &[ROLE_DEFINITION_ID],
        }
    }
}

/// Semantic identity of an edge. Two edges with the same key are the same
/// stored relationship.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub source: String,
    pub target: String,
    pub kind: RelationshipKind,
    pub role_definition_id: Option<String>,
}

/// A directed relationship between two node ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    pub properties: EdgeProperties,
    /// Additional properties that are not part of the merge key.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Edge {
    /// `(source)-[:ASSIGNED_TO]->(target)`
    pub fn assigned_to(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            properties: EdgeProperties::AssignedTo,
            extra: BTreeMap::new(),
        }
    }

    /// `(source)-[:HAS_ROLE {role_definition_id}]->(target)`
    pub fn has_role(
        source: impl Into<String>,
        target: impl Into<String>,
        role_definition_id: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            properties: EdgeProperties::HasRole {
                role_definition_id: role_definition_id.into(),
            },
            extra: BTreeMap::new(),
        }
    }

    /// Build an edge from an open property map.
    ///
    /// Required properties for `kind` are lifted into [`EdgeProperties`]; the
    /// remaining keys are kept as extra properties. Fails when a required
    /// property is missing or empty, or when an extra key is not a plain
    /// identifier.
    pub fn from_parts(
        source: impl Into<String>,
        target: impl Into<String>,
        kind: RelationshipKind,
        mut properties: BTreeMap<String, String>,
    ) -> ModelResult<Self> {
        let missing = EdgeProperties::required_keys(kind)
            .iter()
            .find(|key| !properties.get(**key).is_some_and(|v| !v.is_empty()));
        if let Some(&missing) = missing {
            return Err(ModelError::MalformedRelationship { kind, missing });
        }

        let edge_properties = match kind {
            RelationshipKind::AssignedTo => EdgeProperties::AssignedTo,
            RelationshipKind::HasRole => EdgeProperties::HasRole {
                role_definition_id: properties.remove(ROLE_DEFINITION_ID).unwrap_or_default(),
            },
        };

        if let Some(bad) = properties.keys().find(|k| !is_property_key(k)) {
            return Err(ModelError::InvalidPropertyKey(bad.clone()));
        }

        Ok(Self {
            source: source.into(),
            target: target.into(),
            properties: edge_properties,
            extra: properties,
        })
    }

    pub fn kind(&self) -> RelationshipKind {
        self.properties.kind()
    }

    /// All properties of the edge as an open map.
    pub fn properties(&self) -> BTreeMap<String, String> {
        let mut all = self.extra.clone();
        if let Some(role) = self.properties.role_definition_id() {
            all.insert(ROLE_DEFINITION_ID.to_string(), role.to_string());
        }
        all
    }

    pub fn merge_key(&self) -> EdgeKey {
        EdgeKey {
            source: self.source.clone(),
            target: self.target.clone(),
            kind: self.kind(),
            role_definition_id: self.properties.role_definition_id().map(str::to_string),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})-[:{}]->({})", self.source, self.kind(), self.target)
    }
}

/// Property keys end up in Cypher text, so only plain identifiers pass.
fn is_property_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_role_requires_role_definition_id() {
        let err = Edge::from_parts("p", "g", RelationshipKind::HasRole, BTreeMap::new()).unwrap_err();
        assert_eq!(
            err,
            ModelError::MalformedRelationship {
                kind: RelationshipKind::HasRole,
                missing: ROLE_DEFINITION_ID
            }
        );
    }

    #[test]
    fn test_has_role_rejects_empty_role_definition_id() {
        let props = BTreeMap::from([(ROLE_DEFINITION_ID.to_string(), String::new())]);
        assert!(Edge::from_parts("p", "g", RelationshipKind::HasRole, props).is_err());
    }

    #[test]
    fn test_has_role_from_parts() {
        let props = BTreeMap::from([
            (ROLE_DEFINITION_ID.to_string(), "/roles/reader".to_string()),
            ("assignment".to_string(), "a1".to_string()),
        ]);
        let edge = Edge::from_parts("p", "g", RelationshipKind::HasRole, props.clone()).unwrap();
        assert_eq!(edge.kind(), RelationshipKind::HasRole);
        assert_eq!(edge.properties.role_definition_id(), Some("/roles/reader"));
        assert_eq!(edge.extra.get("assignment").map(String::as_str), Some("a1"));
        assert_eq!(edge.properties(), props);
    }

    #[test]
    fn test_assigned_to_has_no_required_properties() {
        let edge = Edge::from_parts("p", "r", RelationshipKind::AssignedTo, BTreeMap::new()).unwrap();
        assert_eq!(edge, Edge::assigned_to("p", "r"));
        assert!(edge.properties().is_empty());
    }

    #[test]
    fn test_required_keys_are_consumed_by_from_parts() {
        for kind in [RelationshipKind::AssignedTo, RelationshipKind::HasRole] {
            let required = EdgeProperties::required_keys(kind);
            let props: BTreeMap<String, String> =
                required.iter().map(|k| (k.to_string(), "value".to_string())).collect();
            let edge = Edge::from_parts("p", "t", kind, props.clone()).unwrap();

            assert!(required.iter().all(|k| !edge.extra.contains_key(*k)));
            assert_eq!(edge.properties(), props);

            for &missing in required {
                let mut partial = props.clone();
                partial.remove(missing);
                let err = Edge::from_parts("p", "t", kind, partial).unwrap_err();
                assert_eq!(err, ModelError::MalformedRelationship { kind, missing });
            }
        }
    }

    #[test]
    fn test_invalid_extra_key() {
        let props = BTreeMap::from([("bad key}".to_string(), "x".to_string())]);
        let err = Edge::from_parts("p", "r", RelationshipKind::AssignedTo, props).unwrap_err();
        assert_eq!(err, ModelError::InvalidPropertyKey("bad key}".to_string()));
    }

    #[test]
    fn test_merge_key_distinguishes_roles() {
        let reader = Edge::has_role("p", "g", "reader");
        let owner = Edge::has_role("p", "g", "owner");
        assert_ne!(reader.merge_key(), owner.merge_key());
        assert_eq!(reader.merge_key(), Edge::has_role("p", "g", "reader").merge_key());
    }

    #[test]
    fn test_kind_labels_round_trip() {
        for kind in [RelationshipKind::AssignedTo, RelationshipKind::HasRole] {
            assert_eq!(kind.label().parse::<RelationshipKind>().unwrap(), kind);
        }
        assert!("OWNS".parse::<RelationshipKind>().is_err());
    }
}

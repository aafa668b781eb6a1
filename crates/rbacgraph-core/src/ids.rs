//! Canonical graph keys for ARM identifiers.
//!
//! Azure returns the same resource path with different casing of its
//! collection segments depending on the API (`resourcegroups` vs
//! `resourceGroups`). Node identity is an exact string match, so every id used
//! as a graph key goes through [`canonical_key`].

/// Collection segments rewritten to a fixed casing.
const CANONICAL_SEGMENTS: &[&str] = &["subscriptions", "resourceGroups", "providers"];

/// Canonicalize an id before it is used as a node id or edge endpoint.
///
/// ARM paths (leading `/`) get their collection segments rewritten to the
/// casing in [`CANONICAL_SEGMENTS`] and lose any trailing `/`; the root scope
/// stays `/`. Other strings,
/// such as principal GUIDs, are returned unchanged. Resource names are never
/// touched, only whole segments that equal a collection name.
pub fn canonical_key(id: &str) -> String {
    if !id.starts_with('/') {
        return id.to_string();
    }

    let trimmed = id.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/".to_string();
    }

    trimmed
        .split('/')
        .enumerate()
        .map(|(i, segment)| {
            // Collection segments sit at odd positions: "", "subscriptions", "{id}", ...
            if i % 2 == 1 {
                CANONICAL_SEGMENTS
                    .iter()
                    .find(|c| c.eq_ignore_ascii_case(segment))
                    .copied()
                    .unwrap_or(segment)
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Path segments of an ARM id, lowercased for comparison.
pub(crate) fn segments(id: &str) -> Vec<String> {
    id.trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_lowercase())
        .collect()
}

/// True when one scope contains the other (or they are equal).
///
/// Mirrors how ARM lists role assignments for a scope: assignments at the
/// scope, above it and below it all apply.
pub fn scopes_related(a: &str, b: &str) -> bool {
    let a = segments(a);
    let b = segments(b);
    let n = a.len().min(b.len());
    a[..n] == b[..n]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_resource_group_segment() {
        let id = "/subscriptions/s1/resourcegroups/rg-Prod/providers/Microsoft.ManagedIdentity/userAssignedIdentities/uami";
        assert_eq!(
            canonical_key(id),
            "/subscriptions/s1/resourceGroups/rg-Prod/providers/Microsoft.ManagedIdentity/userAssignedIdentities/uami"
        );
    }

    #[test]
    fn test_canonical_input_is_unchanged() {
        let id = "/subscriptions/s1/resourceGroups/rg/providers/Microsoft.Web/sites/app";
        assert_eq!(canonical_key(id), id);
    }

    #[test]
    fn test_names_are_not_rewritten() {
        // A resource group literally named "resourcegroups" keeps its name.
        let id = "/Subscriptions/s1/RESOURCEGROUPS/resourcegroups";
        assert_eq!(canonical_key(id), "/subscriptions/s1/resourceGroups/resourcegroups");
    }

    #[test]
    fn test_trailing_slash_removed() {
        assert_eq!(canonical_key("/subscriptions/s1/resourcegroups/rg/"), "/subscriptions/s1/resourceGroups/rg");
    }

    #[test]
    fn test_root_scope_is_kept() {
        assert_eq!(canonical_key("/"), "/");
        assert_eq!(canonical_key("//"), "/");
    }

    #[test]
    fn test_guid_untouched() {
        let guid = "6A1B8C3D-0000-4000-8000-ABCDEF012345";
        assert_eq!(canonical_key(guid), guid);
    }

    #[test]
    fn test_scopes_related() {
        let rg = "/subscriptions/s1/resourceGroups/rg";
        let site = "/subscriptions/s1/resourcegroups/RG/providers/Microsoft.Web/sites/app";
        assert!(scopes_related(rg, site));
        assert!(scopes_related(site, rg));
        assert!(scopes_related(rg, rg));
        assert!(scopes_related("/", rg));
        assert!(!scopes_related(rg, "/subscriptions/s1/resourceGroups/other"));
    }
}

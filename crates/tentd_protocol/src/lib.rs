/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct GroupRef {
    pub id: String,
}

/// Permission summary attached to a serialized resource.
///
/// The compact form only carries `public`; the extended form also lists the
/// groups and entities the resource has been shared with.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct PermissionsJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<GroupRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entities: Option<BTreeMap<String, bool>>,
    pub public: bool,
}

impl PermissionsJson {
    pub fn compact(public: bool) -> Self {
        Self {
            groups: None,
            entities: None,
            public,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct GrantGroup {
    #[serde(default)]
    pub id: Option<String>,
}

/// Grant-assignment input: `{ groups: [{id}], entities: {entity: bool}, public }`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct PermissionsSpec {
    #[serde(default)]
    pub groups: Option<Vec<GrantGroup>>,
    #[serde(default)]
    pub entities: Option<BTreeMap<String, bool>>,
    #[serde(default)]
    pub public: Option<bool>,
}

impl PermissionsSpec {
    pub fn group_ids(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flatten()
            .filter_map(|g| g.id.as_deref())
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    pub fn visible_entities(&self) -> impl Iterator<Item = &str> {
        self.entities
            .iter()
            .flatten()
            .filter(|(_, visible)| **visible)
            .map(|(entity, _)| entity.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compact_summary_omits_grant_lists() {
        let json = serde_json::to_string(&PermissionsJson::compact(true)).unwrap();
        assert_eq!(json, r#"{"public":true}"#);
    }

    #[test]
    fn grant_spec_skips_missing_ids_and_hidden_entities() {
        let spec: PermissionsSpec = serde_json::from_str(
            r#"{
                "groups": [{"id": "g1"}, {}, {"id": "  "}],
                "entities": {"https://alice.example.com": true, "https://bob.example.com": false},
                "public": null
            }"#,
        )
        .unwrap();
        assert_eq!(spec.group_ids().collect::<Vec<_>>(), vec!["g1"]);
        assert_eq!(
            spec.visible_entities().collect::<Vec<_>>(),
            vec!["https://alice.example.com"]
        );
        assert_eq!(spec.public, None);
    }
}

/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::permissible::Permissible;
use crate::store::PermissibleDb;
use anyhow::Result;
use rusqlite::params;
use std::collections::BTreeMap;
use tentd_protocol::{GroupRef, PermissionsJson};

impl PermissibleDb {
    /// Transfer form of a resource's grants. Group grants list the group's
    /// public id and follower grants the follower's entity; following grants
    /// are not listed. Deleted groups and followers are left out.
    pub fn permissions_json<T: Permissible>(&self, resource: &T, extended: bool) -> Result<PermissionsJson> {
        if !extended {
            return Ok(PermissionsJson::compact(resource.is_public()));
        }
        let reg = self.registry().get(T::resource_type())?;
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT g.public_id, f.entity
            FROM permissions p
            LEFT JOIN groups g ON g.public_id = p.group_public_id AND g.deleted_at IS NULL
            LEFT JOIN followers f ON f.id = p.follower_access_id AND f.deleted_at IS NULL
            WHERE p.{} = ?1
            ORDER BY p.id ASC
            "#,
            reg.summary_fk
        ))?;
        let rows = stmt
            .query_map(params![resource.id()], |r| {
                Ok((r.get::<_, Option<String>>(0)?, r.get::<_, Option<String>>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut groups: Vec<GroupRef> = Vec::new();
        let mut entities = BTreeMap::new();
        for (group, entity) in rows {
            if let Some(id) = group {
                if !groups.iter().any(|g| g.id == id) {
                    groups.push(GroupRef { id });
                }
            }
            if let Some(entity) = entity {
                entities.insert(entity, true);
            }
        }

        Ok(PermissionsJson {
            groups: Some(groups),
            entities: Some(entities),
            public: resource.is_public(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::auth::Relation;
    use crate::config::FetchConfig;
    use crate::resources::NewPost;
    use crate::store::PermissibleDb;
    use serde_json::json;

    #[test]
    fn deleted_groups_and_removed_followers_are_not_listed() {
        let dir = tempfile::tempdir().unwrap();
        let db = PermissibleDb::open(dir.path().join("t.sqlite"), FetchConfig::default()).unwrap();
        let kept = db.create_group(1, "friends").unwrap();
        let dropped = db.create_group(1, "family").unwrap();
        db.add_follower(1, "https://alice.example", &[]).unwrap();
        let bob = db.add_follower(1, "https://bob.example", &[]).unwrap();
        let mut post = db.create_post(1, &NewPost::status("https://o.example", "hi", false)).unwrap();

        let spec = serde_json::from_value(json!({
            "groups": [{"id": kept.public_id}, {"id": dropped.public_id}],
            "entities": {"https://alice.example": true, "https://bob.example": true}
        }))
        .unwrap();
        db.assign_permissions(1, &mut post, &spec).unwrap();

        db.conn()
            .unwrap()
            .execute("UPDATE groups SET deleted_at=1 WHERE id=?1", [dropped.id])
            .unwrap();
        assert!(db.remove_contact(Relation::Follower, 1, bob.id).unwrap());

        let summary = db.permissions_json(&post, true).unwrap();
        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            json!({ "groups": [{"id": kept.public_id}], "entities": {"https://alice.example": true}, "public": false })
        );
    }
}

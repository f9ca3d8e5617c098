/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::auth::Relation;
use crate::permissible::Permissible;
use crate::social::normalize_entity;
use crate::store::{now_ms, PermissibleDb};
use anyhow::{bail, Result};
use rusqlite::{params, OptionalExtension, Transaction};
use tentd_protocol::PermissionsSpec;
use tracing::{info, warn};

impl PermissibleDb {
    /// Apply a grant spec to one of `owner_id`'s resources.
    ///
    /// Group ids are resolved among the owner's groups and entities among the
    /// owner's followers and followings; unknown references are skipped. All
    /// writes, including the public flag, commit together or not at all.
    pub fn assign_permissions<T: Permissible>(
        &self,
        owner_id: i64,
        resource: &mut T,
        spec: &PermissionsSpec,
    ) -> Result<()> {
        let reg = self.registry().get(T::resource_type())?;
        if resource.owner_id() != owner_id {
            bail!(
                "{} #{} is not owned by identity {owner_id}",
                reg.table,
                resource.id()
            );
        }
        let fk = reg.permissions_fk;
        let resource_id = resource.id();

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let now = now_ms();
        let mut granted = 0usize;

        for group_id in spec.group_ids() {
            let found: Option<String> = tx
                .query_row(
                    "SELECT public_id FROM groups WHERE user_id=?1 AND public_id=?2 AND deleted_at IS NULL",
                    params![owner_id, group_id],
                    |r| r.get(0),
                )
                .optional()?;
            let Some(public_id) = found else {
                warn!(table = reg.table, id = resource_id, group = %group_id, "grant skipped: unknown group");
                continue;
            };
            tx.execute(
                &format!("INSERT INTO permissions({fk}, group_public_id, created_at_ms) VALUES (?1, ?2, ?3)"),
                params![resource_id, public_id, now],
            )?;
            granted += 1;
        }

        for entity in spec.visible_entities() {
            let entity = normalize_entity(entity);
            let mut matched = 0usize;
            for relation in [Relation::Follower, Relation::Following] {
                matched += grant_relation(&tx, fk, resource_id, relation, owner_id, &entity, now)?;
            }
            if matched == 0 {
                warn!(table = reg.table, id = resource_id, entity = %entity, "grant skipped: unknown entity");
            }
            granted += matched;
        }

        if let Some(public) = spec.public {
            tx.execute(
                &format!("UPDATE {} SET public=?1 WHERE id=?2 AND user_id=?3", reg.table),
                params![public, resource_id, owner_id],
            )?;
        }

        tx.commit()?;
        if let Some(public) = spec.public {
            resource.set_public(public);
        }
        info!(table = reg.table, id = resource_id, granted, public = ?spec.public, "permissions assigned");
        Ok(())
    }
}

fn grant_relation(
    tx: &Transaction<'_>,
    fk: &str,
    resource_id: i64,
    relation: Relation,
    owner_id: i64,
    entity: &str,
    now: i64,
) -> Result<usize> {
    let ids = {
        let mut stmt = tx.prepare(&format!(
            "SELECT id FROM {} WHERE user_id=?1 AND entity=?2 AND deleted_at IS NULL ORDER BY id ASC",
            relation.table()
        ))?;
        let rows = stmt
            .query_map(params![owner_id, entity], |r| r.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        rows
    };
    let column = relation.permission_column();
    for id in &ids {
        tx.execute(
            &format!("INSERT INTO permissions({fk}, {column}, created_at_ms) VALUES (?1, ?2, ?3)"),
            params![resource_id, id, now],
        )?;
    }
    Ok(ids.len())
}

#[cfg(test)]
mod tests {
    use crate::config::FetchConfig;
    use crate::resources::{NewPost, Post};
    use crate::store::PermissibleDb;
    use tentd_protocol::{GrantGroup, PermissionsSpec};

    fn permission_rows(db: &PermissibleDb, post_id: i64) -> i64 {
        db.conn()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM permissions WHERE post_id=?1", [post_id], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn foreign_groups_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let db = PermissibleDb::open(dir.path().join("t.sqlite"), FetchConfig::default()).unwrap();
        let mine = db.create_group(1, "friends").unwrap();
        let theirs = db.create_group(2, "family").unwrap();
        let mut post = db.create_post(1, &NewPost::status("https://o.example", "hi", false)).unwrap();

        let spec = PermissionsSpec {
            groups: Some(vec![
                GrantGroup { id: Some(mine.public_id.clone()) },
                GrantGroup { id: Some(theirs.public_id.clone()) },
                GrantGroup { id: Some("missing".into()) },
                GrantGroup { id: None },
            ]),
            ..Default::default()
        };
        db.assign_permissions(1, &mut post, &spec).unwrap();
        assert_eq!(permission_rows(&db, post.id), 1);
        assert!(!post.public);
    }

    #[test]
    fn failed_write_rolls_back_every_grant() {
        let dir = tempfile::tempdir().unwrap();
        let db = PermissibleDb::open(dir.path().join("t.sqlite"), FetchConfig::default()).unwrap();
        let group = db.create_group(1, "friends").unwrap();
        db.add_follower(1, "https://alice.example", &[]).unwrap();
        let mut post = db.create_post(1, &NewPost::status("https://o.example", "hi", false)).unwrap();

        // The public flag is the last write; make it fail.
        db.conn()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_public BEFORE UPDATE OF public ON posts BEGIN SELECT RAISE(ABORT, 'nope'); END;",
            )
            .unwrap();

        let spec: PermissionsSpec = serde_json::from_value(serde_json::json!({
            "groups": [{"id": group.public_id}],
            "entities": {"https://alice.example": true},
            "public": true
        }))
        .unwrap();
        assert!(db.assign_permissions(1, &mut post, &spec).is_err());
        assert_eq!(permission_rows(&db, post.id), 0);
        assert!(!post.public);
        let stored = db.find_with_permissions::<Post>(1, post.id, &crate::auth::Caller::Owner).unwrap().unwrap();
        assert!(!stored.public);
    }

    #[test]
    fn resource_of_another_owner_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let db = PermissibleDb::open(dir.path().join("t.sqlite"), FetchConfig::default()).unwrap();
        let mut post = db.create_post(2, &NewPost::status("https://x.example", "hi", false)).unwrap();
        let spec = PermissionsSpec { public: Some(true), ..Default::default() };
        assert!(db.assign_permissions(1, &mut post, &spec).is_err());
    }
}

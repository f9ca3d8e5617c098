/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::auth::{Caller, Relation, ScopedCaller};
use crate::store::{now_ms, random_public_id, PermissibleDb};
use anyhow::{Context, Result};
use rusqlite::{params, OptionalExtension};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Group {
    pub id: i64,
    pub user_id: i64,
    pub public_id: String,
    pub name: String,
}

/// A follower or following relation of an owner.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Contact {
    pub id: i64,
    pub user_id: i64,
    pub entity: String,
    pub groups: Vec<String>,
    #[serde(skip)]
    pub relation: Relation,
}

impl Contact {
    pub fn caller(&self) -> Caller {
        Caller::Scoped(ScopedCaller {
            id: self.id,
            entity: Some(self.entity.clone()),
            relation: self.relation,
            groups: self.groups.clone(),
        })
    }
}

impl PermissibleDb {
    pub fn create_group(&self, owner_id: i64, name: &str) -> Result<Group> {
        let conn = self.conn()?;
        let public_id = random_public_id();
        conn.execute(
            "INSERT INTO groups(user_id, public_id, name, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
            params![owner_id, public_id, name, now_ms()],
        )?;
        Ok(Group {
            id: conn.last_insert_rowid(),
            user_id: owner_id,
            public_id,
            name: name.to_string(),
        })
    }

    pub fn add_follower(&self, owner_id: i64, entity: &str, groups: &[String]) -> Result<Contact> {
        self.add_contact(Relation::Follower, owner_id, entity, groups)
    }

    pub fn add_following(&self, owner_id: i64, entity: &str, groups: &[String]) -> Result<Contact> {
        self.add_contact(Relation::Following, owner_id, entity, groups)
    }

    /// Soft-deletes the relation. Grants held through it stop matching, even
    /// for callers built before the removal. Returns false when nothing matched.
    pub fn remove_contact(&self, relation: Relation, owner_id: i64, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute(
            &format!(
                "UPDATE {} SET deleted_at=?1 WHERE id=?2 AND user_id=?3 AND deleted_at IS NULL",
                relation.table()
            ),
            params![now_ms(), id, owner_id],
        )?;
        Ok(n > 0)
    }

    pub fn get_contact(&self, relation: Relation, owner_id: i64, id: i64) -> Result<Option<Contact>> {
        let conn = self.conn()?;
        let row: Option<(i64, i64, String, String)> = conn
            .query_row(
                &format!(
                    "SELECT id, user_id, entity, groups FROM {} WHERE id=?1 AND user_id=?2 AND deleted_at IS NULL",
                    relation.table()
                ),
                params![id, owner_id],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )
            .optional()?;
        let Some((id, user_id, entity, groups)) = row else {
            return Ok(None);
        };
        let groups: Vec<String> = serde_json::from_str(&groups)
            .with_context(|| format!("decode groups of {} #{id}", relation.table()))?;
        Ok(Some(Contact {
            id,
            user_id,
            entity,
            groups,
            relation,
        }))
    }

    /// Caller context for a stored follower/following, carrying its group memberships.
    pub fn caller_for(&self, relation: Relation, owner_id: i64, id: i64) -> Result<Option<Caller>> {
        Ok(self
            .get_contact(relation, owner_id, id)?
            .map(|r| r.caller()))
    }

    fn add_contact(&self, relation: Relation, owner_id: i64, entity: &str, groups: &[String]) -> Result<Contact> {
        let entity = normalize_entity(entity);
        let conn = self.conn()?;
        let groups_json = serde_json::to_string(groups).context("serialize groups")?;
        conn.execute(
            &format!(
                "INSERT INTO {}(user_id, entity, groups, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
                relation.table()
            ),
            params![owner_id, entity, groups_json, now_ms()],
        )?;
        Ok(Contact {
            id: conn.last_insert_rowid(),
            user_id: owner_id,
            entity,
            groups: groups.to_vec(),
            relation,
        })
    }
}

pub(crate) fn normalize_entity(entity: &str) -> String {
    entity.trim().trim_end_matches('/').to_string()
}

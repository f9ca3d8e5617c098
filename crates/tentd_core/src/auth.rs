/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Follower,
    Following,
}

impl Relation {
    /// Grant-target column on `permissions` for this relation.
    pub fn permission_column(self) -> &'static str {
        match self {
            Relation::Follower => "follower_access_id",
            Relation::Following => "following_id",
        }
    }

    pub fn table(self) -> &'static str {
        match self {
            Relation::Follower => "followers",
            Relation::Following => "followings",
        }
    }
}

/// A remote entity reading through one of the owner's relations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopedCaller {
    /// Row id of the follower/following relation.
    pub id: i64,
    pub entity: Option<String>,
    pub relation: Relation,
    /// Public ids of the owner's groups the caller belongs to.
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    /// Authorized application without grant matching.
    App { app_id: i64 },
    /// The owning identity itself.
    Owner,
    Scoped(ScopedCaller),
}

impl Caller {
    pub fn follower(id: i64, entity: impl Into<String>, groups: Vec<String>) -> Self {
        Caller::Scoped(ScopedCaller {
            id,
            entity: Some(entity.into()),
            relation: Relation::Follower,
            groups,
        })
    }

    pub fn following(id: i64, entity: impl Into<String>, groups: Vec<String>) -> Self {
        Caller::Scoped(ScopedCaller {
            id,
            entity: Some(entity.into()),
            relation: Relation::Following,
            groups,
        })
    }

    /// Grant-matching capability. Only scoped callers can be matched against
    /// permission rows; everyone else sees public rows or, for the owner, all rows.
    pub fn grant_scope(&self) -> Option<&ScopedCaller> {
        match self {
            Caller::Scoped(scope) => Some(scope),
            _ => None,
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, Caller::Owner)
    }
}

impl ScopedCaller {
    /// Non-empty group ids, deduplicated, in first-seen order.
    pub fn group_ids(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for g in &self.groups {
            let g = g.trim();
            if !g.is_empty() && !out.contains(&g) {
                out.push(g);
            }
        }
        out
    }
}

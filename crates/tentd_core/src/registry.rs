/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{bail, Context, Result};
use std::collections::HashMap;

/// Grant-target columns of the `permissions` table. A resource foreign key
/// may never reuse one of these.
pub const GRANT_TARGET_COLUMNS: &[&str] = &["group_public_id", "follower_access_id", "following_id"];

const REQUIRED_COLUMNS: &[&str] = &["id", "user_id", "public", "deleted_at"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    Permissions,
    AccessPermissions,
    VisibilityPermissions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relationship {
    pub kind: RelationshipKind,
    /// Column on `permissions` referencing the resource id.
    pub foreign_key: &'static str,
}

/// Static description of a permission-controlled table.
#[derive(Debug)]
pub struct ResourceType {
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub relationships: &'static [Relationship],
}

impl ResourceType {
    fn relationship(&self, kind: RelationshipKind) -> Option<&'static str> {
        self.relationships
            .iter()
            .find(|r| r.kind == kind)
            .map(|r| r.foreign_key)
    }
}

/// Resolved, validated view of a [`ResourceType`].
#[derive(Debug, Clone)]
pub struct Registration {
    pub table: &'static str,
    pub columns: &'static [&'static str],
    /// Key written by grant assignment.
    pub permissions_fk: &'static str,
    /// Key joined on when evaluating visibility.
    pub visibility_fk: &'static str,
    /// Key scanned when rendering the permission summary.
    pub summary_fk: &'static str,
    pub has_original: bool,
    pub has_entity: bool,
}

impl Registration {
    pub fn resolve(rt: &ResourceType) -> Result<Self> {
        ensure_identifier(rt.table).with_context(|| format!("resource table {:?}", rt.table))?;
        for col in rt.columns {
            ensure_identifier(col).with_context(|| format!("column of {}", rt.table))?;
        }
        for required in REQUIRED_COLUMNS {
            if !rt.columns.contains(required) {
                bail!("resource {} does not declare column {required}", rt.table);
            }
        }

        let generic = rt.relationship(RelationshipKind::Permissions);
        let access = rt.relationship(RelationshipKind::AccessPermissions);
        let visibility = rt.relationship(RelationshipKind::VisibilityPermissions);

        let Some(permissions_fk) = access.or(generic) else {
            bail!("resource {} declares no permissions relationship", rt.table);
        };
        let visibility_fk = visibility.unwrap_or(permissions_fk);
        let summary_fk = generic.unwrap_or(visibility_fk);

        for fk in [permissions_fk, visibility_fk, summary_fk] {
            ensure_identifier(fk).with_context(|| format!("foreign key of {}", rt.table))?;
            if fk == "id" || GRANT_TARGET_COLUMNS.contains(&fk) {
                bail!("resource {} uses reserved permissions column {fk} as foreign key", rt.table);
            }
        }

        Ok(Self {
            table: rt.table,
            columns: rt.columns,
            permissions_fk,
            visibility_fk,
            summary_fk,
            has_original: rt.columns.contains(&"original"),
            has_entity: rt.columns.contains(&"entity"),
        })
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    pub fn qualified(&self, column: &str) -> String {
        format!("{}.{}", self.table, column)
    }

    /// Foreign keys this resource needs on the `permissions` table.
    pub fn permission_columns(&self) -> Vec<&'static str> {
        let mut cols = vec![self.permissions_fk, self.visibility_fk, self.summary_fk];
        cols.sort_unstable();
        cols.dedup();
        cols
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registry {
    by_table: HashMap<&'static str, Registration>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the resources shipped with this crate.
    pub fn with_defaults() -> Result<Self> {
        let mut reg = Self::new();
        reg.register(&crate::resources::POSTS)?;
        reg.register(&crate::resources::APPS)?;
        Ok(reg)
    }

    pub fn register(&mut self, rt: &ResourceType) -> Result<&Registration> {
        let resolved = Registration::resolve(rt)?;
        if self.by_table.contains_key(rt.table) {
            bail!("resource {} registered twice", rt.table);
        }
        Ok(self.by_table.entry(rt.table).or_insert(resolved))
    }

    pub fn get(&self, rt: &ResourceType) -> Result<&Registration> {
        self.by_table
            .get(rt.table)
            .with_context(|| format!("resource type not registered: {}", rt.table))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Registration> {
        self.by_table.values()
    }
}

fn ensure_identifier(s: &str) -> Result<()> {
    let mut chars = s.chars();
    let ok = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !ok {
        bail!("invalid sql identifier: {s:?}");
    }
    Ok(())
}

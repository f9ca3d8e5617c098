/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::auth::Caller;
use crate::query::{placeholders, Fragment, SelectQuery};
use crate::registry::Registration;
use rusqlite::types::Value;

/// Visibility predicate for one caller against one resource type.
#[derive(Debug, Clone, PartialEq)]
pub enum Visibility {
    /// The owner reads every non-deleted row.
    Unrestricted,
    Restricted {
        join: Option<Fragment>,
        condition: Fragment,
    },
}

/// Grant matching only applies while the caller's follower/following row
/// is not deleted.
pub fn visibility_predicate(reg: &Registration, caller: &Caller) -> Visibility {
    if caller.is_owner() {
        return Visibility::Unrestricted;
    }
    let table = reg.table;
    let Some(scope) = caller.grant_scope() else {
        return Visibility::Restricted {
            join: None,
            condition: Fragment::bind(format!("{table}.public = ?"), true),
        };
    };

    let fk = reg.visibility_fk;
    let mut text = format!(
        "LEFT OUTER JOIN permissions ON permissions.{fk} = {table}.id AND (permissions.{} = ?",
        scope.relation.permission_column()
    );
    let mut binds = vec![Value::from(scope.id)];
    let groups = scope.group_ids();
    if !groups.is_empty() {
        text.push_str(&format!(
            " OR permissions.group_public_id IN ({})",
            placeholders(groups.len())
        ));
        binds.extend(groups.into_iter().map(|g| Value::from(g.to_string())));
    }
    let contacts = scope.relation.table();
    text.push_str(&format!(
        ") AND EXISTS (SELECT 1 FROM {contacts} WHERE {contacts}.id = ? AND {contacts}.deleted_at IS NULL)"
    ));
    binds.push(Value::from(scope.id));

    Visibility::Restricted {
        join: Some(Fragment::new(text, binds)),
        condition: Fragment::bind(
            format!("({table}.public = ? OR permissions.{fk} = {table}.id)"),
            true,
        ),
    }
}

impl Visibility {
    pub fn apply(self, query: SelectQuery) -> SelectQuery {
        match self {
            Visibility::Unrestricted => query,
            Visibility::Restricted { join, condition } => {
                let query = match join {
                    Some(join) => query.join(join),
                    None => query,
                };
                query.and_where(condition)
            }
        }
    }
}

/// Base query for `owner_id`'s rows as seen by `caller`: visibility, owner
/// scope, soft-delete and, for non-owners, the `original` restriction.
pub fn query_with_permissions(reg: &Registration, owner_id: i64, caller: &Caller) -> SelectQuery {
    let query = visibility_predicate(reg, caller).apply(SelectQuery::from(reg.table));
    let query = owner_scope(reg, owner_id, query);
    if reg.has_original && !caller.is_owner() {
        query.and_where(Fragment::bind(format!("{}.original = ?", reg.table), true))
    } else {
        query
    }
}

pub fn owner_scope(reg: &Registration, owner_id: i64, query: SelectQuery) -> SelectQuery {
    query
        .and_where(Fragment::bind(format!("{}.user_id = ?", reg.table), owner_id))
        .and_where(Fragment::raw(format!("{}.deleted_at IS NULL", reg.table)))
}

/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::config::FetchConfig;
use crate::params::{Cursor, FetchParams, SortOrder};
use crate::query::{Fragment, SelectQuery};
use crate::registry::Registration;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum Pagination {
    /// The request cannot match anything; skip the store entirely.
    Empty,
    Page(PageSpec),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageSpec {
    pub conditions: Vec<Fragment>,
    pub order: SortOrder,
    /// `None` when counting.
    pub limit: Option<i64>,
    pub reversed: bool,
    pub count: bool,
}

/// Cursor-forward pages (`since_id` without an explicit `asc`) are fetched
/// ascending so the rows right after the cursor are selected, then reversed.
pub fn sort_reversed(params: &FetchParams) -> bool {
    matches!(params.since_id, Cursor::At(_)) && params.order != Some(SortOrder::Asc)
}

pub fn sort_direction(params: &FetchParams) -> SortOrder {
    if params.order == Some(SortOrder::Asc) || sort_reversed(params) {
        SortOrder::Asc
    } else {
        SortOrder::Desc
    }
}

pub fn paginate(reg: &Registration, params: &FetchParams, cfg: &FetchConfig) -> Pagination {
    if params.since_id.is_malformed() || params.before_id.is_malformed() {
        debug!(table = reg.table, "malformed cursor, empty page");
        return Pagination::Empty;
    }

    let id = reg.qualified("id");
    let mut conditions = Vec::new();
    if let Cursor::At(since) = params.since_id {
        conditions.push(Fragment::bind(format!("{id} > ?"), since));
    }
    // until_id shares since_id's comparison.
    if let Some(until) = params.until_id {
        conditions.push(Fragment::bind(format!("{id} > ?"), until));
    }
    if let Cursor::At(before) = params.before_id {
        conditions.push(Fragment::bind(format!("{id} < ?"), before));
    }
    if !params.entity.is_empty() {
        if !reg.has_entity {
            debug!(table = reg.table, "entity filter on resource without entity column, empty page");
            return Pagination::Empty;
        }
        conditions.extend(Fragment::in_list(&reg.qualified("entity"), params.entity.iter().cloned()));
    }

    if params.return_count {
        return Pagination::Page(PageSpec {
            conditions,
            order: sort_direction(params),
            limit: None,
            reversed: false,
            count: true,
        });
    }

    Pagination::Page(PageSpec {
        conditions,
        order: sort_direction(params),
        limit: Some(cfg.clamp_limit(params.limit)),
        reversed: sort_reversed(params),
        count: false,
    })
}

impl PageSpec {
    pub fn apply(self, query: SelectQuery) -> SelectQuery {
        let query = query.and_all(self.conditions);
        if self.count {
            return query.count();
        }
        let query = query.order_by_id(self.order).reversed(self.reversed);
        match self.limit {
            Some(limit) => query.limit(limit),
            None => query,
        }
    }
}

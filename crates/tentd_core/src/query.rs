/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::params::SortOrder;
use anyhow::Result;
use rusqlite::{types::Value, Connection, Row};
use tracing::debug;

/// A piece of SQL together with the values bound to its `?` placeholders.
///
/// Text and binds are created together; merging fragments in order keeps
/// every bind on its own placeholder. Fragment text must not embed string
/// literals: every `?` in it is counted as a placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    text: String,
    binds: Vec<Value>,
}

impl Fragment {
    pub fn new(text: impl Into<String>, binds: Vec<Value>) -> Self {
        let text = text.into();
        debug_assert_eq!(
            text.matches('?').count(),
            binds.len(),
            "placeholder count mismatch in {text}"
        );
        Self { text, binds }
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }

    pub fn bind(text: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(text, vec![value.into()])
    }

    /// `column IN (?, ?, ...)`. Returns `None` for an empty list.
    pub fn in_list<I, V>(column: &str, values: I) -> Option<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let binds: Vec<Value> = values.into_iter().map(Into::into).collect();
        if binds.is_empty() {
            return None;
        }
        Some(Self::new(
            format!("{column} IN ({})", placeholders(binds.len())),
            binds,
        ))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn binds(&self) -> &[Value] {
        &self.binds
    }
}

pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Immutable accumulator for a single-table SELECT.
///
/// Every stage takes the query by value and hands back an extended copy; the
/// statement text and its bind list are produced once, by [`SelectQuery::to_sql`].
#[derive(Debug, Clone)]
pub struct SelectQuery {
    table: &'static str,
    columns: Vec<String>,
    joins: Vec<Fragment>,
    conditions: Vec<Fragment>,
    order: Option<SortOrder>,
    limit: Option<i64>,
    count: bool,
    reversed: bool,
}

impl SelectQuery {
    pub fn from(table: &'static str) -> Self {
        Self {
            table,
            columns: Vec::new(),
            joins: Vec::new(),
            conditions: Vec::new(),
            order: None,
            limit: None,
            count: false,
            reversed: false,
        }
    }

    /// Restrict the projection. Column names are qualified with the table name.
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.columns = columns
            .into_iter()
            .map(|c| format!("{}.{}", self.table, c.as_ref()))
            .collect();
        self
    }

    pub fn join(mut self, join: Fragment) -> Self {
        self.joins.push(join);
        self
    }

    pub fn and_where(mut self, condition: Fragment) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn and_all(mut self, conditions: impl IntoIterator<Item = Fragment>) -> Self {
        self.conditions.extend(conditions);
        self
    }

    pub fn order_by_id(mut self, order: SortOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Execute as `COUNT` instead of returning rows. Drops ordering and limit.
    pub fn count(mut self) -> Self {
        self.count = true;
        self.order = None;
        self.limit = None;
        self
    }

    /// Reverse fetched rows in memory before returning them.
    pub fn reversed(mut self, reversed: bool) -> Self {
        self.reversed = reversed;
        self
    }

    pub fn is_count(&self) -> bool {
        self.count
    }

    /// A joined row can match several grants; results are keyed on the id.
    fn grouped(&self) -> bool {
        !self.joins.is_empty()
    }

    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let table = self.table;
        let mut binds = Vec::new();
        let mut sql = if self.count {
            if self.grouped() {
                format!("SELECT COUNT(DISTINCT {table}.id) FROM {table}")
            } else {
                format!("SELECT COUNT(*) FROM {table}")
            }
        } else {
            let columns = if self.columns.is_empty() {
                format!("{table}.*")
            } else {
                self.columns.join(", ")
            };
            format!("SELECT {columns} FROM {table}")
        };

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join.text());
            binds.extend(join.binds().iter().cloned());
        }

        if !self.conditions.is_empty() {
            let clauses = self
                .conditions
                .iter()
                .map(Fragment::text)
                .collect::<Vec<_>>()
                .join(" AND ");
            sql.push_str(" WHERE ");
            sql.push_str(&clauses);
            for c in &self.conditions {
                binds.extend(c.binds().iter().cloned());
            }
        }

        if !self.count {
            if self.grouped() {
                sql.push_str(&format!(" GROUP BY {table}.id"));
            }
            if let Some(order) = self.order {
                sql.push_str(&format!(" ORDER BY {table}.id {}", order.as_sql()));
            }
            if let Some(limit) = self.limit {
                sql.push_str(" LIMIT ?");
                binds.push(Value::from(limit));
            }
        }

        (sql, binds)
    }

    pub fn fetch_rows<R, F>(&self, conn: &Connection, map: F) -> Result<Vec<R>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<R>,
    {
        let (sql, binds) = self.to_sql();
        debug!(%sql, binds = binds.len(), reversed = self.reversed, "fetch rows");
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = stmt
            .query_map(rusqlite::params_from_iter(binds), map)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        if self.reversed {
            rows.reverse();
        }
        Ok(rows)
    }

    pub fn fetch_count(&self, conn: &Connection) -> Result<u64> {
        let (sql, binds) = self.to_sql();
        debug!(%sql, binds = binds.len(), "fetch count");
        let total: i64 = conn.query_row(&sql, rusqlite::params_from_iter(binds), |r| r.get(0))?;
        Ok(total.max(0) as u64)
    }
}

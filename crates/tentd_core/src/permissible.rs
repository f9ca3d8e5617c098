/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::registry::ResourceType;
use rusqlite::types::ValueRef;
use rusqlite::Row;

/// A row type whose visibility is controlled by `permissions` grants.
pub trait Permissible: Sized {
    fn resource_type() -> &'static ResourceType;

    /// Map a full `table.*` row.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    fn id(&self) -> i64;

    fn owner_id(&self) -> i64;

    fn is_public(&self) -> bool;

    fn set_public(&mut self, public: bool);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Rows(Vec<T>),
    Count(u64),
}

impl<T> Fetched<T> {
    pub fn empty(count: bool) -> Self {
        if count {
            Fetched::Count(0)
        } else {
            Fetched::Rows(Vec::new())
        }
    }

    /// Rows of a row fetch; a count yields nothing.
    pub fn into_rows(self) -> Vec<T> {
        match self {
            Fetched::Rows(rows) => rows,
            Fetched::Count(_) => Vec::new(),
        }
    }

    pub fn count(&self) -> Option<u64> {
        match self {
            Fetched::Count(n) => Some(*n),
            Fetched::Rows(_) => None,
        }
    }
}

/// Column-name keyed row, used when the projection is chosen per request.
pub type Record = serde_json::Map<String, serde_json::Value>;

pub fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    let stmt = row.as_ref();
    let mut out = Record::new();
    for idx in 0..stmt.column_count() {
        let name = stmt.column_name(idx)?.to_string();
        let value = match row.get_ref(idx)? {
            ValueRef::Null => serde_json::Value::Null,
            ValueRef::Integer(i) => serde_json::Value::from(i),
            ValueRef::Real(f) => serde_json::Value::from(f),
            ValueRef::Text(t) => serde_json::Value::from(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => serde_json::Value::from(hex::encode(b)),
        };
        out.insert(name, value);
    }
    Ok(out)
}

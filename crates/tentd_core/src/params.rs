/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Fetch request parameters.
//!
//! Coercion rules, applied identically to JSON bodies and query strings:
//! - `since_id`, `before_id`: integer or integer string. A key that is present
//!   with a null, empty or non-numeric value is a [`Cursor::Malformed`] cursor.
//! - `until_id`, `limit`: integer or integer string, anything else is absent.
//! - `order`: `asc` (any case) ascending, anything else descending.
//! - `entity`, `_select`: a scalar becomes a one-element list; `_select` also
//!   splits on commas.
//! - `return_count`: `true` or `1`.

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cursor {
    #[default]
    Absent,
    /// The key was sent without a usable value.
    Malformed,
    At(i64),
}

impl Cursor {
    pub fn is_malformed(self) -> bool {
        matches!(self, Cursor::Malformed)
    }

    fn from_raw(raw: Option<&RawValue>) -> Self {
        match raw {
            None => Cursor::Absent,
            Some(RawValue::Scalar(s)) => s.trim().parse().map(Cursor::At).unwrap_or(Cursor::Malformed),
            Some(_) => Cursor::Malformed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchParams {
    pub since_id: Cursor,
    pub until_id: Option<i64>,
    pub before_id: Cursor,
    pub limit: Option<i64>,
    pub order: Option<SortOrder>,
    pub entity: Vec<String>,
    pub select: Vec<String>,
    pub return_count: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RawValue {
    Null,
    Scalar(String),
    List(Vec<String>),
}

impl RawValue {
    fn push(&mut self, value: Option<String>) {
        let Some(value) = value else { return };
        match self {
            RawValue::Null => *self = RawValue::Scalar(value),
            RawValue::Scalar(prev) => *self = RawValue::List(vec![std::mem::take(prev), value]),
            RawValue::List(items) => items.push(value),
        }
    }

    fn scalar(&self) -> Option<&str> {
        match self {
            RawValue::Scalar(s) => Some(s.as_str()),
            _ => None,
        }
    }

    fn list(&self) -> Vec<String> {
        match self {
            RawValue::Null => Vec::new(),
            RawValue::Scalar(s) => vec![s.clone()],
            RawValue::List(items) => items.clone(),
        }
    }

    fn from_json(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => RawValue::Null,
            serde_json::Value::String(s) => RawValue::Scalar(s.clone()),
            serde_json::Value::Number(n) => RawValue::Scalar(n.to_string()),
            serde_json::Value::Bool(b) => RawValue::Scalar(b.to_string()),
            serde_json::Value::Array(items) => RawValue::List(
                items
                    .iter()
                    .filter_map(|item| match RawValue::from_json(item) {
                        RawValue::Scalar(s) => Some(s),
                        _ => None,
                    })
                    .collect(),
            ),
            serde_json::Value::Object(_) => RawValue::Null,
        }
    }
}

impl FetchParams {
    /// Parse a URL query string (`since_id=10&entity=a&entity=b`).
    ///
    /// `key` without `=` is a null value; `key[]` and repeated keys build lists.
    pub fn from_query(query: &str) -> Self {
        let mut raw: BTreeMap<String, RawValue> = BTreeMap::new();
        for pair in query.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = match pair.split_once('=') {
                Some((k, v)) => (k, Some(decode_component(v))),
                None => (pair, None),
            };
            let key = decode_component(key);
            let (key, is_list) = match key.strip_suffix("[]") {
                Some(k) => (k.to_string(), true),
                None => (key, false),
            };
            let entry = raw.entry(key).or_insert_with(|| {
                if is_list {
                    RawValue::List(Vec::new())
                } else {
                    RawValue::Null
                }
            });
            entry.push(value);
        }
        Self::from_raw(&raw)
    }

    pub fn from_json(map: &serde_json::Map<String, serde_json::Value>) -> Self {
        let raw = map
            .iter()
            .map(|(k, v)| (k.clone(), RawValue::from_json(v)))
            .collect::<BTreeMap<_, _>>();
        Self::from_raw(&raw)
    }

    fn from_raw(raw: &BTreeMap<String, RawValue>) -> Self {
        let int = |key: &str| {
            raw.get(key)
                .and_then(RawValue::scalar)
                .and_then(|s| s.trim().parse::<i64>().ok())
        };
        let order = raw.get("order").and_then(RawValue::scalar).map(|s| {
            if s.trim().eq_ignore_ascii_case("asc") {
                SortOrder::Asc
            } else {
                SortOrder::Desc
            }
        });
        let entity = raw
            .get("entity")
            .map(RawValue::list)
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        let select = raw
            .get("_select")
            .map(RawValue::list)
            .unwrap_or_default()
            .iter()
            .flat_map(|c| c.split(','))
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        let return_count = raw
            .get("return_count")
            .and_then(RawValue::scalar)
            .map(|s| matches!(s.trim(), "true" | "1"))
            .unwrap_or(false);

        Self {
            since_id: Cursor::from_raw(raw.get("since_id")),
            until_id: int("until_id"),
            before_id: Cursor::from_raw(raw.get("before_id")),
            limit: int("limit"),
            order,
            entity,
            select,
            return_count,
        }
    }
}

impl<'de> Deserialize<'de> for FetchParams {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = serde_json::Map::deserialize(deserializer)?;
        Ok(Self::from_json(&map))
    }
}

fn decode_component(s: &str) -> String {
    let s = s.replace('+', " ");
    let decoded = urlencoding::decode(&s).map(|v| v.into_owned());
    decoded.unwrap_or(s)
}

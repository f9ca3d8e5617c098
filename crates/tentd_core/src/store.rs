/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::auth::Caller;
use crate::config::FetchConfig;
use crate::pagination::{paginate, Pagination};
use crate::params::FetchParams;
use crate::permissible::{record_from_row, Fetched, Permissible, Record};
use crate::query::{Fragment, SelectQuery};
use crate::registry::{Registration, Registry, ResourceType};
use crate::visibility::query_with_permissions;
use anyhow::{bail, Context, Result};
use rand::{rngs::OsRng, RngCore};
use rusqlite::{params, Connection, Row};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Permission-aware access to the server's resource tables.
#[derive(Clone)]
pub struct PermissibleDb {
    path: PathBuf,
    registry: Arc<Registry>,
    config: FetchConfig,
}

impl PermissibleDb {
    pub fn open(db_path: impl AsRef<Path>, config: FetchConfig) -> Result<Self> {
        Self::open_with_registry(db_path, config, Registry::with_defaults()?)
    }

    /// Open the store for an explicit set of resource types. Every registered
    /// table must already exist with its declared columns; the permission
    /// foreign keys are added to `permissions` when missing.
    pub fn open_with_registry(db_path: impl AsRef<Path>, config: FetchConfig, registry: Registry) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();
        let conn = Connection::open(&path).with_context(|| format!("open db: {}", path.display()))?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS groups (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              user_id INTEGER NOT NULL,
              public_id TEXT NOT NULL UNIQUE,
              name TEXT NOT NULL,
              created_at_ms INTEGER NOT NULL,
              deleted_at INTEGER NULL
            );
            CREATE INDEX IF NOT EXISTS idx_groups_user ON groups(user_id, public_id);

            CREATE TABLE IF NOT EXISTS followers (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              user_id INTEGER NOT NULL,
              entity TEXT NOT NULL,
              groups TEXT NOT NULL DEFAULT '[]',
              created_at_ms INTEGER NOT NULL,
              deleted_at INTEGER NULL
            );
            CREATE INDEX IF NOT EXISTS idx_followers_user_entity ON followers(user_id, entity);

            CREATE TABLE IF NOT EXISTS followings (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              user_id INTEGER NOT NULL,
              entity TEXT NOT NULL,
              groups TEXT NOT NULL DEFAULT '[]',
              created_at_ms INTEGER NOT NULL,
              deleted_at INTEGER NULL
            );
            CREATE INDEX IF NOT EXISTS idx_followings_user_entity ON followings(user_id, entity);

            CREATE TABLE IF NOT EXISTS posts (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              user_id INTEGER NOT NULL,
              entity TEXT NOT NULL,
              type TEXT NOT NULL,
              content TEXT NOT NULL DEFAULT '{}',
              public INTEGER NOT NULL DEFAULT 0,
              original INTEGER NOT NULL DEFAULT 1,
              created_at_ms INTEGER NOT NULL,
              deleted_at INTEGER NULL
            );
            CREATE INDEX IF NOT EXISTS idx_posts_user ON posts(user_id, id DESC);

            CREATE TABLE IF NOT EXISTS apps (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              user_id INTEGER NOT NULL,
              public_id TEXT NOT NULL UNIQUE,
              name TEXT NOT NULL,
              description TEXT NULL,
              url TEXT NULL,
              public INTEGER NOT NULL DEFAULT 0,
              created_at_ms INTEGER NOT NULL,
              deleted_at INTEGER NULL
            );

            -- Exactly one grant target per row; resource keys are added per registered type.
            CREATE TABLE IF NOT EXISTS permissions (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              group_public_id TEXT NULL,
              follower_access_id INTEGER NULL,
              following_id INTEGER NULL,
              created_at_ms INTEGER NOT NULL,
              CHECK ((group_public_id IS NOT NULL) + (follower_access_id IS NOT NULL) + (following_id IS NOT NULL) = 1)
            );
            "#,
        )?;

        for reg in registry.iter() {
            let existing = table_columns(&conn, reg.table)?;
            if existing.is_empty() {
                bail!("registered resource table {} does not exist", reg.table);
            }
            for col in reg.columns {
                if !existing.contains(*col) {
                    bail!("registered resource {} is missing column {col}", reg.table);
                }
            }
            let fks = reg.permission_columns();
            let cols = fks.iter().map(|fk| (*fk, "INTEGER NULL")).collect::<Vec<_>>();
            ensure_columns(&conn, "permissions", &cols)?;
            for fk in fks {
                conn.execute_batch(&format!(
                    "CREATE INDEX IF NOT EXISTS idx_permissions_{fk} ON permissions({fk});"
                ))?;
            }
        }

        Ok(Self {
            path,
            registry: Arc::new(registry),
            config,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn conn(&self) -> Result<Connection> {
        Ok(Connection::open(&self.path)?)
    }

    pub fn fetch_with_permissions<T: Permissible>(
        &self,
        owner_id: i64,
        caller: &Caller,
        params: &FetchParams,
    ) -> Result<Fetched<T>> {
        let reg = self.registry.get(T::resource_type())?;
        let base = query_with_permissions(reg, owner_id, caller);
        self.run(reg, base, params, T::from_row)
    }

    /// Like [`Self::fetch_with_permissions`], honouring `_select`. Unknown
    /// columns are dropped; nothing left means all columns.
    pub fn fetch_records_with_permissions(
        &self,
        resource: &ResourceType,
        owner_id: i64,
        caller: &Caller,
        params: &FetchParams,
    ) -> Result<Fetched<Record>> {
        let reg = self.registry.get(resource)?;
        let columns = selected_columns(reg, &params.select);
        let base = query_with_permissions(reg, owner_id, caller);
        let base = if columns.is_empty() { base } else { base.columns(columns) };
        self.run(reg, base, params, record_from_row)
    }

    /// The owner's own listing: every non-deleted row, no grant checks.
    pub fn fetch_all<T: Permissible>(&self, owner_id: i64, params: &FetchParams) -> Result<Fetched<T>> {
        self.fetch_with_permissions(owner_id, &Caller::Owner, params)
    }

    pub fn count_with_permissions<T: Permissible>(
        &self,
        owner_id: i64,
        caller: &Caller,
        params: &FetchParams,
    ) -> Result<u64> {
        let params = FetchParams {
            return_count: true,
            ..params.clone()
        };
        Ok(self
            .fetch_with_permissions::<T>(owner_id, caller, &params)?
            .count()
            .unwrap_or(0))
    }

    pub fn find_with_permissions<T: Permissible>(&self, owner_id: i64, id: i64, caller: &Caller) -> Result<Option<T>> {
        let reg = self.registry.get(T::resource_type())?;
        let query = query_with_permissions(reg, owner_id, caller)
            .and_where(Fragment::bind(format!("{}.id = ?", reg.table), id))
            .limit(1);
        let conn = self.conn()?;
        Ok(query.fetch_rows(&conn, T::from_row)?.into_iter().next())
    }

    /// Marks the row deleted. Returns false when nothing matched.
    pub fn soft_delete<T: Permissible>(&self, owner_id: i64, id: i64) -> Result<bool> {
        let reg = self.registry.get(T::resource_type())?;
        let conn = self.conn()?;
        let n = conn.execute(
            &format!(
                "UPDATE {} SET deleted_at=?1 WHERE id=?2 AND user_id=?3 AND deleted_at IS NULL",
                reg.table
            ),
            params![now_ms(), id, owner_id],
        )?;
        Ok(n > 0)
    }

    fn run<R, F>(&self, reg: &Registration, base: SelectQuery, params: &FetchParams, map: F) -> Result<Fetched<R>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<R>,
    {
        let spec = match paginate(reg, params, &self.config) {
            Pagination::Empty => return Ok(Fetched::empty(params.return_count)),
            Pagination::Page(spec) => spec,
        };
        let query = spec.apply(base);
        let conn = self.conn()?;
        if query.is_count() {
            let total = query.fetch_count(&conn)?;
            debug!(table = reg.table, total, "counted");
            return Ok(Fetched::Count(total));
        }
        let rows = query.fetch_rows(&conn, map)?;
        debug!(table = reg.table, rows = rows.len(), "fetched");
        Ok(Fetched::Rows(rows))
    }
}

fn selected_columns(reg: &Registration, requested: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for col in requested {
        if reg.has_column(col) && !out.contains(col) {
            out.push(col.clone());
        }
    }
    out
}

pub(crate) fn random_public_id() -> String {
    let mut b = [0u8; 16];
    OsRng.fill_bytes(&mut b);
    hex::encode(b)
}

fn table_columns(conn: &Connection, table: &str) -> Result<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;
    let mut existing = HashSet::new();
    for r in rows {
        existing.insert(r?);
    }
    Ok(existing)
}

fn ensure_columns(conn: &Connection, table: &str, cols: &[(&str, &str)]) -> Result<()> {
    let existing = table_columns(conn, table)?;
    for (name, ty) in cols {
        if !existing.contains(*name) {
            conn.execute(&format!("ALTER TABLE {table} ADD COLUMN {name} {ty}"), [])?;
        }
    }
    Ok(())
}

pub(crate) fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

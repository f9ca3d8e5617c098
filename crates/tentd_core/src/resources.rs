/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::permissible::Permissible;
use crate::registry::{Relationship, RelationshipKind, ResourceType};
use crate::store::{now_ms, random_public_id, PermissibleDb};
use anyhow::{Context, Result};
use rusqlite::{params, Row};

pub static POSTS: ResourceType = ResourceType {
    table: "posts",
    columns: &[
        "id",
        "user_id",
        "entity",
        "type",
        "content",
        "public",
        "original",
        "created_at_ms",
        "deleted_at",
    ],
    relationships: &[Relationship {
        kind: RelationshipKind::Permissions,
        foreign_key: "post_id",
    }],
};

pub static APPS: ResourceType = ResourceType {
    table: "apps",
    columns: &[
        "id",
        "user_id",
        "public_id",
        "name",
        "description",
        "url",
        "public",
        "created_at_ms",
        "deleted_at",
    ],
    relationships: &[Relationship {
        kind: RelationshipKind::AccessPermissions,
        foreign_key: "app_id",
    }],
};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    pub entity: String,
    #[serde(rename = "type")]
    pub post_type: String,
    pub content: serde_json::Value,
    pub public: bool,
    pub original: bool,
    pub created_at_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub entity: String,
    pub post_type: String,
    pub content: serde_json::Value,
    pub public: bool,
    pub original: bool,
}

impl NewPost {
    pub fn status(entity: impl Into<String>, text: &str, public: bool) -> Self {
        Self {
            entity: entity.into(),
            post_type: "https://tent.io/types/post/status/v0.1.0".to_string(),
            content: serde_json::json!({ "text": text }),
            public,
            original: true,
        }
    }
}

impl Permissible for Post {
    fn resource_type() -> &'static ResourceType {
        &POSTS
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let content: String = row.get("content")?;
        let content = serde_json::from_str(&content).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            entity: row.get("entity")?,
            post_type: row.get("type")?,
            content,
            public: row.get("public")?,
            original: row.get("original")?,
            created_at_ms: row.get("created_at_ms")?,
            deleted_at: row.get("deleted_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn owner_id(&self) -> i64 {
        self.user_id
    }

    fn is_public(&self) -> bool {
        self.public
    }

    fn set_public(&mut self, public: bool) {
        self.public = public;
    }
}

/// Registered application.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct App {
    pub id: i64,
    pub user_id: i64,
    pub public_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub public: bool,
    pub created_at_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<i64>,
}

impl Permissible for App {
    fn resource_type() -> &'static ResourceType {
        &APPS
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            public_id: row.get("public_id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            url: row.get("url")?,
            public: row.get("public")?,
            created_at_ms: row.get("created_at_ms")?,
            deleted_at: row.get("deleted_at")?,
        })
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn owner_id(&self) -> i64 {
        self.user_id
    }

    fn is_public(&self) -> bool {
        self.public
    }

    fn set_public(&mut self, public: bool) {
        self.public = public;
    }
}

impl PermissibleDb {
    pub fn create_post(&self, owner_id: i64, post: &NewPost) -> Result<Post> {
        let conn = self.conn()?;
        let created_at_ms = now_ms();
        let content = serde_json::to_string(&post.content).context("serialize post content")?;
        conn.execute(
            "INSERT INTO posts(user_id, entity, type, content, public, original, created_at_ms) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![owner_id, post.entity, post.post_type, content, post.public, post.original, created_at_ms],
        )?;
        Ok(Post {
            id: conn.last_insert_rowid(),
            user_id: owner_id,
            entity: post.entity.clone(),
            post_type: post.post_type.clone(),
            content: post.content.clone(),
            public: post.public,
            original: post.original,
            created_at_ms,
            deleted_at: None,
        })
    }

    pub fn create_app(&self, owner_id: i64, name: &str, url: Option<&str>, public: bool) -> Result<App> {
        let conn = self.conn()?;
        let public_id = random_public_id();
        let created_at_ms = now_ms();
        conn.execute(
            "INSERT INTO apps(user_id, public_id, name, url, public, created_at_ms) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![owner_id, public_id, name, url, public, created_at_ms],
        )?;
        Ok(App {
            id: conn.last_insert_rowid(),
            user_id: owner_id,
            public_id,
            name: name.to_string(),
            description: None,
            url: url.map(str::to_string),
            public,
            created_at_ms,
            deleted_at: None,
        })
    }
}

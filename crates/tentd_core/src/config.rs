/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use std::path::Path;

pub const PER_PAGE: u32 = 50;
pub const MAX_PER_PAGE: u32 = 200;

#[derive(Debug, Clone, serde::Deserialize)]
pub struct FetchConfig {
    /// Page size used when the request does not carry `limit`.
    pub per_page: Option<u32>,
    /// Hard ceiling for any requested `limit`.
    pub max_per_page: Option<u32>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            per_page: Some(PER_PAGE),
            max_per_page: Some(MAX_PER_PAGE),
        }
    }
}

impl FetchConfig {
    pub fn with_page_sizes(per_page: u32, max_per_page: u32) -> Self {
        Self {
            per_page: Some(per_page),
            max_per_page: Some(max_per_page),
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).with_context(|| format!("read config: {}", path.display()))?;
        let mut cfg: FetchConfig =
            serde_json::from_slice(&bytes).with_context(|| format!("parse config: {}", path.display()))?;
        let defaults = FetchConfig::default();
        cfg.per_page = cfg.per_page.or(defaults.per_page);
        cfg.max_per_page = cfg.max_per_page.or(defaults.max_per_page);
        Ok(cfg)
    }

    pub fn max_per_page(&self) -> i64 {
        self.max_per_page.unwrap_or(MAX_PER_PAGE).max(1) as i64
    }

    pub fn per_page(&self) -> i64 {
        (self.per_page.unwrap_or(PER_PAGE).max(1) as i64).min(self.max_per_page())
    }

    /// Requested limits above the ceiling are clamped down; zero and negative
    /// limits are clamped up to a single row.
    pub fn clamp_limit(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or_else(|| self.per_page())
            .min(self.max_per_page())
            .max(1)
    }
}

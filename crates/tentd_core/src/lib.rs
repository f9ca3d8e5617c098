/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

pub mod auth;
pub mod config;
mod grants;
pub mod pagination;
pub mod params;
pub mod permissible;
pub mod query;
pub mod registry;
pub mod resources;
pub mod social;
pub mod store;
mod summary;
pub mod visibility;

pub use auth::{Caller, Relation, ScopedCaller};
pub use config::FetchConfig;
pub use params::{Cursor, FetchParams, SortOrder};
pub use permissible::{Fetched, Permissible, Record};
pub use store::PermissibleDb;
pub use tentd_protocol::{PermissionsJson, PermissionsSpec};

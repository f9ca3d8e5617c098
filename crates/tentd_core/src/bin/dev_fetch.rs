/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use anyhow::{Context, Result};
use serde_json::json;
use std::env;
use tentd_core::resources::{NewPost, Post};
use tentd_core::{Caller, FetchConfig, FetchParams, Fetched, PermissibleDb, Relation};
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let db_path = env::args().nth(1).unwrap_or_default();
    let owner_id = env::args().nth(2).unwrap_or_default();
    if db_path.trim().is_empty() || owner_id.trim().is_empty() {
        anyhow::bail!("usage: tentd_dev_fetch <db_path> <owner_id> [query]");
    }
    let owner_id: i64 = owner_id.trim().parse().context("owner_id must be an integer")?;
    let query = env::args().nth(3).unwrap_or_default();

    let cfg = match env::var("TENTD_CONFIG") {
        Ok(path) => FetchConfig::load(path)?,
        Err(_) => FetchConfig::default(),
    };
    let db = PermissibleDb::open(db_path.trim(), cfg)?;

    if env::var("TENTD_SEED").as_deref() == Ok("1") {
        seed(&db, owner_id)?;
    }

    let caller = match env::var("TENTD_AS_FOLLOWER") {
        Ok(id) => {
            let id: i64 = id.trim().parse().context("TENTD_AS_FOLLOWER must be a follower id")?;
            db.caller_for(Relation::Follower, owner_id, id)?
                .with_context(|| format!("follower {id} not found"))?
        }
        Err(_) => Caller::Owner,
    };

    let params = FetchParams::from_query(&query);
    match db.fetch_with_permissions::<Post>(owner_id, &caller, &params)? {
        Fetched::Count(n) => println!("{}", json!({ "count": n })),
        Fetched::Rows(posts) => {
            let mut out = Vec::with_capacity(posts.len());
            for post in &posts {
                let mut v = serde_json::to_value(post)?;
                v["permissions"] = serde_json::to_value(db.permissions_json(post, true)?)?;
                out.push(v);
            }
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

fn seed(db: &PermissibleDb, owner_id: i64) -> Result<()> {
    let entity = format!("https://user{owner_id}.example.com");
    let friends = db.create_group(owner_id, "friends")?;
    let alice = db.add_follower(owner_id, "https://alice.example.com", &[friends.public_id.clone()])?;
    db.add_following(owner_id, "https://alice.example.com", &[])?;
    for i in 1..=25 {
        let mut post = db.create_post(owner_id, &NewPost::status(&entity, &format!("status #{i}"), i % 3 == 0))?;
        if i % 5 == 0 {
            let spec = serde_json::from_value(json!({ "groups": [{ "id": friends.public_id }] }))?;
            db.assign_permissions(owner_id, &mut post, &spec)?;
        }
    }
    info!(owner_id, follower = alice.id, group = %friends.public_id, "seeded demo rows");
    Ok(())
}

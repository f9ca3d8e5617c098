/*
 * SPDX-FileCopyrightText: 2026 RedHunt07 - FEDI3 Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use serde_json::json;
use tempfile::TempDir;
use tentd_core::resources::{App, NewPost, Post};
use tentd_core::{Caller, FetchConfig, FetchParams, PermissibleDb, PermissionsSpec, Relation};

const OWNER: i64 = 1;
const ENTITY: &str = "https://owner.example.com";

const DB_FILE: &str = "tentd.sqlite";

fn open() -> (TempDir, PermissibleDb) {
    let dir = tempfile::tempdir().unwrap();
    let db = PermissibleDb::open(dir.path().join(DB_FILE), FetchConfig::default()).unwrap();
    (dir, db)
}

fn spec(v: serde_json::Value) -> PermissionsSpec {
    serde_json::from_value(v).unwrap()
}

fn ids(posts: &[Post]) -> Vec<i64> {
    posts.iter().map(|p| p.id).collect()
}

fn fetch(db: &PermissibleDb, caller: &Caller) -> Vec<Post> {
    db.fetch_with_permissions::<Post>(OWNER, caller, &FetchParams::default())
        .unwrap()
        .into_rows()
}

#[test]
fn group_grant_reaches_members_only() {
    let (_dir, db) = open();
    let g = db.create_group(OWNER, "friends").unwrap();
    let v = db.add_follower(OWNER, "https://v.example.com", &[g.public_id.clone()]).unwrap();
    let w = db.add_follower(OWNER, "https://w.example.com", &[]).unwrap();

    let mut r1 = db.create_post(OWNER, &NewPost::status(ENTITY, "for friends", false)).unwrap();
    let r2 = db.create_post(OWNER, &NewPost::status(ENTITY, "for everyone", true)).unwrap();
    let r3 = db.create_post(OWNER, &NewPost::status(ENTITY, "for nobody", false)).unwrap();
    db.assign_permissions(OWNER, &mut r1, &spec(json!({ "groups": [{ "id": g.public_id }] })))
        .unwrap();

    let as_v = db.caller_for(Relation::Follower, OWNER, v.id).unwrap().unwrap();
    let as_w = db.caller_for(Relation::Follower, OWNER, w.id).unwrap().unwrap();

    assert_eq!(ids(&fetch(&db, &as_v)), vec![r2.id, r1.id]);
    assert_eq!(ids(&fetch(&db, &as_w)), vec![r2.id]);
    assert_eq!(ids(&fetch(&db, &Caller::Anonymous)), vec![r2.id]);
    assert_eq!(ids(&fetch(&db, &Caller::App { app_id: 5 })), vec![r2.id]);
    assert_eq!(ids(&fetch(&db, &Caller::Owner)), vec![r3.id, r2.id, r1.id]);

    let params = FetchParams::default();
    assert_eq!(db.count_with_permissions::<Post>(OWNER, &as_v, &params).unwrap(), 2);
    assert_eq!(db.count_with_permissions::<Post>(OWNER, &as_w, &params).unwrap(), 1);

    assert!(db.find_with_permissions::<Post>(OWNER, r1.id, &as_v).unwrap().is_some());
    assert!(db.find_with_permissions::<Post>(OWNER, r1.id, &as_w).unwrap().is_none());
    assert!(db.find_with_permissions::<Post>(OWNER, r3.id, &as_v).unwrap().is_none());
}

#[test]
fn row_matched_by_several_grants_is_returned_once() {
    let (_dir, db) = open();
    let g = db.create_group(OWNER, "friends").unwrap();
    let v = db.add_follower(OWNER, "https://v.example.com", &[g.public_id.clone()]).unwrap();
    let mut r1 = db.create_post(OWNER, &NewPost::status(ENTITY, "hi", false)).unwrap();
    db.assign_permissions(
        OWNER,
        &mut r1,
        &spec(json!({
            "groups": [{ "id": g.public_id }],
            "entities": { "https://v.example.com": true }
        })),
    )
    .unwrap();

    let caller = v.caller();
    assert_eq!(ids(&fetch(&db, &caller)), vec![r1.id]);
    assert_eq!(
        db.count_with_permissions::<Post>(OWNER, &caller, &FetchParams::default()).unwrap(),
        1
    );
}

#[test]
fn owner_scope_and_soft_delete_always_apply() {
    let (_dir, db) = open();
    let mine = db.create_post(OWNER, &NewPost::status(ENTITY, "mine", true)).unwrap();
    let gone = db.create_post(OWNER, &NewPost::status(ENTITY, "gone", true)).unwrap();
    db.create_post(2, &NewPost::status("https://other.example.com", "theirs", true))
        .unwrap();
    assert!(db.soft_delete::<Post>(OWNER, gone.id).unwrap());
    assert!(!db.soft_delete::<Post>(OWNER, gone.id).unwrap());

    assert_eq!(ids(&fetch(&db, &Caller::Anonymous)), vec![mine.id]);
    assert_eq!(ids(&fetch(&db, &Caller::Owner)), vec![mine.id]);
    assert!(db.find_with_permissions::<Post>(OWNER, gone.id, &Caller::Owner).unwrap().is_none());
}

#[test]
fn derivative_copies_are_hidden_from_non_owners() {
    let (_dir, db) = open();
    let original = db.create_post(OWNER, &NewPost::status(ENTITY, "original", true)).unwrap();
    let mut copy = NewPost::status(ENTITY, "copy", true);
    copy.original = false;
    let copy = db.create_post(OWNER, &copy).unwrap();

    assert_eq!(ids(&fetch(&db, &Caller::Anonymous)), vec![original.id]);
    assert_eq!(ids(&fetch(&db, &Caller::Owner)), vec![copy.id, original.id]);
}

#[test]
fn follower_and_following_grants_for_one_entity() {
    let (dir, db) = open();
    let follower = db.add_follower(OWNER, "alice@example.com", &[]).unwrap();
    let following = db.add_following(OWNER, "alice@example.com", &[]).unwrap();
    let mut r1 = db.create_post(OWNER, &NewPost::status(ENTITY, "for alice", false)).unwrap();

    db.assign_permissions(OWNER, &mut r1, &spec(json!({ "entities": { "alice@example.com": true } })))
        .unwrap();

    let extended = db.permissions_json(&r1, true).unwrap();
    assert_eq!(
        serde_json::to_value(&extended).unwrap(),
        json!({ "groups": [], "entities": { "alice@example.com": true }, "public": false })
    );
    assert_eq!(
        serde_json::to_value(db.permissions_json(&r1, false).unwrap()).unwrap(),
        json!({ "public": false })
    );

    assert_eq!(ids(&fetch(&db, &follower.caller())), vec![r1.id]);
    assert_eq!(ids(&fetch(&db, &following.caller())), vec![r1.id]);

    let conn = rusqlite::Connection::open(dir.path().join(DB_FILE)).unwrap();
    let grants: Vec<(Option<i64>, Option<i64>)> = conn
        .prepare("SELECT follower_access_id, following_id FROM permissions WHERE post_id=?1 ORDER BY id")
        .unwrap()
        .query_map([r1.id], |r| Ok((r.get(0)?, r.get(1)?)))
        .unwrap()
        .collect::<rusqlite::Result<_>>()
        .unwrap();
    assert_eq!(grants, vec![(Some(follower.id), None), (None, Some(following.id))]);
}

#[test]
fn hidden_entities_and_public_flag() {
    let (_dir, db) = open();
    db.add_follower(OWNER, "https://bob.example.com", &[]).unwrap();
    let g = db.create_group(OWNER, "family").unwrap();
    let mut r1 = db.create_post(OWNER, &NewPost::status(ENTITY, "hi", false)).unwrap();

    db.assign_permissions(
        OWNER,
        &mut r1,
        &spec(json!({
            "groups": [{ "id": g.public_id }, { "id": g.public_id }],
            "entities": { "https://bob.example.com": false },
            "public": true
        })),
    )
    .unwrap();
    assert!(r1.public);

    let summary = db.permissions_json(&r1, true).unwrap();
    assert_eq!(
        serde_json::to_value(&summary).unwrap(),
        json!({ "groups": [{ "id": g.public_id }], "entities": {}, "public": true })
    );
    let stored = db.find_with_permissions::<Post>(OWNER, r1.id, &Caller::Anonymous).unwrap();
    assert_eq!(stored.map(|p| p.public), Some(true));
}

#[test]
fn apps_use_their_access_relationship() {
    let (_dir, db) = open();
    let v = db.add_following(OWNER, "https://v.example.com", &[]).unwrap();
    let mut private = db.create_app(OWNER, "Private App", Some("https://app.example.com"), false).unwrap();
    let public = db.create_app(OWNER, "Public App", None, true).unwrap();

    db.assign_permissions(OWNER, &mut private, &spec(json!({ "entities": { "https://v.example.com/": true } })))
        .unwrap();

    let apps: Vec<App> = db
        .fetch_with_permissions::<App>(OWNER, &v.caller(), &FetchParams::default())
        .unwrap()
        .into_rows();
    assert_eq!(apps.iter().map(|a| a.id).collect::<Vec<_>>(), vec![public.id, private.id]);
    // Following grants give access but are not listed in the summary.
    assert_eq!(
        serde_json::to_value(db.permissions_json(&private, true).unwrap()).unwrap(),
        json!({ "groups": [], "entities": {}, "public": false })
    );
}

#[test]
fn removed_contact_loses_its_grants() {
    let (_dir, db) = open();
    let g = db.create_group(OWNER, "friends").unwrap();
    let v = db.add_follower(OWNER, "https://v.example.com", &[g.public_id.clone()]).unwrap();
    let mut shared = db.create_post(OWNER, &NewPost::status(ENTITY, "for v", false)).unwrap();
    let mut grouped = db.create_post(OWNER, &NewPost::status(ENTITY, "for friends", false)).unwrap();
    let open_post = db.create_post(OWNER, &NewPost::status(ENTITY, "for everyone", true)).unwrap();
    db.assign_permissions(OWNER, &mut shared, &spec(json!({ "entities": { "https://v.example.com": true } })))
        .unwrap();
    db.assign_permissions(OWNER, &mut grouped, &spec(json!({ "groups": [{ "id": g.public_id }] })))
        .unwrap();

    let caller = v.caller();
    assert_eq!(ids(&fetch(&db, &caller)), vec![open_post.id, grouped.id, shared.id]);

    assert!(db.remove_contact(Relation::Follower, OWNER, v.id).unwrap());
    assert!(!db.remove_contact(Relation::Follower, OWNER, v.id).unwrap());

    assert_eq!(ids(&fetch(&db, &caller)), vec![open_post.id]);
    assert_eq!(
        db.count_with_permissions::<Post>(OWNER, &caller, &FetchParams::default()).unwrap(),
        1
    );
    assert!(db.caller_for(Relation::Follower, OWNER, v.id).unwrap().is_none());
}

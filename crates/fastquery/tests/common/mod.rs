#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use fastquery::{
    FastQuery, MemoryBackend, QuerySpec, RelationDescriptor, RelationshipRegistry, ResultRow,
    ThroughTable,
};
use serde_json::{json, Value as JsonValue};

pub fn user(id: i64, name: &str, location_id: i64) -> ResultRow {
    ResultRow::from_json(json!({
        "id": id,
        "name": name,
        "last_name": "Tester",
        "date_of_birth": "1990-01-01",
        "favorite_pet_id": null,
        "favorite_pet_type_id": null,
        "location_id": location_id,
    }))
    .unwrap()
}

/// Users 1..=4 spread over three locations, each in at least one group;
/// users 1..=3 have a profile
pub async fn fixture() -> MemoryBackend {
    let backend = MemoryBackend::new();

    backend
        .insert_table(
            "users",
            vec![
                user(1, "0", 1),
                user(2, "1", 1),
                user(3, "2", 2),
                user(4, "3", 3),
            ],
        )
        .await;

    let locations = (1..=3)
        .map(|id| {
            ResultRow::new()
                .with("id", id)
                .with("name", id.to_string())
                .with("blob", JsonValue::Null)
        })
        .collect();
    backend.insert_table("locations", locations).await;

    backend
        .insert_table(
            "groups",
            vec![
                ResultRow::new().with("id", 1).with("name", "0"),
                ResultRow::new().with("id", 2).with("name", "1"),
            ],
        )
        .await;

    let links = [(1, 1), (1, 2), (2, 1), (3, 2), (4, 1)]
        .into_iter()
        .map(|(user_id, group_id)| {
            ResultRow::new()
                .with("user_id", user_id)
                .with("group_id", group_id)
        })
        .collect();
    backend.insert_table("users_groups", links).await;

    let profiles = (1..=3)
        .map(|id| {
            ResultRow::new()
                .with("id", id + 100)
                .with("user_id", id)
                .with("display_name", format!("User {}", id))
                .with("thumbnail_url", JsonValue::Null)
        })
        .collect();
    backend.insert_table("profiles", profiles).await;

    backend
}

/// Backend with `count` users spread over three locations and two groups
pub async fn scaled_fixture(count: i64) -> MemoryBackend {
    let backend = fixture().await;
    backend
        .insert_table(
            "users",
            (1..=count).map(|id| user(id, "u", id % 3 + 1)).collect(),
        )
        .await;
    backend
        .insert_table(
            "users_groups",
            (1..=count)
                .map(|id| ResultRow::new().with("user_id", id).with("group_id", id % 2 + 1))
                .collect(),
        )
        .await;
    backend
}

pub fn schema() -> Arc<RelationshipRegistry> {
    let users_groups = || ThroughTable::new("users_groups", "user_id", "group_id");
    let groups_users = || ThroughTable::new("users_groups", "group_id", "user_id");

    let relations = [
        ("users", RelationDescriptor::to_one("location", "locations", "location_id")),
        ("users", RelationDescriptor::many_to_many("groups", "groups", users_groups())),
        ("users", RelationDescriptor::reverse_to_one("profile", "profiles", "user_id")),
        ("profiles", RelationDescriptor::to_one("user", "users", "user_id")),
        ("locations", RelationDescriptor::to_many("user_set", "users", "location_id")),
        ("groups", RelationDescriptor::many_to_many("users", "users", groups_users())),
    ];

    let registry = RelationshipRegistry::new();
    for (entity, descriptor) in relations {
        registry.register(entity, descriptor).expect("fixture schema is valid");
    }

    Arc::new(registry)
}

pub fn query(backend: &MemoryBackend, base: QuerySpec) -> FastQuery {
    FastQuery::new(Arc::new(backend.clone()), schema(), base)
}

pub fn names(fields: &[&str]) -> BTreeSet<String> {
    fields.iter().map(|field| field.to_string()).collect()
}

pub fn user_keys() -> BTreeSet<String> {
    names(&[
        "last_name",
        "name",
        "favorite_pet_id",
        "date_of_birth",
        "favorite_pet_type_id",
        "location_id",
        "id",
    ])
}

pub fn keys(row: &ResultRow) -> BTreeSet<String> {
    row.field_names().map(String::from).collect()
}

pub fn ids(rows: &[ResultRow]) -> Vec<JsonValue> {
    rows.iter().filter_map(|row| row.get("id").cloned()).collect()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("fastquery=debug")
        .with_test_writer()
        .try_init();
}

mod common;

use common::{fixture, ids, init_tracing, keys, names, query, scaled_fixture, user_keys};
use fastquery::{OrmError, Prefetch, PrefetchSet, QuerySpec, RelationValue, ResultRow};
use serde_json::{json, Value as JsonValue};

#[tokio::test]
async fn test_fk_prefetch() {
    init_tracing();
    let backend = fixture().await;
    let mut q = query(&backend, QuerySpec::all("users"))
        .prefetch(Prefetch::new("location").with_query(QuerySpec::all("locations")))
        .unwrap();

    let result = q.execute().await.unwrap();
    assert_eq!(backend.fetch_count().await, 2);

    assert!(result
        .iter()
        .all(|row| row.relation("location").and_then(RelationValue::as_one).is_some()));
    let location = result[0].relation("location").and_then(RelationValue::as_one).unwrap();
    assert_eq!(keys(location), names(&["blob", "id", "name"]));
}

#[tokio::test]
async fn test_m2m_prefetch() {
    let backend = fixture().await;
    let mut q = query(&backend, QuerySpec::all("users"))
        .prefetch("groups")
        .unwrap();

    let result = q.execute().await.unwrap();
    assert_eq!(backend.fetch_count().await, 3);

    for row in result {
        let groups = row.relation("groups").and_then(RelationValue::as_many).unwrap();
        assert!(!groups.is_empty());
    }
    let json = result[0].to_json();
    assert!(json["groups"].is_array());
    let group = &result[0].relation("groups").and_then(RelationValue::as_many).unwrap()[0];
    assert_eq!(keys(group), names(&["id", "name"]));
}

#[tokio::test]
async fn test_o2o_prefetch() {
    let backend = fixture().await;
    let mut q = query(&backend, QuerySpec::all("profiles"))
        .prefetch("user")
        .unwrap();

    let result = q.execute().await.unwrap();
    assert_eq!(backend.fetch_count().await, 2);

    assert!(result
        .iter()
        .all(|row| row.relation("user").is_some_and(|user| !user.is_null())));
    let user = result[0].relation("user").and_then(RelationValue::as_one).unwrap();
    assert_eq!(keys(user), user_keys());
}

#[tokio::test]
async fn test_reverse_o2o_prefetch() {
    let backend = fixture().await;
    let mut q = query(&backend, QuerySpec::all("users").order_by("id"))
        .prefetch("profile")
        .unwrap();

    let result = q.execute().await.unwrap();
    assert_eq!(backend.fetch_count().await, 2);

    assert!(result.iter().all(|row| row.has_relation("profile")));
    let profile = result[0].relation("profile").and_then(RelationValue::as_one).unwrap();
    assert_eq!(keys(profile), names(&["display_name", "id", "thumbnail_url", "user_id"]));

    // user 4 has no profile: the slot is present and null
    let json = result[3].to_json();
    assert!(json.as_object().unwrap().contains_key("profile"));
    assert_eq!(json["profile"], JsonValue::Null);
}

#[tokio::test]
async fn test_m2o_prefetch() {
    let backend = fixture().await;
    let mut q = query(&backend, QuerySpec::all("locations"))
        .prefetch("user_set")
        .unwrap();

    let result = q.execute().await.unwrap();
    assert_eq!(backend.fetch_count().await, 2);

    assert!(result.iter().all(|row| row.has_relation("user_set")));
    let users = result
        .iter()
        .filter_map(|row| row.relation("user_set").and_then(RelationValue::as_many))
        .find(|users| users.len() > 1)
        .expect("a location with several users");
    assert_eq!(keys(&users[0]), user_keys());
}

#[tokio::test]
async fn test_nested_prefetch_by_string() {
    let backend = fixture().await;
    let mut q = query(&backend, QuerySpec::all("locations").where_eq("id", 1))
        .prefetch("user_set.groups")
        .unwrap();

    let out: Vec<_> = q.iter().await.unwrap().cloned().collect();
    let users = out[0].relation("user_set").and_then(RelationValue::as_many).unwrap();
    assert!(users[0].has_relation("groups"));
    assert_eq!(
        backend.fetched_entities().await,
        vec!["locations", "users", "users_groups", "groups"]
    );

    let mut manual = query(&backend, QuerySpec::all("locations").where_eq("id", 1))
        .prefetch(Prefetch::new("user_set").nested(Prefetch::new("groups")))
        .unwrap();
    assert_eq!(manual.execute().await.unwrap(), out.as_slice());
}

#[tokio::test]
async fn test_include_paths() {
    let backend = fixture().await;
    let set = PrefetchSet::from_paths(&["groups.", "profile.", "location."], ".").unwrap();

    let mut q = query(&backend, QuerySpec::all("users"));
    for prefetch in set.as_slice() {
        q.add_prefetch(prefetch.clone()).unwrap();
    }

    let result = q.execute().await.unwrap();
    for row in result {
        let names: Vec<&str> = row.relation_names().collect();
        assert_eq!(names, vec!["groups", "location", "profile"]);
    }
    // users, links + groups, profiles, locations
    assert_eq!(backend.fetch_count().await, 5);
}

#[tokio::test]
async fn test_duplicate_registrations_merge() {
    let backend = fixture().await;
    let mut q = query(&backend, QuerySpec::all("locations"))
        .prefetch("user_set.groups")
        .unwrap()
        .prefetch("user_set.profile")
        .unwrap()
        .prefetch("user_set")
        .unwrap();

    assert_eq!(q.prefetches().len(), 1);
    let result = q.execute().await.unwrap();

    // users are fetched once for both nested relations
    let entities = backend.fetched_entities().await;
    assert_eq!(entities.iter().filter(|e| e.as_str() == "users").count(), 1);
    assert_eq!(entities.len(), 5);

    for location in result {
        for user in location.relation("user_set").and_then(RelationValue::as_many).unwrap() {
            assert!(user.has_relation("groups"));
            assert!(user.has_relation("profile"));
        }
    }
}

#[tokio::test]
async fn test_fetch_count_independent_of_row_count() {
    let mut counts = Vec::new();
    for size in [5, 50, 500] {
        let backend = scaled_fixture(size).await;
        let mut q = query(&backend, QuerySpec::all("users"))
            .prefetch("location")
            .unwrap()
            .prefetch("groups")
            .unwrap();
        assert_eq!(q.execute().await.unwrap().len(), size as usize);
        counts.push(backend.fetch_count().await);
    }
    assert_eq!(counts, vec![4, 4, 4]);
}

#[tokio::test]
async fn test_repeated_iteration_does_not_refetch() {
    let backend = fixture().await;
    let mut q = query(&backend, QuerySpec::all("users"))
        .prefetch("location")
        .unwrap();

    let first: Vec<_> = q.iter().await.unwrap().cloned().collect();
    let second: Vec<_> = q.iter().await.unwrap().cloned().collect();
    assert_eq!(first, second);
    assert_eq!(backend.fetch_count().await, 2);

    let stats = q.stats().unwrap();
    assert_eq!(stats.fetch_count, 2);
    assert_eq!(stats.max_depth, 1);
    assert_eq!(stats.rows_fetched, 4 + 3);
}

#[tokio::test]
async fn test_backend_failure_aborts_execution() {
    let backend = fixture().await;
    backend.fail_on("groups").await;

    let mut q = query(&backend, QuerySpec::all("users"))
        .prefetch("location")
        .unwrap()
        .prefetch("groups")
        .unwrap();

    let err = q.execute().await.unwrap_err();
    match err {
        OrmError::BackendFetch { entity, source } => {
            assert_eq!(entity, "groups");
            assert!(source.to_string().contains("groups"));
        }
        other => panic!("Expected BackendFetch, got {:?}", other),
    }
    assert!(!q.is_executed());
    assert!(q.stats().is_none());

    backend.recover("groups").await;
    assert_eq!(q.execute().await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_unknown_relation() {
    let backend = fixture().await;
    let mut q = query(&backend, QuerySpec::all("users"))
        .prefetch("pets")
        .unwrap();

    let err = q.execute().await.unwrap_err();
    assert!(matches!(
        err,
        OrmError::UnknownRelation { ref entity, ref relation }
            if entity == "users" && relation == "pets"
    ));
    assert!(!q.is_executed());
}

#[tokio::test]
async fn test_malformed_path() {
    let backend = fixture().await;
    let q = query(&backend, QuerySpec::all("users"));
    let err = q.prefetch("location..name").err().unwrap();
    assert!(matches!(err, OrmError::MalformedPath { .. }));
}

#[tokio::test]
async fn test_override_query_ordering_is_kept() {
    let backend = fixture().await;
    let mut q = query(&backend, QuerySpec::all("users").where_eq("id", 1))
        .prefetch(
            Prefetch::new("groups").with_query(QuerySpec::all("groups").order_by_desc("name")),
        )
        .unwrap();

    let result = q.execute().await.unwrap();
    let groups = result[0].relation("groups").and_then(RelationValue::as_many).unwrap();
    assert_eq!(ids(groups), vec![json!(2), json!(1)]);
}

#[tokio::test]
async fn test_to_many_override_ordering_is_kept() {
    let backend = fixture().await;
    let mut q = query(&backend, QuerySpec::all("locations").order_by("id"))
        .prefetch(Prefetch::new("user_set").with_query(QuerySpec::all("users").order_by_desc("id")))
        .unwrap();

    let result = q.execute().await.unwrap();
    let user_set = |row: &ResultRow| {
        ids(row.relation("user_set").and_then(RelationValue::as_many).unwrap())
    };
    assert_eq!(user_set(&result[0]), vec![json!(2), json!(1)]);
    assert_eq!(user_set(&result[1]), vec![json!(3)]);
    assert_eq!(user_set(&result[2]), vec![json!(4)]);

    // the ordering is pushed into the single fetch for the relation
    let log = backend.fetch_log().await;
    assert_eq!(log.len(), 2);
    assert_eq!(log[1].entity(), "users");
}

#[tokio::test]
async fn test_empty_base_result() {
    let backend = fixture().await;
    let mut q = query(&backend, QuerySpec::all("users").where_in("id", Vec::<i64>::new()))
        .prefetch("location")
        .unwrap();

    assert!(q.execute().await.unwrap().is_empty());
    assert_eq!(backend.fetch_count().await, 0);
}

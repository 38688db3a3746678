//! Tests for data access unit execution and routing.

use tempfile::TempDir;

use super::test_utils::{WEB_PATTERN, count_rows, dual_registry, seed, sqlite_config};
use crate::db::{BindingRegistry, CallScopes, DataAccessUnit, DbError, Param};

const WEB_LABEL: DataAccessUnit = DataAccessUnit::new(
    "puml::web::mapper",
    "backend_label",
    "SELECT label FROM backend",
);
const SERVICE_LABEL: DataAccessUnit = DataAccessUnit::new(
    "puml::service::sample::mapper",
    "backend_label",
    "SELECT label FROM backend",
);
const WEB_HIT: DataAccessUnit = DataAccessUnit::new(
    "puml::web::mapper",
    "record_hit",
    "INSERT INTO hit (source) VALUES (?)",
);

#[derive(Debug, PartialEq, sqlx::FromRow)]
struct Hit {
    id: i64,
    source: String,
}

/// Two bindings whose databases answer differently to the same query.
async fn labelled_registry(dir: &TempDir) -> BindingRegistry {
    let registry = dual_registry(dir);
    for (name, label) in [("web", "web-backend"), ("service", "service-backend")] {
        let insert = format!("INSERT INTO backend (label) VALUES ('{label}')");
        seed(
            &registry.get(name).unwrap(),
            &[
                "CREATE TABLE backend (label TEXT NOT NULL)",
                insert.as_str(),
                "CREATE TABLE hit (id INTEGER PRIMARY KEY, source TEXT NOT NULL)",
            ],
        )
        .await;
    }
    registry
}

#[tokio::test(flavor = "multi_thread")]
async fn units_with_identical_sql_reach_only_their_own_backend() {
    let dir = TempDir::new().unwrap();
    let registry = labelled_registry(&dir).await;
    let web_label = registry.bind(WEB_LABEL).unwrap();
    let service_label = registry.bind(SERVICE_LABEL).unwrap();

    for _ in 0..25 {
        let web: String = web_label.fetch_scalar(None, &[]).await.unwrap();
        let service: String = service_label.fetch_scalar(None, &[]).await.unwrap();
        assert_eq!(web, "web-backend");
        assert_eq!(service, "service-backend");
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn writes_land_only_in_the_owning_database() {
    let dir = TempDir::new().unwrap();
    let registry = labelled_registry(&dir).await;
    let record_hit = registry.bind(WEB_HIT).unwrap();

    for i in 0..10 {
        let affected = record_hit
            .execute(None, &[Param::from(format!("call {i}"))])
            .await
            .unwrap();
        assert_eq!(affected, 1);
    }

    assert_eq!(count_rows(&registry.get("web").unwrap(), "hit").await, 10);
    assert_eq!(count_rows(&registry.get("service").unwrap(), "hit").await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn scope_on_another_binding_does_not_capture_the_unit() {
    let dir = TempDir::new().unwrap();
    let registry = labelled_registry(&dir).await;
    let service = registry.get("service").unwrap();
    let record_hit = registry.bind(WEB_HIT).unwrap();
    let calls = CallScopes::new();

    let mut service_scope = service.transactions().begin(&calls).await.unwrap();
    record_hit
        .execute(Some(&mut service_scope), &[Param::from("outside")])
        .await
        .unwrap();
    // Rolling back the service scope cannot undo a write made on the web pool.
    service_scope.rollback().await.unwrap();

    assert_eq!(count_rows(&registry.get("web").unwrap(), "hit").await, 1);
    assert_eq!(count_rows(&service, "hit").await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn scope_from_same_named_binding_in_another_registry_is_not_joined() {
    let dir = TempDir::new().unwrap();
    let mut first = BindingRegistry::new();
    let mut second = BindingRegistry::new();
    for (registry, file, label) in [(&mut first, "a", "A"), (&mut second, "b", "B")] {
        let web = registry
            .register("web", WEB_PATTERN, sqlite_config(&dir, file))
            .unwrap();
        let insert = format!("INSERT INTO backend (label) VALUES ('{label}')");
        seed(
            &web,
            &["CREATE TABLE backend (label TEXT NOT NULL)", insert.as_str()],
        )
        .await;
    }
    let calls = CallScopes::new();
    let mut first_scope = first
        .get("web")
        .unwrap()
        .transactions()
        .begin(&calls)
        .await
        .unwrap();

    let label: String = second
        .bind(WEB_LABEL)
        .unwrap()
        .fetch_scalar(Some(&mut first_scope), &[])
        .await
        .unwrap();

    assert_eq!(label, "B");
    first_scope.rollback().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn fetch_as_maps_typed_rows_with_parameters() {
    let dir = TempDir::new().unwrap();
    let registry = labelled_registry(&dir).await;
    let record_hit = registry.bind(WEB_HIT).unwrap();
    for source in ["a", "b", "c"] {
        record_hit.execute(None, &[source.into()]).await.unwrap();
    }

    let since = registry
        .bind(DataAccessUnit::owned(
            "puml::web::mapper",
            "hits_after",
            "SELECT id, source FROM hit WHERE id > ? ORDER BY id",
        ))
        .unwrap();
    let hits: Vec<Hit> = since.fetch_as(None, &[Param::Int(1)]).await.unwrap();

    assert_eq!(
        hits,
        vec![
            Hit {
                id: 2,
                source: "b".to_string()
            },
            Hit {
                id: 3,
                source: "c".to_string()
            },
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connection_query_returns_one() {
    let dir = TempDir::new().unwrap();
    let registry = dual_registry(&dir);
    let unit = registry
        .bind(DataAccessUnit::new(
            "puml::service::sample::mapper",
            "test_connection",
            "SELECT 1",
        ))
        .unwrap();

    let value: i64 = unit.fetch_scalar(None, &[]).await.unwrap();
    assert_eq!(value, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn scalar_on_empty_result_is_a_data_access_error() {
    let dir = TempDir::new().unwrap();
    let registry = labelled_registry(&dir).await;
    let unit = registry
        .bind(DataAccessUnit::owned(
            "puml::web::mapper",
            "missing_hit",
            "SELECT source FROM hit WHERE id = ?",
        ))
        .unwrap();

    let err = unit.fetch_scalar::<String>(None, &[Param::Int(42)]).await.unwrap_err();
    assert!(matches!(
        err,
        DbError::DataAccess { source: sqlx::Error::RowNotFound, .. }
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn driver_errors_are_wrapped_with_unit_and_binding() {
    let dir = TempDir::new().unwrap();
    let registry = dual_registry(&dir);
    let unit = registry
        .bind(DataAccessUnit::owned(
            "puml::web::mapper",
            "broken",
            "SELECT * FROM no_such_table",
        ))
        .unwrap();

    let err = unit
        .fetch_all(None, &[])
        .await
        .err()
        .expect("query on a missing table should fail");
    match err {
        DbError::DataAccess {
            binding, operation, ..
        } => {
            assert_eq!(binding, "web");
            assert_eq!(operation, "broken");
        }
        other => panic!("expected DataAccess, got {other:?}"),
    }
}

#[test]
fn params_convert_from_rust_values() {
    assert_eq!(Param::from(7_i32), Param::Int(7));
    assert_eq!(Param::from("x"), Param::Text("x".to_string()));
    assert_eq!(Param::from(None::<i64>), Param::Null);
    assert_eq!(Param::from(Some(true)), Param::Bool(true));
}

#[test]
fn const_units_keep_their_declaration() {
    assert_eq!(WEB_LABEL.namespace(), "puml::web::mapper");
    assert_eq!(WEB_LABEL.name(), "backend_label");
    assert_eq!(WEB_LABEL.sql(), "SELECT label FROM backend");
}

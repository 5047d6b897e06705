mod common;

use common::{record, TestEnvironment};
use mcp_orgm::client::{IntoSentinel, Resource, ResourceError};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

async fn mount_existing_project(env: &TestEnvironment, id: i64) {
    Mock::given(method("GET"))
        .and(path("/proyecto"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": id,
            "nombre_proyecto": "Residencial Las Palmas",
            "ubicacion": "Santiago"
        }])))
        .mount(&env.server)
        .await;
}

async fn mount_missing_project(env: &TestEnvironment, id: i64) {
    Mock::given(method("GET"))
        .and(path("/proyecto"))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&env.server)
        .await;
}

#[tokio::test]
async fn test_update_sends_only_supplied_fields() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;
    mount_existing_project(&env, 5).await;

    Mock::given(method("PATCH"))
        .and(path("/proyecto"))
        .and(query_param("id", "eq.5"))
        .and(body_json(json!({"ubicacion": "La Vega"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 5,
            "nombre_proyecto": "Residencial Las Palmas",
            "ubicacion": "La Vega"
        }])))
        .expect(1)
        .mount(&env.server)
        .await;

    let updated = env
        .client(Resource::Projects)
        .update(5, record(json!({"id": 77, "ubicacion": "La Vega"})))
        .await
        .expect("update should succeed");

    assert_eq!(updated.get_str("ubicacion"), Some("La Vega"));
    assert_eq!(updated.get_str("nombre_proyecto"), Some("Residencial Las Palmas"));
}

#[tokio::test]
async fn test_update_with_no_fields_still_patches() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;
    mount_existing_project(&env, 5).await;

    Mock::given(method("PATCH"))
        .and(path("/proyecto"))
        .and(query_param("id", "eq.5"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 5,
            "nombre_proyecto": "Residencial Las Palmas"
        }])))
        .expect(1)
        .mount(&env.server)
        .await;

    let updated = env
        .client(Resource::Projects)
        .update(5, record(json!({})))
        .await
        .expect("empty update should succeed");

    assert_eq!(updated.id(), Some(5));
}

#[tokio::test]
async fn test_update_missing_record_sends_no_patch() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;
    mount_missing_project(&env, 404).await;

    let result = env
        .client(Resource::Projects)
        .update(404, record(json!({"ubicacion": "La Vega"})))
        .await;

    assert!(matches!(result, Err(ResourceError::NotFound { id: 404, .. })));
    assert!(env.requests_with_method("PATCH").await.is_empty());
}

#[tokio::test]
async fn test_delete_existing_record() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;
    mount_existing_project(&env, 5).await;

    Mock::given(method("DELETE"))
        .and(path("/proyecto"))
        .and(query_param("id", "eq.5"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&env.server)
        .await;

    let deleted = env.client(Resource::Projects).delete(5).await;

    assert!(deleted.into_sentinel());
}

#[tokio::test]
async fn test_delete_missing_record_sends_no_delete() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;
    mount_missing_project(&env, 999).await;

    let result = env.client(Resource::Projects).delete(999).await;

    assert!(matches!(result, Err(ResourceError::NotFound { .. })));
    assert!(env.requests_with_method("DELETE").await.is_empty());
    assert_eq!(env.requests_with_method("GET").await.len(), 1);
}

#[tokio::test]
async fn test_delete_rejected_by_backend() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;
    mount_existing_project(&env, 5).await;

    Mock::given(method("DELETE"))
        .and(path("/proyecto"))
        .respond_with(ResponseTemplate::new(409).set_body_string("violates foreign key constraint"))
        .expect(1)
        .mount(&env.server)
        .await;

    let result = env.client(Resource::Projects).delete(5).await;

    assert_eq!(result.map_err(|e| e.kind()), Err("http"));
}

#[tokio::test]
async fn test_required_fields_checked_for_every_resource() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;

    for resource in Resource::ALL {
        let result = env.client(resource).create(record(json!({"notas": "sin datos"}))).await;
        match result {
            Err(ResourceError::Validation { field, .. }) => {
                assert_eq!(field, resource.schema().required[0], "{}", resource);
            }
            other => panic!("{}: expected a validation error, got {:?}", resource, other),
        }
    }

    assert!(env.requests().await.is_empty());
}

async fn mount_row(env: &TestEnvironment, table: &str, id: i64, row: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/{}", table)))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([row])))
        .mount(&env.server)
        .await;
}

async fn mount_no_row(env: &TestEnvironment, table: &str, id: i64) {
    Mock::given(method("GET"))
        .and(path(format!("/{}", table)))
        .and(query_param("id", format!("eq.{}", id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&env.server)
        .await;
}

#[tokio::test]
async fn test_assign_payment_to_quotation() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;
    mount_row(&env, "cotizacion", 8, json!({"id": 8, "numero": "COT-2025-008", "total": 2500.0})).await;
    mount_row(&env, "pago", 3, json!({"id": 3, "id_cliente": 1, "monto": 2500.0})).await;

    Mock::given(method("PATCH"))
        .and(path("/pago"))
        .and(query_param("id", "eq.3"))
        .and(body_json(json!({"id_cotizacion": 8})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 3, "id_cliente": 1, "monto": 2500.0, "id_cotizacion": 8}
        ])))
        .expect(1)
        .mount(&env.server)
        .await;

    let payment = env
        .backend
        .assign_payment(3, 8)
        .await
        .expect("assignment should succeed");

    assert_eq!(payment.get("id_cotizacion"), Some(&json!(8)));
}

#[tokio::test]
async fn test_assign_payment_to_missing_quotation() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;
    mount_no_row(&env, "cotizacion", 80).await;
    mount_row(&env, "pago", 3, json!({"id": 3, "id_cliente": 1, "monto": 2500.0})).await;

    let result = env.backend.assign_payment(3, 80).await;

    assert!(matches!(
        result,
        Err(ResourceError::NotFound { resource: "quotation", id: 80 })
    ));
    assert!(env.requests_with_method("PATCH").await.is_empty());
    let gets = env.requests_with_method("GET").await;
    assert_eq!(gets.len(), 1);
    assert_eq!(gets[0].url.path(), "/cotizacion");
}

#[tokio::test]
async fn test_assign_missing_payment() {
    common::init_test_logging();
    let env = TestEnvironment::new().await;
    mount_row(&env, "cotizacion", 8, json!({"id": 8, "numero": "COT-2025-008"})).await;
    mount_no_row(&env, "pago", 30).await;

    let result = env.backend.assign_payment(30, 8).await;

    assert!(matches!(
        result,
        Err(ResourceError::NotFound { resource: "payment", id: 30 })
    ));
    assert!(env.requests_with_method("PATCH").await.is_empty());
}

use std::net::TcpListener;

use estimator_core::{NewSubmission, RepositoryError, SubmissionRepository};
use estimator_db_rest::RestSubmissionRepository;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TABLE_PATH: &str = "/rest/v1/fence_estimator";

fn repo(server: &MockServer) -> RestSubmissionRepository {
    RestSubmissionRepository::new(&server.uri(), "anon-key", "fence_estimator")
        .expect("Failed to build client")
}

fn stored_row() -> serde_json::Value {
    json!({
        "id": 7,
        "full_name": "John Doe",
        "email": "john@example.com",
        "phone": "555-123-4567",
        "address": "123 Main St",
        "zip_code": "12345",
        "property_type": "Residential",
        "service_type": "New Installation",
        "materials": ["Wood"],
        "project_details": "Backyard",
        "created_at": "2025-03-01T12:00:00.123456+00:00"
    })
}

fn request() -> NewSubmission {
    NewSubmission {
        full_name: "John Doe".to_string(),
        email: "john@example.com".to_string(),
        phone: "555-123-4567".to_string(),
        address: "123 Main St".to_string(),
        zip_code: Some("12345".to_string()),
        property_type: Some("Residential".to_string()),
        service_type: Some("New Installation".to_string()),
        materials: vec!["Wood".to_string()],
        project_details: "Backyard".to_string(),
    }
}

#[tokio::test]
async fn insert_sends_credentials_and_returns_row() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .and(header("prefer", "return=representation"))
        .and(body_partial_json(json!({ "full_name": "John Doe", "materials": ["Wood"] })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([stored_row()])))
        .expect(1)
        .mount(&server)
        .await;

    let stored = repo(&server).create_submission(request()).await.unwrap();

    assert_eq!(stored.id, 7);
    assert_eq!(stored.service_type.as_deref(), Some("New Installation"));
}

#[tokio::test]
async fn null_columns_are_normalised() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": 3,
            "full_name": "Robert Johnson",
            "email": "robert@example.com",
            "phone": null,
            "address": null,
            "zip_code": null,
            "property_type": null,
            "service_type": null,
            "materials": null,
            "project_details": "Project type: Tub to walk-in shower",
            "created_at": "2025-03-02T08:30:00Z"
        }])))
        .mount(&server)
        .await;

    let row = repo(&server).get_submission(3).await.unwrap();

    assert_eq!(row.phone, "");
    assert!(row.materials.is_empty());
    assert_eq!(row.property_type, None);
}

#[tokio::test]
async fn missing_row_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    assert_eq!(
        repo(&server).get_submission(99).await.err(),
        Some(RepositoryError::NotFound)
    );
}

#[tokio::test]
async fn count_reads_content_range() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(header("prefer", "count=exact"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-range", "0-0/3")
                .set_body_json(json!([{ "id": 1 }])),
        )
        .mount(&server)
        .await;

    assert_eq!(repo(&server).count_submissions().await.unwrap(), 3);
}

#[tokio::test]
async fn rls_rejection_is_permission_denied() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "42501",
            "message": "new row violates row-level security policy for table \"fence_estimator\""
        })))
        .mount(&server)
        .await;

    let err = repo(&server).create_submission(request()).await.unwrap_err();
    assert!(matches!(err, RepositoryError::PermissionDenied(msg) if msg.contains("row-level security")));
}

#[tokio::test]
async fn absent_table_fails_preflight() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "PGRST205",
            "message": "Could not find the table 'public.fence_estimator' in the schema cache"
        })))
        .mount(&server)
        .await;

    assert_eq!(
        repo(&server).check_table().await,
        Err(RepositoryError::MissingTable("fence_estimator".to_string()))
    );
}

/// A loopback port nothing is listening on. A dropped `MockServer` goes back
/// to wiremock's pool and keeps answering, so it cannot stand in here.
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    listener.local_addr().expect("local addr").port()
}

#[tokio::test]
async fn refused_connection_is_a_connection_error() {
    let uri = format!("http://127.0.0.1:{}", closed_port());
    let repo = RestSubmissionRepository::new(&uri, "anon-key", "fence_estimator").unwrap();

    let err = repo.list_submissions().await.unwrap_err();
    assert!(matches!(err, RepositoryError::Connection(_)), "got {err:?}");

    let err = repo.check_table().await.unwrap_err();
    assert!(matches!(err, RepositoryError::Connection(_)), "got {err:?}");
}

#[tokio::test]
async fn unusable_base_url_is_a_configuration_error() {
    let repo = RestSubmissionRepository::new("not a url", "anon-key", "fence_estimator").unwrap();

    let err = repo.count_submissions().await.unwrap_err();

    assert!(matches!(err, RepositoryError::Configuration(_)), "got {err:?}");
}

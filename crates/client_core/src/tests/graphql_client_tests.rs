use super::*;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde_json::json;
use shared::error::ErrorCode;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct ServerState {
    requests: Arc<Mutex<Vec<(HeaderMap, GraphqlRequest)>>>,
}

async fn handle_graphql(
    State(state): State<ServerState>,
    headers: HeaderMap,
    Json(request): Json<GraphqlRequest>,
) -> impl IntoResponse {
    state
        .requests
        .lock()
        .await
        .push((headers, request.clone()));

    let body = match request.operation_name.as_deref() {
        Some("ListNotes") => match request.variables["nextToken"].as_str() {
            None => json!({
                "data": { "listNotes": {
                    "items": [{ "id": "1", "note": "first" }, { "id": "2", "note": "second" }],
                    "nextToken": "page-2"
                } }
            }),
            Some("page-2") => json!({
                "data": { "listNotes": {
                    "items": [{ "id": "3", "note": "third" }],
                    "nextToken": null
                } }
            }),
            Some(_) => json!({ "errors": [{ "message": "bad token" }] }),
        },
        Some("CreateNote") => json!({
            "data": { "createNote": {
                "id": "new-id",
                "note": request.variables["input"]["note"].clone()
            } }
        }),
        Some("UpdateNote") => json!({
            "data": { "updateNote": null },
            "errors": [{
                "message": "The conditional request failed",
                "errorType": "DynamoDB:ConditionalCheckFailedException",
                "path": ["updateNote"]
            }]
        }),
        Some("DeleteNote") => json!({ "data": { "deleteNote": null } }),
        _ => {
            return (StatusCode::BAD_REQUEST, Json(json!({ "errors": [] })));
        }
    };
    (StatusCode::OK, Json(body))
}

async fn spawn_graphql_server() -> anyhow::Result<(String, ServerState)> {
    let state = ServerState::default();
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/graphql", post(handle_graphql))
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/graphql"), state))
}

fn client_for(endpoint: String) -> GraphqlNotesClient {
    GraphqlNotesClient::new(&ClientSettings {
        endpoint,
        api_key: Some("da2-test-key".to_string()),
        page_size: 2,
        ..ClientSettings::default()
    })
    .expect("client")
}

#[tokio::test]
async fn fetch_all_notes_follows_pagination() {
    let (endpoint, state) = spawn_graphql_server().await.expect("server");
    let client = client_for(endpoint);

    let notes = client.fetch_all_notes().await.expect("fetch");

    assert_eq!(
        notes,
        vec![
            Note::new("1", "first"),
            Note::new("2", "second"),
            Note::new("3", "third"),
        ]
    );
    let requests = state.requests.lock().await;
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].1.variables["limit"], json!(2));
    assert!(requests[0].1.query.contains("listNotes"));
    assert_eq!(requests[1].1.variables["nextToken"], json!("page-2"));
}

#[tokio::test]
async fn create_note_sends_input_and_api_key() {
    let (endpoint, state) = spawn_graphql_server().await.expect("server");
    let client = client_for(endpoint);

    let created = client.create_note("buy milk").await.expect("create");

    assert_eq!(created, Note::new("new-id", "buy milk"));
    let requests = state.requests.lock().await;
    let (headers, request) = &requests[0];
    assert_eq!(
        headers.get("x-api-key").and_then(|v| v.to_str().ok()),
        Some("da2-test-key")
    );
    assert!(headers.get("authorization").is_none());
    assert_eq!(request.variables, json!({ "input": { "note": "buy milk" } }));
    assert!(request.query.starts_with("mutation CreateNote"));
}

#[tokio::test]
async fn graphql_errors_are_surfaced() {
    let (endpoint, _state) = spawn_graphql_server().await.expect("server");
    let client = client_for(endpoint);

    let err = client
        .update_note(&NoteId::from("missing"), "text")
        .await
        .expect_err("update should fail");

    match err.downcast_ref::<GraphqlError>() {
        Some(GraphqlError::Api(exception)) => {
            assert_eq!(exception.code(), ErrorCode::ConditionalCheck);
            assert!(exception.to_string().contains("conditional request failed"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn null_mutation_payload_is_missing_data() {
    let (endpoint, _state) = spawn_graphql_server().await.expect("server");
    let client = client_for(endpoint);

    let err = client
        .delete_note(&NoteId::from("1"))
        .await
        .expect_err("delete should fail");

    assert!(matches!(
        err.downcast_ref::<GraphqlError>(),
        Some(GraphqlError::MissingData {
            field: "deleteNote",
            ..
        })
    ));
}

#[tokio::test]
async fn http_error_status_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new().route(
        "/graphql",
        post(|| async { (StatusCode::UNAUTHORIZED, "UnauthorizedException") }),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    let client = client_for(format!("http://{addr}/graphql"));

    let err = client.fetch_all_notes().await.expect_err("fetch should fail");

    match err.downcast_ref::<GraphqlError>() {
        Some(GraphqlError::Status { status, body }) => {
            assert_eq!(*status, 401);
            assert_eq!(body, "UnauthorizedException");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn cyclic_pagination_tokens_are_rejected() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new().route(
        "/graphql",
        post(|Json(request): Json<GraphqlRequest>| async move {
            let next = match request.variables["nextToken"].as_str() {
                Some("a") => "b",
                _ => "a",
            };
            Json(json!({
                "data": { "listNotes": {
                    "items": [{ "id": next, "note": "looped" }],
                    "nextToken": next
                } }
            }))
        }),
    );
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    let client = client_for(format!("http://{addr}/graphql"));

    let err = tokio::time::timeout(std::time::Duration::from_secs(3), client.fetch_all_notes())
        .await
        .expect("fetch_all_notes returns on a token cycle")
        .expect_err("token cycle should fail");

    assert!(matches!(
        err.downcast_ref::<GraphqlError>(),
        Some(GraphqlError::Protocol(message)) if message.contains("repeated pagination token")
    ));
}

#[test]
fn realtime_endpoint_is_derived_from_http_endpoint() {
    let client = GraphqlNotesClient::new(&ClientSettings {
        endpoint: "https://notes.example.com/graphql".to_string(),
        ..ClientSettings::default()
    })
    .expect("client");

    assert_eq!(
        client.realtime_endpoint().as_str(),
        "wss://notes.example.com/graphql"
    );
}

#[test]
fn explicit_realtime_endpoint_wins() {
    let client = GraphqlNotesClient::new(&ClientSettings {
        endpoint: "https://notes.example.com/graphql".to_string(),
        realtime_endpoint: Some("wss://realtime.example.com/graphql".to_string()),
        ..ClientSettings::default()
    })
    .expect("client");

    assert_eq!(
        client.realtime_endpoint().as_str(),
        "wss://realtime.example.com/graphql"
    );
}

#[test]
fn decode_root_field_rejects_missing_data() {
    let response = GraphqlResponse {
        data: Some(json!({})),
        errors: Vec::new(),
    };

    let err = decode_root_field::<Note>(response, NoteOperation::OnCreateNote)
        .expect_err("missing field");

    assert!(matches!(
        err,
        GraphqlError::MissingData {
            field: "onCreateNote",
            ..
        }
    ));
}

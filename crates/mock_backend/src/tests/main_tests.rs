use super::*;
use axum::{body, body::Body, http::Request};
use shared::domain::{Direction, Role};
use tower::ServiceExt;

const TOKEN: &str = "test-token";

fn test_app() -> Router {
    let settings = Settings {
        access_token: TOKEN.into(),
        catalog_size: 3,
        batch_size: 2,
        ..Settings::default()
    };
    build_router(Arc::new(AppState::from_settings(settings)))
}

fn authed(request: axum::http::request::Builder) -> axum::http::request::Builder {
    request.header("authorization", format!("Bearer {TOKEN}"))
}

async fn json_body<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

fn submit_request(path_id: &str, result: &SwipeResult) -> Request<Body> {
    authed(Request::post(format!("/api/v1/classifications/{path_id}/submit")))
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(result).expect("serialize")))
        .expect("request")
}

async fn fetch_batch(app: &Router) -> Vec<ClassificationItem> {
    let request = authed(Request::get("/api/v1/classifications/next-batch"))
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    json_body::<NextBatchResponse>(response).await.items
}

#[tokio::test]
async fn healthz_reports_ok() {
    let request = Request::get("/healthz").body(Body::empty()).expect("request");
    let response = test_app().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let body = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    assert_eq!(body.as_ref(), b"ok");
}

#[tokio::test]
async fn login_returns_token_for_fixture_user_and_rejects_bad_password() {
    let app = test_app();
    let login = |password: &str| {
        Request::post("/api/v1/auth/login")
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::json!({ "username": "admin", "password": password }).to_string(),
            ))
            .expect("request")
    };

    let response = app.clone().oneshot(login("admin")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let dto: LoginResponse = json_body(response).await;
    assert_eq!(dto.access_token, TOKEN);
    assert_eq!(dto.role, Role::Admin);

    let response = app.oneshot(login("wrong")).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let err: ApiError = json_body(response).await;
    assert_eq!(err.code, ErrorCode::Unauthorized);
}

#[tokio::test]
async fn classification_routes_require_bearer_token() {
    let app = test_app();
    for auth in [None, Some("Bearer nope")] {
        let mut request = Request::get("/api/v1/classifications/next-batch");
        if let Some(value) = auth {
            request = request.header("authorization", value);
        }
        let response = app
            .clone()
            .oneshot(request.body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let err: ApiError = json_body(response).await;
        assert_eq!(err.code, ErrorCode::Unauthorized);
    }
}

#[tokio::test]
async fn batches_skip_classified_items_and_progress_tracks_them() {
    let app = test_app();
    let first = fetch_batch(&app).await;
    let ids: Vec<&str> = first.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["1234", "1235"]);
    assert_eq!(first[0].task_id, Some(HORNET_TASK));

    let result = SwipeResult::new(first[0].id.clone(), Direction::Yes);
    let response = app
        .clone()
        .oneshot(submit_request("1234", &result))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let ack: SubmitAck = json_body(response).await;
    assert_eq!(ack.item_id, result.item_id);

    let second = fetch_batch(&app).await;
    let ids: Vec<&str> = second.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["1235", "1236"]);

    let request = authed(Request::get("/api/v1/classifications/progress"))
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    let progress: ProgressResponse = json_body(response).await;
    assert_eq!(
        progress,
        ProgressResponse {
            completed: 1,
            remaining: 2
        }
    );
}

#[tokio::test]
async fn resubmitting_the_same_submission_is_idempotent_but_a_new_one_conflicts() {
    let app = test_app();
    let result = SwipeResult::new(ItemId::new("1234"), Direction::No);

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(submit_request("1234", &result))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    let other = SwipeResult::new(ItemId::new("1234"), Direction::Yes);
    let response = app
        .oneshot(submit_request("1234", &other))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let err: ApiError = json_body(response).await;
    assert_eq!(err.code, ErrorCode::Conflict);
}

#[tokio::test]
async fn submit_rejects_unknown_and_mismatched_items() {
    let app = test_app();

    let ghost = SwipeResult::new(ItemId::new("9999"), Direction::Trash);
    let response = app
        .clone()
        .oneshot(submit_request("9999", &ghost))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let result = SwipeResult::new(ItemId::new("1234"), Direction::Trash);
    let response = app
        .oneshot(submit_request("1235", &result))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let err: ApiError = json_body(response).await;
    assert_eq!(err.code, ErrorCode::Validation);
}

#[tokio::test]
async fn oversized_bodies_are_refused() {
    let request = authed(Request::post("/api/v1/classifications/1234/submit"))
        .header("content-type", "application/json")
        .body(Body::from(vec![b' '; MAX_BODY_BYTES + 1]))
        .expect("request");
    let response = test_app().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{test_app, token_for, SECRET};

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = test_app(Some(SECRET), &[]).await;

    let (status, body) = app.call(Method::GET, "/api/v1/accounts", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);

    let (status, _) = app
        .call(Method::GET, "/api/v1/accounts", Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = token_for("alice");
    let (status, body) = app
        .call(Method::GET, "/api/v1/accounts", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn accounts_are_scoped_to_their_owner() {
    let app = test_app(Some(SECRET), &[]).await;
    let alice = token_for("alice");
    let bob = token_for("bob");

    let (status, account) = app
        .call(
            Method::POST,
            "/api/v1/accounts",
            Some(&alice),
            Some(json!({ "gameName": "Faker", "tagLine": "KR1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(account["ownerUserId"], "alice");
    let key = account["key"].as_str().unwrap().to_string();

    app.wait_for_sync(&key, Some(&alice)).await;

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/api/v1/accounts/{key}/sync-status"),
            Some(&bob),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/accounts",
            Some(&bob),
            Some(json!({ "gameName": "Faker", "tagLine": "KR1" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, listed) = app
        .call(Method::GET, "/api/v1/accounts", Some(&bob), None)
        .await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn admin_routes_require_an_admin() {
    let app = test_app(Some(SECRET), &["ops"]).await;

    let (status, _) = app
        .call(
            Method::GET,
            "/api/v1/admin/rate-limit",
            Some(&token_for("alice")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .call(
            Method::GET,
            "/api/v1/admin/rate-limit",
            Some(&token_for("ops")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["longCapacity"], 100);
}

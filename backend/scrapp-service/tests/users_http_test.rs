#[macro_use]
mod common;

use actix_web::{http::StatusCode, test};
use common::context;
use serde_json::{json, Value};

#[actix_web::test]
async fn register_returns_token_and_user() {
    let ctx = context();
    let app = test_app!(ctx.state);

    let req = test::TestRequest::post()
        .uri("/api/users/register/")
        .set_json(json!({
            "username": "green.thumb",
            "email": "Green@Example.COM",
            "password": "compost-heap-42"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body: Value = test::read_body_json(resp).await;
    let token = body["token"].as_str().unwrap();
    assert_eq!(token.len(), 40);
    assert_eq!(body["user"]["username"], "green.thumb");
    assert_eq!(body["user"]["email"], "Green@example.com");
    assert!(body["user"].get("password").is_none());

    let hash = ctx.users.password_hash_for("green.thumb").unwrap();
    assert!(hash.starts_with("$argon2"));
}

#[actix_web::test]
async fn register_rejects_duplicates_and_weak_passwords() {
    let ctx = context();
    let app = test_app!(ctx.state);

    let register = |username: &str, password: &str| {
        test::TestRequest::post()
            .uri("/api/users/register/")
            .set_json(json!({"username": username, "password": password}))
            .to_request()
    };

    let resp = test::call_service(&app, register("recycler", "glass-jar-rinse")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = test::call_service(&app, register("recycler", "another-pass-9")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "A user with that username already exists.");

    let resp = test::call_service(&app, register("newbie", "12345678")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "password: This password is entirely numeric.");

    let resp = test::call_service(&app, register("bad name", "glass-jar-rinse")).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn login_reuses_the_registration_token() {
    let ctx = context();
    let app = test_app!(ctx.state);

    let req = test::TestRequest::post()
        .uri("/api/users/register/")
        .set_json(json!({"username": "sorter", "password": "paper-not-plastic"}))
        .to_request();
    let registered: Value = test::call_and_read_body_json(&app, req).await;

    let req = test::TestRequest::post()
        .uri("/api/users/login/")
        .set_json(json!({"username": "sorter", "password": "paper-not-plastic"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["token"], registered["token"]);
}

#[actix_web::test]
async fn login_with_bad_credentials_is_rejected() {
    let ctx = context();
    let app = test_app!(ctx.state);

    let req = test::TestRequest::post()
        .uri("/api/users/register/")
        .set_json(json!({"username": "sorter", "password": "paper-not-plastic"}))
        .to_request();
    test::call_service(&app, req).await;

    for (username, password) in [("sorter", "wrong-password"), ("nobody", "paper-not-plastic")] {
        let req = test::TestRequest::post()
            .uri("/api/users/login/")
            .set_json(json!({"username": username, "password": password}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Unable to log in with provided credentials.");
    }
}

#[actix_web::test]
async fn users_endpoints_only_accept_post() {
    let ctx = context();
    let app = test_app!(ctx.state);

    let req = test::TestRequest::get().uri("/api/users/login/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Method \"GET\" not allowed.");
}

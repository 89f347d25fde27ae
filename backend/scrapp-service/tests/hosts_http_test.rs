mod common;

use actix_web::{http::StatusCode, test, App};
use scrapp_service::handlers;
use scrapp_service::middleware::AllowedHosts;
use serde_json::Value;

#[actix_web::test]
async fn unknown_host_header_is_rejected() {
    let ctx = common::context();
    let app = test::init_service(
        App::new()
            .app_data(ctx.state.clone())
            .wrap(AllowedHosts::new(vec!["127.0.0.1".into(), "localhost".into()]))
            .configure(handlers::configure),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/health")
        .insert_header(("Host", "localhost:8000"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri("/health")
        .insert_header(("Host", "attacker.example"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "Invalid host header");
}

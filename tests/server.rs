#![cfg(feature = "server")]

mod common;

use actix_web::{http::StatusCode, test, web, App};
use common::{harness, harness_with, model, model_path, noisy_png, Harness};
use rimgen::server::{configure, AppState};
use rimgen::{AppConfig, ModelDescriptor};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

macro_rules! app {
    ($h:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new(AppState {
                    client: $h.client.clone(),
                }))
                .configure(|cfg| configure(cfg, "/static/images")),
        )
        .await
    };
}

async fn mount_png(server: &MockServer, name: &str) {
    Mock::given(method("POST"))
        .and(path(model_path(name)))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(noisy_png(300, 300)))
        .expect(1)
        .mount(server)
        .await;
}

#[actix_web::test]
async fn generate_from_form_returns_locator_and_serves_the_file() {
    let server = MockServer::start().await;
    mount_png(&server, "alpha").await;
    let h: Harness = harness(vec![model(&server, "alpha")]);
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri("/generate")
        .set_form([("prompt", "a red fox in snow")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["model"], "alpha");
    assert_eq!(body["attempts"], 1);
    assert_eq!(body["prompt"], "a red fox in snow");
    assert_eq!(body["width"], 300);
    assert_eq!(body["height"], 300);

    let url = body["image_url"].as_str().unwrap().to_string();
    let filename = body["filename"].as_str().unwrap();
    assert_eq!(url, format!("/static/images/{}", filename));
    assert!(h.dir.path().join(filename).is_file());

    let req = test::TestRequest::get().uri(&url).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get("content-type").unwrap().to_str().unwrap(),
        "image/png"
    );
    let bytes = test::read_body(resp).await;
    assert_eq!(bytes.len() as u64, body["size_bytes"].as_u64().unwrap());
}

#[actix_web::test]
async fn generate_falls_back_after_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(model_path("alpha")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    mount_png(&server, "beta").await;
    let h = harness(vec![model(&server, "alpha"), model(&server, "beta")]);
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri("/generate")
        .set_json(json!({ "prompt": "a red fox in snow" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["model"], "beta");
    assert_eq!(body["attempts"], 2);
}

#[actix_web::test]
async fn total_failure_lists_every_model() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(model_path("alpha")))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(model_path("beta")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let h = harness(vec![model(&server, "alpha"), model(&server, "beta")]);
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri("/generate")
        .set_json(json!({ "prompt": "a red fox in snow" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 2);
    assert_eq!(errors[0]["model"], "alpha");
    assert_eq!(errors[0]["kind"], "unauthorized");
    assert_eq!(errors[1]["model"], "beta");
    assert_eq!(errors[1]["kind"], "not_found");
    assert!(body["suggestion"].as_str().unwrap().contains("HF_API_TOKEN"));
}

#[actix_web::test]
async fn selected_model_refused_upstream_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(model_path("alpha")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    let h = harness(vec![model(&server, "alpha"), model(&server, "beta")]);
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri("/generate")
        .set_json(json!({ "prompt": "a red fox in snow", "model": "alpha" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"][0]["kind"], "not_found");
}

#[actix_web::test]
async fn short_prompt_and_unknown_model_are_bad_requests() {
    let server = MockServer::start().await;
    let h = harness(vec![model(&server, "alpha")]);
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri("/generate")
        .set_form([("prompt", "hi")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert!(body["error"].as_str().unwrap().contains("at least 3"));

    let req = test::TestRequest::post()
        .uri("/generate")
        .set_json(json!({ "prompt": "a red fox in snow", "model": "nope" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty());
}

#[actix_web::test]
async fn missing_token_is_a_server_error() {
    let h = harness_with(
        AppConfig::new().with_model(ModelDescriptor::new("alpha", "http://127.0.0.1:1/alpha")),
    );
    let app = app!(h);

    let req = test::TestRequest::post()
        .uri("/generate")
        .set_form([("prompt", "a red fox in snow")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "unhealthy");
}

#[actix_web::test]
async fn model_status_and_index() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(model_path("alpha")))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let h = harness(vec![model(&server, "alpha")]);
    let app = app!(h);

    let req = test::TestRequest::get().uri("/models/status").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["available"], 1);
    assert_eq!(body["models"][0]["name"], "alpha");

    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn missing_or_unsafe_files_are_not_found() {
    let h = harness(vec![]);
    std::fs::write(h.dir.path().join(".secret"), b"x").unwrap();
    let app = app!(h);

    for uri in ["/static/images/missing.png", "/static/images/.secret"] {
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

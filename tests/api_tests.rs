//! Control plane and proxy behaviour over the assembled router.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use common::{delete, get, post_json, send, EchoFactory};
use logdir_hub::{
    hub_router, unavailable_router, AppState, DirectoryIndexFactory, InstanceManager, Settings,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn settings(root: &str) -> Settings {
    Settings {
        root_dir: PathBuf::from(root),
        ..Settings::default()
    }
}

fn echo_app(settings: Settings) -> Router {
    let manager = Arc::new(InstanceManager::new(
        settings.root_dir.clone(),
        Arc::new(EchoFactory::default()),
    ));
    hub_router(AppState::new(manager, settings))
}

async fn create(app: &Router, logdir: &str) -> serde_json::Value {
    let body = json!({ "logdir": logdir, "reload_interval": 0 });
    let r = send(app, post_json("/api/tb/", body)).await;
    assert_eq!(r.status, StatusCode::OK);
    r.json()
}

#[tokio::test]
async fn instance_lifecycle() {
    let app = echo_app(settings("/home/user"));

    let created = create(&app, "logs").await;
    assert_eq!(created["name"], "1");
    assert_eq!(created["logdir"], "<root_dir>/logs");
    assert!(created["reload_time"].is_null());
    assert!(created["reload_interval"].is_null());

    let listed = send(&app, get("/api/tb/")).await;
    assert_eq!(listed.status, StatusCode::OK);
    let listed = listed.json();
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let one = send(&app, get("/api/tb/1")).await;
    assert_eq!(one.status, StatusCode::OK);
    assert_eq!(one.json(), listed[0]);

    let deleted = send(&app, delete("/api/tb/1")).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert!(deleted.body.is_empty());

    let gone = send(&app, get("/api/tb/1")).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
    assert!(gone.json()["message"]
        .as_str()
        .unwrap()
        .starts_with("Dashboard instance not found:"));
}

#[tokio::test]
async fn list_without_trailing_slash() {
    let app = echo_app(settings("/home/user"));
    create(&app, "a").await;
    let r = send(&app, get("/api/tb")).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.json()[0]["name"], "1");
}

#[tokio::test]
async fn unknown_instance_is_404_naming_it() {
    let app = echo_app(settings("/home/user"));
    let r = send(&app, get("/api/tb/999")).await;
    assert_eq!(r.status, StatusCode::NOT_FOUND);
    let body = r.json();
    assert_eq!(body["message"], "Dashboard instance not found: '999'");
    assert_eq!(body["reason"], "not_found");

    let r = send(&app, delete("/api/tb/999")).await;
    assert_eq!(r.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn create_twice_returns_same_instance() {
    let app = echo_app(settings("/home/user"));
    let a = create(&app, "logs").await;
    let b = create(&app, "/home/user/logs").await;
    assert_eq!(a["name"], b["name"]);
    let all = send(&app, get("/api/tb/")).await.json();
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn malformed_create_is_400() {
    let app = echo_app(settings("/home/user"));
    let r = send(&app, post_json("/api/tb/", json!({ "reload_interval": 3 }))).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
    assert_eq!(r.json()["reason"], "bad_request");

    let r = send(&app, post_json("/api/tb/", json!({ "logdir": "" }))).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);

    let body = json!({ "logdir": "x", "reload_interval": "soon" });
    let r = send(&app, post_json("/api/tb/", body)).await;
    assert_eq!(r.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn directory_outside_root_is_rendered_relative() {
    let app = echo_app(settings("/home/user"));
    let created = create(&app, "/abs/logs").await;
    assert_eq!(created["logdir"], "<root_dir>/../../abs/logs");
}

#[tokio::test]
async fn instance_root_redirects_with_trailing_slash() {
    let app = echo_app(settings("/home/user"));
    create(&app, "logs").await;

    let r = send(&app, get("/embedded/1")).await;
    assert_eq!(r.status, StatusCode::MOVED_PERMANENTLY);
    assert_eq!(r.headers[header::LOCATION], "/embedded/1/");

    let r = send(&app, get("/embedded/1?x=1")).await;
    assert_eq!(r.status, StatusCode::MOVED_PERMANENTLY);
    assert_eq!(r.headers[header::LOCATION], "/embedded/1/?x=1");
}

#[tokio::test]
async fn post_to_instance_root_is_forbidden() {
    let app = echo_app(settings("/home/user"));
    create(&app, "logs").await;
    let request = Request::builder()
        .method("POST")
        .uri("/embedded/1")
        .header(header::HOST, "localhost")
        .header(header::REFERER, "http://localhost/embedded/1/")
        .body(Body::empty())
        .unwrap();
    let r = send(&app, request).await;
    assert_eq!(r.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn proxy_strips_prefix_and_passes_everything_else() {
    let app = echo_app(settings("/home/user"));
    create(&app, "logs").await;

    let request = Request::builder()
        .uri("/embedded/1/data/plugin/scalars/tags?run=train&tag=loss")
        .header("x-echo", "kept")
        .body(Body::empty())
        .unwrap();
    let r = send(&app, request).await;
    assert_eq!(r.status, StatusCode::OK);
    let echoed = r.json();
    assert_eq!(echoed["method"], "GET");
    assert_eq!(echoed["uri"], "/data/plugin/scalars/tags?run=train&tag=loss");
    assert_eq!(echoed["x_echo"], "kept");
    assert_eq!(echoed["directory"], "/home/user/logs");

    let r = send(&app, get("/embedded/1/")).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.json()["uri"], "/");
}

#[tokio::test]
async fn proxy_to_unknown_instance_is_404() {
    let app = echo_app(settings("/home/user"));
    let r = send(&app, get("/embedded/7/data/runs")).await;
    assert_eq!(r.status, StatusCode::NOT_FOUND);
    assert!(r.json()["message"].as_str().unwrap().contains("'7'"));
}

fn proxied_post(referer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/embedded/1/data/plugin/scalars/scalars_multirun")
        .header(header::HOST, "localhost:8888")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(r) = referer {
        builder = builder.header(header::REFERER, r);
    }
    builder.body(Body::from(r#"{"tag":"loss"}"#)).unwrap()
}

#[tokio::test]
async fn same_origin_post_is_proxied() {
    let app = echo_app(settings("/home/user"));
    create(&app, "logs").await;
    let r = send(&app, proxied_post(Some("http://localhost:8888/embedded/1/"))).await;
    assert_eq!(r.status, StatusCode::OK);
    let echoed = r.json();
    assert_eq!(echoed["method"], "POST");
    assert_eq!(echoed["body"], r#"{"tag":"loss"}"#);
}

#[tokio::test]
async fn cross_origin_or_refererless_post_is_forbidden() {
    let app = echo_app(settings("/home/user"));
    create(&app, "logs").await;
    let r = send(&app, proxied_post(Some("http://elsewhere.example/"))).await;
    assert_eq!(r.status, StatusCode::FORBIDDEN);
    let r = send(&app, proxied_post(None)).await;
    assert_eq!(r.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn token_is_required_when_configured() {
    let app = echo_app(Settings {
        token: Some("s3cret".into()),
        ..settings("/home/user")
    });

    let r = send(&app, get("/api/tb/")).await;
    assert_eq!(r.status, StatusCode::UNAUTHORIZED);
    let r = send(&app, get("/embedded/1/")).await;
    assert_eq!(r.status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/tb/")
        .header(header::AUTHORIZATION, "token s3cret")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status, StatusCode::OK);
    assert_eq!(send(&app, get("/api/tb/?token=s3cret")).await.status, StatusCode::OK);

    assert_eq!(send(&app, get("/health")).await.status, StatusCode::OK);
}

#[tokio::test]
async fn routes_live_under_base_url() {
    let app = echo_app(Settings {
        base_url: "/hub/".into(),
        ..settings("/home/user")
    });
    let body = json!({ "logdir": "logs", "reload_interval": 0 });
    let r = send(&app, post_json("/hub/api/tb/", body)).await;
    assert_eq!(r.status, StatusCode::OK);

    let r = send(&app, get("/hub/embedded/1?x=1")).await;
    assert_eq!(r.status, StatusCode::MOVED_PERMANENTLY);
    assert_eq!(r.headers[header::LOCATION], "/hub/embedded/1/?x=1");

    let r = send(&app, get("/hub/embedded/1/data")).await;
    assert_eq!(r.json()["uri"], "/data");

    assert_eq!(send(&app, get("/api/tb/")).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unavailable_dashboard_degrades_to_503() {
    let app = unavailable_router(&settings("/home/user"), "pattern did not compile");
    for uri in ["/api/tb/", "/api/tb/1", "/embedded/1", "/embedded/1/data/runs"] {
        let r = send(&app, get(uri)).await;
        assert_eq!(r.status, StatusCode::SERVICE_UNAVAILABLE, "{}", uri);
        assert!(r.json()["message"].as_str().unwrap().contains("pattern did not compile"));
    }
    assert_eq!(send(&app, get("/health")).await.status, StatusCode::OK);
    assert_eq!(send(&app, get("/ready")).await.status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(send(&app, get("/elsewhere")).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn builtin_dashboard_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("train")).unwrap();
    std::fs::write(dir.path().join("train/events.out.tfevents.1"), b"x").unwrap();
    let settings = Settings {
        root_dir: dir.path().to_path_buf(),
        ..Settings::default()
    };
    let factory = DirectoryIndexFactory::new(&settings.file_pattern).unwrap();
    let manager = Arc::new(InstanceManager::new(settings.root_dir.clone(), Arc::new(factory)));
    let app = hub_router(AppState::new(manager, settings));

    let created = create(&app, ".").await;
    assert_eq!(created["logdir"], "<root_dir>");

    let r = send(&app, get("/embedded/1/data/runs")).await;
    assert_eq!(r.status, StatusCode::OK);
    assert_eq!(r.json(), json!(["train"]));

    let r = send(&app, get("/embedded/1/")).await;
    assert_eq!(r.status, StatusCode::OK);
    assert!(String::from_utf8_lossy(&r.body).contains("href=\"data/runs\""));
}

#[tokio::test]
async fn reload_time_advances_with_interval() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings {
        root_dir: dir.path().to_path_buf(),
        ..Settings::default()
    };
    let factory = DirectoryIndexFactory::new(&settings.file_pattern).unwrap();
    let manager = Arc::new(InstanceManager::new(settings.root_dir.clone(), Arc::new(factory)));
    let app = hub_router(AppState::new(manager.clone(), settings));

    let body = json!({ "logdir": ".", "reload_interval": 1 });
    let r = send(&app, post_json("/api/tb/", body)).await;
    assert_eq!(r.status, StatusCode::OK);
    let first = r.json();
    assert_eq!(first["reload_interval"], 1.0);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    let second = send(&app, get("/api/tb/1")).await.json();
    assert!(!second["reload_time"].is_null());
    assert_ne!(first["reload_time"], second["reload_time"]);
    manager.shutdown().await;
}

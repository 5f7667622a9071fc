//! Axum gateway for the bindings dashboard. Config-driven via DashboardConfig.

mod handlers;
mod logging;

use axum::extract::State;
use axum::http::{HeaderValue, Method};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::{get, post};
use axum::Router;
use bindscope_core::host::build_env;
use bindscope_core::{describe, summarize, DashboardConfig, Env};
use logging::LogBroadcastLayer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Pre-flight check: config parses, every backend opens, port is free.
fn run_verify() -> Result<(), String> {
    let config = DashboardConfig::load().map_err(|e| format!("Config load failed: {}", e))?;

    print!("Opening {} bindings... ", config.binding_count());
    let env = build_env(&config).map_err(|e| e.to_string())?;
    println!("OK ({} bound)", env.len());
    drop(env);

    let port = config.port;
    print!("Checking port {}... ", port);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], port));
    match std::net::TcpListener::bind(addr) {
        Ok(listener) => {
            drop(listener);
            println!("OK (available)");
        }
        Err(e) => return Err(format!("Port {} BLOCKED: {}", port, e)),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[bindscope] .env not loaded: {} (using system environment)", e);
    }

    if std::env::args().any(|a| a == "--verify") {
        match run_verify() {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("PRE-FLIGHT FAILED: {}", e);
                std::process::exit(1);
            }
        }
    }

    let (log_tx, _) = broadcast::channel(1000);
    let log_layer = LogBroadcastLayer::new(log_tx.clone());

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .with(log_layer)
        .init();

    let config = Arc::new(DashboardConfig::load().expect("load DashboardConfig"));
    let env = Arc::new(build_env(&config).expect("open local bindings"));

    let app = build_app(AppState {
        config: Arc::clone(&config),
        env,
        log_tx,
    });

    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], config.port));
    tracing::info!(
        "{} listening on http://{}{}",
        config.app_name,
        addr,
        config.mount_path()
    );
    axum::serve(
        tokio::net::TcpListener::bind(addr).await.expect("bind gateway port"),
        app,
    )
    .await
    .expect("serve gateway");
}

/// Browser origins served from this machine, any port.
fn is_local_origin(origin: &str) -> bool {
    let Some((_, authority)) = origin.split_once("://") else {
        return false;
    };
    let host = if authority.starts_with('[') {
        authority.split_once(']').map_or(authority, |(h, _)| h).trim_start_matches('[')
    } else {
        authority.split(':').next().unwrap_or_default()
    };
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

fn build_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(|origin: &HeaderValue, _| {
            is_local_origin(origin.to_str().unwrap_or(""))
        }))
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any);

    let mount = state.config.mount_path();

    let api = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/status", get(status))
        .route("/api/v1/env", get(env_overview))
        .route("/api/v1/logs", get(logs_stream))
        .route("/api/v1/kv", get(handlers::kv::overview))
        .route(
            "/api/v1/kv/:binding/entries",
            get(handlers::kv::list_entries).post(handlers::kv::save_entry),
        )
        .route(
            "/api/v1/kv/:binding/entries/:key",
            get(handlers::kv::edit_entry).delete(handlers::kv::delete_entry),
        )
        .route("/api/v1/r2", get(handlers::r2::overview))
        .route("/api/v1/r2/:binding/objects", get(handlers::r2::list_objects))
        .route("/api/v1/r2/:binding/view/*key", get(handlers::r2::view_object))
        .route("/api/v1/r2/:binding/raw/*key", get(handlers::r2::raw_object))
        .route("/api/v1/d1", get(handlers::d1::overview))
        .route("/api/v1/d1/:binding", get(handlers::d1::catalog))
        .route("/api/v1/d1/:binding/query", post(handlers::d1::run_query))
        .with_state(state);

    let app = if mount.is_empty() {
        api
    } else {
        Router::new().nest(&mount, api)
    };
    app.layer(cors)
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<DashboardConfig>,
    pub(crate) env: Arc<Env>,
    pub(crate) log_tx: broadcast::Sender<String>,
}

/// GET /api/v1/health – liveness check for UI and scripts.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "status": "ok" }))
}

/// GET /api/v1/status – app identity and binding counts.
async fn status(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "app_name": state.config.app_name,
        "port": state.config.port,
        "base_path": state.config.mount_path(),
        "ephemeral": state.config.ephemeral,
        "bindings": summarize(&state.env),
    }))
}

/// GET /api/v1/env – every binding with its classified kind.
async fn env_overview(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({ "bindings": describe(&state.env) }))
}

/// GET /api/v1/logs – Server-Sent Events stream of gateway logs (tracing output).
async fn logs_stream(
    State(state): State<AppState>,
) -> Sse<impl futures_util::Stream<Item = Result<Event, std::convert::Infallible>> + Send + 'static> {
    use async_stream::stream;
    let mut rx = state.log_tx.subscribe();
    let stream = stream! {
        loop {
            match rx.recv().await {
                Ok(line) => yield Ok(Event::default().data(line)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    yield Ok(Event::default().data(format!("... {} log lines dropped", n)));
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keepalive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, Bytes};
    use axum::http::{header, Request, StatusCode};
    use bindscope_core::{classify, ResourceBinding, VarBinding};
    use tower::ServiceExt;

    fn test_log_tx() -> broadcast::Sender<String> {
        let (tx, _) = broadcast::channel(1);
        tx
    }

    fn test_config() -> DashboardConfig {
        DashboardConfig {
            app_name: "Test Dashboard".to_string(),
            port: 8788,
            ephemeral: true,
            vars: vec![VarBinding {
                name: "API_URL".into(),
                value: serde_json::json!("https://example.test"),
            }],
            kv_namespaces: vec![
                ResourceBinding { binding: "CACHE".into() },
                ResourceBinding { binding: "SESSIONS".into() },
            ],
            r2_buckets: vec![ResourceBinding { binding: "ASSETS".into() }],
            d1_databases: vec![ResourceBinding { binding: "DB".into() }],
            ..DashboardConfig::default()
        }
    }

    fn test_app(config: DashboardConfig) -> (Router, Arc<Env>) {
        let env = Arc::new(build_env(&config).unwrap());
        let app = build_app(AppState {
            config: Arc::new(config),
            env: Arc::clone(&env),
            log_tx: test_log_tx(),
        });
        (app, env)
    }

    async fn json_body(res: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().method("GET").uri(uri).body(Body::empty()).unwrap()
    }

    fn form_req(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_returns_ok() {
        let (app, _) = test_app(test_config());
        let res = app.oneshot(get_req("/api/v1/health")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_status_reports_identity_and_counts() {
        let (app, _) = test_app(test_config());
        let res = app.oneshot(get_req("/api/v1/status")).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = json_body(res).await;
        assert_eq!(json["app_name"], "Test Dashboard");
        assert_eq!(json["port"], 8788);
        assert_eq!(json["bindings"]["kv_namespaces"], 2);
        assert_eq!(json["bindings"]["buckets"], 1);
        assert_eq!(json["bindings"]["databases"], 1);
        assert_eq!(json["bindings"]["other"], 1);
        assert_eq!(json["bindings"]["total"], 5);
    }

    #[tokio::test]
    async fn test_env_lists_bindings_in_order() {
        let (app, _) = test_app(test_config());
        let res = app.oneshot(get_req("/api/v1/env")).await.unwrap();
        let json = json_body(res).await;
        let bindings = json["bindings"].as_array().unwrap();
        assert_eq!(bindings[0]["name"], "API_URL");
        assert_eq!(bindings[0]["kind"], "string");
        assert_eq!(bindings[0]["value"], "https://example.test");
        assert_eq!(bindings[1]["kind"], "KVNamespace");
        assert!(bindings[1].get("value").is_none());
        assert_eq!(bindings[3]["kind"], "R2Bucket");
        assert_eq!(bindings[4]["kind"], "D1Database");
    }

    #[tokio::test]
    async fn test_kv_save_edit_delete_flow() {
        let (app, _) = test_app(test_config());

        let res = app
            .clone()
            .oneshot(form_req(
                "/api/v1/kv/CACHE/entries",
                "key=user%3A1&value=alice&expirationTtl=3600&metadata=%7B%22role%22%3A%22admin%22%7D",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let json = json_body(res).await;
        assert_eq!(json["entries"][0]["key"], "user:1");
        assert_eq!(json["entries"][0]["value"], "alice");
        assert_eq!(json["entries"][0]["metadata"]["role"], "admin");
        assert!(json["entries"][0]["expiration"].is_i64());

        let res = app
            .clone()
            .oneshot(get_req("/api/v1/kv/CACHE/entries/user%3A1"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let form = json_body(res).await;
        assert_eq!(form["value"], "alice");
        assert!(form["metadata"].as_str().unwrap().contains("\"role\": \"admin\""));

        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/v1/kv/CACHE/entries/user%3A1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(json_body(res).await["entries"].as_array().unwrap().len(), 0);

        let res = app
            .oneshot(get_req("/api/v1/kv/CACHE/entries/user%3A1"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(res).await["outcome"], "not_found");
    }

    #[tokio::test]
    async fn test_kv_invalid_form_echoes_input() {
        let (app, _) = test_app(test_config());
        let res = app
            .oneshot(form_req(
                "/api/v1/kv/CACHE/entries",
                "key=&value=v&expirationTtl=soon",
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let json = json_body(res).await;
        assert_eq!(json["outcome"], "validation_error");
        assert_eq!(json["issues"].as_array().unwrap().len(), 2);
        assert_eq!(json["input"]["value"], "v");
        assert_eq!(json["input"]["expirationTtl"], "soon");
    }

    #[tokio::test]
    async fn test_kv_search_and_selection() {
        let (app, _) = test_app(test_config());
        for body in ["key=user%3A1&value=a", "key=session%3A9&value=b"] {
            let res = app
                .clone()
                .oneshot(form_req("/api/v1/kv/SESSIONS/entries", body))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }

        let res = app
            .clone()
            .oneshot(get_req("/api/v1/kv/SESSIONS/entries?search=USER"))
            .await
            .unwrap();
        let json = json_body(res).await;
        let entries = json["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0]["key"], "user:1");

        let res = app
            .clone()
            .oneshot(get_req("/api/v1/kv?binding=SESSIONS"))
            .await
            .unwrap();
        let json = json_body(res).await;
        assert_eq!(json["selection"]["active"], "SESSIONS");
        assert_eq!(json["entries"].as_array().unwrap().len(), 2);

        let res = app.oneshot(get_req("/api/v1/kv?binding=ASSETS")).await.unwrap();
        let json = json_body(res).await;
        assert_eq!(json["selection"]["available"], serde_json::json!(["CACHE", "SESSIONS"]));
        assert_eq!(json["selection"]["active"], "CACHE");
    }

    #[tokio::test]
    async fn test_wrong_kind_binding_is_not_found() {
        let (app, _) = test_app(test_config());
        let res = app
            .oneshot(get_req("/api/v1/kv/ASSETS/entries"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        let json = json_body(res).await;
        assert_eq!(json["error"], "no KVNamespace binding named 'ASSETS'");
    }

    #[tokio::test]
    async fn test_r2_listing_preview_and_raw() {
        let (app, env) = test_app(test_config());
        let bucket = classify(env.get("ASSETS").unwrap()).object_bucket().unwrap();
        bucket
            .put("img/cat.png", Bytes::from_static(b"\x89PNG"), Some("image/png".into()))
            .await
            .unwrap();
        bucket
            .put("readme.txt", Bytes::from_static(b"hi"), None)
            .await
            .unwrap();

        let res = app
            .clone()
            .oneshot(get_req("/api/v1/r2/ASSETS/objects"))
            .await
            .unwrap();
        let listing = json_body(res).await;
        assert_eq!(listing["folders"][0]["prefix"], "img/");
        assert_eq!(listing["files"][0]["name"], "readme.txt");
        assert!(listing["parent"].is_null());

        let res = app
            .clone()
            .oneshot(get_req("/api/v1/r2/ASSETS/objects?prefix=img%2F"))
            .await
            .unwrap();
        let listing = json_body(res).await;
        assert_eq!(listing["parent"], "");
        assert_eq!(listing["files"][0]["name"], "cat.png");

        let res = app
            .clone()
            .oneshot(get_req("/api/v1/r2/ASSETS/view/img/cat.png"))
            .await
            .unwrap();
        let preview = json_body(res).await;
        assert_eq!(preview["is_image"], true);
        assert_eq!(preview["file_name"], "cat.png");

        let res = app
            .clone()
            .oneshot(get_req("/api/v1/r2/ASSETS/raw/img/cat.png"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "image/png");
        assert!(res.headers().contains_key(header::ETAG));
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"\x89PNG");

        let res = app
            .oneshot(get_req("/api/v1/r2/ASSETS/raw/missing.txt"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_d1_query_runner() {
        let (app, _) = test_app(test_config());
        for statement in [
            "query=CREATE+TABLE+users+%28id+INTEGER+PRIMARY+KEY%2C+name+TEXT%29",
            "query=INSERT+INTO+users+%28name%29+VALUES+%28%27ada%27%29",
        ] {
            let res = app
                .clone()
                .oneshot(form_req("/api/v1/d1/DB/query", statement))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }

        let res = app
            .clone()
            .oneshot(form_req("/api/v1/d1/DB/query", "query=SELECT+*+FROM+users"))
            .await
            .unwrap();
        let page = json_body(res).await;
        assert_eq!(page["tables"], serde_json::json!(["users"]));
        assert_eq!(page["last_query"], "SELECT * FROM users");
        assert_eq!(page["result"]["columns"], serde_json::json!(["id", "name"]));
        assert_eq!(page["result"]["rows"], serde_json::json!([[1, "ada"]]));

        let res = app
            .clone()
            .oneshot(form_req("/api/v1/d1/DB/query", "query=SELEKT+1"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let page = json_body(res).await;
        assert!(page["result"]["error"].as_str().unwrap().contains("syntax error"));

        let res = app.oneshot(get_req("/api/v1/d1")).await.unwrap();
        let json = json_body(res).await;
        assert_eq!(json["selection"]["active"], "DB");
        assert_eq!(json["page"]["tables"], serde_json::json!(["users"]));
    }

    #[tokio::test]
    async fn test_routes_nest_under_base_path() {
        let config = DashboardConfig {
            base_path: "/_dash/".into(),
            ..test_config()
        };
        let (app, _) = test_app(config);
        let res = app
            .clone()
            .oneshot(get_req("/_dash/api/v1/health"))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let res = app.oneshot(get_req("/api/v1/health")).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_local_origins_only() {
        assert!(is_local_origin("http://localhost:5173"));
        assert!(is_local_origin("http://127.0.0.1:8787"));
        assert!(is_local_origin("http://[::1]:3000"));
        assert!(is_local_origin("https://localhost"));
        assert!(!is_local_origin("https://example.com"));
        assert!(!is_local_origin("http://localhost.evil.test"));
        assert!(!is_local_origin("null"));
    }
}

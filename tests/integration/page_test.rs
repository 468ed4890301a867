//! Integration tests for bootstrap pages, static assets and introspection.

use axum::http::StatusCode;

use crate::helpers::{self, TestApp};

#[tokio::test]
async fn test_inline_page_without_template() {
    let app = TestApp::new();
    app.bind("chat", None);

    let response = app.get("/chat").await;

    assert_eq!(response.status, StatusCode::OK);
    assert!(response.content_type.starts_with("text/html"));
    assert!(response.text.starts_with("<h1>chat</h1>"));
    assert!(response.text.contains("window.location.host+\"/chat_ws\""));
    assert!(response.text.contains("src=\"/chat_res/chat.js\""));
}

#[tokio::test]
async fn test_template_page_is_rendered() {
    let app = TestApp::new();
    app.bind("chat", None);
    app.write_asset(
        "chat.html",
        "<title>{{.Title}}</title><script src=\"{{.ScriptPath}}{{.ScriptName}}\"></script>{{.Tagws}}",
    );

    let response = app.get("/chat").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.text,
        "<title>chat</title><script src=\"/chat_res/chat.js\"></script>chat_ws"
    );
}

#[tokio::test]
async fn test_assets_served_from_binding_path() {
    let app = TestApp::new();
    app.bind("chat", None);
    app.write_asset("chat.js", "console.log('chat');");
    app.write_asset("css/site.css", "body {}");

    let js = app.get("/chat_res/chat.js").await;
    assert_eq!(js.status, StatusCode::OK);
    assert_eq!(js.text, "console.log('chat');");

    let css = app.get("/chat_res/css/site.css").await;
    assert_eq!(css.status, StatusCode::OK);
    assert_eq!(css.text, "body {}");

    let missing = app.get("/chat_res/nope.js").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_asset_root_serves_index() {
    let app = TestApp::new();
    app.bind("chat", None);
    app.write_asset("index.html", "<p>index</p>");

    let response = app.get("/chat_res/").await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.text, "<p>index</p>");
    assert_eq!(app.get("/news_res/").await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unbound_tag_is_not_found() {
    let app = TestApp::new();
    app.bind("chat", None);

    for path in ["/news", "/news_res/news.js", "/", "/a/b/c"] {
        let response = app.get(path).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "path {path}");
    }

    let body = app.get("/news").await.json();
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_ws_endpoint_requires_upgrade() {
    let app = TestApp::new();
    app.bind("chat", None);

    let response = app.get("/chat_ws").await;

    assert!(response.status.is_client_error(), "got {}", response.status);
    assert_eq!(app.engine.registry().session_count("chat"), 0);
}

#[tokio::test]
async fn test_tag_bound_after_start_is_served() {
    let app = TestApp::new();
    assert_eq!(app.get("/late").await.status, StatusCode::NOT_FOUND);

    app.bind("late", None);

    assert_eq!(app.get("/late").await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_stats_reports_tags_and_metrics() {
    let app = TestApp::new();
    let (listener, _) = helpers::recording_listener();
    app.bind("chat", Some(listener));
    app.bind("news", None);

    let response = app.get("/_relay/stats").await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    let tags = body["tags"].as_array().unwrap();
    assert_eq!(tags.len(), 2);
    assert_eq!(tags[0]["tag"], "chat");
    assert_eq!(tags[0]["listeners"], 1);
    assert_eq!(tags[1]["tag"], "news");
    assert_eq!(tags[1]["listeners"], 0);
    assert_eq!(body["metrics"]["sessions_active"], 0);
}

use indoc::indoc;
use integration_tests::TestServer;

#[tokio::test]
async fn health_endpoint_enabled() {
    let server = TestServer::start("").await;

    let response = server.client.get("/health").await;
    assert_eq!(response.status(), 200);

    let body = response.text().await.unwrap();
    insta::assert_snapshot!(body, @r#"{"status":"healthy"}"#);
}

#[tokio::test]
async fn health_endpoint_custom_path() {
    let config = indoc! {r#"
        [server.health]
        path = "/status"
    "#};

    let server = TestServer::start(config).await;

    assert_eq!(server.client.get("/status").await.status(), 200);
    assert_eq!(server.client.get("/health").await.status(), 404);
}

#[tokio::test]
async fn health_endpoint_disabled() {
    let config = indoc! {r#"
        [server.health]
        enabled = false
    "#};

    let server = TestServer::start(config).await;

    assert_eq!(server.client.get("/health").await.status(), 404);
}

#[tokio::test]
async fn health_is_not_rate_limited_or_logged() {
    let config = indoc! {r#"
        [server.rate_limits]
        max_events = 1
        methods = ["GET"]
    "#};

    let server = TestServer::start(config).await;

    for _ in 0..3 {
        assert_eq!(server.client.get("/health").await.status(), 200);
    }

    assert_eq!(server.request_log(), "");
}

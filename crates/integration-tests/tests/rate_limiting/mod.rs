use indoc::indoc;
use integration_tests::TestServer;
use serde_json::json;

#[tokio::test]
async fn writes_are_limited_per_client() {
    // Default limits: five POST requests per minute.
    let server = TestServer::start("").await;

    for i in 0..5 {
        server.create_user(&format!("user{i}"), "member").await;
    }

    let response = server.client.post("/users", &json!({ "username": "user5" })).await;
    assert_eq!(response.status(), 429);

    let retry_after: u64 = response.headers()["retry-after"].to_str().unwrap().parse().unwrap();
    assert!((1..=60).contains(&retry_after), "retry-after {retry_after}");

    assert_eq!(response.text().await.unwrap(), "Too many requests");
}

#[tokio::test]
async fn reads_are_not_limited() {
    let server = TestServer::start("").await;
    let alice = TestServer::id(&server.create_user("alice", "member").await);

    let client = server.client.as_user(&alice);

    for _ in 0..10 {
        assert_eq!(client.get("/conversations").await.status(), 200);
    }
}

#[tokio::test]
async fn limited_methods_are_configurable() {
    let config = indoc! {r#"
        [server.rate_limits]
        max_events = 2
        methods = ["GET"]
    "#};

    let server = TestServer::start(config).await;

    for i in 0..3 {
        server.create_user(&format!("user{i}"), "member").await;
    }

    assert_eq!(server.client.get("/conversations").await.status(), 401);
    assert_eq!(server.client.get("/conversations").await.status(), 401);
    assert_eq!(server.client.get("/conversations").await.status(), 429);
}

#[tokio::test]
async fn disabled_rate_limiting() {
    let config = indoc! {r#"
        [server.rate_limits]
        enabled = false
    "#};

    let server = TestServer::start(config).await;

    for i in 0..8 {
        server.create_user(&format!("user{i}"), "member").await;
    }
}

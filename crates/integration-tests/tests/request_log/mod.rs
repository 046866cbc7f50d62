use indoc::indoc;
use integration_tests::TestServer;
use serde_json::json;

#[tokio::test]
async fn requests_are_appended_to_the_log() {
    let server = TestServer::start("").await;
    let alice = TestServer::id(&server.create_user("alice", "member").await);

    server.client.as_user(&alice).get("/conversations").await;

    let log = server.request_log();
    let lines: Vec<_> = log.lines().collect();

    assert_eq!(lines.len(), 2, "{log}");
    assert!(lines[0].ends_with(" - User: Anonymous - Path: /users"), "{}", lines[0]);
    assert!(
        lines[1].ends_with(&format!(" - User: {alice} - Path: /conversations")),
        "{}",
        lines[1]
    );
}

#[tokio::test]
async fn rejected_requests_are_logged() {
    let config = indoc! {r#"
        [server.rate_limits]
        max_events = 1
    "#};

    let server = TestServer::start(config).await;

    server.create_user("alice", "member").await;

    let response = server.client.post("/users", &json!({ "username": "bob" })).await;
    assert_eq!(response.status(), 429);

    let log = server.request_log();
    assert_eq!(log.lines().count(), 2, "{log}");
}

#[tokio::test]
async fn custom_log_file() {
    let dir = tempfile::tempdir().unwrap();

    let config = format!(
        indoc! {r#"
            [server.request_log]
            base_dir = "{}"
            file_name = "access.log"
        "#},
        dir.path().display()
    );

    let server = TestServer::start(&config).await;
    server.client.get("/conversations").await;

    let log = std::fs::read_to_string(dir.path().join("access.log")).unwrap();
    assert!(log.ends_with(" - User: Anonymous - Path: /conversations\n"), "{log}");
}

#[tokio::test]
async fn disabled_request_log() {
    let config = indoc! {r#"
        [server.request_log]
        enabled = false
    "#};

    let server = TestServer::start(config).await;
    server.create_user("alice", "member").await;

    assert_eq!(server.request_log(), "");
}

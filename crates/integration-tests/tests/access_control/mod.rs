use indoc::{formatdoc, indoc};
use integration_tests::TestServer;
use jiff::Zoned;
use serde_json::{Value, json};

const ROLES: &str = indoc! {r#"
    [server.rate_limits]
    enabled = false

    [server.roles]
    protected_paths = ["/users/"]
    allowed_roles = ["admin"]
"#};

#[tokio::test]
async fn protected_paths_require_an_allowed_role() {
    let server = TestServer::start(ROLES).await;

    let admin = TestServer::id(&server.create_user("admin", "admin").await);
    let member = TestServer::id(&server.create_user("member", "member").await);

    // Deleting oneself is normally allowed, but the path is protected.
    let response = server.client.as_user(&member).delete(&format!("/users/{member}")).await;
    assert_eq!(response.status(), 403);

    let body: Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "error": {
        "code": 403,
        "message": "Forbidden: your role may not access this resource",
        "type": "permission_error"
      }
    }
    "#);

    let response = server.client.as_user(&admin).delete(&format!("/users/{member}")).await;
    assert_eq!(response.status(), 204);

    // Paths outside the protected prefix stay open.
    let response = server.client.as_user(&admin).get("/users?username=admin").await;
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn privileged_roles_cannot_be_self_assigned() {
    let server = TestServer::start(ROLES).await;

    // The first user bootstraps the deployment.
    let admin = TestServer::id(&server.create_user("admin", "admin").await);
    let victim = TestServer::id(&server.create_user("victim", "member").await);

    let response = server
        .client
        .post("/users", &json!({ "username": "mallory", "role": "admin" }))
        .await;
    assert_eq!(response.status(), 403);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Forbidden: only admins can grant the admin role");

    // Registering as a member works, but that identity stays out of protected paths.
    let mallory = TestServer::id(&server.create_user("mallory", "member").await);

    let response = server.client.as_user(&mallory).delete(&format!("/users/{victim}")).await;
    assert_eq!(response.status(), 403);

    // An admin may hand out roles.
    let response = server
        .client
        .as_user(&admin)
        .post("/users", json!({ "username": "moderator", "role": "moderator" }))
        .await;
    assert_eq!(response.status(), 201);

    let moderator: Value = response.json().await.unwrap();
    assert_eq!(moderator["role"], "moderator");
}

#[tokio::test]
async fn requests_outside_access_hours_are_refused() {
    let hour = Zoned::now().hour();
    let (start, end) = if hour < 23 { (hour + 1, 24) } else { (0, 23) };

    let config = formatdoc! {r#"
        [server.access_hours]
        start_hour = {start}
        end_hour = {end}
    "#};

    let server = TestServer::start(&config).await;

    let response = server.client.get("/conversations").await;
    assert_eq!(response.status(), 403);

    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error"]["message"],
        format!("Forbidden: access is only allowed between {start:02}:00 and {end:02}:00")
    );

    // Health stays reachable.
    assert_eq!(server.client.get("/health").await.status(), 200);
}

#[tokio::test]
async fn requests_inside_access_hours_pass() {
    let config = indoc! {r#"
        [server.access_hours]
        start_hour = 0
        end_hour = 24
    "#};

    let server = TestServer::start(config).await;

    server.create_user("alice", "member").await;
}

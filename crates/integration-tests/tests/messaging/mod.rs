use indoc::indoc;
use integration_tests::TestServer;
use serde_json::{Value, json};

const CONFIG: &str = indoc! {r#"
    [server.rate_limits]
    enabled = false
"#};

struct Chat {
    server: TestServer,
    alice: String,
    bob: String,
    conversation: String,
}

async fn chat() -> Chat {
    let server = TestServer::start(CONFIG).await;

    let alice = TestServer::id(&server.create_user("alice", "member").await);
    let bob = TestServer::id(&server.create_user("bob", "member").await);

    let response = server
        .client
        .as_user(&alice)
        .post("/conversations", json!({ "participants": [bob] }))
        .await;
    assert_eq!(response.status(), 201);

    let conversation: Value = response.json().await.unwrap();
    let conversation = TestServer::id(&conversation);

    Chat {
        server,
        alice,
        bob,
        conversation,
    }
}

impl Chat {
    async fn send(&self, from: &str, to: &str, content: &str, parent: Option<&str>) -> Value {
        let response = self
            .server
            .client
            .as_user(from)
            .post(
                &format!("/conversations/{}/messages", self.conversation),
                json!({ "receiver": to, "content": content, "parent_id": parent }),
            )
            .await;

        assert_eq!(response.status(), 201);

        response.json().await.unwrap()
    }
}

#[tokio::test]
async fn send_message_notifies_receiver() {
    let chat = chat().await;

    let message = chat.send(&chat.alice, &chat.bob, "Hi Bob", None).await;

    insta::assert_json_snapshot!(message, {
        ".id" => "[id]",
        ".conversation_id" => "[conversation]",
        ".sender" => "[alice]",
        ".receiver" => "[bob]",
        ".created_at" => "[timestamp]",
    }, @r#"
    {
      "content": "Hi Bob",
      "conversation_id": "[conversation]",
      "created_at": "[timestamp]",
      "edited": false,
      "id": "[id]",
      "parent_id": null,
      "read": false,
      "receiver": "[bob]",
      "sender": "[alice]"
    }
    "#);

    let notifications: Vec<Value> = chat
        .server
        .client
        .as_user(&chat.bob)
        .get("/notifications")
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0]["message_id"], message["id"]);
    assert_eq!(notifications[0]["read"], false);

    let theirs: Vec<Value> = chat
        .server
        .client
        .as_user(&chat.alice)
        .get("/notifications")
        .await
        .json()
        .await
        .unwrap();

    assert!(theirs.is_empty());
}

#[tokio::test]
async fn edit_records_history() {
    let chat = chat().await;
    let message = chat.send(&chat.alice, &chat.bob, "Hi Bbo", None).await;
    let id = message["id"].as_str().unwrap();

    let response = chat
        .server
        .client
        .as_user(&chat.alice)
        .patch(&format!("/messages/{id}"), json!({ "content": "Hi Bob" }))
        .await;
    assert_eq!(response.status(), 200);

    let edited: Value = response.json().await.unwrap();
    assert_eq!(edited["content"], "Hi Bob");
    assert_eq!(edited["edited"], true);

    let history: Vec<Value> = chat
        .server
        .client
        .as_user(&chat.bob)
        .get(&format!("/messages/{id}/history"))
        .await
        .json()
        .await
        .unwrap();

    insta::assert_json_snapshot!(history, {
        "[].id" => "[id]",
        "[].message_id" => "[message]",
        "[].edited_at" => "[timestamp]",
        "[].edited_by" => "[alice]",
    }, @r#"
    [
      {
        "edited_at": "[timestamp]",
        "edited_by": "[alice]",
        "id": "[id]",
        "message_id": "[message]",
        "old_content": "Hi Bbo"
      }
    ]
    "#);
    assert_eq!(history[0]["edited_by"].as_str(), Some(chat.alice.as_str()));
}

#[tokio::test]
async fn only_the_sender_may_edit() {
    let chat = chat().await;
    let message = chat.send(&chat.alice, &chat.bob, "mine", None).await;
    let id = message["id"].as_str().unwrap();

    let response = chat
        .server
        .client
        .as_user(&chat.bob)
        .patch(&format!("/messages/{id}"), json!({ "content": "ours" }))
        .await;

    assert_eq!(response.status(), 403);

    let body: Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "error": {
        "code": 403,
        "message": "Forbidden: only the sender can edit a message",
        "type": "permission_error"
      }
    }
    "#);
}

#[tokio::test]
async fn unread_messages_and_mark_read() {
    let chat = chat().await;
    let first = chat.send(&chat.alice, &chat.bob, "one", None).await;
    chat.send(&chat.alice, &chat.bob, "two", None).await;

    let bob = chat.server.client.as_user(&chat.bob);

    let unread: Vec<Value> = bob.get("/messages/unread").await.json().await.unwrap();
    assert_eq!(unread.len(), 2);

    let id = first["id"].as_str().unwrap();
    let response = bob.post(&format!("/messages/{id}/read"), json!({})).await;
    assert_eq!(response.status(), 200);

    let unread: Vec<Value> = bob.get("/messages/unread").await.json().await.unwrap();
    let contents: Vec<_> = unread.iter().map(|message| message["content"].clone()).collect();
    assert_eq!(contents, [json!("two")]);

    // Only the receiver marks read.
    let response = chat
        .server
        .client
        .as_user(&chat.alice)
        .post(&format!("/messages/{id}/read"), json!({}))
        .await;
    assert_eq!(response.status(), 403);
}

#[tokio::test]
async fn threads_and_listing() {
    let chat = chat().await;

    let root = chat.send(&chat.alice, &chat.bob, "root", None).await;
    let root_id = root["id"].as_str().unwrap();

    let reply = chat.send(&chat.bob, &chat.alice, "reply", Some(root_id)).await;
    chat.send(&chat.alice, &chat.bob, "nested", reply["id"].as_str()).await;

    let alice = chat.server.client.as_user(&chat.alice);

    let thread: Value = alice
        .get(&format!("/messages/{root_id}/thread"))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(thread["message"]["content"], "root");
    assert_eq!(thread["replies"][0]["message"]["content"], "reply");
    assert_eq!(thread["replies"][0]["replies"][0]["message"]["content"], "nested");

    let page: Value = alice
        .get(&format!("/conversations/{}/messages", chat.conversation))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(page["total"], 3);
    assert_eq!(page["per_page"], 20);
    assert_eq!(page["items"][0]["content"], "nested");
    assert_eq!(page["items"][2]["content"], "root");

    let filtered: Value = alice
        .get(&format!("/messages?participant={}&page=1", chat.bob))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(filtered["total"], 3);
}

#[tokio::test]
async fn listing_is_paged() {
    let chat = chat().await;

    for i in 0..25 {
        chat.send(&chat.alice, &chat.bob, &format!("message {i}"), None).await;
    }

    let bob = chat.server.client.as_user(&chat.bob);
    let path = format!("/conversations/{}/messages", chat.conversation);

    let first: Value = bob.get(&path).await.json().await.unwrap();
    assert_eq!(first["items"].as_array().unwrap().len(), 20);
    assert_eq!(first["items"][0]["content"], "message 24");

    let second: Value = bob.get(&format!("{path}?page=2")).await.json().await.unwrap();
    assert_eq!(second["items"].as_array().unwrap().len(), 5);
    assert_eq!(second["items"][4]["content"], "message 0");
}

#[tokio::test]
async fn outsiders_are_refused() {
    let chat = chat().await;
    let carol = TestServer::id(&chat.server.create_user("carol", "member").await);

    let response = chat
        .server
        .client
        .as_user(&carol)
        .get(&format!("/conversations/{}/messages", chat.conversation))
        .await;
    assert_eq!(response.status(), 403);

    let response = chat
        .server
        .client
        .as_user(&chat.alice)
        .post(
            &format!("/conversations/{}/messages", chat.conversation),
            json!({ "receiver": carol, "content": "psst" }),
        )
        .await;
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn missing_identity_is_unauthorized() {
    let server = TestServer::start(CONFIG).await;

    let response = server.client.get("/conversations").await;
    assert_eq!(response.status(), 401);

    let body: Value = response.json().await.unwrap();

    insta::assert_json_snapshot!(body, @r#"
    {
      "error": {
        "code": 401,
        "message": "Missing or invalid 'x-user-id' header",
        "type": "authentication_error"
      }
    }
    "#);
}

#[tokio::test]
async fn unknown_message_is_not_found() {
    let chat = chat().await;
    let id = uuid::Uuid::new_v4();

    let response = chat
        .server
        .client
        .as_user(&chat.alice)
        .get(&format!("/messages/{id}"))
        .await;

    assert_eq!(response.status(), 404);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["message"], format!("Message '{id}' not found"));
    assert_eq!(body["error"]["type"], "not_found_error");
}

#[tokio::test]
async fn user_lookup_and_deletion() {
    let chat = chat().await;
    chat.send(&chat.alice, &chat.bob, "bye", None).await;

    let alice = chat.server.client.as_user(&chat.alice);

    let found: Value = alice.get("/users?username=bob").await.json().await.unwrap();
    assert_eq!(found["id"].as_str(), Some(chat.bob.as_str()));

    // Deleting someone else needs the admin role.
    let response = alice.delete(&format!("/users/{}", chat.bob)).await;
    assert_eq!(response.status(), 403);

    let response = chat
        .server
        .client
        .as_user(&chat.bob)
        .delete(&format!("/users/{}", chat.bob))
        .await;
    assert_eq!(response.status(), 204);

    assert_eq!(alice.get("/users?username=bob").await.status(), 404);

    let page: Value = alice
        .get(&format!("/conversations/{}/messages", chat.conversation))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 0);
}

#[tokio::test]
async fn invalid_users_are_rejected() {
    let server = TestServer::start(CONFIG).await;

    let response = server.client.post("/users", &json!({ "username": "  " })).await;
    assert_eq!(response.status(), 400);

    server.create_user("alice", "admin").await;

    let response = server.client.post("/users", &json!({ "username": "alice" })).await;
    assert_eq!(response.status(), 400);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Invalid request: username 'alice' is taken");
}

use std::fmt::Display;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::Config;
use reqwest::Method;
use serde_json::{Value, json};
use server::ServeConfig;
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::time::timeout;

/// Header carrying the acting user, as configured by default.
pub const IDENTITY_HEADER: &str = "x-user-id";

/// Test client for making HTTP requests to the test server
pub struct TestClient {
    base_url: String,
    client: reqwest::Client,
}

impl TestClient {
    /// Create a new test client for the given base URL
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Start building a request to the given path
    pub fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client.request(method, format!("{}{}", self.base_url, path))
    }

    /// Send a GET request to the given path
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.request(Method::GET, path).send().await.unwrap()
    }

    /// Send a POST request to the given path with JSON body
    pub async fn post<T: serde::Serialize>(&self, path: &str, body: &T) -> reqwest::Response {
        self.request(Method::POST, path).json(body).send().await.unwrap()
    }

    /// A client acting as `user`
    pub fn as_user(&self, user: impl Display) -> UserClient<'_> {
        UserClient {
            client: self,
            user: user.to_string(),
        }
    }
}

/// Sends every request with the identity header set.
pub struct UserClient<'a> {
    client: &'a TestClient,
    user: String,
}

impl UserClient<'_> {
    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, path)
            .header(IDENTITY_HEADER, self.user.as_str())
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.request(Method::GET, path).send().await.unwrap()
    }

    pub async fn post(&self, path: &str, body: Value) -> reqwest::Response {
        self.request(Method::POST, path).json(&body).send().await.unwrap()
    }

    pub async fn patch(&self, path: &str, body: Value) -> reqwest::Response {
        self.request(Method::PATCH, path).json(&body).send().await.unwrap()
    }

    pub async fn delete(&self, path: &str) -> reqwest::Response {
        self.request(Method::DELETE, path).send().await.unwrap()
    }
}

/// Test server that manages the lifecycle of a server instance
pub struct TestServer {
    pub client: TestClient,
    pub address: SocketAddr,
    request_log: PathBuf,
    _log_dir: TempDir,
    _handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a new test server with the given TOML configuration.
    ///
    /// A request log left at its default location is moved to a temporary directory.
    pub async fn start(config_toml: &str) -> Self {
        let mut config: Config = toml::from_str(config_toml).unwrap();
        config.validate().unwrap();

        let log_dir = tempfile::tempdir().unwrap();

        if config.server.request_log.base_dir == Path::new(".") {
            config.server.request_log.base_dir = log_dir.path().to_path_buf();
        }

        let request_log = config.server.request_log.path();
        let health_path = config.server.health.path.to_string();

        // Find an available port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let serve_config = ServeConfig {
            listen_address: address,
            config,
        };

        // Start the server in a background task
        let (tx, mut rx) = tokio::sync::oneshot::channel();
        let handle = tokio::spawn(async move {
            // Drop the listener so the server can bind to the address
            drop(listener);

            let _ = tx.send(server::serve(serve_config).await);
        });

        // Wait for the server to start up or fail
        tokio::time::sleep(Duration::from_millis(50)).await;

        if let Ok(Err(e)) = rx.try_recv() {
            eprintln!("Server failed to start: {e}");
            std::process::exit(1);
        }

        let client = TestClient::new(format!("http://{address}"));

        // Verify the server is actually running by making a simple request
        let mut retries = 10;
        while retries > 0 {
            if timeout(Duration::from_millis(100), client.request(Method::GET, &health_path).send())
                .await
                .is_ok_and(|response| response.is_ok())
            {
                break;
            }

            retries -= 1;
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        TestServer {
            client,
            address,
            request_log,
            _log_dir: log_dir,
            _handle: handle,
        }
    }

    /// Registers a user and returns its JSON representation.
    pub async fn create_user(&self, username: &str, role: &str) -> Value {
        let response = self
            .client
            .post("/users", &json!({ "username": username, "role": role }))
            .await;

        assert_eq!(response.status(), 201, "creating user {username}");

        response.json().await.unwrap()
    }

    /// Id of a user returned by [`TestServer::create_user`].
    pub fn id(value: &Value) -> String {
        value["id"].as_str().unwrap().to_string()
    }

    /// Contents of the request log, empty if nothing was logged.
    pub fn request_log(&self) -> String {
        std::fs::read_to_string(&self.request_log).unwrap_or_default()
    }
}

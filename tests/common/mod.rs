#![allow(dead_code)]

use std::net::SocketAddr;

use reqwest::{Client, Response};
use serde_json::{json, Value};
use tempfile::TempDir;

use foodapi::config::Config;
use foodapi::db;
use foodapi::state::AppState;

pub const PASSWORD: &str = "correct-horse-battery";

/// A running server on an ephemeral port, backed by a throwaway database.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub client: Client,
    _dir: TempDir,
}

impl TestServer {
    pub async fn start() -> Self {
        let dir = TempDir::new().unwrap();

        let mut config = Config::default();
        config.server.host = "127.0.0.1".to_string();
        config.database.path = Some(dir.path().join("test.db"));
        config.auth.secret = Some("integration-test-secret".to_string());
        config.auth.bcrypt_cost = 4;

        let pool = db::create_pool(&config.db_path()).unwrap();
        db::run_migrations(&pool).unwrap();
        let state = AppState::new(pool, config);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = foodapi::app(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            state,
            client: Client::new(),
            _dir: dir,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn post(&self, path: &str, body: Value) -> Response {
        self.client.post(self.url(path)).json(&body).send().await.unwrap()
    }

    /// Register `username` and return its (access, refresh) token pair.
    pub async fn login(&self, username: &str) -> (String, String) {
        let response = self
            .post(
                "/register/",
                json!({
                    "username": username,
                    "password": PASSWORD,
                    "password2": PASSWORD,
                }),
            )
            .await;
        assert_eq!(response.status(), 201, "register {username}");

        let tokens: Value = self
            .post(
                "/token/",
                json!({ "username": username, "password": PASSWORD }),
            )
            .await
            .json()
            .await
            .unwrap();
        (
            tokens["access"].as_str().unwrap().to_string(),
            tokens["refresh"].as_str().unwrap().to_string(),
        )
    }

    pub fn user_id(&self, username: &str) -> i64 {
        let conn = self.state.db.get().unwrap();
        conn.query_row(
            "SELECT id FROM users WHERE username = ?1",
            [username],
            |row| row.get(0),
        )
        .unwrap()
    }

    pub async fn get_as(&self, token: &str, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    pub async fn post_as(&self, token: &str, path: &str, body: Value) -> Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn put_as(&self, token: &str, path: &str, body: Value) -> Response {
        self.client
            .put(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn patch_as(&self, token: &str, path: &str, body: Value) -> Response {
        self.client
            .patch(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn delete_as(&self, token: &str, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    /// Create a record through the API and return its body.
    pub async fn create(&self, token: &str, path: &str, body: Value) -> Value {
        let response = self.post_as(token, path, body).await;
        assert_eq!(response.status(), 201, "create at {path}");
        response.json().await.unwrap()
    }
}

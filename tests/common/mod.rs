#![allow(dead_code)]

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use doka_api::config::AppConfig;
use doka_api::server;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "admin-password";

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Boots the API in-process over the memory store, with a seeded admin
    pub async fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let config = AppConfig::from_vars(|key| {
            let value = match key {
                "DB_DRIVER" => "memory".to_string(),
                "APP_HOST" => "127.0.0.1".to_string(),
                "APP_PORT" => port.to_string(),
                "API_SECRET" => "integration-secret".to_string(),
                "BCRYPT_COST" => "4".to_string(),
                "USER_NAME" => "admin".to_string(),
                "USER_MAIL" => ADMIN_EMAIL.to_string(),
                "USER_PASS" => ADMIN_PASSWORD.to_string(),
                _ => return None,
            };
            Some(value)
        })?;

        let listener = TcpListener::bind(config.bind_addr()).await?;
        let state = server::build_state(config).await?;
        tokio::spawn(server::serve(listener, state));

        let server = Self {
            port,
            base_url: format!("http://127.0.0.1:{}", port),
            client: reqwest::Client::new(),
        };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        let res = self
            .client
            .post(self.url("/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());

        let body = res.json::<Value>().await?;
        body["token"]
            .as_str()
            .map(str::to_string)
            .context("login response without token")
    }

    pub async fn admin_token(&self) -> Result<String> {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await
    }

    /// Has the admin create a member account, then logs in as it
    pub async fn register(&self, nickname: &str) -> Result<(i64, String)> {
        let admin = self.admin_token().await?;
        let email = format!("{}@example.com", nickname);
        let password = format!("{}-password", nickname);

        let res = self
            .client
            .post(self.url("/user"))
            .bearer_auth(&admin)
            .json(&json!({ "nickname": nickname, "email": email, "password": password }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "user create failed: {}", res.status());

        let user = res.json::<Value>().await?;
        let id = user["id"].as_i64().context("created user without id")?;
        let token = self.login(&email, &password).await?;
        Ok((id, token))
    }
}

#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

pub const ADMIN_USERNAME: &str = "test-admin";
pub const ADMIN_EMAIL: &str = "admin@climbassist.test";
pub const ADMIN_PASSWORD: &str = "admin-password";

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // In-memory storage keeps every test binary on a fresh, database-free server
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_climbassist-api"));
        cmd.arg("serve")
            .env("APP_ENV", "development")
            .env("CLIMB_STORAGE", "memory")
            .env("CLIMB_API_PORT", port.to_string())
            .env("SECURITY_JWT_SECRET", "integration-test-secret")
            .env("SECURITY_SECURE_COOKIES", "false")
            .env("RESOURCE_MAX_DEPTH", "10")
            .env(
                "CLIMB_BOOTSTRAP_ADMIN",
                format!("{}:{}:{}", ADMIN_USERNAME, ADMIN_EMAIL, ADMIN_PASSWORD),
            )
            .env("RUST_LOG", "warn")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// A client that keeps the session cookies the server sets
pub fn session_client() -> Result<Client> {
    Ok(Client::builder().cookie_store(true).build()?)
}

/// Lowercase suffix that keeps names unique across tests sharing one server
pub fn unique(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("{}-{}", prefix, nanos % 1_000_000_000_000)
}

pub async fn sign_in(server: &TestServer, client: &Client, username: &str, password: &str) -> Result<()> {
    let res = client
        .post(server.url("/v1/user/sign-in"))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "sign-in failed: {}", res.status());
    Ok(())
}

pub async fn admin_client(server: &TestServer) -> Result<Client> {
    let client = session_client()?;
    sign_in(server, &client, ADMIN_USERNAME, ADMIN_PASSWORD).await?;
    Ok(client)
}

/// Register and sign in a fresh non-administrator
pub async fn user_client(server: &TestServer) -> Result<(Client, String)> {
    let username = unique("climber");
    let client = session_client()?;
    let res = client
        .post(server.url("/v1/user/register"))
        .json(&json!({
            "username": username,
            "email": format!("{}@climbassist.test", username),
            "password": "correct-horse"
        }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "register failed: {}", res.status());
    sign_in(server, &client, &username, "correct-horse").await?;
    Ok((client, username))
}

/// POST a new resource as an administrator and return its generated id
pub async fn create(server: &TestServer, client: &Client, collection: &str, body: Value) -> Result<String> {
    let res = client.post(server.url(&format!("/v1/{}", collection))).json(&body).send().await?;
    let status = res.status();
    let body: Value = res.json().await?;
    anyhow::ensure!(status == StatusCode::CREATED, "create {} failed: {} {}", collection, status, body);

    let id = body["data"]
        .as_object()
        .and_then(|data| data.values().next())
        .and_then(Value::as_str)
        .context("missing id in create response")?;
    Ok(id.to_string())
}

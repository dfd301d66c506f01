use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::StatusCode;

static SERVER: OnceLock<TestServer> = OnceLock::new();

/// Signing secret pinned for the spawned server so tests can mint their
/// own bearer tokens deterministically.
pub const JWT_SECRET: &str = "integration-test-secret";

/// Integration tests run the built binary against a live Postgres and are
/// opt-in: set FORMBUILDER_LIVE_TESTS=1 (plus DATABASE_URL) to enable them.
/// Without the flag every test returns early and reports nothing.
pub fn live_tests_enabled() -> bool {
    std::env::var("FORMBUILDER_LIVE_TESTS").as_deref() == Ok("1")
}

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    #[allow(dead_code)]
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Spawn the already-built binary to keep start fast during tests
        let mut cmd = Command::new("target/debug/formbuilder-api");
        cmd.env("PORT", port.to_string())
            .env("JWT_SECRET", JWT_SECRET)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Inherit environment so the server sees DATABASE_URL from .env
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
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
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// Insert (or refresh) a user row directly so a minted token's subject
/// satisfies the ownership foreign keys. Returns the user's id.
#[allow(dead_code)]
pub async fn seed_user(username: &str) -> Result<uuid::Uuid> {
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL required for live tests")?;
    let pool = sqlx::PgPool::connect(&url).await?;
    let (id,): (uuid::Uuid,) = sqlx::query_as(
        "INSERT INTO users (username, email) VALUES ($1, $2)
         ON CONFLICT (username) DO UPDATE SET email = EXCLUDED.email
         RETURNING id",
    )
    .bind(username)
    .bind(format!("{}@example.com", username))
    .fetch_one(&pool)
    .await?;
    Ok(id)
}

/// Mint a bearer token the spawned server will accept for `user_id`
#[allow(dead_code)]
pub fn bearer_token(user_id: uuid::Uuid, username: &str) -> Result<String> {
    let claims = formbuilder_api::auth::Claims::new(user_id, username.to_string(), 1);
    formbuilder_api::auth::encode_token(&claims, JWT_SECRET).map_err(|e| anyhow::anyhow!(e))
}

/// Unique suffix for slugs so repeated test runs do not collide
pub fn unique_suffix() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{:x}", nanos)
}

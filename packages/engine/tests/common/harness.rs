//! Test harness with testcontainers for integration testing.
//!
//! Uses a shared Postgres container across all tests for dramatically
//! improved performance. Each test gets its own database inside the
//! shared container: the matchmaker scans the whole queue, so tests
//! running in parallel must not see each other's entries.

use anyhow::{Context, Result};
use sqlx::PgPool;
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

use engine_core::{Engine, EngineConfig};

/// Shared test infrastructure that persists across all tests.
struct SharedTestInfra {
    db_url: String,
    // Keep the container alive for the entire test run
    _postgres: Option<ContainerAsync<Postgres>>,
}

/// Global shared infrastructure - initialized once, reused by all tests.
static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Respect RUST_LOG; try_init avoids panicking when already set up.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        // Allow pointing tests at an externally managed Postgres (e.g. in
        // environments without a Docker daemon).
        if let Ok(db_url) = std::env::var("DATABASE_URL") {
            return Ok(Self {
                db_url,
                _postgres: None,
            });
        }

        let postgres = Postgres::default()
            .with_tag("16")
            .with_cmd(["-c", "max_connections=200"])
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        Ok(Self {
            db_url,
            _postgres: Some(postgres),
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// Test harness handing each test an engine over the shared database.
///
/// # Example
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let outcome = ctx.engine.enqueue(user, mode, criteria).await.unwrap();
/// }
/// ```
pub struct TestHarness {
    /// The engine under test.
    pub engine: Engine,
    /// Database pool - use this for test fixtures.
    pub db_pool: PgPool,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        let infra = SharedTestInfra::get().await;

        // Fresh database per test, migrated from scratch.
        let db_name = format!("test_{}", uuid::Uuid::new_v4().simple());
        let admin_pool = PgPool::connect(&infra.db_url)
            .await
            .expect("Failed to connect admin pool");
        sqlx::query(&format!(r#"CREATE DATABASE "{db_name}""#))
            .execute(&admin_pool)
            .await
            .expect("Failed to create test database");
        admin_pool.close().await;

        let test_db_url = infra
            .db_url
            .rsplit_once('/')
            .map(|(base, _)| format!("{base}/{db_name}"))
            .expect("malformed database url");
        let db_pool = PgPool::connect(&test_db_url)
            .await
            .expect("Failed to connect test pool");

        sqlx::migrate!("./migrations")
            .run(&db_pool)
            .await
            .expect("Failed to run migrations");

        let config = EngineConfig {
            // Keep pairing retries snappy in tests
            match_retries: 3,
            ..EngineConfig::default()
        };

        Self {
            engine: Engine::new(db_pool.clone(), config),
            db_pool,
        }
    }

    async fn teardown(self) {
        self.db_pool.close().await;
    }
}

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

const CONNECT_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Creates and returns a PostgreSQL connection pool, retrying the initial
/// connection a few times so the service survives a database that is still
/// starting up.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let mut attempt = 1;
    let pool = loop {
        match PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .connect(database_url)
            .await
        {
            Ok(pool) => break pool,
            Err(e) if attempt < CONNECT_ATTEMPTS => {
                warn!("PostgreSQL connection attempt {attempt}/{CONNECT_ATTEMPTS} failed: {e}");
                tokio::time::sleep(RETRY_DELAY).await;
                attempt += 1;
            }
            Err(e) => return Err(e).context("Could not connect to PostgreSQL"),
        }
    };

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Applies the embedded SQL migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to apply database migrations")?;
    info!("Database migrations applied");
    Ok(())
}

/// Round-trips a trivial query.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await.map(|_| ())
}

/// Pings the database up to `attempts` times, sleeping between failures.
/// Returns whether any attempt succeeded.
pub async fn ping_with_retries(pool: &PgPool, attempts: u32) -> bool {
    for attempt in 1..=attempts {
        match ping(pool).await {
            Ok(()) => return true,
            Err(e) => {
                warn!("DB check failed (attempt {attempt}/{attempts}): {e}");
                if attempt < attempts {
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }
    false
}

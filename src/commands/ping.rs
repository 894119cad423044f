//! Ping command - Database connectivity check.

use crate::config::Config;
use crate::errors::RepoResult;
use crate::infra::Database;

/// Execute the ping command
pub async fn execute(config: Config) -> RepoResult<()> {
    let db = Database::connect(&config).await?;
    db.ping().await?;

    tracing::info!("Database is reachable");
    println!("ok");
    Ok(())
}

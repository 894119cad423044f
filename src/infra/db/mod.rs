//! Database connection and initialization.

use std::time::Duration;

use sea_orm::{
    ConnectOptions, ConnectionTrait, Database as SeaDatabase, DatabaseConnection,
    EntityTrait, Schema, Statement,
};

use super::unit_of_work::Persistence;
use crate::config::Config;
use crate::errors::RepoResult;

/// Database wrapper for connection management
#[derive(Clone)]
pub struct Database {
    connection: DatabaseConnection,
}

impl Database {
    /// Open a connection pool described by `config`.
    ///
    /// An in-memory SQLite URL is limited to one pooled connection, since
    /// every further connection would see a different, empty database.
    pub async fn connect(config: &Config) -> RepoResult<Self> {
        let mut options = ConnectOptions::new(config.database_url.clone());

        let max_connections = if config.is_in_memory_sqlite() {
            1
        } else {
            config.max_connections
        };
        options
            .max_connections(max_connections)
            .min_connections(config.min_connections.min(max_connections))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .sqlx_logging(config.sqlx_logging);

        let connection = SeaDatabase::connect(options).await?;
        tracing::info!(
            backend = ?connection.get_database_backend(),
            max_connections,
            "Database connected"
        );

        Ok(Self { connection })
    }

    /// Wrap an existing connection.
    pub fn from_connection(connection: DatabaseConnection) -> Self {
        Self { connection }
    }

    /// Get a reference to the database connection.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    /// Get a clone of the database connection.
    pub fn get_connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }

    /// Start a new unit of work with its own session.
    pub fn unit_of_work(&self) -> Persistence {
        Persistence::new(self.get_connection())
    }

    /// Create the table backing `entity` if it does not exist yet.
    pub async fn create_table_for<E: EntityTrait>(&self, entity: E) -> RepoResult<()> {
        let backend = self.connection.get_database_backend();
        let schema = Schema::new(backend);
        let mut statement = schema.create_table_from_entity(entity);
        statement.if_not_exists();

        self.connection.execute(backend.build(&statement)).await?;
        tracing::debug!(table = entity.table_name(), "Table ensured");
        Ok(())
    }

    /// Check database connectivity by executing a simple query.
    pub async fn ping(&self) -> RepoResult<()> {
        self.connection
            .execute(Statement::from_string(
                self.connection.get_database_backend(),
                "SELECT 1".to_string(),
            ))
            .await?;
        Ok(())
    }
}

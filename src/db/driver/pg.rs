//! PostgreSQL driver.
use std::time::Duration;

use async_trait::async_trait;
use fieldx::fxstruct;
use sea_orm::ConnectOptions;
use sea_orm::ConnectionTrait;
use sea_orm::DatabaseConnection;
use tracing::error;

use crate::types::Result;

use super::DatabaseDriver;

#[derive(Debug)]
#[fxstruct(sync, no_new)]
pub struct Pg {
    connection: DatabaseConnection,
}

impl Pg {
    pub async fn connect(host: &str, port: u16, user: &str, password: &str, database: &str) -> Result<Self> {
        let schema = format!("postgres://{user}:{password}@{host}:{port}/{database}");
        let mut opts = ConnectOptions::new(&schema);
        opts.max_connections(10)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(20))
            .max_lifetime(Duration::from_secs(60))
            .test_before_acquire(true);

        let connection = sea_orm::Database::connect(opts)
            .await
            .inspect_err(|e| error!("Error connecting to database {host}:{port}/{database}: {e}"))?;

        Ok(Self { connection })
    }
}

#[async_trait]
impl DatabaseDriver for Pg {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    fn connection(&self) -> DatabaseConnection {
        self.connection.clone()
    }

    async fn configure(&self) -> Result<()> {
        self.connection
            .execute_unprepared("SET TIME ZONE 'UTC';")
            .await?;

        Ok(())
    }

    async fn checkpoint(&self) -> Result<()> {
        Ok(())
    }
}

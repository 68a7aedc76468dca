use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Executor};
use tracing::info;

use crate::script::StatementSink;
use crate::secrets::Credential;

pub const POSTGRES_PORT: u16 = 5432;

/// Opens a SQL connection as the given user.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        host: &str,
        database: &str,
        credential: &Credential,
    ) -> anyhow::Result<Box<dyn StatementSink>>;
}

#[derive(Default)]
pub struct PgConnector;

#[async_trait]
impl Connector for PgConnector {
    async fn connect(
        &self,
        host: &str,
        database: &str,
        credential: &Credential,
    ) -> anyhow::Result<Box<dyn StatementSink>> {
        let options = PgConnectOptions::new()
            .host(host)
            .port(POSTGRES_PORT)
            .username(&credential.username)
            .password(&credential.password)
            .database(database);

        info!("Connecting to {}:{}/{}", host, POSTGRES_PORT, database);
        let connection = PgConnection::connect_with(&options).await?;

        Ok(Box::new(PgSink {
            connection,
            in_transaction: false,
        }))
    }
}

/// Postgres connection that opens a transaction on the first statement after
/// each commit. Statements go over the simple query protocol, so one string may
/// hold several statements or a `DO` block.
pub struct PgSink {
    connection: PgConnection,
    in_transaction: bool,
}

#[async_trait]
impl StatementSink for PgSink {
    async fn execute(&mut self, sql: &str) -> anyhow::Result<()> {
        if !self.in_transaction {
            self.connection.execute(sqlx::raw_sql("BEGIN")).await?;
            self.in_transaction = true;
        }
        self.connection.execute(sqlx::raw_sql(sql)).await?;
        Ok(())
    }

    async fn commit(&mut self) -> anyhow::Result<()> {
        if self.in_transaction {
            self.connection.execute(sqlx::raw_sql("COMMIT")).await?;
            self.in_transaction = false;
        }
        Ok(())
    }
}

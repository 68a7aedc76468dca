//! Custom resource that prepares a freshly created RDS database: schema,
//! sample data for the monolith, and the application's login role.

mod hot_pool;
mod postgres;
mod script;
mod secrets;

pub use hot_pool::{DynamoHotPool, HotPoolEntry, HotPoolRegistry};
pub use postgres::{Connector, PgConnector, PgSink, POSTGRES_PORT};
pub use script::{
    split_dollar_quoted, split_statements, ScriptRunner, StatementSink, BOOTSTRAP_POOL_SQL,
    BOOTSTRAP_SQL, DATA_SQL, MAX_SQL_BATCH_SIZE, USER_SQL,
};
pub use secrets::{Credential, CredentialSource, SecretsManagerCredentials};

use anyhow::{anyhow, bail, Context as _};
use bon::Builder;
use lambda_runtime::{Error, LambdaEvent};
use onboarding_common::custom_resource::complete;
use onboarding_common::{required, CustomResourceEvent, RequestKind, Responder, ResponseData};
use serde::Deserialize;
use tracing::info;

/// Tenant id of the single-tenant lab database, which also gets sample data.
pub const MONOLITH_TENANT: &str = "MONOLITH";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Bootstrap,
    BootstrapPool,
    AddUser,
}

impl Action {
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            "BOOTSTRAP" => Some(Self::Bootstrap),
            "BOOTSTRAP_POOL" => Some(Self::BootstrapPool),
            "ADD_USER" => Some(Self::AddUser),
            _ => None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct BootstrapProperties {
    pub action: Option<String>,
    pub super_user_credentials: Option<String>,
    pub app_user_credentials: Option<String>,
    pub host: Option<String>,
    pub database: Option<String>,
    pub instance_id: Option<String>,
    pub tenant_id: Option<String>,
}

impl BootstrapProperties {
    fn app_user_secret(&self) -> Option<&str> {
        self.app_user_credentials
            .as_deref()
            .filter(|secret| !secret.trim().is_empty())
    }

    fn is_monolith(&self) -> bool {
        self.tenant_id
            .as_deref()
            .is_some_and(|id| id.eq_ignore_ascii_case(MONOLITH_TENANT))
    }
}

pub type BootstrapEvent = CustomResourceEvent<BootstrapProperties>;

#[derive(Builder)]
pub struct BootstrapService {
    secrets: Box<dyn CredentialSource>,
    connector: Box<dyn Connector>,
    hot_pool: Box<dyn HotPoolRegistry>,
    responder: Box<dyn Responder>,
}

impl BootstrapService {
    pub async fn handle(&self, event: LambdaEvent<BootstrapEvent>) -> Result<(), Error> {
        let (request, ctx) = event.into_parts();
        info!("{:?}", request);

        complete(&request, &ctx, self.responder.as_ref(), self.run(&request)).await
    }

    pub async fn run(&self, request: &BootstrapEvent) -> anyhow::Result<ResponseData> {
        match request.kind() {
            RequestKind::Create => {}
            RequestKind::Update | RequestKind::Delete => {
                info!("{} is a no-op", request.request_type);
                return Ok(ResponseData::new());
            }
            RequestKind::Unknown => bail!("Unknown RequestType {}", request.request_type),
        }

        let properties = &request.resource_properties;
        let action = required("Action", properties.action.as_deref())?;
        let action = Action::parse(action).ok_or_else(|| anyhow!("Unknown Action {}", action))?;
        let super_user_secret =
            required("SuperUserCredentials", properties.super_user_credentials.as_deref())?;
        let host = required("Host", properties.host.as_deref())?;
        let database = required("Database", properties.database.as_deref())?;
        info!("CREATE {:?} on {}/{}", action, host, database);

        let super_user = self
            .secrets
            .credential(super_user_secret)
            .await
            .context("Unable to read super user credentials")?;
        let sink = self
            .connector
            .connect(host, database, &super_user)
            .await
            .context("Unable to connect to database")?;
        let mut runner = ScriptRunner::new(sink);

        match action {
            Action::Bootstrap => self.bootstrap(&mut runner, host, properties).await?,
            Action::BootstrapPool => {
                runner
                    .run_batched("bootstrap_pool.sql", split_statements(BOOTSTRAP_POOL_SQL))
                    .await?;
                self.add_app_user(&mut runner, properties).await?;
            }
            Action::AddUser => {
                if properties.app_user_secret().is_none() {
                    bail!("AppUserCredentials is required for ADD_USER");
                }
                self.add_app_user(&mut runner, properties).await?;
            }
        }

        info!("{:?} executed {} statements", action, runner.executed());
        Ok(ResponseData::new())
    }

    async fn bootstrap(
        &self,
        runner: &mut ScriptRunner,
        host: &str,
        properties: &BootstrapProperties,
    ) -> anyhow::Result<()> {
        let instance = properties
            .instance_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| anyhow!("InstanceId is required for BOOTSTRAP"))?;

        runner
            .run_batched("bootstrap.sql", split_statements(BOOTSTRAP_SQL))
            .await?;

        if properties.is_monolith() {
            runner.run_batched("data.sql", split_statements(DATA_SQL)).await?;
        }

        self.add_app_user(runner, properties).await?;

        self.hot_pool
            .record(&HotPoolEntry {
                instance,
                host: host.to_string(),
                tenant_id: properties.tenant_id.clone().filter(|id| !id.is_empty()),
            })
            .await
            .context("Unable to record database in hot pool")?;
        Ok(())
    }

    /// Creates the application's login role when app user credentials are given.
    async fn add_app_user(
        &self,
        runner: &mut ScriptRunner,
        properties: &BootstrapProperties,
    ) -> anyhow::Result<()> {
        let Some(secret) = properties.app_user_secret() else {
            return Ok(());
        };

        let app_user = self
            .secrets
            .credential(secret)
            .await
            .context("Unable to read application user credentials")?;
        info!("Creating application user {}", app_user.username);

        runner
            .run_atomic("user.sql", split_dollar_quoted(USER_SQL, &app_user))
            .await
    }
}

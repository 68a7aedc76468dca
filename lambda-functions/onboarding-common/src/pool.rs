use std::time::Instant;

use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoClient;
use serde_dynamo::from_item;
use tracing::info;

use crate::error::{AwsResultExt, OnboardingResult};
use crate::model::AvailableDatabase;

pub const DEFAULT_RDS_CLUSTER_TABLE: &str = "saas-factory-srvls-wrkshp-rds-clusters";

pub fn rds_cluster_table() -> String {
    std::env::var("RDS_CLUSTER_TABLE").unwrap_or_else(|_| DEFAULT_RDS_CLUSTER_TABLE.to_string())
}

/// The hot pool of pre-provisioned RDS clusters waiting to be claimed by a tenant.
///
/// Lookups are not atomic: two concurrent registrations can receive the same
/// cluster.
#[async_trait]
pub trait DatabasePool: Send + Sync {
    async fn next_available(&self) -> OnboardingResult<Option<AvailableDatabase>>;
}

pub struct DynamoDatabasePool {
    client: DynamoClient,
    table: String,
}

impl DynamoDatabasePool {
    pub fn new(client: DynamoClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait]
impl DatabasePool for DynamoDatabasePool {
    async fn next_available(&self) -> OnboardingResult<Option<AvailableDatabase>> {
        let start = Instant::now();

        // Clusters not yet assigned to a tenant have no TenantId attribute
        let result = self
            .client
            .scan()
            .table_name(&self.table)
            .filter_expression("attribute_not_exists(TenantId)")
            .send()
            .await
            .aws("DynamoDB::Scan")?;

        let database: Option<AvailableDatabase> = result
            .items()
            .first()
            .map(|item| from_item(item.clone()))
            .transpose()?;

        info!(
            "Next available database lookup in {} ms: {:?}",
            start.elapsed().as_millis(),
            database.as_ref().map(|db| &db.endpoint)
        );
        Ok(database)
    }
}

use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoClient;
use onboarding_common::{AwsResultExt, OnboardingResult};
use serde::Serialize;
use serde_dynamo::to_item;
use tracing::info;

/// A bootstrapped database kept for later assignment to tenants.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct HotPoolEntry {
    pub instance: String,
    pub host: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

#[async_trait]
pub trait HotPoolRegistry: Send + Sync {
    async fn record(&self, entry: &HotPoolEntry) -> OnboardingResult<()>;
}

pub struct DynamoHotPool {
    client: DynamoClient,
    table: String,
}

impl DynamoHotPool {
    pub fn new(client: DynamoClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait]
impl HotPoolRegistry for DynamoHotPool {
    async fn record(&self, entry: &HotPoolEntry) -> OnboardingResult<()> {
        info!("Adding database instance {} to hot pool {}", entry.instance, self.table);
        let item = to_item(entry)?;

        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(item))
            .send()
            .await
            .aws("DynamoDB::PutItem")?;

        Ok(())
    }
}

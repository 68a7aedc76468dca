use std::fmt;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client as DynamoClient;
use onboarding_common::{AwsResultExt, OnboardingError, OnboardingResult, Tenant};
use serde_dynamo::{from_item, from_items, to_item};
use tracing::info;

pub const DEFAULT_TENANT_TABLE: &str = "saas-factory-srvls-wrkshp-tenants";

pub fn tenant_table() -> String {
    std::env::var("TENANT_TABLE").unwrap_or_else(|_| DEFAULT_TENANT_TABLE.to_string())
}

/// Tenant attributes that can be set on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantField {
    Database,
    UserPool,
}

impl TenantField {
    pub fn attribute(&self) -> &'static str {
        match self {
            TenantField::Database => "database",
            TenantField::UserPool => "userPool",
        }
    }
}

impl fmt::Display for TenantField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute())
    }
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn list(&self) -> OnboardingResult<Vec<Tenant>>;

    async fn get(&self, id: &str) -> OnboardingResult<Option<Tenant>>;

    /// Inserts or replaces the tenant with the same id.
    async fn put(&self, tenant: &Tenant) -> OnboardingResult<()>;

    async fn delete(&self, id: &str) -> OnboardingResult<()>;

    /// Sets one attribute of an existing tenant and returns the tenant as
    /// stored afterwards. Fails with `TenantNotFound` for an unknown id.
    async fn set_field(&self, id: &str, field: TenantField, value: &str) -> OnboardingResult<Tenant>;
}

pub struct DynamoTenantStore {
    client: DynamoClient,
    table: String,
}

impl DynamoTenantStore {
    pub fn new(client: DynamoClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }

    fn key(id: &str) -> AttributeValue {
        AttributeValue::S(id.to_string())
    }
}

#[async_trait]
impl TenantStore for DynamoTenantStore {
    async fn list(&self) -> OnboardingResult<Vec<Tenant>> {
        let mut tenants = Vec::new();
        let mut last_evaluated_key = None;

        loop {
            let mut scan_request = self.client.scan().table_name(&self.table);

            if let Some(key) = last_evaluated_key {
                scan_request = scan_request.set_exclusive_start_key(Some(key));
            }

            let result = scan_request.send().await.aws("DynamoDB::Scan")?;

            if let Some(items) = result.items {
                let page: Vec<Tenant> = from_items(items)?;
                tenants.extend(page);
            }

            if result.last_evaluated_key.is_none() {
                break;
            }

            last_evaluated_key = result.last_evaluated_key;
        }

        info!("Scanned {} tenants from {}", tenants.len(), self.table);
        Ok(tenants)
    }

    async fn get(&self, id: &str) -> OnboardingResult<Option<Tenant>> {
        let result = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("id", Self::key(id))
            .send()
            .await
            .aws("DynamoDB::GetItem")?;

        Ok(result.item.map(from_item).transpose()?)
    }

    async fn put(&self, tenant: &Tenant) -> OnboardingResult<()> {
        let item = to_item(tenant)?;

        self.client
            .put_item()
            .table_name(&self.table)
            .set_item(Some(item))
            .send()
            .await
            .aws("DynamoDB::PutItem")?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> OnboardingResult<()> {
        self.client
            .delete_item()
            .table_name(&self.table)
            .key("id", Self::key(id))
            .send()
            .await
            .aws("DynamoDB::DeleteItem")?;

        Ok(())
    }

    async fn set_field(&self, id: &str, field: TenantField, value: &str) -> OnboardingResult<Tenant> {
        let result = self
            .client
            .update_item()
            .table_name(&self.table)
            .key("id", Self::key(id))
            .update_expression("SET #field = :value")
            .condition_expression("attribute_exists(#id)")
            .expression_attribute_names("#id", "id")
            .expression_attribute_names("#field", field.attribute())
            .expression_attribute_values(":value", AttributeValue::S(value.to_string()))
            .return_values(ReturnValue::AllNew)
            .send()
            .await;

        let result = match result {
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_conditional_check_failed_exception()) =>
            {
                return Err(OnboardingError::TenantNotFound(id.to_string()));
            }
            other => other.aws("DynamoDB::UpdateItem")?,
        };

        let attributes = result.attributes.ok_or_else(|| {
            OnboardingError::Invalid(format!("Tenant {} returned no attributes after update", id))
        })?;
        Ok(from_item(attributes)?)
    }
}

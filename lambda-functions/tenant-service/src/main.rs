use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::Client as DynamoClient;
use lambda_http::{run, service_fn, Error, Request};
use onboarding_common::pool::rds_cluster_table;
use onboarding_common::DynamoDatabasePool;
use tenant_service::{tenant_table, DynamoTenantStore, TenantService};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let client = DynamoClient::new(&config);

    let service = &TenantService::new(
        DynamoTenantStore::new(client.clone(), tenant_table()),
        DynamoDatabasePool::new(client, rds_cluster_table()),
    );

    run(service_fn(move |event: Request| async move {
        Ok::<_, Error>(service.handle(&event).await)
    }))
    .await
}

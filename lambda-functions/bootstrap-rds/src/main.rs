use aws_config::BehaviorVersion;
use bootstrap_rds::{
    BootstrapEvent, BootstrapService, DynamoHotPool, PgConnector, SecretsManagerCredentials,
};
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use onboarding_common::HttpResponder;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let hot_pool_table = std::env::var("RDS_HOT_POOL_TABLE")?;
    let config = aws_config::defaults(BehaviorVersion::latest()).load().await;

    let service = &BootstrapService::builder()
        .secrets(Box::new(SecretsManagerCredentials::new(
            aws_sdk_secretsmanager::Client::new(&config),
        )))
        .connector(Box::new(PgConnector))
        .hot_pool(Box::new(DynamoHotPool::new(
            aws_sdk_dynamodb::Client::new(&config),
            hot_pool_table,
        )))
        .responder(Box::new(HttpResponder::new(reqwest::Client::new())))
        .build();

    run(service_fn(move |event: LambdaEvent<BootstrapEvent>| async move {
        service.handle(event).await
    }))
    .await
}

use aws_config::BehaviorVersion;
use lambda_http::{run, service_fn, Error, Request};
use onboarding_common::pool::rds_cluster_table;
use onboarding_common::DynamoDatabasePool;
use registration_service::{
    CloudFormationStacks, CognitoIdentity, HttpTenantApi, Registrar, RegistrationSettings,
    SsmParameterStore,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let ssm = aws_sdk_ssm::Client::new(&config);
    let settings = RegistrationSettings::load(&ssm).await?;

    let registrar = &Registrar::builder()
        .pool(Box::new(DynamoDatabasePool::new(
            aws_sdk_dynamodb::Client::new(&config),
            rds_cluster_table(),
        )))
        .tenants(Box::new(HttpTenantApi::new(
            reqwest::Client::new(),
            settings.api_gateway.clone(),
        )))
        .identity(Box::new(CognitoIdentity::new(
            aws_sdk_cognitoidentityprovider::Client::new(&config),
        )))
        .parameters(Box::new(SsmParameterStore::new(ssm)))
        .stacks(Box::new(CloudFormationStacks::new(
            aws_sdk_cloudformation::Client::new(&config),
            aws_sdk_elasticloadbalancingv2::Client::new(&config),
        )))
        .settings(settings)
        .build();

    run(service_fn(move |event: Request| async move {
        Ok::<_, Error>(registrar.handle(&event).await)
    }))
    .await
}

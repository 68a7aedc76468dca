use aws_config::BehaviorVersion;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use onboarding_common::HttpResponder;
use update_deployment_group::{CodeDeployGroups, DeploymentGroupEvent, DeploymentGroupService};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let service = &DeploymentGroupService::new(
        CodeDeployGroups::new(aws_sdk_codedeploy::Client::new(&config)),
        Box::new(HttpResponder::new(reqwest::Client::new())),
    );

    run(service_fn(move |event: LambdaEvent<DeploymentGroupEvent>| async move {
        service.handle(event).await
    }))
    .await
}

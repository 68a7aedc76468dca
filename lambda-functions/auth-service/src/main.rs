use auth_service::{AuthService, CognitoDirectory};
use aws_config::BehaviorVersion;
use lambda_http::{run, service_fn, Error, Request};

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .json()
        .init();

    let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let service = &AuthService::new(CognitoDirectory::new(
        aws_sdk_cognitoidentityprovider::Client::new(&config),
    ));

    run(service_fn(move |event: Request| async move {
        Ok::<_, Error>(service.handle(&event).await)
    }))
    .await
}

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use bootstrap_rds::{
    split_statements, BootstrapEvent, BootstrapService, Connector, Credential, CredentialSource,
    HotPoolEntry, HotPoolRegistry, ScriptRunner, StatementSink, BOOTSTRAP_SQL, DATA_SQL,
    MAX_SQL_BATCH_SIZE,
};
use lambda_runtime::{Context, LambdaEvent};
use mockall::{mock, predicate::*};
use onboarding_common::custom_resource::{CustomResourceResponse, ResponseStatus};
use onboarding_common::{OnboardingResult, Responder};
use serde_json::json;

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Execute(String),
    Commit,
}

type Log = Arc<Mutex<Vec<Op>>>;

struct RecordingSink {
    log: Log,
}

#[async_trait]
impl StatementSink for RecordingSink {
    async fn execute(&mut self, sql: &str) -> anyhow::Result<()> {
        self.log.lock().unwrap().push(Op::Execute(sql.to_string()));
        Ok(())
    }

    async fn commit(&mut self) -> anyhow::Result<()> {
        self.log.lock().unwrap().push(Op::Commit);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingConnector {
    log: Log,
    connections: Arc<Mutex<Vec<(String, String, String)>>>,
}

#[async_trait]
impl Connector for RecordingConnector {
    async fn connect(
        &self,
        host: &str,
        database: &str,
        credential: &Credential,
    ) -> anyhow::Result<Box<dyn StatementSink>> {
        self.connections.lock().unwrap().push((
            host.to_string(),
            database.to_string(),
            credential.username.clone(),
        ));
        Ok(Box::new(RecordingSink {
            log: self.log.clone(),
        }))
    }
}

mock! {
    pub Secrets {}

    #[async_trait]
    impl CredentialSource for Secrets {
        async fn credential(&self, secret_id: &str) -> OnboardingResult<Credential>;
    }
}

mock! {
    pub HotPool {}

    #[async_trait]
    impl HotPoolRegistry for HotPool {
        async fn record(&self, entry: &HotPoolEntry) -> OnboardingResult<()>;
    }
}

mock! {
    pub Cfn {}

    #[async_trait]
    impl Responder for Cfn {
        async fn send(&self, url: &str, response: &CustomResourceResponse) -> anyhow::Result<()>;
    }
}

fn secrets() -> MockSecrets {
    let mut secrets = MockSecrets::new();
    secrets.expect_credential().with(eq("super-secret")).returning(|_| {
        Ok(Credential {
            username: "master".to_string(),
            password: "master-pass".to_string(),
        })
    });
    secrets.expect_credential().with(eq("app-secret")).returning(|_| {
        Ok(Credential {
            username: "application".to_string(),
            password: "app-pass".to_string(),
        })
    });
    secrets
}

fn responder_expecting(status: ResponseStatus) -> MockCfn {
    let mut responder = MockCfn::new();
    responder
        .expect_send()
        .withf(move |_, response| response.status == status)
        .times(1)
        .returning(|_, _| Ok(()));
    responder
}

fn lambda_event(request_type: &str, properties: serde_json::Value) -> LambdaEvent<BootstrapEvent> {
    let payload: BootstrapEvent = serde_json::from_value(json!({
        "RequestType": request_type,
        "ResponseURL": "https://cloudformation-custom-resource-response.s3.amazonaws.com/signed",
        "StackId": "arn:aws:cloudformation:us-east-1:123456789012:stack/workshop/guid",
        "RequestId": "req-1",
        "ResourceType": "Custom::BootstrapRDS",
        "LogicalResourceId": "BootstrapDatabase",
        "ResourceProperties": properties
    }))
    .unwrap();

    let mut context = Context::default();
    context.deadline = (SystemTime::now() + Duration::from_secs(60))
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64;

    LambdaEvent { payload, context }
}

fn properties(action: &str, tenant_id: &str, app_user: Option<&str>) -> serde_json::Value {
    json!({
        "ServiceToken": "arn:aws:lambda:us-east-1:123456789012:function:bootstrap",
        "Action": action,
        "SuperUserCredentials": "super-secret",
        "AppUserCredentials": app_user,
        "Host": "monolith.xyz.us-east-1.rds.amazonaws.com",
        "Database": "saas_factory_srvls_wrkshp",
        "InstanceId": "monolith-instance",
        "TenantId": tenant_id
    })
}

fn executed(log: &Log) -> Vec<String> {
    log.lock()
        .unwrap()
        .iter()
        .filter_map(|op| match op {
            Op::Execute(sql) => Some(sql.clone()),
            Op::Commit => None,
        })
        .collect()
}

fn commit_positions(log: &Log) -> Vec<usize> {
    let mut statements = 0;
    let mut positions = Vec::new();
    for op in log.lock().unwrap().iter() {
        match op {
            Op::Execute(_) => statements += 1,
            Op::Commit => positions.push(statements),
        }
    }
    positions
}

#[tokio::test]
async fn test_runner_commits_every_batch_across_scripts() {
    let log = Log::default();
    let mut runner = ScriptRunner::new(Box::new(RecordingSink { log: log.clone() }));

    let first: Vec<String> = (0..20).map(|i| format!("SELECT {i}")).collect();
    let second: Vec<String> = (0..10).map(|i| format!("SELECT {i}")).collect();
    runner.run_batched("first", first).await.unwrap();
    runner.run_batched("second", second).await.unwrap();

    assert_eq!(runner.executed(), 30);
    assert_eq!(commit_positions(&log), vec![20, MAX_SQL_BATCH_SIZE, 30]);
}

#[tokio::test]
async fn test_runner_atomic_commits_once() {
    let log = Log::default();
    let mut runner = ScriptRunner::new(Box::new(RecordingSink { log: log.clone() }));

    let statements: Vec<String> = (0..30).map(|i| format!("SELECT {i}")).collect();
    runner.run_atomic("user.sql", statements).await.unwrap();

    assert_eq!(commit_positions(&log), vec![30]);
}

#[tokio::test]
async fn test_bootstrap_monolith() {
    let connector = RecordingConnector::default();
    let log = connector.log.clone();
    let connections = connector.connections.clone();

    let mut hot_pool = MockHotPool::new();
    hot_pool
        .expect_record()
        .withf(|entry| {
            entry.instance == "monolith-instance"
                && entry.host == "monolith.xyz.us-east-1.rds.amazonaws.com"
                && entry.tenant_id.as_deref() == Some("MONOLITH")
        })
        .times(1)
        .returning(|_| Ok(()));

    let service = BootstrapService::builder()
        .secrets(Box::new(secrets()))
        .connector(Box::new(connector))
        .hot_pool(Box::new(hot_pool))
        .responder(Box::new(responder_expecting(ResponseStatus::Success)))
        .build();

    service
        .handle(lambda_event("Create", properties("BOOTSTRAP", "MONOLITH", Some("app-secret"))))
        .await
        .unwrap();

    assert_eq!(
        connections.lock().unwrap().clone(),
        vec![(
            "monolith.xyz.us-east-1.rds.amazonaws.com".to_string(),
            "saas_factory_srvls_wrkshp".to_string(),
            "master".to_string()
        )]
    );

    let schema = split_statements(BOOTSTRAP_SQL).len();
    let data = split_statements(DATA_SQL).len();
    let statements = executed(&log);
    assert_eq!(statements.len(), schema + data + 2);
    assert!(statements[0].starts_with("CREATE TABLE"));
    assert!(statements[schema].starts_with("INSERT INTO"));
    assert!(statements[schema + data].starts_with("DO"));
    assert!(statements[schema + data].contains("CREATE ROLE application LOGIN PASSWORD 'app-pass'"));

    assert_eq!(
        commit_positions(&log),
        vec![schema, MAX_SQL_BATCH_SIZE, schema + data, schema + data + 2]
    );
}

#[tokio::test]
async fn test_bootstrap_without_app_user_or_sample_data() {
    let connector = RecordingConnector::default();
    let log = connector.log.clone();

    let mut hot_pool = MockHotPool::new();
    hot_pool
        .expect_record()
        .withf(|entry| entry.tenant_id.as_deref() == Some("pool"))
        .times(1)
        .returning(|_| Ok(()));

    let service = BootstrapService::builder()
        .secrets(Box::new(secrets()))
        .connector(Box::new(connector))
        .hot_pool(Box::new(hot_pool))
        .responder(Box::new(responder_expecting(ResponseStatus::Success)))
        .build();

    service
        .handle(lambda_event("Create", properties("BOOTSTRAP", "pool", None)))
        .await
        .unwrap();

    assert_eq!(executed(&log).len(), split_statements(BOOTSTRAP_SQL).len());
}

#[tokio::test]
async fn test_add_user() {
    let connector = RecordingConnector::default();
    let log = connector.log.clone();

    let mut hot_pool = MockHotPool::new();
    hot_pool.expect_record().never();

    let service = BootstrapService::builder()
        .secrets(Box::new(secrets()))
        .connector(Box::new(connector))
        .hot_pool(Box::new(hot_pool))
        .responder(Box::new(responder_expecting(ResponseStatus::Success)))
        .build();

    service
        .handle(lambda_event("Create", properties("ADD_USER", "", Some("app-secret"))))
        .await
        .unwrap();

    let statements = executed(&log);
    assert_eq!(statements.len(), 2);
    assert!(statements[0].ends_with("$$;"));
    assert!(statements[1].starts_with("GRANT USAGE ON SCHEMA public TO application"));
    assert_eq!(commit_positions(&log), vec![2]);
}

#[tokio::test]
async fn test_unknown_action_fails() {
    let connector = RecordingConnector::default();
    let log = connector.log.clone();

    let mut responder = MockCfn::new();
    responder
        .expect_send()
        .withf(|_, response| {
            response.status == ResponseStatus::Failed && response.reason == "Unknown Action DROP_ALL"
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let service = BootstrapService::builder()
        .secrets(Box::new(MockSecrets::new()))
        .connector(Box::new(connector))
        .hot_pool(Box::new(MockHotPool::new()))
        .responder(Box::new(responder))
        .build();

    service
        .handle(lambda_event("Create", properties("DROP_ALL", "", None)))
        .await
        .unwrap();

    assert!(log.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_property_fails_before_connecting() {
    let connector = RecordingConnector::default();
    let connections = connector.connections.clone();

    let mut secrets = MockSecrets::new();
    secrets.expect_credential().never();

    let mut responder = MockCfn::new();
    responder
        .expect_send()
        .withf(|url, response| {
            url.ends_with("/signed")
                && response.status == ResponseStatus::Failed
                && response.reason == "Missing required property Host"
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let service = BootstrapService::builder()
        .secrets(Box::new(secrets))
        .connector(Box::new(connector))
        .hot_pool(Box::new(MockHotPool::new()))
        .responder(Box::new(responder))
        .build();

    let event = lambda_event(
        "Create",
        json!({
            "ServiceToken": "arn:aws:lambda:us-east-1:123456789012:function:bootstrap",
            "Action": "BOOTSTRAP",
            "SuperUserCredentials": "super-secret",
            "Database": "saas_factory_srvls_wrkshp",
            "InstanceId": "monolith-instance"
        }),
    );
    service.handle(event).await.unwrap();

    assert!(connections.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_and_delete_are_noops() {
    for request_type in ["Update", "Delete"] {
        let connector = RecordingConnector::default();
        let log = connector.log.clone();

        let service = BootstrapService::builder()
            .secrets(Box::new(MockSecrets::new()))
            .connector(Box::new(connector))
            .hot_pool(Box::new(MockHotPool::new()))
            .responder(Box::new(responder_expecting(ResponseStatus::Success)))
            .build();

        service
            .handle(lambda_event(request_type, properties("BOOTSTRAP", "MONOLITH", None)))
            .await
            .unwrap();

        assert!(log.lock().unwrap().is_empty());
    }
}

#[tokio::test]
async fn test_secret_failure_is_reported() {
    let mut secrets = MockSecrets::new();
    secrets.expect_credential().returning(|_| {
        Err(onboarding_common::OnboardingError::Aws {
            operation: "SecretsManager::GetSecretValue",
            message: "Secrets Manager can't find the specified secret.".to_string(),
        })
    });

    let mut responder = MockCfn::new();
    responder
        .expect_send()
        .withf(|_, response| {
            response.status == ResponseStatus::Failed
                && response.reason.starts_with("Unable to read super user credentials")
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let service = BootstrapService::builder()
        .secrets(Box::new(secrets))
        .connector(Box::new(RecordingConnector::default()))
        .hot_pool(Box::new(MockHotPool::new()))
        .responder(Box::new(responder))
        .build();

    service
        .handle(lambda_event("Create", properties("BOOTSTRAP_POOL", "", None)))
        .await
        .unwrap();
}

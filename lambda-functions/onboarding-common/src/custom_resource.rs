//! CloudFormation custom resource protocol: the request event, the response
//! document PUT to the pre-signed `ResponseURL`, and a helper that runs the
//! handler's work under the invocation deadline and always answers
//! CloudFormation.

use std::fmt;
use std::future::Future;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bon::Builder;
use lambda_runtime::Context;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info};

/// Time kept in reserve to deliver the response before Lambda kills the invocation.
pub const DEADLINE_MARGIN: Duration = Duration::from_secs(1);

pub type ResponseData = Map<String, Value>;

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceEvent<P> {
    pub request_type: String,

    #[serde(rename = "ResponseURL")]
    pub response_url: String,

    pub stack_id: String,
    pub request_id: String,

    #[serde(default)]
    pub resource_type: String,

    pub logical_resource_id: String,

    #[serde(default)]
    pub physical_resource_id: Option<String>,

    pub resource_properties: P,
}

impl<P> CustomResourceEvent<P> {
    pub fn kind(&self) -> RequestKind {
        RequestKind::parse(&self.request_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Create,
    Update,
    Delete,
    Unknown,
}

impl RequestKind {
    pub fn parse(request_type: &str) -> Self {
        match request_type.to_ascii_lowercase().as_str() {
            "create" => Self::Create,
            "update" => Self::Update,
            "delete" => Self::Delete,
            _ => Self::Unknown,
        }
    }
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "SUCCESS"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

#[derive(Builder, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,

    #[builder(default)]
    pub no_echo: bool,

    #[builder(default)]
    pub data: ResponseData,
}

impl CustomResourceResponse {
    /// Builds the answer to `event`. A failure reason is reported both as the
    /// response `Reason` and under `Data.Reason`.
    pub fn for_event<P>(
        event: &CustomResourceEvent<P>,
        log_stream: &str,
        outcome: Result<ResponseData, String>,
    ) -> Self {
        let (status, reason, data) = match outcome {
            Ok(data) => (
                ResponseStatus::Success,
                format!("See the details in CloudWatch Log Stream: {}", log_stream),
                data,
            ),
            Err(reason) => {
                let mut data = ResponseData::new();
                data.insert("Reason".to_string(), Value::String(reason.clone()));
                (ResponseStatus::Failed, reason, data)
            }
        };

        Self::builder()
            .status(status)
            .reason(reason)
            .physical_resource_id(
                event
                    .physical_resource_id
                    .clone()
                    .unwrap_or_else(|| log_stream.to_string()),
            )
            .stack_id(event.stack_id.clone())
            .request_id(event.request_id.clone())
            .logical_resource_id(event.logical_resource_id.clone())
            .data(data)
            .build()
    }
}

/// Delivers a response document to CloudFormation.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn send(&self, url: &str, response: &CustomResourceResponse) -> anyhow::Result<()>;
}

#[derive(Default)]
pub struct HttpResponder {
    client: reqwest::Client,
}

impl HttpResponder {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Responder for HttpResponder {
    async fn send(&self, url: &str, response: &CustomResourceResponse) -> anyhow::Result<()> {
        let body = serde_json::to_string(response)?;

        // The pre-signed S3 URL is signed without a content type
        let result = self
            .client
            .put(url)
            .header(CONTENT_TYPE, "")
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        info!(
            "Sent {} response to CloudFormation, HTTP {}",
            response.status,
            result.status()
        );
        Ok(())
    }
}

/// Value of a resource property the handler cannot work without. Properties
/// are deserialized as optional so a missing one still gets a FAILED answer.
pub fn required<'a>(name: &str, value: Option<&'a str>) -> anyhow::Result<&'a str> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("Missing required property {}", name))
}

/// Remaining invocation time minus [`DEADLINE_MARGIN`].
pub fn time_budget(ctx: &Context) -> Duration {
    ctx.deadline()
        .duration_since(SystemTime::now())
        .unwrap_or_default()
        .saturating_sub(DEADLINE_MARGIN)
}

/// Runs `work` within the invocation deadline and reports its outcome.
pub async fn complete<P, F>(
    event: &CustomResourceEvent<P>,
    ctx: &Context,
    responder: &dyn Responder,
    work: F,
) -> Result<(), lambda_runtime::Error>
where
    F: Future<Output = anyhow::Result<ResponseData>>,
{
    complete_within(
        event,
        time_budget(ctx),
        &ctx.env_config.log_stream,
        responder,
        work,
    )
    .await
}

pub async fn complete_within<P, F>(
    event: &CustomResourceEvent<P>,
    budget: Duration,
    log_stream: &str,
    responder: &dyn Responder,
    work: F,
) -> Result<(), lambda_runtime::Error>
where
    F: Future<Output = anyhow::Result<ResponseData>>,
{
    let outcome = match tokio::time::timeout(budget, work).await {
        Ok(Ok(data)) => Ok(data),
        Ok(Err(e)) => {
            error!("FAILED unexpected error: {:#}", e);
            Err(format!("{:#}", e))
        }
        Err(_) => {
            error!("FAILED request timed out after {} ms", budget.as_millis());
            Err(format!("Request timed out after {} ms", budget.as_millis()))
        }
    };

    let response = CustomResourceResponse::for_event(event, log_stream, outcome);
    responder.send(&event.response_url, &response).await?;
    Ok(())
}

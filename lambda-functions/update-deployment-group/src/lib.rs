//! Custom resource that attaches a tenant's auto scaling group to the shared
//! CodeDeploy deployment group, and detaches it when the tenant stack is deleted.

use anyhow::{bail, Context as _};
use async_trait::async_trait;
use aws_sdk_codedeploy::Client as CodeDeployClient;
use lambda_runtime::{Error, LambdaEvent};
use onboarding_common::custom_resource::complete;
use onboarding_common::{
    required, AwsResultExt, CustomResourceEvent, OnboardingResult, RequestKind, Responder, ResponseData,
};
use serde::Deserialize;
use tracing::info;

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeploymentGroupProperties {
    pub application_name: Option<String>,
    pub deployment_group: Option<String>,
    pub auto_scaling_group: Option<String>,
}

pub type DeploymentGroupEvent = CustomResourceEvent<DeploymentGroupProperties>;

/// The auto scaling groups to set on the deployment group. `UpdateDeploymentGroup`
/// replaces the whole list, so the existing groups are carried over. The
/// requested group appears at most once.
pub fn next_auto_scaling_groups(
    kind: RequestKind,
    requested: &str,
    existing: Vec<String>,
) -> Option<Vec<String>> {
    match kind {
        RequestKind::Create | RequestKind::Update => {
            let mut groups = vec![requested.to_string()];
            groups.extend(existing.into_iter().filter(|asg| asg != requested));
            Some(groups)
        }
        RequestKind::Delete => Some(existing.into_iter().filter(|asg| asg != requested).collect()),
        RequestKind::Unknown => None,
    }
}

#[async_trait]
pub trait DeploymentGroups: Send + Sync {
    async fn auto_scaling_groups(&self, application: &str, group: &str) -> OnboardingResult<Vec<String>>;

    async fn set_auto_scaling_groups(
        &self,
        application: &str,
        group: &str,
        auto_scaling_groups: Vec<String>,
    ) -> OnboardingResult<()>;
}

pub struct CodeDeployGroups {
    client: CodeDeployClient,
}

impl CodeDeployGroups {
    pub fn new(client: CodeDeployClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeploymentGroups for CodeDeployGroups {
    async fn auto_scaling_groups(&self, application: &str, group: &str) -> OnboardingResult<Vec<String>> {
        let result = self
            .client
            .get_deployment_group()
            .application_name(application)
            .deployment_group_name(group)
            .send()
            .await
            .aws("CodeDeploy::GetDeploymentGroup")?;

        Ok(result
            .deployment_group_info()
            .map(|info| {
                info.auto_scaling_groups()
                    .iter()
                    .filter_map(|asg| asg.name().map(str::to_owned))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set_auto_scaling_groups(
        &self,
        application: &str,
        group: &str,
        auto_scaling_groups: Vec<String>,
    ) -> OnboardingResult<()> {
        self.client
            .update_deployment_group()
            .application_name(application)
            .current_deployment_group_name(group)
            .set_auto_scaling_groups(Some(auto_scaling_groups))
            .send()
            .await
            .aws("CodeDeploy::UpdateDeploymentGroup")?;

        Ok(())
    }
}

pub struct DeploymentGroupService<G> {
    groups: G,
    responder: Box<dyn Responder>,
}

impl<G: DeploymentGroups> DeploymentGroupService<G> {
    pub fn new(groups: G, responder: Box<dyn Responder>) -> Self {
        Self { groups, responder }
    }

    pub async fn handle(&self, event: LambdaEvent<DeploymentGroupEvent>) -> Result<(), Error> {
        let (request, ctx) = event.into_parts();
        info!("{:?}", request);

        complete(&request, &ctx, self.responder.as_ref(), self.update(&request)).await
    }

    pub async fn update(&self, request: &DeploymentGroupEvent) -> anyhow::Result<ResponseData> {
        let kind = request.kind();
        if kind == RequestKind::Unknown {
            bail!("Unknown RequestType {}", request.request_type);
        }
        let properties = &request.resource_properties;
        let application = required("ApplicationName", properties.application_name.as_deref())?;
        let deployment_group = required("DeploymentGroup", properties.deployment_group.as_deref())?;
        let auto_scaling_group =
            required("AutoScalingGroup", properties.auto_scaling_group.as_deref())?;

        let existing = self
            .groups
            .auto_scaling_groups(application, deployment_group)
            .await
            .context("Unable to read deployment group")?;

        let groups = next_auto_scaling_groups(kind, auto_scaling_group, existing).unwrap_or_default();
        info!(
            "{:?} deployment group {} auto scaling groups {:?}",
            kind, deployment_group, groups
        );

        self.groups
            .set_auto_scaling_groups(application, deployment_group, groups)
            .await
            .context("Unable to update deployment group")?;

        Ok(ResponseData::new())
    }
}

use std::collections::HashMap;

use aws_sdk_ssm::Client as SsmClient;
use onboarding_common::{AwsResultExt, OnboardingError, OnboardingResult};
use tracing::info;

/// `GetParameters` accepts at most 10 names per call.
pub const PARAMETER_BATCHES: [&[&str]; 2] = [
    &["API_GW", "WORKSHOP_BUCKET", "KEY_PAIR", "VPC", "APP_SG", "PRIVATE_SUBNETS"],
    &[
        "PIPELINE_BUCKET",
        "CODE_DEPLOY",
        "DEPLOYMENT_GROUP",
        "CODE_DEPLOY_LAMBDA",
        "ALB_LISTENER",
        "RDS_ADD_USER_LAMBDA",
    ],
];

pub const ONBOARDING_TEMPLATE: &str = "onboard-tenant.template";

/// Workshop-wide settings published to Parameter Store by the bootstrap stack.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationSettings {
    pub api_gateway: String,
    pub workshop_bucket: String,
    pub key_pair: String,
    pub vpc: String,
    pub app_security_group: String,
    pub private_subnets: String,
    pub pipeline_bucket: String,
    pub code_deploy_application: String,
    pub deployment_group: String,
    pub update_deployment_group_lambda: String,
    pub alb_listener: String,
    pub add_database_user_lambda: String,
}

impl RegistrationSettings {
    pub async fn load(client: &SsmClient) -> OnboardingResult<Self> {
        let mut values = HashMap::new();

        for batch in PARAMETER_BATCHES {
            let result = client
                .get_parameters()
                .set_names(Some(batch.iter().map(|name| name.to_string()).collect()))
                .send()
                .await
                .aws("SSM::GetParameters")?;

            for parameter in result.parameters() {
                if let (Some(name), Some(value)) = (parameter.name(), parameter.value()) {
                    info!("Setting env {} = {}", name, value);
                    values.insert(name.to_string(), value.to_string());
                }
            }
        }

        Self::from_parameters(values)
    }

    /// Fails naming every parameter that is absent or empty.
    pub fn from_parameters(mut values: HashMap<String, String>) -> OnboardingResult<Self> {
        let mut missing = Vec::new();
        let mut take = |name: &str| match values.remove(name).filter(|v| !v.trim().is_empty()) {
            Some(value) => value,
            None => {
                missing.push(name.to_string());
                String::new()
            }
        };

        let settings = Self {
            api_gateway: take("API_GW"),
            workshop_bucket: take("WORKSHOP_BUCKET"),
            key_pair: take("KEY_PAIR"),
            vpc: take("VPC"),
            app_security_group: take("APP_SG"),
            private_subnets: take("PRIVATE_SUBNETS"),
            pipeline_bucket: take("PIPELINE_BUCKET"),
            code_deploy_application: take("CODE_DEPLOY"),
            deployment_group: take("DEPLOYMENT_GROUP"),
            update_deployment_group_lambda: take("CODE_DEPLOY_LAMBDA"),
            alb_listener: take("ALB_LISTENER"),
            add_database_user_lambda: take("RDS_ADD_USER_LAMBDA"),
        };

        if missing.is_empty() {
            Ok(settings)
        } else {
            Err(OnboardingError::MissingSettings(missing.join(", ")))
        }
    }

    pub fn template_url(&self) -> String {
        format!(
            "https://{}.s3.amazonaws.com/{}",
            self.workshop_bucket, ONBOARDING_TEMPLATE
        )
    }

    /// Parameters of the per-tenant onboarding stack.
    pub fn stack_parameters(&self, tenant_id: &str, alb_rule_priority: usize) -> Vec<(&'static str, String)> {
        vec![
            ("TenantId", tenant_id.to_string()),
            ("TenantRouteALBPriority", alb_rule_priority.to_string()),
            ("KeyPair", self.key_pair.clone()),
            ("VPC", self.vpc.clone()),
            ("PrivateSubnets", self.private_subnets.clone()),
            ("AppServerSecurityGroup", self.app_security_group.clone()),
            ("CodePipelineBucket", self.pipeline_bucket.clone()),
            ("CodeDeployApplication", self.code_deploy_application.clone()),
            ("DeploymentGroup", self.deployment_group.clone()),
            ("LambdaUpdateDeploymentGroupArn", self.update_deployment_group_lambda.clone()),
            ("ALBListener", self.alb_listener.clone()),
            ("LambdaAddDatabaseUserArn", self.add_database_user_lambda.clone()),
        ]
    }
}

#[cfg(test)]
pub(crate) fn test_parameters() -> HashMap<String, String> {
    PARAMETER_BATCHES
        .iter()
        .flat_map(|batch| batch.iter())
        .map(|name| (name.to_string(), format!("{}-value", name.to_lowercase())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parameters() {
        let settings = RegistrationSettings::from_parameters(test_parameters()).unwrap();

        assert_eq!(settings.api_gateway, "api_gw-value");
        assert_eq!(settings.code_deploy_application, "code_deploy-value");
        assert_eq!(settings.add_database_user_lambda, "rds_add_user_lambda-value");
    }

    #[test]
    fn test_missing_parameters_are_named() {
        let mut values = test_parameters();
        values.remove("CODE_DEPLOY");
        values.insert("VPC".to_string(), "  ".to_string());

        let err = RegistrationSettings::from_parameters(values).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to get all required settings from Parameter Store: VPC, CODE_DEPLOY"
        );
    }

    #[test]
    fn test_batches_fit_get_parameters_limit() {
        for batch in PARAMETER_BATCHES {
            assert!(batch.len() <= 10);
        }
        assert_eq!(PARAMETER_BATCHES.iter().map(|b| b.len()).sum::<usize>(), 12);
    }

    #[test]
    fn test_template_url() {
        let settings = RegistrationSettings::from_parameters(test_parameters()).unwrap();
        assert_eq!(
            settings.template_url(),
            "https://workshop_bucket-value.s3.amazonaws.com/onboard-tenant.template"
        );
    }

    #[test]
    fn test_stack_parameters() {
        let settings = RegistrationSettings::from_parameters(test_parameters()).unwrap();
        let parameters = settings.stack_parameters("5b1e7c2a-9f0d-4c3b-8a6e-1d2f3a4b5c6d", 4);

        let keys: Vec<&str> = parameters.iter().map(|(key, _)| *key).collect();
        assert_eq!(
            keys,
            vec![
                "TenantId",
                "TenantRouteALBPriority",
                "KeyPair",
                "VPC",
                "PrivateSubnets",
                "AppServerSecurityGroup",
                "CodePipelineBucket",
                "CodeDeployApplication",
                "DeploymentGroup",
                "LambdaUpdateDeploymentGroupArn",
                "ALBListener",
                "LambdaAddDatabaseUserArn",
            ]
        );
        assert_eq!(parameters[1].1, "4");
        assert_eq!(parameters[5].1, "app_sg-value");
    }
}

use async_trait::async_trait;
use aws_sdk_cloudformation::types::{Capability, OnFailure, Parameter};
use aws_sdk_cloudformation::Client as CloudFormationClient;
use aws_sdk_cognitoidentityprovider::types::{
    AdminCreateUserConfigType, AttributeDataType, AttributeType, DeliveryMediumType,
    ExplicitAuthFlowsType, MessageActionType, PasswordPolicyType, SchemaAttributeType,
    UserPoolPolicyType,
};
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use aws_sdk_elasticloadbalancingv2::Client as ElbClient;
use aws_sdk_ssm::types::ParameterType;
use aws_sdk_ssm::Client as SsmClient;
use onboarding_common::password::generate_password;
use onboarding_common::{AwsResultExt, OnboardingError, OnboardingResult, Registration};
use tracing::info;

use crate::provision::{IdentityProvider, ParameterStore, StackProvisioner, StackRequest};

const TEMPORARY_PASSWORD_LENGTH: usize = 12;

pub struct CognitoIdentity {
    client: CognitoClient,
}

impl CognitoIdentity {
    pub fn new(client: CognitoClient) -> Self {
        Self { client }
    }
}

fn standard_attribute(name: &str) -> SchemaAttributeType {
    SchemaAttributeType::builder()
        .name(name)
        .attribute_data_type(AttributeDataType::String)
        .required(true)
        .build()
}

// Custom attributes can't be required
fn custom_attribute(name: &str, mutable: bool) -> SchemaAttributeType {
    SchemaAttributeType::builder()
        .name(name)
        .attribute_data_type(AttributeDataType::String)
        .required(false)
        .mutable(mutable)
        .build()
}

fn attribute(name: &str, value: Option<&str>) -> OnboardingResult<AttributeType> {
    Ok(AttributeType::builder()
        .name(name)
        .set_value(value.map(str::to_owned))
        .build()?)
}

#[async_trait]
impl IdentityProvider for CognitoIdentity {
    async fn create_user_pool(&self, prefix: &str) -> OnboardingResult<String> {
        let policy = PasswordPolicyType::builder()
            .minimum_length(8)
            .require_lowercase(true)
            .require_uppercase(true)
            .require_numbers(true)
            .temporary_password_validity_days(7)
            .build();

        let result = self
            .client
            .create_user_pool()
            .pool_name(format!("{}_UserPool", prefix))
            .schema(standard_attribute("email"))
            .schema(standard_attribute("given_name"))
            .schema(standard_attribute("family_name"))
            .schema(custom_attribute("tenant_id", false))
            .schema(custom_attribute("company", true))
            .schema(custom_attribute("plan", true))
            .admin_create_user_config(
                AdminCreateUserConfigType::builder()
                    .allow_admin_create_user_only(true)
                    .build(),
            )
            .policies(UserPoolPolicyType::builder().password_policy(policy).build())
            .send()
            .await
            .aws("CognitoIdentity::CreateUserPool")?;

        let user_pool_id = result
            .user_pool()
            .and_then(|pool| pool.id())
            .map(str::to_owned)
            .ok_or_else(|| OnboardingError::Invalid("CreateUserPool returned no pool id".to_string()))?;

        info!("Creating app client for user pool {}", user_pool_id);
        self.client
            .create_user_pool_client()
            .user_pool_id(&user_pool_id)
            .client_name(format!("{}_AppClient", prefix))
            .generate_secret(false)
            .explicit_auth_flows(ExplicitAuthFlowsType::AdminNoSrpAuth)
            .send()
            .await
            .aws("CognitoIdentity::CreateUserPoolClient")?;

        Ok(user_pool_id)
    }

    async fn create_user(
        &self,
        user_pool_id: &str,
        tenant_id: &str,
        registration: &Registration,
    ) -> OnboardingResult<String> {
        let email = registration.email.as_deref().unwrap_or_default();
        info!("Creating Cognito user {}", email);

        let result = self
            .client
            .admin_create_user()
            .user_pool_id(user_pool_id)
            .username(email)
            .user_attributes(attribute("email", Some(email))?)
            .user_attributes(attribute("family_name", registration.last_name.as_deref())?)
            .user_attributes(attribute("given_name", registration.first_name.as_deref())?)
            .user_attributes(attribute("custom:tenant_id", Some(tenant_id))?)
            .user_attributes(attribute("custom:company", registration.company.as_deref())?)
            .user_attributes(attribute("custom:plan", registration.plan.as_deref())?)
            .temporary_password(generate_password(TEMPORARY_PASSWORD_LENGTH)?)
            .desired_delivery_mediums(DeliveryMediumType::Email)
            .message_action(MessageActionType::Suppress)
            .send()
            .await
            .aws("CognitoIdentity::AdminCreateUser")?;

        let username = result
            .user()
            .and_then(|user| user.username())
            .unwrap_or(email)
            .to_string();

        // Replace the temporary password so the user isn't forced through a challenge
        self.client
            .admin_set_user_password()
            .user_pool_id(user_pool_id)
            .username(&username)
            .password(registration.password.as_deref().unwrap_or_default())
            .permanent(true)
            .send()
            .await
            .aws("CognitoIdentity::AdminSetUserPassword")?;

        Ok(username)
    }
}

pub struct SsmParameterStore {
    client: SsmClient,
}

impl SsmParameterStore {
    pub fn new(client: SsmClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    async fn put_parameter(&self, name: &str, value: &str, secure: bool) -> OnboardingResult<()> {
        info!("PutParameter {}", name);

        let parameter_type = if secure {
            ParameterType::SecureString
        } else {
            ParameterType::String
        };

        self.client
            .put_parameter()
            .name(name)
            .value(value)
            .r#type(parameter_type)
            .overwrite(true)
            .send()
            .await
            .aws("SSM::PutParameter")?;

        Ok(())
    }
}

pub struct CloudFormationStacks {
    cfn: CloudFormationClient,
    elb: ElbClient,
}

impl CloudFormationStacks {
    pub fn new(cfn: CloudFormationClient, elb: ElbClient) -> Self {
        Self { cfn, elb }
    }
}

#[async_trait]
impl StackProvisioner for CloudFormationStacks {
    async fn listener_rule_count(&self, listener_arn: &str) -> OnboardingResult<usize> {
        let result = self
            .elb
            .describe_rules()
            .listener_arn(listener_arn)
            .send()
            .await
            .aws("ElasticLoadBalancingV2::DescribeRules")?;

        Ok(result.rules().len())
    }

    async fn create_stack(&self, request: &StackRequest) -> OnboardingResult<String> {
        let parameters = request
            .parameters
            .iter()
            .map(|(key, value)| {
                Parameter::builder()
                    .parameter_key(*key)
                    .parameter_value(value)
                    .build()
            })
            .collect();

        let result = self
            .cfn
            .create_stack()
            .stack_name(&request.stack_name)
            .on_failure(OnFailure::DoNothing)
            .capabilities(Capability::CapabilityNamedIam)
            .template_url(&request.template_url)
            .set_parameters(Some(parameters))
            .send()
            .await
            .aws("CloudFormation::CreateStack")?;

        let stack_id = result.stack_id().unwrap_or_default().to_string();
        info!("Stack {} id {}", request.stack_name, stack_id);
        Ok(stack_id)
    }
}

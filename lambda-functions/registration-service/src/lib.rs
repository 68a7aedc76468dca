//! Self-service tenant sign-up. A registration claims a database from the hot
//! pool, creates the tenant record, its Cognito user pool and first user,
//! stores the tenant's database settings and starts the onboarding stack.
//! Steps that already succeeded are not undone when a later one fails.

mod aws;
mod provision;
mod settings;
mod tenant_api;

pub use aws::{CloudFormationStacks, CognitoIdentity, SsmParameterStore};
pub use provision::{IdentityProvider, ParameterStore, StackProvisioner, StackRequest, TenantApi};
pub use settings::{RegistrationSettings, ONBOARDING_TEMPLATE, PARAMETER_BATCHES};
pub use tenant_api::HttpTenantApi;

use std::time::Instant;

use bon::Builder;
use lambda_http::http::StatusCode;
use lambda_http::{Body, Request, Response};
use onboarding_common::password::generate_password;
use onboarding_common::{
    api, warmup, DatabasePool, OnboardingError, OnboardingResult, Registration, Tenant,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

pub const DATABASE_NAME: &str = "saas_factory_srvls_wrkshp";
pub const DATABASE_USER: &str = "application";
const DATABASE_PASSWORD_LENGTH: usize = 12;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct RegistrationResult {
    pub tenant_id: String,
    pub stack_name: String,
}

/// A Parameter Store entry holding one of the tenant's database settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TenantParameter {
    pub name: String,
    pub value: String,
    pub secure: bool,
}

/// `<tenantId>_DB_*` parameters read by the tenant's application servers.
pub fn tenant_parameters(tenant_id: &str, host: &str, password: &str) -> Vec<TenantParameter> {
    [
        ("DB_NAME", DATABASE_NAME, false),
        ("DB_USER", DATABASE_USER, false),
        ("DB_PASS", password, true),
        ("DB_HOST", host, false),
    ]
    .into_iter()
    .map(|(key, value, secure)| TenantParameter {
        name: format!("{}_{}", tenant_id, key),
        value: value.to_string(),
        secure,
    })
    .collect()
}

pub fn stack_name(prefix: &str) -> String {
    format!("Tenant-{}", prefix)
}

#[derive(Builder)]
pub struct Registrar {
    settings: RegistrationSettings,
    pool: Box<dyn DatabasePool>,
    tenants: Box<dyn TenantApi>,
    identity: Box<dyn IdentityProvider>,
    parameters: Box<dyn ParameterStore>,
    stacks: Box<dyn StackProvisioner>,
}

impl Registrar {
    pub async fn handle(&self, request: &Request) -> Response<Body> {
        if warmup::is_warmup(request) {
            info!("Warming up");
            return api::empty(StatusCode::OK);
        }

        let start = Instant::now();
        let registration = match api::parse_object::<Registration>(request.body().as_ref()) {
            Ok(registration) if !registration.is_empty() => registration,
            Ok(_) => return api::invalid_body(),
            Err(e) => {
                error!("Unable to parse registration: {}", e);
                return api::invalid_body();
            }
        };

        let response = match self.register(&registration).await {
            Ok(result) => api::ok(&result),
            Err(e) => {
                error!("Registration failed: {}", e);
                api::bad_request(&e.to_string())
            }
        };

        info!("Register exec {} ms", start.elapsed().as_millis());
        response
    }

    pub async fn register(&self, registration: &Registration) -> OnboardingResult<RegistrationResult> {
        let missing = registration.missing_fields();
        if !missing.is_empty() {
            return Err(OnboardingError::Invalid(format!(
                "Missing registration fields: {}",
                missing.join(", ")
            )));
        }

        let database = self
            .pool
            .next_available()
            .await?
            .ok_or(OnboardingError::PoolDepleted)?;
        info!("Next available database = {}", database.endpoint);

        let request = Tenant::builder()
            .active(true)
            .maybe_company_name(registration.company.clone())
            .maybe_plan(registration.plan.clone())
            .database(database.endpoint.clone())
            .build();
        let tenant = self.tenants.create_tenant(&request).await?;
        let (tenant_id, prefix) = match (tenant.id, tenant.short_id()) {
            (Some(id), Some(prefix)) => (id.to_string(), prefix),
            _ => {
                return Err(OnboardingError::TenantApi(
                    "Tenant service returned a tenant without an id".to_string(),
                ))
            }
        };
        info!("Created tenant {}", tenant_id);

        let user_pool_id = self.identity.create_user_pool(&prefix).await?;
        info!("Created user pool {}", user_pool_id);

        let username = self
            .identity
            .create_user(&user_pool_id, &tenant_id, registration)
            .await?;
        info!("Created user {}", username);

        self.store_parameters(&tenant_id, tenant.database.as_deref().unwrap_or(&database.endpoint))
            .await?;

        let stack_name = self.create_stack(&tenant_id, &prefix).await?;

        Ok(RegistrationResult {
            tenant_id,
            stack_name,
        })
    }

    async fn store_parameters(&self, tenant_id: &str, host: &str) -> OnboardingResult<()> {
        let start = Instant::now();
        let password = generate_password(DATABASE_PASSWORD_LENGTH)?;

        for parameter in tenant_parameters(tenant_id, host, &password) {
            self.parameters
                .put_parameter(&parameter.name, &parameter.value, parameter.secure)
                .await?;
        }

        info!("Store parameters exec {} ms", start.elapsed().as_millis());
        Ok(())
    }

    async fn create_stack(&self, tenant_id: &str, prefix: &str) -> OnboardingResult<String> {
        let start = Instant::now();

        let priority = self
            .stacks
            .listener_rule_count(&self.settings.alb_listener)
            .await?
            + 1;
        info!("Routing rule priority = {}", priority);

        let request = StackRequest {
            stack_name: stack_name(prefix),
            template_url: self.settings.template_url(),
            parameters: self.settings.stack_parameters(tenant_id, priority),
        };
        self.stacks.create_stack(&request).await?;

        info!(
            "CloudFormation CreateStack {} returned in {} ms",
            request.stack_name,
            start.elapsed().as_millis()
        );
        Ok(request.stack_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tenant_parameters() {
        let parameters = tenant_parameters("abc", "db.example.com", "Secret#12345");

        let names: Vec<&str> = parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["abc_DB_NAME", "abc_DB_USER", "abc_DB_PASS", "abc_DB_HOST"]);
        assert_eq!(parameters[0].value, DATABASE_NAME);
        assert_eq!(parameters[1].value, DATABASE_USER);
        assert!(parameters[2].secure);
        assert!(!parameters[3].secure);
        assert_eq!(parameters[3].value, "db.example.com");
    }

    #[test]
    fn test_stack_name() {
        assert_eq!(stack_name("5b1e7c2a"), "Tenant-5b1e7c2a");
    }

    #[test]
    fn test_result_json_structure() {
        let result = RegistrationResult {
            tenant_id: "abc".to_string(),
            stack_name: "Tenant-abc".to_string(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!({"TenantId": "abc", "StackName": "Tenant-abc"}));
    }

    #[test]
    fn test_settings_fixture_is_complete() {
        assert!(RegistrationSettings::from_parameters(settings::test_parameters()).is_ok());
    }
}

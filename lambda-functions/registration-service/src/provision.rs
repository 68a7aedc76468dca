//! The AWS resources created for a new tenant, one seam per service.

use async_trait::async_trait;
use onboarding_common::{OnboardingResult, Registration, Tenant};

/// The tenant service's REST API.
#[async_trait]
pub trait TenantApi: Send + Sync {
    /// Creates the tenant record and returns it with its generated id.
    async fn create_tenant(&self, tenant: &Tenant) -> OnboardingResult<Tenant>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates `<prefix>_UserPool` with its `<prefix>_AppClient`, returning the pool id.
    async fn create_user_pool(&self, prefix: &str) -> OnboardingResult<String>;

    /// Creates the registering user with a permanent password, returning the username.
    async fn create_user(
        &self,
        user_pool_id: &str,
        tenant_id: &str,
        registration: &Registration,
    ) -> OnboardingResult<String>;
}

#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn put_parameter(&self, name: &str, value: &str, secure: bool) -> OnboardingResult<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackRequest {
    pub stack_name: String,
    pub template_url: String,
    pub parameters: Vec<(&'static str, String)>,
}

#[async_trait]
pub trait StackProvisioner: Send + Sync {
    async fn listener_rule_count(&self, listener_arn: &str) -> OnboardingResult<usize>;

    /// Starts stack creation without waiting for it, returning the stack id.
    async fn create_stack(&self, request: &StackRequest) -> OnboardingResult<String>;
}

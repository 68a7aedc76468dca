use std::fmt;

use async_trait::async_trait;
use aws_sdk_secretsmanager::Client as SecretsClient;
use onboarding_common::{AwsResultExt, OnboardingError, OnboardingResult};
use serde::Deserialize;

/// Database login stored as a `{"username", "password"}` JSON secret.
#[derive(Deserialize, Clone, PartialEq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

impl Credential {
    pub fn from_secret_string(secret: &str) -> OnboardingResult<Self> {
        Ok(serde_json::from_str(secret)?)
    }
}

#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn credential(&self, secret_id: &str) -> OnboardingResult<Credential>;
}

pub struct SecretsManagerCredentials {
    client: SecretsClient,
}

impl SecretsManagerCredentials {
    pub fn new(client: SecretsClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CredentialSource for SecretsManagerCredentials {
    async fn credential(&self, secret_id: &str) -> OnboardingResult<Credential> {
        let result = self
            .client
            .get_secret_value()
            .secret_id(secret_id)
            .send()
            .await
            .aws("SecretsManager::GetSecretValue")?;

        let secret = result
            .secret_string()
            .ok_or_else(|| OnboardingError::Invalid(format!("Secret {} has no string value", secret_id)))?;
        Credential::from_secret_string(secret)
    }
}

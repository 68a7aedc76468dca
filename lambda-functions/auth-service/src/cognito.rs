use async_trait::async_trait;
use aws_sdk_cognitoidentityprovider::types::AuthFlowType;
use aws_sdk_cognitoidentityprovider::Client as CognitoClient;
use onboarding_common::{AwsResultExt, OnboardingResult};
use tracing::info;

use crate::{AuthOutcome, AuthTokens, UserDirectory};

/// Largest page `ListUserPools` accepts.
const MAX_USER_POOLS: i32 = 60;

pub struct CognitoDirectory {
    client: CognitoClient,
}

impl CognitoDirectory {
    pub fn new(client: CognitoClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl UserDirectory for CognitoDirectory {
    async fn list_user_pools(&self) -> OnboardingResult<Vec<String>> {
        let result = self
            .client
            .list_user_pools()
            .max_results(MAX_USER_POOLS)
            .send()
            .await
            .aws("CognitoIdentity::ListUserPools")?;

        Ok(result
            .user_pools()
            .iter()
            .filter_map(|pool| pool.id().map(str::to_owned))
            .collect())
    }

    async fn list_usernames(&self, user_pool_id: &str) -> OnboardingResult<Vec<String>> {
        let result = self
            .client
            .list_users()
            .user_pool_id(user_pool_id)
            .send()
            .await
            .aws("CognitoIdentity::ListUsers")?;

        let mut usernames = Vec::new();
        for user in result.users() {
            let attributes: Vec<String> = user
                .attributes()
                .iter()
                .map(|attr| format!("{}={}", attr.name(), attr.value().unwrap_or_default()))
                .collect();
            info!(
                "Pool {} user {:?} status {:?} attributes [{}]",
                user_pool_id,
                user.username(),
                user.user_status().map(|status| status.as_str()),
                attributes.join(", ")
            );

            if let Some(username) = user.username() {
                usernames.push(username.to_string());
            }
        }
        Ok(usernames)
    }

    async fn first_app_client(&self, user_pool_id: &str) -> OnboardingResult<Option<String>> {
        let result = self
            .client
            .list_user_pool_clients()
            .user_pool_id(user_pool_id)
            .send()
            .await
            .aws("CognitoIdentity::ListUserPoolClients")?;

        Ok(result
            .user_pool_clients()
            .first()
            .and_then(|client| client.client_id())
            .map(str::to_owned))
    }

    async fn admin_initiate_auth(
        &self,
        user_pool_id: &str,
        client_id: &str,
        username: &str,
        password: &str,
    ) -> OnboardingResult<AuthOutcome> {
        let result = self
            .client
            .admin_initiate_auth()
            .user_pool_id(user_pool_id)
            .client_id(client_id)
            .auth_flow(AuthFlowType::AdminNoSrpAuth)
            .auth_parameters("USERNAME", username)
            .auth_parameters("PASSWORD", password)
            .send()
            .await
            .aws("CognitoIdentity::AdminInitiateAuth")?;

        if let Some(challenge) = result.challenge_name() {
            return Ok(AuthOutcome::Challenge(challenge.as_str().to_string()));
        }

        let tokens = result
            .authentication_result()
            .map(|auth| AuthTokens {
                access_token: auth.access_token().map(str::to_owned),
                id_token: auth.id_token().map(str::to_owned),
                expires_in: auth.expires_in(),
                refresh_token: auth.refresh_token().map(str::to_owned),
                token_type: auth.token_type().map(str::to_owned),
            })
            .unwrap_or_default();
        Ok(AuthOutcome::Authenticated(tokens))
    }
}

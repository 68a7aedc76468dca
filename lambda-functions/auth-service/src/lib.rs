//! Tenant user sign-in. The user pool is not known up front, so every pool in
//! the account is searched for the username before authenticating against the
//! first pool that has it.

mod cognito;

pub use cognito::CognitoDirectory;

use async_trait::async_trait;
use lambda_http::http::StatusCode;
use lambda_http::{Body, Request, Response};
use onboarding_common::{api, warmup, OnboardingError, OnboardingResult};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

#[derive(Deserialize, Debug, Clone, Default)]
pub struct AuthRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AuthRequest {
    fn credentials(&self) -> Option<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) if !username.is_empty() => Some((username, password)),
            _ => None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: Option<String>,
    pub id_token: Option<String>,
    pub expires_in: i32,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    Authenticated(AuthTokens),
    /// Cognito wants another step (e.g. `NEW_PASSWORD_REQUIRED`).
    Challenge(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn list_user_pools(&self) -> OnboardingResult<Vec<String>>;

    async fn list_usernames(&self, user_pool_id: &str) -> OnboardingResult<Vec<String>>;

    async fn first_app_client(&self, user_pool_id: &str) -> OnboardingResult<Option<String>>;

    async fn admin_initiate_auth(
        &self,
        user_pool_id: &str,
        client_id: &str,
        username: &str,
        password: &str,
    ) -> OnboardingResult<AuthOutcome>;
}

pub struct AuthService<D> {
    directory: D,
}

impl<D: UserDirectory> AuthService<D> {
    pub fn new(directory: D) -> Self {
        Self { directory }
    }

    pub async fn handle(&self, request: &Request) -> Response<Body> {
        if warmup::is_warmup(request) {
            info!("Warming up");
            return api::empty(StatusCode::OK);
        }

        let auth: AuthRequest = match api::parse_object(request.body().as_ref()) {
            Ok(auth) => auth,
            Err(e) => {
                error!("Unable to parse sign-in request: {}", e);
                return api::invalid_body();
            }
        };
        let Some((username, password)) = auth.credentials() else {
            return api::invalid_body();
        };

        match self.authenticate(username, password).await {
            Ok(response) => response,
            Err(e) => {
                error!("Sign-in failed for {}: {}", username, e);
                api::bad_request(&e.to_string())
            }
        }
    }

    /// Pools that contain `username`, in listing order.
    pub async fn user_pools_for(&self, username: &str) -> OnboardingResult<Vec<String>> {
        let mut matches = Vec::new();
        for pool in self.directory.list_user_pools().await? {
            let usernames = self.directory.list_usernames(&pool).await?;
            if usernames.iter().any(|name| name == username) {
                info!("User {} found in pool {}", username, pool);
                matches.push(pool);
            }
        }
        Ok(matches)
    }

    async fn authenticate(&self, username: &str, password: &str) -> OnboardingResult<Response<Body>> {
        let pools = self.user_pools_for(username).await?;
        let pool = pools
            .first()
            .ok_or_else(|| OnboardingError::Invalid(format!("User {} not found", username)))?;

        let client = self
            .directory
            .first_app_client(pool)
            .await?
            .ok_or_else(|| OnboardingError::Invalid(format!("No app client for user pool {}", pool)))?;

        let outcome = self
            .directory
            .admin_initiate_auth(pool, &client, username, password)
            .await;

        Ok(match outcome {
            Ok(AuthOutcome::Authenticated(tokens)) => api::ok(&tokens),
            Ok(AuthOutcome::Challenge(challenge)) => {
                info!("Sign-in for {} requires challenge {}", username, challenge);
                api::message(StatusCode::UNAUTHORIZED, &challenge)
            }
            Err(e) => {
                error!("Cognito rejected sign-in for {}: {}", username, e);
                api::message(StatusCode::UNAUTHORIZED, &e.service_message())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn test_credentials_require_username_and_password() {
        let full = AuthRequest {
            username: Some("ada@example.com".to_string()),
            password: Some("Secret#1".to_string()),
        };
        assert_eq!(full.credentials(), Some(("ada@example.com", "Secret#1")));
        assert_eq!(AuthRequest::default().credentials(), None);

        let blank = AuthRequest {
            username: Some(String::new()),
            password: Some("x".to_string()),
        };
        assert_eq!(blank.credentials(), None);
    }

    #[tokio::test]
    async fn test_user_pools_for_collects_every_match() {
        let mut directory = MockUserDirectory::new();
        directory
            .expect_list_user_pools()
            .returning(|| Ok(vec!["pool-a".into(), "pool-b".into(), "pool-c".into()]));
        directory
            .expect_list_usernames()
            .with(eq("pool-a"))
            .returning(|_| Ok(vec!["ada@example.com".into()]));
        directory
            .expect_list_usernames()
            .with(eq("pool-b"))
            .returning(|_| Ok(vec!["grace@example.com".into()]));
        directory
            .expect_list_usernames()
            .with(eq("pool-c"))
            .returning(|_| Ok(vec!["grace@example.com".into(), "ada@example.com".into()]));

        let service = AuthService::new(directory);
        let pools = service.user_pools_for("ada@example.com").await.unwrap();

        assert_eq!(pools, vec!["pool-a".to_string(), "pool-c".to_string()]);
    }

    #[test]
    fn test_tokens_json_structure() {
        let tokens = AuthTokens {
            access_token: Some("access".into()),
            id_token: Some("id".into()),
            expires_in: 3600,
            refresh_token: Some("refresh".into()),
            token_type: Some("Bearer".into()),
        };

        let json = serde_json::to_value(&tokens).unwrap();
        assert_eq!(json["accessToken"], "access");
        assert_eq!(json["idToken"], "id");
        assert_eq!(json["expiresIn"], 3600);
        assert_eq!(json["refreshToken"], "refresh");
        assert_eq!(json["tokenType"], "Bearer");
    }
}

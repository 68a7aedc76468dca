use aws_smithy_runtime_api::client::result::SdkError;
use aws_smithy_types::error::display::DisplayErrorContext;
use aws_smithy_types::error::metadata::ProvideErrorMetadata;
use aws_smithy_types::error::operation::BuildError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OnboardingError {
    #[error("{operation}: {message}")]
    Aws {
        operation: &'static str,
        message: String,
    },

    #[error("{0}")]
    TenantApi(String),

    #[error("Failed to get all required settings from Parameter Store: {0}")]
    MissingSettings(String),

    #[error("Cannot register new tenant. Hot pool of RDS clusters has been depleted.")]
    PoolDepleted,

    #[error("{0}")]
    Invalid(String),

    #[error("Tenant {0} not found")]
    TenantNotFound(String),

    #[error("Invalid AWS request: {0}")]
    Build(#[from] BuildError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DynamoDB item error: {0}")]
    Item(#[from] serde_dynamo::Error),
}

impl OnboardingError {
    /// The message reported by the remote service, without the operation name.
    pub fn service_message(&self) -> String {
        match self {
            OnboardingError::Aws { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type OnboardingResult<T> = Result<T, OnboardingError>;

/// Tags an AWS SDK failure with the operation that produced it, e.g.
/// `CognitoIdentity::AdminInitiateAuth`.
pub trait AwsResultExt<T> {
    fn aws(self, operation: &'static str) -> OnboardingResult<T>;
}

impl<T, E, R> AwsResultExt<T> for Result<T, SdkError<E, R>>
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    fn aws(self, operation: &'static str) -> OnboardingResult<T> {
        self.map_err(|err| {
            let message = err
                .message()
                .map(str::to_owned)
                .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
            OnboardingError::Aws { operation, message }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aws_error_display() {
        let err = OnboardingError::Aws {
            operation: "CognitoIdentity::AdminInitiateAuth",
            message: "Incorrect username or password.".to_string(),
        };

        assert_eq!(
            err.to_string(),
            "CognitoIdentity::AdminInitiateAuth: Incorrect username or password."
        );
        assert_eq!(err.service_message(), "Incorrect username or password.");
    }

    #[test]
    fn test_pool_depleted_message() {
        let err = OnboardingError::PoolDepleted;
        assert_eq!(
            err.service_message(),
            "Cannot register new tenant. Hot pool of RDS clusters has been depleted."
        );
    }

    #[test]
    fn test_missing_settings_lists_names() {
        let err = OnboardingError::MissingSettings("VPC, ALB_LISTENER".to_string());
        assert!(err.to_string().ends_with("VPC, ALB_LISTENER"));
    }
}

//! Pieces shared by the tenant onboarding functions.

pub mod api;
pub mod custom_resource;
pub mod error;
pub mod model;
pub mod password;
pub mod pool;
pub mod warmup;

pub use custom_resource::{
    complete, required, CustomResourceEvent, HttpResponder, RequestKind, Responder, ResponseData,
};
pub use error::{AwsResultExt, OnboardingError, OnboardingResult};
pub use model::{AvailableDatabase, Registration, Tenant};
pub use pool::{DatabasePool, DynamoDatabasePool};

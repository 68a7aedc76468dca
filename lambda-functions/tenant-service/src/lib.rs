mod route;
mod store;

pub use route::Route;
pub use store::{tenant_table, DynamoTenantStore, TenantField, TenantStore, DEFAULT_TENANT_TABLE};

use std::time::Instant;

use lambda_http::http::StatusCode;
use lambda_http::{Body, Request, Response};
use onboarding_common::{api, warmup, DatabasePool, OnboardingError, OnboardingResult, Tenant};
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

pub struct TenantService<S, P> {
    store: S,
    pool: P,
}

impl<S: TenantStore, P: DatabasePool> TenantService<S, P> {
    pub fn new(store: S, pool: P) -> Self {
        Self { store, pool }
    }

    pub async fn handle(&self, request: &Request) -> Response<Body> {
        let start = Instant::now();
        let route = Route::parse(request.method(), request.uri().path());

        if warmup::is_warmup(request) {
            info!("Warming up {:?}", route);
            return api::empty(StatusCode::OK);
        }

        let response = match self.dispatch(&route, request.body().as_ref()).await {
            Ok(response) => response,
            Err(e) => {
                error!("{:?} failed: {}", route, e);
                api::message(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
            }
        };

        info!(
            "{:?} exec time: {} ms, status {}",
            route,
            start.elapsed().as_millis(),
            response.status()
        );
        response
    }

    async fn dispatch(&self, route: &Route, body: &[u8]) -> OnboardingResult<Response<Body>> {
        match route {
            Route::List => Ok(api::ok(&self.store.list().await?)),
            Route::NextAvailableDatabase => match self.pool.next_available().await? {
                Some(database) => Ok(api::ok(&database)),
                None => Ok(api::ok(&json!({}))),
            },
            Route::Get(id) => match self.store.get(id).await? {
                Some(tenant) => Ok(api::ok(&tenant)),
                None => Ok(api::message(StatusCode::NOT_FOUND, "Tenant not found")),
            },
            Route::Insert => {
                let Some(mut tenant) = parse_tenant(body) else {
                    return Ok(api::invalid_body());
                };
                tenant.id.get_or_insert_with(Uuid::new_v4);
                tenant.active.get_or_insert(true);

                self.store.put(&tenant).await?;
                Ok(api::ok(&tenant))
            }
            Route::Update(id) => {
                let Some(tenant) = tenant_for_path(body, id) else {
                    return Ok(api::invalid_body());
                };
                self.store.put(&tenant).await?;
                Ok(api::ok(&tenant))
            }
            Route::Delete(id) => {
                if tenant_for_path(body, id).is_none() {
                    return Ok(api::invalid_body());
                }
                self.store.delete(id).await?;
                Ok(api::empty(StatusCode::OK))
            }
            Route::UpdateDatabase(id) => {
                let value = tenant_for_path(body, id).and_then(|t| t.database);
                self.set_field(id, TenantField::Database, value).await
            }
            Route::UpdateUserPool(id) => {
                let value = tenant_for_path(body, id).and_then(|t| t.user_pool);
                self.set_field(id, TenantField::UserPool, value).await
            }
            Route::NotFound => Ok(api::message(StatusCode::NOT_FOUND, "Not found")),
        }
    }

    async fn set_field(
        &self,
        id: &str,
        field: TenantField,
        value: Option<String>,
    ) -> OnboardingResult<Response<Body>> {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(value) => match self.store.set_field(id, field, &value).await {
                Ok(tenant) => {
                    info!("Tenant {} {} set to {}", id, field, value);
                    Ok(api::ok(&tenant))
                }
                Err(OnboardingError::TenantNotFound(_)) => {
                    Ok(api::message(StatusCode::NOT_FOUND, "Tenant not found"))
                }
                Err(e) => Err(e),
            },
            None => Ok(api::invalid_body()),
        }
    }
}

fn parse_tenant(body: &[u8]) -> Option<Tenant> {
    match api::parse_object(body) {
        Ok(tenant) => Some(tenant),
        Err(e) => {
            error!("Unable to parse tenant: {}", e);
            None
        }
    }
}

/// The request body as a tenant, provided its id matches the one in the path.
fn tenant_for_path(body: &[u8], id: &str) -> Option<Tenant> {
    parse_tenant(body).filter(|tenant| tenant.has_id(id))
}

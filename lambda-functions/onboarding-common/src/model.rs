use bon::Builder;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant record as stored by the tenant service and exchanged over its API.
#[derive(Builder, Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_pool: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl Tenant {
    /// True when the tenant carries an id equal to `id` (as found in a request path).
    pub fn has_id(&self, id: &str) -> bool {
        self.id.is_some_and(|own| own.to_string() == id)
    }

    /// First eight characters of the tenant id. Used to name per-tenant resources.
    pub fn short_id(&self) -> Option<String> {
        self.id.map(|id| id.to_string()[..8].to_string())
    }
}

/// Sign-up form posted to the registration service.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub company: Option<String>,
    pub plan: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Registration {
    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|field| field.is_none())
    }

    /// Names of the fields that are absent or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        const NAMES: [&str; 6] = ["company", "plan", "firstName", "lastName", "email", "password"];
        NAMES
            .iter()
            .zip(self.fields())
            .filter(|(_, value)| value.map_or(true, |v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect()
    }

    fn fields(&self) -> [Option<&str>; 6] {
        [
            self.company.as_deref(),
            self.plan.as_deref(),
            self.first_name.as_deref(),
            self.last_name.as_deref(),
            self.email.as_deref(),
            self.password.as_deref(),
        ]
    }
}

/// An unclaimed RDS cluster from the hot pool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AvailableDatabase {
    #[serde(rename = "DBClusterIdentifier")]
    pub cluster_identifier: String,

    #[serde(rename = "Endpoint")]
    pub endpoint: String,
}

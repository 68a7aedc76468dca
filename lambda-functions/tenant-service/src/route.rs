use lambda_http::http::Method;

/// Tenant API operations, keyed by method and the path below `tenants`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    List,
    NextAvailableDatabase,
    Get(String),
    Insert,
    Update(String),
    Delete(String),
    UpdateDatabase(String),
    UpdateUserPool(String),
    NotFound,
}

impl Route {
    pub fn parse(method: &Method, path: &str) -> Self {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some(start) = segments.iter().position(|s| *s == "tenants") else {
            return Route::NotFound;
        };

        match (method, &segments[start + 1..]) {
            (&Method::GET, []) => Route::List,
            (&Method::POST, []) => Route::Insert,
            (&Method::GET, ["pool", "database"]) => Route::NextAvailableDatabase,
            (&Method::GET, [id]) => Route::Get(id.to_string()),
            (&Method::PUT, [id]) => Route::Update(id.to_string()),
            (&Method::DELETE, [id]) => Route::Delete(id.to_string()),
            (&Method::PUT, [id, "database"]) => Route::UpdateDatabase(id.to_string()),
            (&Method::PUT, [id, "userpool"]) => Route::UpdateUserPool(id.to_string()),
            _ => Route::NotFound,
        }
    }
}

use sqlx::PgPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub db_schema: Option<String>,
    pub env_name: String,
    pub default_currency: String,
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    pub gateway_base_url: Option<String>,
    pub gateway_store_id: Option<String>,
    pub gateway_store_passwd: Option<String>,
    pub callback_secret: Option<String>,
    pub public_base_url: String,
    pub frontend_base_url: String,
    pub http: reqwest::Client,
}

impl AppState {
    pub fn table(&self, name: &str) -> String {
        match &self.db_schema {
            Some(s) => format!("{s}.{name}"),
            None => name.to_string(),
        }
    }
}

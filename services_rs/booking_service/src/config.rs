use regex::Regex;
use std::env;
use vistara_common::secret_policy;

#[derive(Clone, Debug)]
pub struct Config {
    pub env_name: String,

    pub host: String,
    pub port: u16,
    pub max_body_bytes: usize,

    pub db_url: String,
    pub db_schema: Option<String>,

    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,

    pub gateway_base_url: Option<String>,
    pub gateway_store_id: Option<String>,
    pub gateway_store_passwd: Option<String>,
    pub callback_secret: Option<String>,

    pub public_base_url: String,
    pub frontend_base_url: String,

    pub allowed_hosts: Vec<String>,
    pub allowed_origins: Vec<String>,

    pub default_currency: String,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(v) => {
            let v = v.trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        }
        Err(_) => None,
    }
}

fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn normalize_db_url(raw: &str) -> String {
    // Accept SQLAlchemy-style URLs like "postgresql+psycopg://..." by dropping
    // the "+driver" portion.
    if let Some(colon) = raw.find(':') {
        let (scheme, rest) = raw.split_at(colon);
        if let Some(plus) = scheme.find('+') {
            return format!("{}{}", &scheme[..plus], rest);
        }
    }
    raw.to_string()
}

fn validate_postgres_url(url: &str) -> Result<(), String> {
    let scheme = url
        .split_once(':')
        .map(|(s, _)| s.trim().to_lowercase())
        .unwrap_or_default();
    match scheme.as_str() {
        "postgres" | "postgresql" => Ok(()),
        _ => Err("BOOKING_DB_URL (or DB_URL) must be a postgres URL".to_string()),
    }
}

fn base_url(key: &str, default: &str, prod_like: bool) -> Result<String, String> {
    let raw = env_or(key, default);
    let url = raw.trim().trim_end_matches('/').to_string();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(format!("{key} must be an http(s) URL"));
    }
    if prod_like && !url.starts_with("https://") {
        return Err(format!("{key} must use https:// in prod/staging"));
    }
    Ok(url)
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let env_name = env_or("ENV", "dev");
        let env_lower = env_name.trim().to_lowercase();
        let prod_like = matches!(env_lower.as_str(), "prod" | "production" | "staging");

        let host = env_or("APP_HOST", "0.0.0.0");
        let port: u16 = env_or("APP_PORT", "8084")
            .parse()
            .map_err(|_| "APP_PORT must be a valid u16".to_string())?;

        let db_raw = env_opt("BOOKING_DB_URL")
            .or_else(|| env_opt("DB_URL"))
            .unwrap_or_else(|| "postgresql://vistara:vistara@db:5432/vistara_booking".to_string());
        let db_url = normalize_db_url(&db_raw);
        validate_postgres_url(&db_url)?;

        let db_schema = env_opt("DB_SCHEMA");
        if let Some(s) = &db_schema {
            let re = Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").map_err(|e| e.to_string())?;
            if !re.is_match(s) {
                return Err("DB_SCHEMA must match ^[A-Za-z_][A-Za-z0-9_]*$".to_string());
            }
        }

        let jwt_secret = env_opt("JWT_SECRET");
        if prod_like && jwt_secret.as_deref().unwrap_or("").trim().is_empty() {
            return Err("JWT_SECRET must be set in prod/staging".to_string());
        }
        secret_policy::validate_secret_for_env(
            &env_name,
            "JWT_SECRET",
            jwt_secret.as_deref(),
            true,
        )?;
        let jwt_secret = jwt_secret.unwrap_or_else(|| "vistara-local-jwt".to_string());

        let jwt_ttl_secs: i64 = env_or("JWT_TTL_SECS", "86400")
            .parse()
            .map_err(|_| "JWT_TTL_SECS must be an integer".to_string())?;
        let jwt_ttl_secs = jwt_ttl_secs.clamp(300, 7 * 24 * 3600);

        let gateway_base_url = env_opt("PAYMENT_GATEWAY_BASE_URL");
        let gateway_store_id = env_opt("GATEWAY_STORE_ID");
        let gateway_store_passwd = env_opt("GATEWAY_STORE_PASSWD");
        if prod_like {
            if gateway_base_url.as_deref().unwrap_or("").trim().is_empty() {
                return Err("PAYMENT_GATEWAY_BASE_URL must be set in prod/staging".to_string());
            }
            if gateway_store_id.as_deref().unwrap_or("").trim().is_empty() {
                return Err("GATEWAY_STORE_ID must be set in prod/staging".to_string());
            }
        }
        if let Some(base) = gateway_base_url.as_deref() {
            if !(base.starts_with("http://") || base.starts_with("https://")) {
                return Err("PAYMENT_GATEWAY_BASE_URL must be an http(s) URL".to_string());
            }
            if prod_like && !base.starts_with("https://") {
                return Err(
                    "PAYMENT_GATEWAY_BASE_URL must use https:// in prod/staging".to_string(),
                );
            }
        }
        secret_policy::validate_secret_for_env(
            &env_name,
            "GATEWAY_STORE_PASSWD",
            gateway_store_passwd.as_deref(),
            true,
        )?;

        let callback_secret = env_opt("PAYMENTS_CALLBACK_SECRET");
        secret_policy::validate_secret_for_env(
            &env_name,
            "PAYMENTS_CALLBACK_SECRET",
            callback_secret.as_deref(),
            true,
        )?;

        let public_base_url = base_url("PUBLIC_BASE_URL", "http://localhost:8084", prod_like)?;
        let frontend_base_url = base_url("FRONTEND_BASE_URL", "http://localhost:3000", prod_like)?;

        let mut allowed_hosts = parse_csv(&env_or("ALLOWED_HOSTS", ""));
        if allowed_hosts.is_empty() {
            // Fail closed on missing host allowlist:
            // - dev/test keep loopback defaults for local ergonomics
            // - prod/staging requires explicit external hosts from ALLOWED_HOSTS
            if matches!(env_lower.as_str(), "dev" | "test") {
                allowed_hosts = vec!["localhost".to_string(), "127.0.0.1".to_string()];
            }
        }
        if matches!(env_lower.as_str(), "dev" | "test") {
            for extra in ["localhost", "127.0.0.1"] {
                if !allowed_hosts.iter().any(|h| h == extra) {
                    allowed_hosts.push(extra.to_string());
                }
            }
        }
        for extra in ["booking"] {
            if !allowed_hosts.iter().any(|h| h == extra) {
                allowed_hosts.push(extra.to_string());
            }
        }
        if prod_like && allowed_hosts.iter().any(|h| h.trim() == "*") {
            return Err("ALLOWED_HOSTS must not contain '*' in prod/staging".to_string());
        }

        let mut allowed_origins = parse_csv(&env_or("ALLOWED_ORIGINS", ""));
        if allowed_origins.is_empty() {
            allowed_origins = vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ];
        }
        if prod_like && allowed_origins.iter().any(|o| o.trim() == "*") {
            return Err("ALLOWED_ORIGINS must not contain '*' in prod/staging".to_string());
        }
        if prod_like
            && allowed_origins
                .iter()
                .any(|o| !o.trim().starts_with("https://"))
        {
            return Err("ALLOWED_ORIGINS must use https:// origins in prod/staging".to_string());
        }

        let max_body_bytes: usize = env_or("BOOKING_MAX_BODY_BYTES", "1048576")
            .parse()
            .map_err(|_| "BOOKING_MAX_BODY_BYTES must be an integer".to_string())?;
        let max_body_bytes = max_body_bytes.clamp(16 * 1024, 10 * 1024 * 1024);

        let mut default_currency = env_or("DEFAULT_CURRENCY", "BDT").trim().to_uppercase();
        if default_currency.is_empty() {
            default_currency = "BDT".to_string();
        }
        if default_currency.len() > 3 {
            default_currency.truncate(3);
        }

        Ok(Self {
            env_name,
            host,
            port,
            max_body_bytes,
            db_url,
            db_schema,
            jwt_secret,
            jwt_ttl_secs,
            gateway_base_url,
            gateway_store_id,
            gateway_store_passwd,
            callback_secret,
            public_base_url,
            frontend_base_url,
            allowed_hosts,
            allowed_origins,
            default_currency,
        })
    }
}

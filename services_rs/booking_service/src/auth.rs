use crate::error::{ApiError, ApiResult};
use crate::lifecycle::Role;
use crate::models::{AuthOut, LoginReq, RegisterReq};
use crate::state::AppState;
use argon2::password_hash::{PasswordHasher, SaltString};
use argon2::{Argon2, PasswordHash, PasswordVerifier};
use axum::extract::State;
use axum::http::HeaderMap;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    role: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Clone)]
pub struct AuthedUser {
    pub user_id: String,
    pub role: Role,
}

pub fn issue_token(
    jwt_secret: &str,
    ttl_secs: i64,
    user_id: &str,
    role: Role,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        iat: now,
        exp: now + ttl_secs,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
}

fn decode_token(jwt_secret: &str, token: &str) -> ApiResult<AuthedUser> {
    let mut validation = jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.leeway = 10;
    validation.validate_exp = true;

    let data = jsonwebtoken::decode::<Claims>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map_err(|_| ApiError::unauthorized("invalid or expired token"))?;

    let role = Role::parse(&data.claims.role)
        .ok_or_else(|| ApiError::unauthorized("invalid or expired token"))?;
    let user_id = data.claims.sub.trim().to_string();
    if user_id.is_empty() {
        return Err(ApiError::unauthorized("invalid or expired token"));
    }
    Ok(AuthedUser { user_id, role })
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .and_then(|v| {
            let (scheme, rest) = v.split_once(' ')?;
            if !scheme.eq_ignore_ascii_case("bearer") {
                return None;
            }
            let rest = rest.trim();
            if rest.is_empty() {
                None
            } else {
                Some(rest)
            }
        })
}

pub fn authenticate(state: &AppState, headers: &HeaderMap) -> ApiResult<AuthedUser> {
    let token =
        bearer_token(headers).ok_or_else(|| ApiError::unauthorized("missing bearer token"))?;
    decode_token(&state.jwt_secret, token)
}

fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            tracing::error!(error = %e, "password hash failed");
            ApiError::internal("internal error")
        })
}

fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn normalize_email(raw: &str) -> ApiResult<String> {
    let email = raw.trim().to_ascii_lowercase();
    let ok = email.len() >= 3
        && email.len() <= 255
        && email.split_once('@').is_some_and(|(local, domain)| {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        });
    if !ok {
        return Err(ApiError::bad_request("invalid email"));
    }
    Ok(email)
}

// Self-service registration covers tourists and guides; admins are provisioned
// out of band.
fn parse_registration_role(raw: Option<&str>) -> ApiResult<Role> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(Role::Tourist);
    };
    match Role::parse(raw) {
        Some(Role::Admin) | None => Err(ApiError::bad_request("role must be tourist or guide")),
        Some(role) => Ok(role),
    }
}

pub async fn register(
    State(state): State<AppState>,
    axum::Json(body): axum::Json<RegisterReq>,
) -> ApiResult<(axum::http::StatusCode, axum::Json<AuthOut>)> {
    let email = normalize_email(&body.email)?;
    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request("password too short"));
    }
    let role = parse_registration_role(body.role.as_deref())?;

    let users = state.table("users");
    let existing = sqlx::query(&format!("SELECT id FROM {users} WHERE email=$1"))
        .bind(&email)
        .fetch_optional(&state.pool)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "db register lookup failed");
            ApiError::internal("database error")
        })?;
    if existing.is_some() {
        return Err(ApiError::conflict("email already registered"));
    }

    let password_hash = hash_password(&body.password)?;
    let id = Uuid::new_v4().to_string();
    let now = Utc::now().to_rfc3339();

    sqlx::query(&format!(
        "INSERT INTO {users} (id,email,password_hash,full_name,role,created_at) VALUES ($1,$2,$3,$4,$5,$6)"
    ))
    .bind(&id)
    .bind(&email)
    .bind(&password_hash)
    .bind(
        body.full_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty()),
    )
    .bind(role.as_str())
    .bind(&now)
    .execute(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "db register insert failed");
        ApiError::internal("database error")
    })?;

    let access_token = issue_token(&state.jwt_secret, state.jwt_ttl_secs, &id, role)
        .map_err(|e| {
            tracing::error!(error = %e, "token issue failed");
            ApiError::internal("internal error")
        })?;
    tracing::info!(user_id = %id, role = role.as_str(), "user registered");

    Ok((
        axum::http::StatusCode::CREATED,
        axum::Json(AuthOut {
            access_token,
            user_id: id,
            role: role.as_str().to_string(),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    axum::Json(body): axum::Json<LoginReq>,
) -> ApiResult<axum::Json<AuthOut>> {
    let email = normalize_email(&body.email).map_err(|_| invalid_credentials())?;

    let users = state.table("users");
    let row = sqlx::query(&format!(
        "SELECT id,password_hash,role FROM {users} WHERE email=$1"
    ))
    .bind(&email)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| {
        tracing::error!(error = %e, "db login lookup failed");
        ApiError::internal("database error")
    })?
    .ok_or_else(invalid_credentials)?;

    let stored_hash: String = row.try_get("password_hash").unwrap_or_default();
    if !verify_password(&body.password, &stored_hash) {
        return Err(invalid_credentials());
    }

    let user_id: String = row.try_get("id").unwrap_or_default();
    let role = Role::parse(&row.try_get::<String, _>("role").unwrap_or_default())
        .unwrap_or(Role::Tourist);

    let access_token = issue_token(&state.jwt_secret, state.jwt_ttl_secs, &user_id, role)
        .map_err(|e| {
            tracing::error!(error = %e, "token issue failed");
            ApiError::internal("internal error")
        })?;

    Ok(axum::Json(AuthOut {
        access_token,
        user_id,
        role: role.as_str().to_string(),
    }))
}

// Generic on purpose so login cannot be used to enumerate accounts.
fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("invalid credentials")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    #[test]
    fn token_round_trip_preserves_identity() {
        let token = issue_token("unit-test-secret", 3600, "user-1", Role::Guide).expect("token");
        let user = decode_token("unit-test-secret", &token).expect("decode");
        assert_eq!(user.user_id, "user-1");
        assert_eq!(user.role, Role::Guide);
    }

    #[test]
    fn token_with_wrong_secret_is_rejected() {
        let token = issue_token("unit-test-secret", 3600, "user-1", Role::Tourist).expect("token");
        let err = decode_token("another-secret", &token).expect_err("must reject");
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn bearer_extraction_works() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn email_normalization_works() {
        assert_eq!(normalize_email(" Alice@Vistara.App ").unwrap(), "alice@vistara.app");
        assert!(normalize_email("not-an-email").is_err());
        assert!(normalize_email("a@.bad").is_err());
    }

    #[test]
    fn admin_self_registration_is_rejected() {
        assert_eq!(parse_registration_role(None).unwrap(), Role::Tourist);
        assert_eq!(parse_registration_role(Some("guide")).unwrap(), Role::Guide);
        assert!(parse_registration_role(Some("admin")).is_err());
        assert!(parse_registration_role(Some("owner")).is_err());
    }

    #[test]
    fn password_hash_and_verify_round_trip() {
        let hash = hash_password("correct horse battery").expect("hash");
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong", &hash));
    }
}

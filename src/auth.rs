use actix_web::cookie::{time::Duration, Cookie, SameSite};
use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    error::ErrorUnauthorized,
    http::header,
    middleware::Next,
    web, Error, HttpMessage, HttpRequest, HttpResponse,
};
use actix_web_httpauth::extractors::basic::BasicAuth;
use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use serde_json::json;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    models::{UserRow, ROLE_ADMIN, ROLE_BARBER},
    state::AppState,
};

pub const AUTH_REALM: &str = "Barbershop";
const SIGNED_OUT_COOKIE: &str = "shop_logged_out";

/// Staff member resolved from Basic credentials, stored in request extensions.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub display_name: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }
}

pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

fn password_matches(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|hash| {
            Argon2::default()
                .verify_password(password.as_bytes(), &hash)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Looks up an active account and checks its password. Lookup failures are
/// logged and treated as bad credentials.
pub async fn authenticate_credentials(
    pool: &SqlitePool,
    username: &str,
    password: &str,
) -> Option<AuthUser> {
    let user = sqlx::query_as::<_, UserRow>(
        r#"SELECT id, username, display_name, role, password_hash, active, created_at
           FROM users
           WHERE username = ? AND active = 1
           LIMIT 1"#,
    )
    .bind(username)
    .fetch_optional(pool)
    .await
    .map_err(|err| log::error!("Credential lookup failed: {err}"))
    .ok()??;

    password_matches(password, &user.password_hash).then(|| AuthUser {
        id: user.id,
        display_name: user.display_name,
        role: user.role,
    })
}

async fn admit(
    req: ServiceRequest,
    credentials: BasicAuth,
    role: Option<&'static str>,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let Some(state) = req.app_data::<web::Data<AppState>>().cloned() else {
        return Err((ErrorUnauthorized("Unauthorized"), req));
    };
    let user = authenticate_credentials(
        &state.db,
        credentials.user_id(),
        credentials.password().unwrap_or_default(),
    )
    .await;

    match user {
        Some(user) if role.map_or(true, |role| user.role == role) => {
            req.extensions_mut().insert(user);
            Ok(req)
        }
        Some(user) => {
            log::debug!("{} ({}) refused on {}", user.display_name, user.role, req.path());
            Err((ErrorUnauthorized("Unauthorized"), req))
        }
        None => Err((ErrorUnauthorized("Unauthorized"), req)),
    }
}

/// Any active staff account.
pub async fn staff_validator(
    req: ServiceRequest,
    credentials: BasicAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    admit(req, credentials, None).await
}

pub async fn admin_validator(
    req: ServiceRequest,
    credentials: BasicAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    admit(req, credentials, Some(ROLE_ADMIN)).await
}

pub async fn barber_validator(
    req: ServiceRequest,
    credentials: BasicAuth,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    admit(req, credentials, Some(ROLE_BARBER)).await
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn signed_out_cookie(req: &HttpRequest, value: &'static str, max_age: Duration) -> Cookie<'static> {
    let mut builder = Cookie::build(SIGNED_OUT_COOKIE, value)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(max_age);
    if req.connection_info().scheme() == "https" {
        builder = builder.secure(true);
    }
    builder.finish()
}

pub fn logout_cookie(req: &HttpRequest) -> Cookie<'static> {
    signed_out_cookie(req, "1", Duration::days(365))
}

pub fn clear_logout_cookie(req: &HttpRequest) -> Cookie<'static> {
    signed_out_cookie(req, "", Duration::ZERO)
}

/// Browsers keep replaying Basic credentials, so a logged-out session is
/// tracked with a cookie and rejected here until the next `/login`.
pub async fn logout_guard<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<BoxBody>, Error>
where
    B: MessageBody + 'static,
{
    if req.cookie(SIGNED_OUT_COOKIE).is_none() {
        return Ok(next.call(req).await?.map_into_boxed_body());
    }

    let home = if req.path().starts_with("/barber") {
        "/barber/bookings"
    } else {
        "/admin/dashboard"
    };
    let response = HttpResponse::Unauthorized()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(json!({
            "error": "logged_out",
            "message": "Your session has been closed.",
            "login": format!("/login?next={home}"),
        }));
    Ok(req.into_response(response))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_verifies() {
        let hash = hash_password("clippers").unwrap();
        assert!(password_matches("clippers", &hash));
        assert!(!password_matches("scissors", &hash));
        assert!(!password_matches("clippers", "not-a-hash"));
    }
}

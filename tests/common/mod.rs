#![allow(dead_code)]

use actix_web_httpauth::headers::authorization::{Authorization, Basic};
use barbershop::{
    auth::{new_id, AuthUser},
    config::AppConfig,
    db, init_state,
    models::ROLE_ADMIN,
    state::AppState,
};
use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};

pub const ADMIN_USER: &str = "admin";
pub const ADMIN_PASSWORD: &str = "secret-pass";
pub const BARBER_USER: &str = "marco";
pub const BARBER_PASSWORD: &str = "clippers";

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        admin_user: ADMIN_USER.to_string(),
        admin_password: ADMIN_PASSWORD.to_string(),
        ..AppConfig::default()
    }
}

pub async fn test_state() -> AppState {
    init_state(&test_config()).await.expect("test state")
}

pub async fn add_barber(state: &AppState) -> String {
    let mut conn = state.db.acquire().await.expect("connection");
    db::insert_barber(&mut conn, BARBER_USER, "Marco Ruiz", BARBER_PASSWORD)
        .await
        .expect("barber")
}

pub async fn add_service(state: &AppState, price: f64) -> String {
    let id = new_id();
    sqlx::query(
        r#"INSERT INTO services (id, name, price, duration_minutes, is_active, created_at)
           VALUES (?, 'Signature Cut', ?, 45, 1, '2024-01-01T00:00:00Z')"#,
    )
    .bind(&id)
    .bind(price)
    .execute(&state.db)
    .await
    .expect("service");
    id
}

pub async fn admin_user(state: &AppState) -> AuthUser {
    let (id, display_name) = sqlx::query_as::<_, (String, String)>(
        "SELECT id, display_name FROM users WHERE role = ? LIMIT 1",
    )
    .bind(ROLE_ADMIN)
    .fetch_one(&state.db)
    .await
    .expect("admin");
    AuthUser {
        id,
        display_name,
        role: ROLE_ADMIN.to_string(),
    }
}

pub fn basic(user: &'static str, password: &'static str) -> Authorization<Basic> {
    Authorization::from(Basic::new(user, Some(password)))
}

/// First `weekday` strictly after today, so no slot on it has elapsed.
pub fn next(weekday: Weekday) -> NaiveDate {
    let mut date = Local::now().date_naive() + Duration::days(1);
    while date.weekday() != weekday {
        date += Duration::days(1);
    }
    date
}

pub fn booking_body(barber_id: &str, service_id: &str, date: NaiveDate, time: &str) -> serde_json::Value {
    serde_json::json!({
        "customer": { "name": "Dana Cole", "phone": "555-0101", "email": "dana@example.com" },
        "barberId": barber_id,
        "serviceId": service_id,
        "date": date.format("%Y-%m-%d").to_string(),
        "time": time,
    })
}

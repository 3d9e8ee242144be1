use actix_web::{http::header, middleware::from_fn, web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    auth::{admin_validator, logout_guard, new_id, AuthUser},
    availability::{BreakWindow, ShopDay},
    bookings::{self, BookingFilter},
    db::{insert_barber, log_activity},
    error::AppError,
    models::{
        ActivityRow, BookingRow, BookingView, DealRow, ServiceRow, UserRow, BOOKING_COLUMNS,
        BOOKING_JOINS, ROLE_BARBER,
    },
    schedule::{self as shop_schedule, DayOffInput},
    state::AppState,
};

use super::{change_status, schedule, schedule::HoursPayload, status_counts, StatusPayload};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BarberView {
    id: String,
    display_name: String,
    username: String,
    active: bool,
}

impl From<UserRow> for BarberView {
    fn from(user: UserRow) -> Self {
        BarberView {
            id: user.id,
            display_name: user.display_name,
            username: user.username,
            active: user.active == 1,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BarberCreateForm {
    username: String,
    display_name: String,
    password: String,
}

#[derive(Deserialize)]
struct ActivePayload {
    active: bool,
}

#[derive(Deserialize)]
struct ShopHoursPayload {
    days: Vec<ShopDay>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SlotDurationPayload {
    slot_duration: u16,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServicePayload {
    name: String,
    price: f64,
    duration_minutes: i64,
    is_active: Option<bool>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DealPayload {
    title: String,
    description: Option<String>,
    discount_percent: i64,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .wrap(HttpAuthentication::basic(admin_validator))
            .wrap(from_fn(logout_guard))
            .service(web::resource("").route(web::get().to(index)))
            .service(web::resource("/").route(web::get().to(index)))
            .service(web::resource("/dashboard").route(web::get().to(dashboard)))
            .service(web::resource("/bookings").route(web::get().to(list_bookings)))
            .service(
                web::resource("/bookings/{id}/status").route(web::post().to(update_status)),
            )
            .service(
                web::resource("/barbers")
                    .route(web::get().to(list_barbers))
                    .route(web::post().to(create_barber)),
            )
            .service(web::resource("/barbers/{id}/active").route(web::post().to(set_barber_active)))
            .service(web::resource("/barbers/{id}/stats").route(web::get().to(barber_stats)))
            .service(web::resource("/barbers/{id}/schedule").route(web::get().to(show_schedule)))
            .service(
                web::resource("/barbers/{id}/schedule/hours").route(web::put().to(replace_hours)),
            )
            .service(web::resource("/barbers/{id}/schedule/break").route(web::put().to(set_break)))
            .service(
                web::resource("/barbers/{id}/schedule/days-off").route(web::post().to(add_day_off)),
            )
            .service(
                web::resource("/barbers/{id}/schedule/days-off/{date}")
                    .route(web::delete().to(remove_day_off)),
            )
            .service(
                web::resource("/settings/hours")
                    .route(web::get().to(shop_hours))
                    .route(web::put().to(replace_shop_hours)),
            )
            .service(
                web::resource("/settings/slot-duration").route(web::put().to(set_slot_duration)),
            )
            .service(
                web::resource("/services")
                    .route(web::get().to(list_services))
                    .route(web::post().to(create_service)),
            )
            .service(
                web::resource("/services/{id}")
                    .route(web::put().to(update_service))
                    .route(web::delete().to(retire_service)),
            )
            .service(
                web::resource("/deals")
                    .route(web::get().to(list_deals))
                    .route(web::post().to(create_deal)),
            )
            .service(web::resource("/deals/{id}").route(web::delete().to(end_deal))),
    );
}

async fn index() -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, "/admin/dashboard"))
        .finish()
}

async fn dashboard(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, AppError> {
    let stats = status_counts(&state, None).await?;

    let sql = format!("SELECT {BOOKING_COLUMNS} {BOOKING_JOINS} ORDER BY b.date DESC, b.time DESC LIMIT 6");
    let upcoming: Vec<BookingView> = sqlx::query_as::<_, BookingRow>(&sql)
        .fetch_all(&state.db)
        .await?
        .into_iter()
        .map(BookingView::from)
        .collect();

    let activities = sqlx::query_as::<_, ActivityRow>(
        "SELECT kind, message, created_at FROM activities ORDER BY created_at DESC LIMIT 10",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(HttpResponse::Ok().json(json!({
        "adminName": auth.display_name,
        "stats": stats,
        "upcoming": upcoming,
        "activities": activities,
    })))
}

async fn list_bookings(
    state: web::Data<AppState>,
    query: web::Query<BookingFilter>,
) -> Result<HttpResponse, AppError> {
    let bookings = bookings::list_bookings(&state.db, &query).await?;
    Ok(HttpResponse::Ok().json(bookings))
}

async fn update_status(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
    payload: web::Json<StatusPayload>,
) -> Result<HttpResponse, AppError> {
    change_status(&state, &auth, &path.into_inner(), payload.into_inner()).await
}

async fn fetch_barbers(state: &AppState) -> Result<Vec<BarberView>, AppError> {
    let rows = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, display_name, role, password_hash, active, created_at FROM users WHERE role = ? ORDER BY display_name",
    )
    .bind(ROLE_BARBER)
    .fetch_all(&state.db)
    .await?;
    Ok(rows.into_iter().map(BarberView::from).collect())
}

async fn list_barbers(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(fetch_barbers(&state).await?))
}

async fn create_barber(
    state: web::Data<AppState>,
    form: web::Json<BarberCreateForm>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, AppError> {
    let form = form.into_inner();
    let mut errors = Vec::new();
    if form.username.trim().is_empty() {
        errors.push("Username is required.");
    }
    if form.display_name.trim().is_empty() {
        errors.push("Display name is required.");
    }
    if form.password.trim().len() < 6 {
        errors.push("Password must be at least 6 characters.");
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors.join(" ")));
    }

    let mut tx = state.db.begin().await?;
    let barber_id = insert_barber(
        &mut tx,
        form.username.trim(),
        form.display_name.trim(),
        &form.password,
    )
    .await?;
    tx.commit().await?;

    log_activity(
        &state.db,
        "barber_created",
        &format!("{} created barber {}.", auth.display_name, form.display_name.trim()),
        Some(&auth.id),
        None,
    )
    .await;

    Ok(HttpResponse::Created().json(BarberView {
        id: barber_id,
        display_name: form.display_name.trim().to_string(),
        username: form.username.trim().to_string(),
        active: true,
    }))
}

async fn set_barber_active(
    state: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<ActivePayload>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, AppError> {
    let barber_id = path.into_inner();
    let result = sqlx::query("UPDATE users SET active = ? WHERE id = ? AND role = ?")
        .bind(payload.active)
        .bind(&barber_id)
        .bind(ROLE_BARBER)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Barber not found".into()));
    }

    let verb = if payload.active { "activated" } else { "deactivated" };
    log_activity(
        &state.db,
        "barber_active_changed",
        &format!("{} {} barber {}.", auth.display_name, verb, barber_id),
        Some(&auth.id),
        None,
    )
    .await;

    Ok(HttpResponse::Ok().json(json!({ "ok": true, "active": payload.active })))
}

async fn barber_stats(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let barber_id = path.into_inner();
    let barber = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, display_name, role, password_hash, active, created_at FROM users WHERE id = ? AND role = ?",
    )
    .bind(&barber_id)
    .bind(ROLE_BARBER)
    .fetch_optional(&state.db)
    .await?
    .map(BarberView::from)
    .ok_or_else(|| AppError::NotFound("Barber not found".into()))?;

    let stats = status_counts(&state, Some(&barber.id)).await?;
    let recent = bookings::list_bookings(
        &state.db,
        &BookingFilter {
            barber_id: Some(barber.id.clone()),
            ..BookingFilter::default()
        },
    )
    .await?
    .into_iter()
    .take(8)
    .collect::<Vec<_>>();

    Ok(HttpResponse::Ok().json(json!({
        "barber": barber,
        "stats": stats,
        "recent": recent,
    })))
}

async fn show_schedule(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    schedule::show(&state, &path.into_inner()).await
}

async fn replace_hours(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
    payload: web::Json<HoursPayload>,
) -> Result<HttpResponse, AppError> {
    schedule::replace_hours(&state, &auth, &path.into_inner(), payload.into_inner()).await
}

async fn set_break(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
    payload: web::Json<BreakWindow>,
) -> Result<HttpResponse, AppError> {
    schedule::set_break(&state, &auth, &path.into_inner(), payload.into_inner()).await
}

async fn add_day_off(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
    payload: web::Json<DayOffInput>,
) -> Result<HttpResponse, AppError> {
    schedule::add_day_off(&state, &auth, &path.into_inner(), payload.into_inner()).await
}

async fn remove_day_off(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (barber_id, date) = path.into_inner();
    schedule::remove_day_off(&state, &auth, &barber_id, &date).await
}

async fn shop_hours(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let mut conn = state.db.acquire().await?;
    let schedule = shop_schedule::load_shop_schedule(&mut conn).await?;
    Ok(HttpResponse::Ok().json(schedule))
}

async fn replace_shop_hours(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    payload: web::Json<ShopHoursPayload>,
) -> Result<HttpResponse, AppError> {
    shop_schedule::replace_shop_hours(&state.db, &payload.days).await?;
    log_activity(
        &state.db,
        "shop_hours_updated",
        &format!("{} updated the shop's opening hours.", auth.display_name),
        Some(&auth.id),
        None,
    )
    .await;
    shop_hours(state).await
}

async fn set_slot_duration(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    payload: web::Json<SlotDurationPayload>,
) -> Result<HttpResponse, AppError> {
    shop_schedule::set_slot_duration(&state.db, payload.slot_duration).await?;
    log_activity(
        &state.db,
        "slot_duration_updated",
        &format!("{} set the slot length to {} minutes.", auth.display_name, payload.slot_duration),
        Some(&auth.id),
        None,
    )
    .await;
    shop_hours(state).await
}

async fn list_services(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let services = sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name, price, duration_minutes, is_active FROM services ORDER BY name",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(HttpResponse::Ok().json(services))
}

fn validate_service(payload: &ServicePayload) -> Result<(), AppError> {
    let mut errors = Vec::new();
    if payload.name.trim().is_empty() {
        errors.push("Service name is required.");
    }
    if !payload.price.is_finite() || payload.price < 0.0 {
        errors.push("Price cannot be negative.");
    }
    if payload.duration_minutes <= 0 {
        errors.push("Duration must be a positive number of minutes.");
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors.join(" ")))
    }
}

async fn create_service(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    payload: web::Json<ServicePayload>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    validate_service(&payload)?;

    let service = ServiceRow {
        id: new_id(),
        name: payload.name.trim().to_string(),
        price: payload.price,
        duration_minutes: payload.duration_minutes,
        is_active: i64::from(payload.is_active.unwrap_or(true)),
    };
    sqlx::query(
        r#"INSERT INTO services (id, name, price, duration_minutes, is_active, created_at)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&service.id)
    .bind(&service.name)
    .bind(service.price)
    .bind(service.duration_minutes)
    .bind(service.is_active)
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    log_activity(
        &state.db,
        "service_created",
        &format!("{} added service {}.", auth.display_name, service.name),
        Some(&auth.id),
        None,
    )
    .await;

    Ok(HttpResponse::Created().json(service))
}

async fn update_service(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
    payload: web::Json<ServicePayload>,
) -> Result<HttpResponse, AppError> {
    let service_id = path.into_inner();
    let payload = payload.into_inner();
    validate_service(&payload)?;

    let result = sqlx::query(
        r#"UPDATE services
           SET name = ?, price = ?, duration_minutes = ?, is_active = COALESCE(?, is_active)
           WHERE id = ?"#,
    )
    .bind(payload.name.trim())
    .bind(payload.price)
    .bind(payload.duration_minutes)
    .bind(payload.is_active)
    .bind(&service_id)
    .execute(&state.db)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Service not found".into()));
    }

    log_activity(
        &state.db,
        "service_updated",
        &format!("{} updated service {}.", auth.display_name, payload.name.trim()),
        Some(&auth.id),
        None,
    )
    .await;

    let service = sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name, price, duration_minutes, is_active FROM services WHERE id = ?",
    )
    .bind(&service_id)
    .fetch_one(&state.db)
    .await?;
    Ok(HttpResponse::Ok().json(service))
}

/// Past bookings keep pointing at the service, so it is only switched off.
async fn retire_service(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let service_id = path.into_inner();
    let result = sqlx::query("UPDATE services SET is_active = 0 WHERE id = ?")
        .bind(&service_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Service not found".into()));
    }
    log_activity(
        &state.db,
        "service_retired",
        &format!("{} retired service {}.", auth.display_name, service_id),
        Some(&auth.id),
        None,
    )
    .await;
    Ok(HttpResponse::NoContent().finish())
}

async fn list_deals(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let deals = sqlx::query_as::<_, DealRow>(
        "SELECT id, title, description, discount_percent, is_active FROM deals ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(HttpResponse::Ok().json(deals))
}

async fn create_deal(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    payload: web::Json<DealPayload>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("Deal title is required.".into()));
    }
    if !(0..=100).contains(&payload.discount_percent) {
        return Err(AppError::Validation("Discount must be between 0 and 100 percent.".into()));
    }

    let deal = DealRow {
        id: new_id(),
        title: payload.title.trim().to_string(),
        description: payload
            .description
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty()),
        discount_percent: payload.discount_percent,
        is_active: 1,
    };
    sqlx::query(
        r#"INSERT INTO deals (id, title, description, discount_percent, is_active, created_at)
           VALUES (?, ?, ?, ?, 1, ?)"#,
    )
    .bind(&deal.id)
    .bind(&deal.title)
    .bind(&deal.description)
    .bind(deal.discount_percent)
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    log_activity(
        &state.db,
        "deal_created",
        &format!("{} started deal {}.", auth.display_name, deal.title),
        Some(&auth.id),
        None,
    )
    .await;

    Ok(HttpResponse::Created().json(deal))
}

async fn end_deal(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let deal_id = path.into_inner();
    let result = sqlx::query("UPDATE deals SET is_active = 0 WHERE id = ?")
        .bind(&deal_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Deal not found".into()));
    }
    log_activity(
        &state.db,
        "deal_ended",
        &format!("{} ended deal {}.", auth.display_name, deal_id),
        Some(&auth.id),
        None,
    )
    .await;
    Ok(HttpResponse::NoContent().finish())
}

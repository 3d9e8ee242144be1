use actix_web::http::header::Header;
use actix_web::{http::header, web, HttpRequest, HttpResponse};
use actix_web_httpauth::headers::authorization::{Authorization, Basic};
use serde::Deserialize;

use crate::{
    auth::{authenticate_credentials, clear_logout_cookie, logout_cookie, AUTH_REALM},
    bookings::{self, BookingRequest},
    clock::shop_now,
    db::{fetch_booking, log_activity},
    error::AppError,
    models::{BarberSummary, DealRow, PublicBookingView, ServiceRow, ROLE_ADMIN, ROLE_BARBER},
    state::AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/health").route(web::get().to(health)))
        .service(web::resource("/services").route(web::get().to(list_services)))
        .service(web::resource("/deals").route(web::get().to(list_deals)))
        .service(web::resource("/barbers").route(web::get().to(list_barbers)))
        .service(
            web::resource("/bookings/available-slots/{barber_id}/{date}")
                .route(web::get().to(available_slots)),
        )
        .service(web::resource("/bookings").route(web::post().to(create_booking)))
        .service(web::resource("/bookings/{id}").route(web::get().to(booking_status)))
        .service(web::resource("/login").route(web::get().to(login)))
        .service(web::resource("/logout").route(web::get().to(logout)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn list_services(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let services = sqlx::query_as::<_, ServiceRow>(
        "SELECT id, name, price, duration_minutes, is_active FROM services WHERE is_active = 1 ORDER BY name",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(HttpResponse::Ok().json(services))
}

async fn list_deals(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let deals = sqlx::query_as::<_, DealRow>(
        "SELECT id, title, description, discount_percent, is_active FROM deals WHERE is_active = 1 ORDER BY created_at DESC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(HttpResponse::Ok().json(deals))
}

async fn list_barbers(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT id, display_name FROM users WHERE role = ? AND active = 1 ORDER BY display_name",
    )
    .bind(ROLE_BARBER)
    .fetch_all(&state.db)
    .await?;

    let barbers: Vec<BarberSummary> = rows
        .into_iter()
        .map(|(id, display_name)| BarberSummary::new(id, display_name))
        .collect();
    Ok(HttpResponse::Ok().json(barbers))
}

async fn available_slots(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (barber_id, date) = path.into_inner();
    let slots = bookings::available_slots(&state.db, &barber_id, &date, shop_now()).await?;
    Ok(HttpResponse::Ok().json(slots))
}

async fn create_booking(
    state: web::Data<AppState>,
    payload: web::Json<BookingRequest>,
) -> Result<HttpResponse, AppError> {
    let booking = bookings::create_booking(&state.db, payload.into_inner(), shop_now()).await?;

    log_activity(
        &state.db,
        "booking_created",
        &format!(
            "New booking for {} on {} at {}.",
            booking.customer.name, booking.date, booking.label
        ),
        None,
        Some(&booking.id),
    )
    .await;
    state.publish("booking_created", &booking);

    Ok(HttpResponse::Created().json(booking))
}

async fn booking_status(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let booking_id = path.into_inner();
    let mut conn = state.db.acquire().await?;
    let booking = fetch_booking(&mut conn, &booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;
    Ok(HttpResponse::Ok().json(PublicBookingView::from(booking)))
}

async fn logout(req: HttpRequest) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, "/"))
        .cookie(logout_cookie(&req))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

#[derive(Deserialize)]
struct LoginQuery {
    next: Option<String>,
}

async fn login(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<LoginQuery>,
) -> HttpResponse {
    let auth = match Authorization::<Basic>::parse(&req) {
        Ok(auth) => auth,
        Err(_) => return auth_challenge(),
    };
    let credentials = auth.into_scheme();
    let username = credentials.user_id();
    let password = credentials.password().unwrap_or_default();

    let user = match authenticate_credentials(&state.db, username, password).await {
        Some(user) => user,
        None => return auth_challenge(),
    };

    let requested = query.next.as_deref().unwrap_or("");
    let requested = if requested.starts_with('/') { requested } else { "" };
    let redirect = if user.role == ROLE_ADMIN {
        if requested.starts_with("/admin") {
            requested
        } else {
            "/admin/dashboard"
        }
    } else if requested.starts_with("/barber") {
        requested
    } else {
        "/barber/bookings"
    };

    HttpResponse::SeeOther()
        .append_header((header::LOCATION, redirect))
        .cookie(clear_logout_cookie(&req))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

fn auth_challenge() -> HttpResponse {
    HttpResponse::Unauthorized()
        .insert_header((header::WWW_AUTHENTICATE, format!("Basic realm=\"{}\"", AUTH_REALM)))
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .finish()
}

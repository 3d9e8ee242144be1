use actix_web::{http::header, middleware::from_fn, web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{barber_validator, logout_guard, AuthUser},
    availability::BreakWindow,
    bookings::{self, BookingFilter},
    error::AppError,
    schedule::DayOffInput,
    state::AppState,
};

use super::{change_status, schedule, schedule::HoursPayload, status_counts, StatusPayload};

#[derive(Deserialize)]
struct DayQuery {
    date: Option<String>,
    status: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/barber")
            .wrap(HttpAuthentication::basic(barber_validator))
            .wrap(from_fn(logout_guard))
            .service(web::resource("").route(web::get().to(index)))
            .service(web::resource("/").route(web::get().to(index)))
            .service(web::resource("/stats").route(web::get().to(stats)))
            .service(web::resource("/bookings").route(web::get().to(list_bookings)))
            .service(
                web::resource("/bookings/{id}/status").route(web::post().to(update_status)),
            )
            .service(web::resource("/schedule").route(web::get().to(show_schedule)))
            .service(web::resource("/schedule/hours").route(web::put().to(replace_hours)))
            .service(web::resource("/schedule/break").route(web::put().to(set_break)))
            .service(web::resource("/schedule/days-off").route(web::post().to(add_day_off)))
            .service(
                web::resource("/schedule/days-off/{date}").route(web::delete().to(remove_day_off)),
            ),
    );
}

async fn index() -> HttpResponse {
    HttpResponse::Found()
        .append_header((header::LOCATION, "/barber/bookings"))
        .finish()
}

async fn stats(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, AppError> {
    let stats = status_counts(&state, Some(&auth.id)).await?;
    Ok(HttpResponse::Ok().json(json!({
        "barberName": auth.display_name,
        "stats": stats,
    })))
}

async fn list_bookings(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    query: web::Query<DayQuery>,
) -> Result<HttpResponse, AppError> {
    let query = query.into_inner();
    let filter = BookingFilter {
        status: query.status,
        date: query.date,
        barber_id: Some(auth.id.clone()),
    };
    let bookings = bookings::list_bookings(&state.db, &filter).await?;
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

async fn show_schedule(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
) -> Result<HttpResponse, AppError> {
    schedule::show(&state, &auth.id).await
}

async fn replace_hours(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    payload: web::Json<HoursPayload>,
) -> Result<HttpResponse, AppError> {
    schedule::replace_hours(&state, &auth, &auth.id, payload.into_inner()).await
}

async fn set_break(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    payload: web::Json<BreakWindow>,
) -> Result<HttpResponse, AppError> {
    schedule::set_break(&state, &auth, &auth.id, payload.into_inner()).await
}

async fn add_day_off(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    payload: web::Json<DayOffInput>,
) -> Result<HttpResponse, AppError> {
    schedule::add_day_off(&state, &auth, &auth.id, payload.into_inner()).await
}

async fn remove_day_off(
    state: web::Data<AppState>,
    auth: web::ReqData<AuthUser>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    schedule::remove_day_off(&state, &auth, &auth.id, &path.into_inner()).await
}

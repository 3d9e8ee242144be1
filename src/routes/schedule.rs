//! Barber schedule handlers shared by the barber portal (own schedule) and
//! the admin back-office (any barber).

use actix_web::HttpResponse;
use serde::{Deserialize, Serialize};

use crate::{
    auth::AuthUser,
    availability::{BarberSchedule, BreakWindow, WorkingHours},
    db::{is_active_barber, log_activity},
    error::AppError,
    schedule::{self, DayOffInput},
    state::AppState,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleView {
    barber_id: String,
    follows_shop_hours: bool,
    #[serde(flatten)]
    schedule: BarberSchedule,
}

#[derive(Deserialize)]
pub struct HoursPayload {
    pub hours: Vec<WorkingHours>,
}

pub async fn show(state: &AppState, barber_id: &str) -> Result<HttpResponse, AppError> {
    let mut conn = state.db.acquire().await?;
    if !is_active_barber(&mut conn, barber_id).await? {
        return Err(AppError::NotFound("Barber not found".into()));
    }
    let schedule = schedule::load_barber_schedule(&mut conn, barber_id).await?;
    Ok(HttpResponse::Ok().json(ScheduleView {
        barber_id: barber_id.to_string(),
        follows_shop_hours: schedule.working_hours.is_empty(),
        schedule,
    }))
}

pub async fn replace_hours(
    state: &AppState,
    auth: &AuthUser,
    barber_id: &str,
    payload: HoursPayload,
) -> Result<HttpResponse, AppError> {
    ensure_barber(state, barber_id).await?;
    schedule::replace_barber_hours(&state.db, barber_id, &payload.hours).await?;
    log_activity(
        &state.db,
        "schedule_hours_updated",
        &format!("{} updated working hours for barber {}.", auth.display_name, barber_id),
        Some(&auth.id),
        None,
    )
    .await;
    show(state, barber_id).await
}

pub async fn set_break(
    state: &AppState,
    auth: &AuthUser,
    barber_id: &str,
    window: BreakWindow,
) -> Result<HttpResponse, AppError> {
    ensure_barber(state, barber_id).await?;
    schedule::set_break_window(&state.db, barber_id, &window).await?;
    log_activity(
        &state.db,
        "schedule_break_updated",
        &format!("{} updated the break for barber {}.", auth.display_name, barber_id),
        Some(&auth.id),
        None,
    )
    .await;
    show(state, barber_id).await
}

pub async fn add_day_off(
    state: &AppState,
    auth: &AuthUser,
    barber_id: &str,
    input: DayOffInput,
) -> Result<HttpResponse, AppError> {
    ensure_barber(state, barber_id).await?;
    let day_off = schedule::add_day_off(&state.db, barber_id, input).await?;
    log_activity(
        &state.db,
        "day_off_added",
        &format!("{} marked {} off for barber {}.", auth.display_name, day_off.date, barber_id),
        Some(&auth.id),
        None,
    )
    .await;
    Ok(HttpResponse::Created().json(day_off))
}

pub async fn remove_day_off(
    state: &AppState,
    auth: &AuthUser,
    barber_id: &str,
    date: &str,
) -> Result<HttpResponse, AppError> {
    ensure_barber(state, barber_id).await?;
    schedule::remove_day_off(&state.db, barber_id, date).await?;
    log_activity(
        &state.db,
        "day_off_removed",
        &format!("{} removed day off {} for barber {}.", auth.display_name, date, barber_id),
        Some(&auth.id),
        None,
    )
    .await;
    Ok(HttpResponse::NoContent().finish())
}

async fn ensure_barber(state: &AppState, barber_id: &str) -> Result<(), AppError> {
    let mut conn = state.db.acquire().await?;
    if is_active_barber(&mut conn, barber_id).await? {
        Ok(())
    } else {
        Err(AppError::NotFound("Barber not found".into()))
    }
}


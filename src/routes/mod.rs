pub mod admin;
pub mod barber;
pub mod events;
pub mod public;
pub mod schedule;

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::{
    auth::AuthUser,
    bookings,
    db::log_activity,
    error::AppError,
    models::{BookingStatus, StatCard},
    state::AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("Invalid request body: {err}")).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::Validation(format!("Invalid query: {err}")).into()
    }))
    .configure(public::configure)
    .configure(events::configure)
    .configure(admin::configure)
    .configure(barber::configure);
}

#[derive(Deserialize)]
pub struct StatusPayload {
    pub status: String,
}

async fn change_status(
    state: &AppState,
    auth: &AuthUser,
    booking_id: &str,
    payload: StatusPayload,
) -> Result<HttpResponse, AppError> {
    let next: BookingStatus = payload.status.parse()?;
    let booking = bookings::update_status(&state.db, booking_id, next, auth).await?;

    log_activity(
        &state.db,
        "booking_status_updated",
        &format!("{} marked booking {} as {}.", auth.display_name, booking_id, next),
        Some(&auth.id),
        Some(booking_id),
    )
    .await;
    state.publish("booking_updated", &booking);

    Ok(HttpResponse::Ok().json(booking))
}

/// Booking counts per status, optionally for one barber.
async fn status_counts(state: &AppState, barber_id: Option<&str>) -> Result<Vec<StatCard>, AppError> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT status, COUNT(*) FROM bookings WHERE (?1 IS NULL OR barber_id = ?1) GROUP BY status",
    )
    .bind(barber_id)
    .fetch_all(&state.db)
    .await?;

    let count_of = |status: BookingStatus| {
        rows.iter()
            .find(|(name, _)| name == status.as_str())
            .map(|(_, count)| *count)
            .unwrap_or(0)
    };

    let mut stats = vec![StatCard {
        label: "Total bookings".to_string(),
        value: rows.iter().map(|(_, count)| count).sum(),
    }];
    for (label, status) in [
        ("Pending", BookingStatus::Pending),
        ("Confirmed", BookingStatus::Confirmed),
        ("Completed", BookingStatus::Completed),
        ("Cancelled", BookingStatus::Cancelled),
    ] {
        stats.push(StatCard {
            label: label.to_string(),
            value: count_of(status),
        });
    }
    Ok(stats)
}

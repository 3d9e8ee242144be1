//! Booking write path and lookups.
//!
//! Creation re-runs the slot computation inside the inserting transaction and
//! leans on the `bookings_active_slot` partial unique index, so two customers
//! racing for the same chair get one booking and one `Conflict`.

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    auth::{new_id, AuthUser},
    availability::{compute_available_slots, drop_elapsed, OccupiedSlot, Slot},
    clock::{format_date, parse_date, ClockTime},
    db::{fetch_booking, is_active_barber, parse_stored_time},
    error::{conflict_on_unique, AppError},
    models::{BookingRow, BookingStatus, BookingView, BOOKING_COLUMNS, BOOKING_JOINS},
    schedule::{load_barber_schedule, load_shop_schedule},
};

const SLOT_TAKEN: &str = "Someone just booked that slot. Please pick another time.";
const STALE_BOOKING: &str = "Booking was changed by someone else. Reload and try again.";

#[derive(Debug, Deserialize)]
pub struct CustomerInput {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub customer: CustomerInput,
    pub barber_id: String,
    pub service_id: String,
    pub deal_id: Option<String>,
    pub date: String,
    pub time: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BookingFilter {
    pub status: Option<String>,
    pub date: Option<String>,
    pub barber_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSlots {
    pub barber_id: String,
    pub date: String,
    pub slot_duration: u16,
    pub slots: Vec<Slot>,
}

pub async fn available_slots(
    pool: &SqlitePool,
    barber_id: &str,
    date: &str,
    now: NaiveDateTime,
) -> Result<AvailableSlots, AppError> {
    let date = parse_date(date)?;
    let mut conn = pool.acquire().await?;

    if !is_active_barber(&mut conn, barber_id).await? {
        return Err(AppError::NotFound("Barber not found".into()));
    }

    let (slot_duration, slots) = open_slots(&mut conn, barber_id, date).await?;

    Ok(AvailableSlots {
        barber_id: barber_id.to_string(),
        date: format_date(date),
        slot_duration,
        slots: drop_elapsed(slots, date, now),
    })
}

async fn open_slots(
    conn: &mut SqliteConnection,
    barber_id: &str,
    date: NaiveDate,
) -> Result<(u16, Vec<Slot>), AppError> {
    let shop = load_shop_schedule(conn).await?;
    let barber = load_barber_schedule(conn, barber_id).await?;
    let occupied = occupied_slots(conn, barber_id, date).await?;
    let slots = compute_available_slots(date, &shop, Some(&barber), &occupied);
    Ok((shop.slot_duration, slots))
}

async fn occupied_slots(
    conn: &mut SqliteConnection,
    barber_id: &str,
    date: NaiveDate,
) -> Result<Vec<OccupiedSlot>, AppError> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT time, status FROM bookings WHERE barber_id = ? AND date = ? AND status <> 'cancelled'",
    )
    .bind(barber_id)
    .bind(format_date(date))
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|(time, status)| -> Result<OccupiedSlot, AppError> {
            Ok(OccupiedSlot {
                time: parse_stored_time(&time)?,
                status: status.parse()?,
            })
        })
        .collect()
}

pub async fn create_booking(
    pool: &SqlitePool,
    request: BookingRequest,
    now: NaiveDateTime,
) -> Result<BookingView, AppError> {
    let mut errors = Vec::new();
    if request.customer.name.trim().is_empty() {
        errors.push("Full name is required.");
    }
    if request.customer.phone.trim().is_empty() {
        errors.push("Phone number is required.");
    }
    if request.barber_id.trim().is_empty() {
        errors.push("Please select a barber.");
    }
    if request.service_id.trim().is_empty() {
        errors.push("Please select a service.");
    }
    if !errors.is_empty() {
        return Err(AppError::Validation(errors.join(" ")));
    }

    let date = parse_date(&request.date)?;
    let time: ClockTime = request.time.parse()?;
    if date < now.date() || (date == now.date() && time <= ClockTime::from(now.time())) {
        return Err(AppError::NotAvailable("That time has already passed.".into()));
    }

    // IMMEDIATE takes the write lock before the slot re-check, so concurrent
    // bookings run one after another instead of failing to upgrade a read.
    let mut tx = pool
        .begin_with("BEGIN IMMEDIATE")
        .await
        .map_err(|err| conflict_on_unique(err, SLOT_TAKEN))?;

    if !is_active_barber(&mut tx, &request.barber_id).await? {
        return Err(AppError::Validation("Selected barber is not available for booking.".into()));
    }

    let service_price = sqlx::query_scalar::<_, f64>(
        "SELECT price FROM services WHERE id = ? AND is_active = 1",
    )
    .bind(&request.service_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::Validation("Selected service is not offered.".into()))?;

    let deal_id = request
        .deal_id
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let price = match deal_id {
        Some(deal_id) => {
            let discount = sqlx::query_scalar::<_, i64>(
                "SELECT discount_percent FROM deals WHERE id = ? AND is_active = 1",
            )
            .bind(deal_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::Validation("That deal is no longer running.".into()))?;
            discounted(service_price, discount)
        }
        None => service_price,
    };

    let (_, slots) = open_slots(&mut tx, &request.barber_id, date).await?;
    if !slots.iter().any(|slot| slot.time == time) {
        return Err(AppError::NotAvailable(format!(
            "{} on {} is not available. Please pick another time.",
            time.label(),
            format_date(date)
        )));
    }

    let booking_id = new_id();
    let stamp = Utc::now().to_rfc3339();
    let email = request
        .customer
        .email
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty());

    sqlx::query(
        r#"INSERT INTO bookings
           (id, customer_name, customer_phone, customer_email, barber_id, service_id, deal_id,
            date, time, price, status, created_at, updated_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&booking_id)
    .bind(request.customer.name.trim())
    .bind(request.customer.phone.trim())
    .bind(email)
    .bind(&request.barber_id)
    .bind(&request.service_id)
    .bind(deal_id)
    .bind(format_date(date))
    .bind(time.to_string())
    .bind(price)
    .bind(BookingStatus::Pending.as_str())
    .bind(&stamp)
    .bind(&stamp)
    .execute(&mut *tx)
    .await
    .map_err(|err| conflict_on_unique(err, SLOT_TAKEN))?;

    let booking = fetch_booking(&mut tx, &booking_id)
        .await?
        .ok_or_else(|| AppError::Internal("booking vanished after insert".into()))?;
    tx.commit()
        .await
        .map_err(|err| conflict_on_unique(err, SLOT_TAKEN))?;

    log::info!(
        "Booked {} with barber {} on {} at {}",
        booking.customer.name,
        booking.barber_id,
        booking.date,
        booking.time
    );
    Ok(booking)
}

pub async fn update_status(
    pool: &SqlitePool,
    booking_id: &str,
    next: BookingStatus,
    actor: &AuthUser,
) -> Result<BookingView, AppError> {
    let mut tx = pool
        .begin_with("BEGIN IMMEDIATE")
        .await
        .map_err(|err| conflict_on_unique(err, STALE_BOOKING))?;
    let current = fetch_booking(&mut tx, booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;

    if !actor.is_admin() && current.barber_id != actor.id {
        return Err(AppError::Forbidden("Not allowed".into()));
    }

    let current_status: BookingStatus = current.status.parse()?;
    if current_status == next {
        return Ok(current);
    }
    if !current_status.can_transition_to(next, actor.is_admin()) {
        return Err(AppError::Validation(format!(
            "A {current_status} booking cannot be marked {next}."
        )));
    }

    // Re-opening takes the slot again, so it has to be open right now.
    if next.occupies_slot() && !current_status.occupies_slot() {
        let date = parse_date(&current.date)?;
        let time = parse_stored_time(&current.time)?;
        let (_, slots) = open_slots(&mut tx, &current.barber_id, date).await?;
        if !slots.iter().any(|slot| slot.time == time) {
            return Err(AppError::NotAvailable(format!(
                "{} on {} is no longer open for this barber.",
                time.label(),
                current.date
            )));
        }
    }

    let result = sqlx::query(
        "UPDATE bookings SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
    )
    .bind(next.as_str())
    .bind(Utc::now().to_rfc3339())
    .bind(booking_id)
    .bind(current_status.as_str())
    .execute(&mut *tx)
    .await
    .map_err(|err| conflict_on_unique(err, "That slot has been booked by someone else since."))?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict(STALE_BOOKING.into()));
    }

    let booking = fetch_booking(&mut tx, booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".into()))?;
    tx.commit()
        .await
        .map_err(|err| conflict_on_unique(err, STALE_BOOKING))?;
    Ok(booking)
}

pub async fn list_bookings(
    pool: &SqlitePool,
    filter: &BookingFilter,
) -> Result<Vec<BookingView>, AppError> {
    let status = match non_empty(&filter.status) {
        Some(raw) => Some(raw.parse::<BookingStatus>()?.as_str()),
        None => None,
    };
    let date = non_empty(&filter.date).map(parse_date).transpose()?.map(format_date);
    let barber_id = non_empty(&filter.barber_id);

    let sql = format!(
        r#"SELECT {BOOKING_COLUMNS} {BOOKING_JOINS}
           WHERE (?1 IS NULL OR b.status = ?1)
             AND (?2 IS NULL OR b.date = ?2)
             AND (?3 IS NULL OR b.barber_id = ?3)
           ORDER BY b.date DESC, b.time ASC"#
    );
    let rows = sqlx::query_as::<_, BookingRow>(&sql)
        .bind(status)
        .bind(date)
        .bind(barber_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(BookingView::from).collect())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}

fn discounted(price: f64, percent: i64) -> f64 {
    let percent = percent.clamp(0, 100) as f64;
    ((price * (100.0 - percent)) / 100.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::discounted;

    #[test]
    fn discount_rounds_to_cents() {
        assert_eq!(discounted(35.0, 10), 31.5);
        assert_eq!(discounted(19.99, 15), 16.99);
        assert_eq!(discounted(20.0, 150), 0.0);
        assert_eq!(discounted(20.0, 0), 20.0);
    }
}

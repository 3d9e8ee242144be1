//! Loading and saving shop and barber schedules.

use chrono::Utc;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    auth::new_id,
    availability::{BarberSchedule, BreakWindow, DayOff, ShopDay, ShopSchedule, WorkingHours},
    clock::{format_date, parse_date, ClockTime, DayOfWeek, MINUTES_PER_DAY},
    db::{self, parse_stored_time, DEFAULT_CLOSE, DEFAULT_OPEN},
    error::AppError,
};

#[derive(sqlx::FromRow)]
struct ShopHoursRow {
    day: String,
    is_open: i64,
    open_time: String,
    close_time: String,
}

#[derive(sqlx::FromRow)]
struct BarberHoursRow {
    day: String,
    is_working: i64,
    start_time: String,
    end_time: String,
}

#[derive(sqlx::FromRow)]
struct BreakRow {
    enabled: i64,
    start_time: String,
    end_time: String,
}

#[derive(sqlx::FromRow)]
struct DayOffRow {
    date: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DayOffInput {
    pub date: String,
    pub reason: Option<String>,
}

pub async fn load_shop_schedule(conn: &mut SqliteConnection) -> Result<ShopSchedule, AppError> {
    let rows = sqlx::query_as::<_, ShopHoursRow>(
        "SELECT day, is_open, open_time, close_time FROM shop_hours",
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut days = Vec::with_capacity(rows.len());
    for row in rows {
        days.push(ShopDay {
            day: row.day.parse()?,
            is_open: row.is_open != 0,
            open_time: parse_stored_time(&row.open_time)?,
            close_time: parse_stored_time(&row.close_time)?,
        });
    }
    days.sort_by_key(|entry| weekday_index(entry.day));

    Ok(ShopSchedule {
        days,
        slot_duration: db::shop_slot_duration(conn).await?,
    })
}

pub async fn load_barber_schedule(
    conn: &mut SqliteConnection,
    barber_id: &str,
) -> Result<BarberSchedule, AppError> {
    let hours = sqlx::query_as::<_, BarberHoursRow>(
        "SELECT day, is_working, start_time, end_time FROM barber_hours WHERE barber_id = ?",
    )
    .bind(barber_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut working_hours = Vec::with_capacity(hours.len());
    for row in hours {
        working_hours.push(WorkingHours {
            day: row.day.parse()?,
            is_working: row.is_working != 0,
            start_time: parse_stored_time(&row.start_time)?,
            end_time: parse_stored_time(&row.end_time)?,
        });
    }
    working_hours.sort_by_key(|entry| weekday_index(entry.day));

    let break_window = sqlx::query_as::<_, BreakRow>(
        "SELECT enabled, start_time, end_time FROM barber_breaks WHERE barber_id = ?",
    )
    .bind(barber_id)
    .fetch_optional(&mut *conn)
    .await?
    .map(|row| -> Result<BreakWindow, AppError> {
        Ok(BreakWindow {
            enabled: row.enabled != 0,
            start_time: parse_stored_time(&row.start_time)?,
            end_time: parse_stored_time(&row.end_time)?,
        })
    })
    .transpose()?;

    let days_off = sqlx::query_as::<_, DayOffRow>(
        "SELECT date, reason FROM barber_days_off WHERE barber_id = ? ORDER BY date",
    )
    .bind(barber_id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|row| -> Result<DayOff, AppError> {
        Ok(DayOff {
            date: parse_date(&row.date)?,
            reason: row.reason,
        })
    })
    .collect::<Result<Vec<_>, _>>()?;

    Ok(BarberSchedule {
        working_hours,
        break_window,
        days_off,
    })
}

/// Replaces the whole week. Days missing from `days` are stored closed.
pub async fn replace_shop_hours(pool: &SqlitePool, days: &[ShopDay]) -> Result<(), AppError> {
    ensure_unique_days(days.iter().map(|entry| entry.day))?;
    for entry in days.iter().filter(|entry| entry.is_open) {
        ensure_window(entry.open_time, entry.close_time, entry.day)?;
    }

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM shop_hours").execute(&mut *tx).await?;
    for day in DayOfWeek::ALL {
        let entry = days.iter().find(|entry| entry.day == day);
        let (is_open, open_time, close_time) = match entry {
            Some(entry) => (entry.is_open, entry.open_time.to_string(), entry.close_time.to_string()),
            None => (false, DEFAULT_OPEN.to_string(), DEFAULT_CLOSE.to_string()),
        };
        sqlx::query(
            "INSERT INTO shop_hours (day, is_open, open_time, close_time) VALUES (?, ?, ?, ?)",
        )
        .bind(day.as_str())
        .bind(is_open)
        .bind(open_time)
        .bind(close_time)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn set_slot_duration(pool: &SqlitePool, minutes: u16) -> Result<(), AppError> {
    if !(5..=240).contains(&minutes) || MINUTES_PER_DAY % minutes != 0 {
        return Err(AppError::Validation(
            "Slot duration must be between 5 and 240 minutes and divide the day evenly.".into(),
        ));
    }
    sqlx::query(
        r#"INSERT INTO shop_settings (id, slot_duration, updated_at) VALUES (1, ?, ?)
           ON CONFLICT(id) DO UPDATE SET slot_duration = excluded.slot_duration, updated_at = excluded.updated_at"#,
    )
    .bind(minutes as i64)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;
    Ok(())
}

/// An empty list puts the barber back on shop hours.
pub async fn replace_barber_hours(
    pool: &SqlitePool,
    barber_id: &str,
    hours: &[WorkingHours],
) -> Result<(), AppError> {
    ensure_unique_days(hours.iter().map(|entry| entry.day))?;
    for entry in hours.iter().filter(|entry| entry.is_working) {
        ensure_window(entry.start_time, entry.end_time, entry.day)?;
    }

    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM barber_hours WHERE barber_id = ?")
        .bind(barber_id)
        .execute(&mut *tx)
        .await?;
    for entry in hours {
        sqlx::query(
            r#"INSERT INTO barber_hours (barber_id, day, is_working, start_time, end_time)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(barber_id)
        .bind(entry.day.as_str())
        .bind(entry.is_working)
        .bind(entry.start_time.to_string())
        .bind(entry.end_time.to_string())
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn set_break_window(
    pool: &SqlitePool,
    barber_id: &str,
    window: &BreakWindow,
) -> Result<(), AppError> {
    if window.start_time >= window.end_time {
        return Err(AppError::Validation("Break must end after it starts.".into()));
    }
    sqlx::query(
        r#"INSERT INTO barber_breaks (barber_id, enabled, start_time, end_time) VALUES (?, ?, ?, ?)
           ON CONFLICT(barber_id) DO UPDATE SET
             enabled = excluded.enabled,
             start_time = excluded.start_time,
             end_time = excluded.end_time"#,
    )
    .bind(barber_id)
    .bind(window.enabled)
    .bind(window.start_time.to_string())
    .bind(window.end_time.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

/// One day off per date; repeating a date only updates its reason.
pub async fn add_day_off(
    pool: &SqlitePool,
    barber_id: &str,
    input: DayOffInput,
) -> Result<DayOff, AppError> {
    let date = parse_date(&input.date)?;
    let reason = input
        .reason
        .map(|reason| reason.trim().to_string())
        .filter(|reason| !reason.is_empty());

    sqlx::query(
        r#"INSERT INTO barber_days_off (id, barber_id, date, reason) VALUES (?, ?, ?, ?)
           ON CONFLICT(barber_id, date) DO UPDATE SET reason = excluded.reason"#,
    )
    .bind(new_id())
    .bind(barber_id)
    .bind(format_date(date))
    .bind(&reason)
    .execute(pool)
    .await?;

    Ok(DayOff { date, reason })
}

pub async fn remove_day_off(pool: &SqlitePool, barber_id: &str, date: &str) -> Result<(), AppError> {
    let date = parse_date(date)?;
    let result = sqlx::query("DELETE FROM barber_days_off WHERE barber_id = ? AND date = ?")
        .bind(barber_id)
        .bind(format_date(date))
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("No day off on {}", format_date(date))));
    }
    Ok(())
}

fn ensure_window(start: ClockTime, end: ClockTime, day: DayOfWeek) -> Result<(), AppError> {
    if start >= end {
        return Err(AppError::Validation(format!(
            "Closing time must be after opening time on {day}."
        )));
    }
    Ok(())
}

fn ensure_unique_days(days: impl Iterator<Item = DayOfWeek>) -> Result<(), AppError> {
    let mut seen = Vec::with_capacity(7);
    for day in days {
        if seen.contains(&day) {
            return Err(AppError::Validation(format!("{day} is listed more than once.")));
        }
        seen.push(day);
    }
    Ok(())
}

fn weekday_index(day: DayOfWeek) -> usize {
    DayOfWeek::ALL
        .iter()
        .position(|candidate| *candidate == day)
        .unwrap_or(DayOfWeek::ALL.len())
}

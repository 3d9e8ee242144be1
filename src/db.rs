use std::{fs, path::Path, str::FromStr, time::Duration};

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};

use crate::{
    auth::{hash_password, new_id},
    availability::DEFAULT_SLOT_DURATION,
    clock::{ClockTime, DayOfWeek},
    config::AppConfig,
    error::{conflict_on_unique, AppError},
    models::{BookingRow, BookingView, BOOKING_COLUMNS, BOOKING_JOINS, ROLE_ADMIN, ROLE_BARBER},
};

pub const DEFAULT_OPEN: &str = "11:00";
pub const DEFAULT_CLOSE: &str = "20:00";
pub const DEFAULT_BREAK_START: &str = "13:00";
pub const DEFAULT_BREAK_END: &str = "14:00";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn connect(db_url: &str) -> Result<SqlitePool, Box<dyn std::error::Error>> {
    ensure_sqlite_dir(db_url)?;

    // Writers queue on SQLite's lock for a while before giving up with BUSY.
    let connect_options = SqliteConnectOptions::from_str(db_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    // An in-memory database lives and dies with its single connection.
    let in_memory = db_url.contains(":memory:");
    let mut pool_options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
    if in_memory {
        pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }

    Ok(pool_options.connect_with(connect_options).await?)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = if let Some(path) = db_url.strip_prefix("sqlite://") {
        Some(path)
    } else if let Some(path) = db_url.strip_prefix("sqlite:") {
        Some(path)
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    let db_path = Path::new(path);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Creates the records the shop cannot run without. Every step inserts only
/// what is missing, so running it on every start is harmless.
pub async fn bootstrap(pool: &SqlitePool, config: &AppConfig) -> Result<(), AppError> {
    if !config.bootstrap_enabled {
        return Ok(());
    }
    seed_admin(pool, config).await?;
    seed_shop(pool).await?;
    if config.seed_demo {
        seed_demo(pool).await?;
    }
    Ok(())
}

async fn seed_admin(pool: &SqlitePool, config: &AppConfig) -> Result<(), AppError> {
    let existing = sqlx::query_as::<_, (String,)>("SELECT id FROM users WHERE role = ? LIMIT 1")
        .bind(ROLE_ADMIN)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    if config.admin_password == "admin" {
        log::warn!("ADMIN_PASSWORD not set. Using default password 'admin'. Set ADMIN_PASSWORD in production.");
    }

    let password_hash = hash_password(&config.admin_password)
        .map_err(|_| AppError::Internal("password hash failed".into()))?;

    sqlx::query(
        r#"INSERT INTO users (id, username, display_name, role, password_hash, active, created_at)
           VALUES (?, ?, ?, ?, ?, 1, ?)"#,
    )
    .bind(new_id())
    .bind(&config.admin_user)
    .bind(&config.admin_display_name)
    .bind(ROLE_ADMIN)
    .bind(password_hash)
    .bind(Utc::now().to_rfc3339())
    .execute(pool)
    .await?;

    log::info!("Created admin account '{}'", config.admin_user);
    Ok(())
}

async fn seed_shop(pool: &SqlitePool) -> Result<(), AppError> {
    sqlx::query("INSERT OR IGNORE INTO shop_settings (id, slot_duration, updated_at) VALUES (1, ?, ?)")
        .bind(DEFAULT_SLOT_DURATION as i64)
        .bind(Utc::now().to_rfc3339())
        .execute(pool)
        .await?;

    for day in DayOfWeek::ALL {
        sqlx::query(
            "INSERT OR IGNORE INTO shop_hours (day, is_open, open_time, close_time) VALUES (?, ?, ?, ?)",
        )
        .bind(day.as_str())
        .bind(day != DayOfWeek::Sunday)
        .bind(DEFAULT_OPEN)
        .bind(DEFAULT_CLOSE)
        .execute(pool)
        .await?;
    }
    Ok(())
}

async fn seed_demo(pool: &SqlitePool) -> Result<(), AppError> {
    let barber = sqlx::query_as::<_, (String,)>("SELECT id FROM users WHERE role = ? LIMIT 1")
        .bind(ROLE_BARBER)
        .fetch_optional(pool)
        .await?;
    if barber.is_none() {
        log::warn!("Seeding demo barber 'barber1' with password 'change-me'.");
        let mut conn = pool.acquire().await?;
        insert_barber(&mut conn, "barber1", "Barber One", "change-me").await?;
    }

    let services = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM services")
        .fetch_one(pool)
        .await?;
    if services == 0 {
        let catalog = [
            ("Signature Cut", 35.0, 45),
            ("Fade & Line-Up", 30.0, 35),
            ("Beard Sculpt", 20.0, 25),
            ("Full Grooming", 55.0, 60),
        ];
        for (name, price, duration) in catalog {
            sqlx::query(
                r#"INSERT INTO services (id, name, price, duration_minutes, is_active, created_at)
                   VALUES (?, ?, ?, ?, 1, ?)"#,
            )
            .bind(new_id())
            .bind(name)
            .bind(price)
            .bind(duration)
            .bind(Utc::now().to_rfc3339())
            .execute(pool)
            .await?;
        }
    }
    Ok(())
}

/// New barbers follow the shop's hours and have their lunch break switched off
/// until they configure one.
pub async fn insert_barber(
    conn: &mut SqliteConnection,
    username: &str,
    display_name: &str,
    password: &str,
) -> Result<String, AppError> {
    let password_hash =
        hash_password(password).map_err(|_| AppError::Internal("password hash failed".into()))?;
    let id = new_id();

    sqlx::query(
        r#"INSERT INTO users (id, username, display_name, role, password_hash, active, created_at)
           VALUES (?, ?, ?, ?, ?, 1, ?)"#,
    )
    .bind(&id)
    .bind(username)
    .bind(display_name)
    .bind(ROLE_BARBER)
    .bind(password_hash)
    .bind(Utc::now().to_rfc3339())
    .execute(&mut *conn)
    .await
    .map_err(|err| conflict_on_unique(err, "Username is already taken."))?;

    sqlx::query(
        "INSERT INTO barber_breaks (barber_id, enabled, start_time, end_time) VALUES (?, 0, ?, ?)",
    )
    .bind(&id)
    .bind(DEFAULT_BREAK_START)
    .bind(DEFAULT_BREAK_END)
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

pub async fn shop_slot_duration(conn: &mut SqliteConnection) -> Result<u16, AppError> {
    let value = sqlx::query_scalar::<_, i64>("SELECT slot_duration FROM shop_settings WHERE id = 1")
        .fetch_optional(&mut *conn)
        .await?;
    Ok(value
        .and_then(|minutes| u16::try_from(minutes).ok())
        .filter(|minutes| *minutes > 0)
        .unwrap_or(DEFAULT_SLOT_DURATION))
}

pub async fn log_activity(
    pool: &SqlitePool,
    kind: &str,
    message: &str,
    user_id: Option<&str>,
    booking_id: Option<&str>,
) {
    let result = sqlx::query(
        r#"INSERT INTO activities (id, kind, message, created_at, user_id, booking_id)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(new_id())
    .bind(kind)
    .bind(message)
    .bind(Utc::now().to_rfc3339())
    .bind(user_id)
    .bind(booking_id)
    .execute(pool)
    .await;

    if let Err(err) = result {
        log::warn!("Failed to record activity {kind}: {err}");
    }
}

pub async fn fetch_booking(
    conn: &mut SqliteConnection,
    booking_id: &str,
) -> Result<Option<BookingView>, AppError> {
    let sql = format!("SELECT {BOOKING_COLUMNS} {BOOKING_JOINS} WHERE b.id = ? LIMIT 1");
    let row = sqlx::query_as::<_, BookingRow>(&sql)
        .bind(booking_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(BookingView::from))
}

pub async fn is_active_barber(conn: &mut SqliteConnection, barber_id: &str) -> Result<bool, AppError> {
    let found = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE id = ? AND role = ? AND active = 1",
    )
    .bind(barber_id)
    .bind(ROLE_BARBER)
    .fetch_one(&mut *conn)
    .await?;
    Ok(found > 0)
}

pub fn parse_stored_time(raw: &str) -> Result<ClockTime, AppError> {
    raw.parse()
        .map_err(|_| AppError::Internal(format!("Stored time '{raw}' is not HH:MM")))
}

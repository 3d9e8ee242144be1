pub mod auth;
pub mod availability;
pub mod bookings;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod schedule;
pub mod state;

use crate::{config::AppConfig, state::AppState};

/// Opens the database, applies the schema and runs the startup bootstrap.
pub async fn init_state(config: &AppConfig) -> Result<AppState, Box<dyn std::error::Error>> {
    let pool = db::connect(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    db::bootstrap(&pool, config).await?;
    Ok(AppState::new(pool, config.event_buffer))
}

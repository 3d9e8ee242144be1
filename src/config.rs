use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub admin_user: String,
    pub admin_password: String,
    pub admin_display_name: String,
    /// Runs the idempotent startup bootstrap (admin account, shop defaults).
    pub bootstrap_enabled: bool,
    pub seed_demo: bool,
    pub event_buffer: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/barbershop.db".to_string(),
            port: 8080,
            admin_user: "admin".to_string(),
            admin_password: "admin".to_string(),
            admin_display_name: "Shop Admin".to_string(),
            bootstrap_enabled: true,
            seed_demo: false,
            event_buffer: 64,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            port: env::var("PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(defaults.port),
            admin_user: env::var("ADMIN_USER").unwrap_or(defaults.admin_user),
            admin_password: env::var("ADMIN_PASSWORD").unwrap_or(defaults.admin_password),
            admin_display_name: env::var("ADMIN_DISPLAY_NAME")
                .unwrap_or(defaults.admin_display_name),
            bootstrap_enabled: env_flag("BOOTSTRAP_ENABLED", defaults.bootstrap_enabled),
            seed_demo: env_flag("SEED_DEMO", defaults.seed_demo),
            event_buffer: env::var("EVENT_BUFFER")
                .ok()
                .and_then(|value| value.parse().ok())
                .filter(|value: &usize| *value > 0)
                .unwrap_or(defaults.event_buffer),
        };

        if !config.bootstrap_enabled {
            log::info!("BOOTSTRAP_ENABLED=false, skipping default records");
        }

        config
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_BARBER: &str = "barber";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    /// Whether the booking still holds its slot.
    pub fn occupies_slot(self) -> bool {
        self != BookingStatus::Cancelled
    }

    /// Re-opening a cancelled booking is reserved for admins.
    pub fn can_transition_to(self, next: BookingStatus, is_admin: bool) -> bool {
        use BookingStatus::*;
        match (self, next) {
            (Pending, Confirmed) | (Pending, Cancelled) => true,
            (Confirmed, Completed) | (Confirmed, Cancelled) => true,
            (Cancelled, Pending) => is_admin,
            _ => false,
        }
    }
}

impl FromStr for BookingStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value.trim())
            .ok_or_else(|| AppError::Validation(format!("Unknown booking status '{value}'")))
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub role: String,
    pub password_hash: String,
    pub active: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookingRow {
    pub id: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub barber_id: String,
    pub barber_name: Option<String>,
    pub service_id: String,
    pub service_name: Option<String>,
    pub deal_id: Option<String>,
    pub date: String,
    pub time: String,
    pub price: f64,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

pub const BOOKING_COLUMNS: &str = r#"b.id, b.customer_name, b.customer_phone, b.customer_email,
       b.barber_id, u.display_name as barber_name,
       b.service_id, s.name as service_name, b.deal_id,
       b.date, b.time, b.price, b.status, b.created_at, b.updated_at"#;

pub const BOOKING_JOINS: &str = r#"FROM bookings b
       LEFT JOIN users u ON b.barber_id = u.id
       LEFT JOIN services s ON b.service_id = s.id"#;

#[derive(Debug, Clone, Serialize)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub id: String,
    pub customer: Customer,
    pub barber_id: String,
    pub barber_name: String,
    pub service_id: String,
    pub service_name: String,
    pub deal_id: Option<String>,
    pub date: String,
    pub time: String,
    pub label: String,
    pub price: f64,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<BookingRow> for BookingView {
    fn from(row: BookingRow) -> Self {
        let label = row
            .time
            .parse::<crate::clock::ClockTime>()
            .map(|time| time.label())
            .unwrap_or_else(|_| row.time.clone());
        BookingView {
            id: row.id,
            customer: Customer {
                name: row.customer_name,
                phone: row.customer_phone,
                email: row.customer_email,
            },
            barber_id: row.barber_id,
            barber_name: row.barber_name.unwrap_or_else(|| "Unassigned".to_string()),
            service_id: row.service_id,
            service_name: row.service_name.unwrap_or_default(),
            deal_id: row.deal_id,
            date: row.date,
            time: row.time,
            label,
            price: row.price,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// What customers see on the status page; contact details stay private.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicBookingView {
    pub id: String,
    pub barber_name: String,
    pub service_name: String,
    pub date: String,
    pub time: String,
    pub label: String,
    pub status: String,
}

impl From<BookingView> for PublicBookingView {
    fn from(view: BookingView) -> Self {
        PublicBookingView {
            id: view.id,
            barber_name: view.barber_name,
            service_name: view.service_name,
            date: view.date,
            time: view.time,
            label: view.label,
            status: view.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRow {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub duration_minutes: i64,
    #[serde(with = "int_bool")]
    pub is_active: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DealRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub discount_percent: i64,
    #[serde(with = "int_bool")]
    pub is_active: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRow {
    pub kind: String,
    pub message: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarberSummary {
    pub id: String,
    pub display_name: String,
    pub initials: String,
}

impl BarberSummary {
    pub fn new(id: String, display_name: String) -> Self {
        let initials = display_name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .take(2)
            .collect::<String>()
            .to_uppercase();
        BarberSummary {
            id,
            display_name,
            initials,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatCard {
    pub label: String,
    pub value: i64,
}

/// SQLite has no boolean column type; flags are stored as 0/1.
mod int_bool {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(*value != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_transitions() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed, false));
        assert!(Confirmed.can_transition_to(Completed, false));
        assert!(Pending.can_transition_to(Cancelled, false));
        assert!(!Completed.can_transition_to(Cancelled, true));
        assert!(!Pending.can_transition_to(Completed, true));
        assert!(!Cancelled.can_transition_to(Pending, false));
        assert!(Cancelled.can_transition_to(Pending, true));
    }

    #[test]
    fn initials_take_first_two_words() {
        let barber = BarberSummary::new("b1".into(), "marco de la cruz".into());
        assert_eq!(barber.initials, "MD");
    }
}

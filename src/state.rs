use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::models::BookingView;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub events: broadcast::Sender<BookingEvent>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_buffer: usize) -> Self {
        let (events, _) = broadcast::channel(event_buffer);
        Self { db, events }
    }

    /// Fans a booking change out to connected dashboards. Nobody listening is
    /// not an error.
    pub fn publish(&self, kind: &str, booking: &BookingView) {
        let _ = self.events.send(BookingEvent::from_view(kind, booking));
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingEvent {
    pub kind: String,
    pub booking_id: String,
    pub status: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub barber_id: String,
    pub barber_name: String,
    pub service_name: String,
    pub date: String,
    pub time: String,
    pub label: String,
}

impl BookingEvent {
    pub fn from_view(kind: &str, view: &BookingView) -> Self {
        Self {
            kind: kind.to_string(),
            booking_id: view.id.clone(),
            status: view.status.clone(),
            customer_name: view.customer.name.clone(),
            customer_phone: view.customer.phone.clone(),
            barber_id: view.barber_id.clone(),
            barber_name: view.barber_name.clone(),
            service_name: view.service_name.clone(),
            date: view.date.clone(),
            time: view.time.clone(),
            label: view.label.clone(),
        }
    }
}

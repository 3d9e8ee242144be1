use actix_web::{http::header, middleware::from_fn, web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use crate::{
    auth::{logout_guard, staff_validator},
    state::{AppState, BookingEvent},
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/events")
            .wrap(HttpAuthentication::basic(staff_validator))
            .wrap(from_fn(logout_guard))
            .route(web::get().to(stream_events)),
    )
    .service(
        web::resource("/bookings/{id}/events").route(web::get().to(stream_booking_events)),
    );
}

async fn stream_events(state: web::Data<AppState>) -> HttpResponse {
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(|result| match result {
        Ok(event) => Some(Ok::<web::Bytes, actix_web::Error>(sse_frame(&event))),
        Err(err) => {
            log::debug!("Event subscriber lagged: {err}");
            None
        }
    });

    sse_response(stream)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublicStatusEvent {
    booking_id: String,
    status: String,
    service_name: String,
    barber_name: String,
    date: String,
    time: String,
    label: String,
}

impl From<BookingEvent> for PublicStatusEvent {
    fn from(event: BookingEvent) -> Self {
        PublicStatusEvent {
            booking_id: event.booking_id,
            status: event.status,
            service_name: event.service_name,
            barber_name: event.barber_name,
            date: event.date,
            time: event.time,
            label: event.label,
        }
    }
}

async fn stream_booking_events(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> HttpResponse {
    let booking_id = path.into_inner();
    let rx = state.events.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| {
        let event = result.ok()?;
        if event.booking_id != booking_id {
            return None;
        }
        let public = PublicStatusEvent::from(event);
        Some(Ok::<web::Bytes, actix_web::Error>(sse_frame(&public)))
    });

    sse_response(stream)
}

fn sse_response<S>(stream: S) -> HttpResponse
where
    S: Stream<Item = Result<web::Bytes, actix_web::Error>> + 'static,
{
    HttpResponse::Ok()
        .insert_header((header::CONTENT_TYPE, "text/event-stream"))
        .insert_header((header::CACHE_CONTROL, "no-cache"))
        .streaming(stream)
}

fn sse_frame<T: Serialize>(event: &T) -> web::Bytes {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    web::Bytes::from(format!("event: update\ndata: {}\n\n", payload))
}

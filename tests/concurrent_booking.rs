mod common;

use barbershop::{
    bookings::{self, BookingRequest},
    clock::shop_now,
    config::AppConfig,
    error::AppError,
    init_state,
};
use chrono::Weekday;

use common::*;

#[actix_web::test]
async fn parallel_requests_for_one_slot_book_it_once() {
    let dir = tempfile::tempdir().expect("temp dir");
    let config = AppConfig {
        database_url: format!("sqlite://{}", dir.path().join("shop.db").display()),
        ..test_config()
    };
    let state = init_state(&config).await.expect("file-backed state");
    let barber_id = add_barber(&state).await;
    let service_id = add_service(&state, 35.0).await;
    let monday = next(Weekday::Mon);

    let request = |time: &str| -> BookingRequest {
        serde_json::from_value(booking_body(&barber_id, &service_id, monday, time)).unwrap()
    };
    let times = ["11:00", "11:30", "12:00", "12:30", "14:00", "15:30", "17:00", "19:30"];

    for time in times {
        let attempt = || bookings::create_booking(&state.db, request(time), shop_now());
        let (a, b, c, d) = tokio::join!(attempt(), attempt(), attempt(), attempt());

        let mut booked = 0;
        for result in [a, b, c, d] {
            match result {
                Ok(_) => booked += 1,
                Err(AppError::NotAvailable(_)) | Err(AppError::Conflict(_)) => {}
                Err(other) => panic!("{time}: unexpected failure {other}"),
            }
        }
        assert_eq!(booked, 1, "{time} should be booked exactly once");
    }

    let active: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE status <> 'cancelled'")
            .fetch_one(&state.db)
            .await
            .unwrap();
    assert_eq!(active, times.len() as i64);
}

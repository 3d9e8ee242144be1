mod common;

use actix_web::{http::StatusCode, test, web, App};
use barbershop::{db, routes};
use chrono::Weekday;
use serde_json::{json, Value};

use common::*;

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .configure(routes::configure),
        )
        .await
    };
}

fn day(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

macro_rules! slot_count {
    ($app:expr, $barber_id:expr, $date:expr) => {{
        let req = test::TestRequest::get()
            .uri(&format!("/bookings/available-slots/{}/{}", $barber_id, day($date)))
            .to_request();
        let body: Value = test::call_and_read_body_json($app, req).await;
        body["slots"].as_array().map(Vec::len).unwrap_or_default()
    }};
}

#[actix_web::test]
async fn barber_break_and_day_off_shape_availability() {
    let state = test_state().await;
    let barber_id = add_barber(&state).await;
    let monday = next(Weekday::Mon);
    let app = app!(state);

    assert_eq!(slot_count!(&app, &barber_id, monday), 18);

    let req = test::TestRequest::put()
        .uri("/barber/schedule/break")
        .insert_header(basic(BARBER_USER, BARBER_PASSWORD))
        .set_json(json!({ "enabled": true, "startTime": "13:00", "endTime": "14:00" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let schedule: Value = test::read_body_json(resp).await;
    assert_eq!(schedule["followsShopHours"], true);
    assert_eq!(schedule["breakWindow"]["startTime"], "13:00");

    assert_eq!(slot_count!(&app, &barber_id, monday), 16);

    let req = test::TestRequest::post()
        .uri("/barber/schedule/days-off")
        .insert_header(basic(BARBER_USER, BARBER_PASSWORD))
        .set_json(json!({ "date": day(monday), "reason": "Dentist" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    assert_eq!(slot_count!(&app, &barber_id, monday), 0);

    let req = test::TestRequest::delete()
        .uri(&format!("/barber/schedule/days-off/{}", day(monday)))
        .insert_header(basic(BARBER_USER, BARBER_PASSWORD))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    assert_eq!(slot_count!(&app, &barber_id, monday), 16);
}

#[actix_web::test]
async fn personal_hours_replace_shop_hours() {
    let state = test_state().await;
    let barber_id = add_barber(&state).await;
    let app = app!(state);

    let req = test::TestRequest::put()
        .uri("/barber/schedule/hours")
        .insert_header(basic(BARBER_USER, BARBER_PASSWORD))
        .set_json(json!({
            "hours": [
                { "day": "monday", "isWorking": true, "startTime": "12:00", "endTime": "16:00" },
                { "day": "sunday", "isWorking": true, "startTime": "10:00", "endTime": "12:00" }
            ]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    assert_eq!(slot_count!(&app, &barber_id, next(Weekday::Mon)), 8);
    // Sunday is closed for the shop but the barber's own week takes over.
    assert_eq!(slot_count!(&app, &barber_id, next(Weekday::Sun)), 4);
    // Days missing from a personal week are not worked.
    assert_eq!(slot_count!(&app, &barber_id, next(Weekday::Tue)), 0);

    let req = test::TestRequest::put()
        .uri("/barber/schedule/hours")
        .insert_header(basic(BARBER_USER, BARBER_PASSWORD))
        .set_json(json!({ "hours": [] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(slot_count!(&app, &barber_id, next(Weekday::Tue)), 18);
}

#[actix_web::test]
async fn inverted_hours_are_rejected() {
    let state = test_state().await;
    add_barber(&state).await;
    let app = app!(state);

    let req = test::TestRequest::put()
        .uri("/barber/schedule/hours")
        .insert_header(basic(BARBER_USER, BARBER_PASSWORD))
        .set_json(json!({
            "hours": [{ "day": "monday", "isWorking": true, "startTime": "16:00", "endTime": "12:00" }]
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn admin_changes_slot_length() {
    let state = test_state().await;
    let barber_id = add_barber(&state).await;
    let monday = next(Weekday::Mon);
    let app = app!(state);

    let req = test::TestRequest::put()
        .uri("/admin/settings/slot-duration")
        .insert_header(basic(ADMIN_USER, ADMIN_PASSWORD))
        .set_json(json!({ "slotDuration": 60 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let schedule: Value = test::read_body_json(resp).await;
    assert_eq!(schedule["slotDuration"], 60);

    assert_eq!(slot_count!(&app, &barber_id, monday), 9);

    let req = test::TestRequest::put()
        .uri("/admin/settings/slot-duration")
        .insert_header(basic(ADMIN_USER, ADMIN_PASSWORD))
        .set_json(json!({ "slotDuration": 7 }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn staff_areas_require_credentials() {
    let state = test_state().await;
    add_barber(&state).await;
    let app = app!(state);

    let cases = [
        test::TestRequest::get().uri("/admin/dashboard").to_request(),
        test::TestRequest::get()
            .uri("/admin/dashboard")
            .insert_header(basic(BARBER_USER, BARBER_PASSWORD))
            .to_request(),
        test::TestRequest::get()
            .uri("/barber/bookings")
            .insert_header(basic(ADMIN_USER, "wrong"))
            .to_request(),
    ];

    for req in cases {
        let status = match test::try_call_service(&app, req).await {
            Ok(resp) => resp.status(),
            Err(err) => err.as_response_error().status_code(),
        };
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let req = test::TestRequest::get()
        .uri("/admin/dashboard")
        .insert_header(basic(ADMIN_USER, ADMIN_PASSWORD))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["stats"][0]["label"], "Total bookings");
}

#[actix_web::test]
async fn admin_creates_barber_who_can_sign_in() {
    let state = test_state().await;
    let app = app!(state);

    let req = test::TestRequest::post()
        .uri("/admin/barbers")
        .insert_header(basic(ADMIN_USER, ADMIN_PASSWORD))
        .set_json(json!({ "username": "jo", "displayName": "Jo Park", "password": "sharp-blade" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let barber: Value = test::read_body_json(resp).await;
    let barber_id = barber["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/admin/barbers")
        .insert_header(basic(ADMIN_USER, ADMIN_PASSWORD))
        .set_json(json!({ "username": "jo", "displayName": "Jo Again", "password": "sharp-blade" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::get()
        .uri("/barber/stats")
        .insert_header(basic("jo", "sharp-blade"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["barberName"], "Jo Park");

    let req = test::TestRequest::get().uri("/barbers").to_request();
    let barbers: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(barbers[0]["id"], barber_id.as_str());
    assert_eq!(barbers[0]["initials"], "JP");
}

#[actix_web::test]
async fn bootstrap_is_idempotent() {
    let state = test_state().await;
    db::bootstrap(&state.db, &test_config()).await.expect("second bootstrap");

    let admins: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = 'admin'")
        .fetch_one(&state.db)
        .await
        .unwrap();
    let days: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop_hours")
        .fetch_one(&state.db)
        .await
        .unwrap();
    let open: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop_hours WHERE is_open = 1")
        .fetch_one(&state.db)
        .await
        .unwrap();
    assert_eq!((admins, days, open), (1, 7, 6));
}

//! Bookable slot computation.
//!
//! Everything here is pure: callers fetch the shop schedule, the barber's
//! schedule and the barber's bookings for the day, then ask which grid
//! positions are still open.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::clock::{ClockTime, DayOfWeek, MINUTES_PER_DAY};
use crate::models::BookingStatus;

pub const DEFAULT_SLOT_DURATION: u16 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopDay {
    pub day: DayOfWeek,
    pub is_open: bool,
    pub open_time: ClockTime,
    pub close_time: ClockTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopSchedule {
    pub days: Vec<ShopDay>,
    pub slot_duration: u16,
}

impl ShopSchedule {
    pub fn day(&self, day: DayOfWeek) -> Option<&ShopDay> {
        self.days.iter().find(|entry| entry.day == day)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingHours {
    pub day: DayOfWeek,
    pub is_working: bool,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakWindow {
    pub enabled: bool,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
}

impl BreakWindow {
    pub fn covers(&self, time: ClockTime) -> bool {
        self.enabled && self.start_time <= time && time < self.end_time
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayOff {
    pub date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BarberSchedule {
    /// Empty means the barber follows the shop's hours.
    pub working_hours: Vec<WorkingHours>,
    pub break_window: Option<BreakWindow>,
    pub days_off: Vec<DayOff>,
}

impl BarberSchedule {
    pub fn is_day_off(&self, date: NaiveDate) -> bool {
        self.days_off.iter().any(|entry| entry.date == date)
    }
}

/// A slot already claimed by an existing booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupiedSlot {
    pub time: ClockTime,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub time: ClockTime,
    pub label: String,
}

impl From<ClockTime> for Slot {
    fn from(time: ClockTime) -> Self {
        Slot {
            time,
            label: time.label(),
        }
    }
}

/// Start and end of the working window on `date`, or `None` when the barber
/// is off or the shop is closed.
///
/// Barber hours replace shop hours wholesale as soon as the barber has any
/// entry configured.
pub fn working_window(
    date: NaiveDate,
    shop: &ShopSchedule,
    barber: Option<&BarberSchedule>,
) -> Option<(ClockTime, ClockTime)> {
    let day = DayOfWeek::of(date);

    if barber.is_some_and(|schedule| schedule.is_day_off(date)) {
        return None;
    }

    match barber.filter(|schedule| !schedule.working_hours.is_empty()) {
        Some(schedule) => schedule
            .working_hours
            .iter()
            .find(|entry| entry.day == day)
            .filter(|entry| entry.is_working)
            .map(|entry| (entry.start_time, entry.end_time)),
        None => shop
            .day(day)
            .filter(|entry| entry.is_open)
            .map(|entry| (entry.open_time, entry.close_time)),
    }
}

/// Grid positions in `[start, end)`, stepping by `step` minutes from the top
/// of the opening hour. Positions before `start` are skipped, so an 11:15
/// opening on a 30-minute grid starts at 11:30.
pub fn slot_grid(start: ClockTime, end: ClockTime, step: u16) -> Vec<ClockTime> {
    let step = if step == 0 { DEFAULT_SLOT_DURATION } else { step };
    let anchor = start.hour() * 60;
    let last = end.minutes().min(MINUTES_PER_DAY);

    (anchor..last)
        .step_by(step as usize)
        .filter(|minutes| *minutes >= start.minutes())
        .filter_map(ClockTime::from_minutes)
        .collect()
}

pub fn compute_available_slots(
    date: NaiveDate,
    shop: &ShopSchedule,
    barber: Option<&BarberSchedule>,
    existing: &[OccupiedSlot],
) -> Vec<Slot> {
    let Some((start, end)) = working_window(date, shop, barber) else {
        return Vec::new();
    };

    let break_window = barber.and_then(|schedule| schedule.break_window.as_ref());

    slot_grid(start, end, shop.slot_duration)
        .into_iter()
        .filter(|time| !break_window.is_some_and(|window| window.covers(*time)))
        .filter(|time| {
            !existing
                .iter()
                .any(|booked| booked.status.occupies_slot() && booked.time == *time)
        })
        .map(Slot::from)
        .collect()
}

/// Drops slots that have already started relative to `now` (shop local time).
pub fn drop_elapsed(slots: Vec<Slot>, date: NaiveDate, now: NaiveDateTime) -> Vec<Slot> {
    let today = now.date();
    if date < today {
        return Vec::new();
    }
    if date > today {
        return slots;
    }
    let current = ClockTime::from(now.time());
    slots.into_iter().filter(|slot| slot.time > current).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::parse_date;

    fn t(raw: &str) -> ClockTime {
        raw.parse().unwrap()
    }

    fn shop_defaults() -> ShopSchedule {
        let days = DayOfWeek::ALL
            .into_iter()
            .map(|day| ShopDay {
                day,
                is_open: day != DayOfWeek::Sunday,
                open_time: t("09:00"),
                close_time: t("18:00"),
            })
            .collect();
        ShopSchedule {
            days,
            slot_duration: 30,
        }
    }

    fn barber_eleven_to_eight() -> BarberSchedule {
        BarberSchedule {
            working_hours: DayOfWeek::ALL
                .into_iter()
                .map(|day| WorkingHours {
                    day,
                    is_working: true,
                    start_time: t("11:00"),
                    end_time: t("20:00"),
                })
                .collect(),
            break_window: None,
            days_off: Vec::new(),
        }
    }

    fn labels(slots: &[Slot]) -> Vec<&str> {
        slots.iter().map(|slot| slot.label.as_str()).collect()
    }

    // 2024-06-03 is a Monday, 2024-06-02 a Sunday.
    const MONDAY: &str = "2024-06-03";
    const SUNDAY: &str = "2024-06-02";

    #[test]
    fn closed_shop_day_has_no_slots() {
        let shop = shop_defaults();
        let date = parse_date(SUNDAY).unwrap();
        assert!(compute_available_slots(date, &shop, None, &[]).is_empty());
        let empty_override = BarberSchedule::default();
        assert!(compute_available_slots(date, &shop, Some(&empty_override), &[]).is_empty());
    }

    #[test]
    fn day_off_wins_over_working_hours() {
        let shop = shop_defaults();
        let mut barber = barber_eleven_to_eight();
        let date = parse_date(MONDAY).unwrap();
        barber.days_off.push(DayOff {
            date,
            reason: Some("Dentist".into()),
        });
        assert!(compute_available_slots(date, &shop, Some(&barber), &[]).is_empty());

        let tuesday = parse_date("2024-06-04").unwrap();
        assert_eq!(compute_available_slots(tuesday, &shop, Some(&barber), &[]).len(), 18);
    }

    #[test]
    fn full_day_on_thirty_minute_grid() {
        let shop = shop_defaults();
        let barber = barber_eleven_to_eight();
        let slots = compute_available_slots(parse_date(MONDAY).unwrap(), &shop, Some(&barber), &[]);
        assert_eq!(slots.len(), 18);
        assert_eq!(slots.first().unwrap().label, "11:00 AM");
        assert_eq!(slots.last().unwrap().label, "7:30 PM");
        assert!(slots.windows(2).all(|pair| pair[0].time < pair[1].time));
    }

    #[test]
    fn break_window_removes_two_slots() {
        let shop = shop_defaults();
        let mut barber = barber_eleven_to_eight();
        barber.break_window = Some(BreakWindow {
            enabled: true,
            start_time: t("13:00"),
            end_time: t("14:00"),
        });
        let slots = compute_available_slots(parse_date(MONDAY).unwrap(), &shop, Some(&barber), &[]);
        assert_eq!(slots.len(), 16);
        let labels = labels(&slots);
        assert!(!labels.contains(&"1:00 PM"));
        assert!(!labels.contains(&"1:30 PM"));
        assert!(labels.contains(&"12:30 PM"));
        assert!(labels.contains(&"2:00 PM"));
    }

    #[test]
    fn disabled_break_is_ignored() {
        let shop = shop_defaults();
        let mut barber = barber_eleven_to_eight();
        barber.break_window = Some(BreakWindow {
            enabled: false,
            start_time: t("13:00"),
            end_time: t("14:00"),
        });
        let slots = compute_available_slots(parse_date(MONDAY).unwrap(), &shop, Some(&barber), &[]);
        assert_eq!(slots.len(), 18);
    }

    #[test]
    fn booked_slot_excluded_until_cancelled() {
        let shop = shop_defaults();
        let barber = barber_eleven_to_eight();
        let date = parse_date(MONDAY).unwrap();

        let booked = [OccupiedSlot {
            time: t("14:00"),
            status: BookingStatus::Confirmed,
        }];
        let slots = compute_available_slots(date, &shop, Some(&barber), &booked);
        assert_eq!(slots.len(), 17);
        assert!(!labels(&slots).contains(&"2:00 PM"));

        let cancelled = [OccupiedSlot {
            time: t("14:00"),
            status: BookingStatus::Cancelled,
        }];
        let slots = compute_available_slots(date, &shop, Some(&barber), &cancelled);
        assert!(labels(&slots).contains(&"2:00 PM"));
    }

    #[test]
    fn barber_without_hours_follows_shop_window() {
        let shop = shop_defaults();
        let barber = BarberSchedule::default();
        let date = parse_date(MONDAY).unwrap();
        assert_eq!(working_window(date, &shop, Some(&barber)), Some((t("09:00"), t("18:00"))));

        let slots = compute_available_slots(date, &shop, Some(&barber), &[]);
        assert_eq!(slots.first().unwrap().time, t("09:00"));
        assert_eq!(slots.last().unwrap().time, t("17:30"));
        assert_eq!(slots, compute_available_slots(date, &shop, None, &[]));
    }

    #[test]
    fn barber_hours_are_not_merged_with_shop() {
        let shop = shop_defaults();
        let barber = BarberSchedule {
            working_hours: vec![WorkingHours {
                day: DayOfWeek::Tuesday,
                is_working: true,
                start_time: t("10:00"),
                end_time: t("12:00"),
            }],
            ..BarberSchedule::default()
        };
        // Monday has no barber entry, so the shop's Monday hours do not apply.
        assert!(compute_available_slots(parse_date(MONDAY).unwrap(), &shop, Some(&barber), &[]).is_empty());
    }

    #[test]
    fn barber_may_work_when_shop_is_closed() {
        let shop = shop_defaults();
        let barber = barber_eleven_to_eight();
        let slots = compute_available_slots(parse_date(SUNDAY).unwrap(), &shop, Some(&barber), &[]);
        assert_eq!(slots.len(), 18);
    }

    #[test]
    fn off_grid_start_snaps_forward() {
        let grid = slot_grid(t("11:15"), t("12:30"), 30);
        assert_eq!(grid, vec![t("11:30"), t("12:00")]);
    }

    #[test]
    fn configured_step_is_used() {
        let mut shop = shop_defaults();
        shop.slot_duration = 45;
        let grid = slot_grid(t("09:00"), t("12:00"), shop.slot_duration);
        assert_eq!(grid, vec![t("09:00"), t("09:45"), t("10:30"), t("11:15")]);
        let slots = compute_available_slots(parse_date(MONDAY).unwrap(), &shop, None, &[]);
        assert_eq!(slots.len(), 12);
    }

    #[test]
    fn uneven_steps_start_at_opening_time() {
        assert_eq!(
            slot_grid(t("11:00"), t("13:00"), 45),
            vec![t("11:00"), t("11:45"), t("12:30")]
        );
        assert_eq!(slot_grid(t("11:00"), t("14:00"), 90), vec![t("11:00"), t("12:30")]);
        assert_eq!(
            slot_grid(t("11:20"), t("13:00"), 45),
            vec![t("11:45"), t("12:30")]
        );
    }

    #[test]
    fn inverted_window_yields_nothing() {
        assert!(slot_grid(t("18:00"), t("09:00"), 30).is_empty());
    }

    #[test]
    fn elapsed_slots_are_dropped_today_only() {
        let shop = shop_defaults();
        let date = parse_date(MONDAY).unwrap();
        let slots = compute_available_slots(date, &shop, None, &[]);

        let now = date.and_hms_opt(12, 10, 0).unwrap();
        let remaining = drop_elapsed(slots.clone(), date, now);
        assert_eq!(remaining.first().unwrap().time, t("12:30"));

        let yesterday = date.pred_opt().unwrap().and_hms_opt(23, 0, 0).unwrap();
        assert_eq!(drop_elapsed(slots.clone(), date, yesterday).len(), slots.len());

        let tomorrow = date.succ_opt().unwrap().and_hms_opt(8, 0, 0).unwrap();
        assert!(drop_elapsed(slots, date, tomorrow).is_empty());
    }
}

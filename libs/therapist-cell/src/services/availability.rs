use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::UserRole;

use crate::models::{AvailabilityWindow, DaySchedule, TherapistError, UpsertAvailabilityRequest};

/// Every slot is exactly one hour; there is no variable session length.
pub const SLOT_DURATION_MINUTES: i64 = 60;

pub fn slot_duration() -> Duration {
    Duration::minutes(SLOT_DURATION_MINUTES)
}

pub struct AvailabilityService {
    supabase: SupabaseClient,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// A therapist's configured windows, ordered by day then start time.
    pub async fn get_availability(
        &self,
        therapist_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Vec<AvailabilityWindow>, TherapistError> {
        debug!("Fetching availability for therapist: {}", therapist_id);

        let path = format!(
            "/rest/v1/availability?therapist_id=eq.{}&order=day_of_week.asc,start_time.asc",
            therapist_id
        );
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| TherapistError::DatabaseError(e.to_string()))?;

        let windows: Vec<AvailabilityWindow> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AvailabilityWindow>, _>>()
            .map_err(|e| {
                TherapistError::DatabaseError(format!("Failed to parse availability: {}", e))
            })?;

        Ok(windows)
    }

    /// Replace the caller's windows for every day named in the request.
    /// Only expert roles may hold availability.
    pub async fn set_availability(
        &self,
        therapist_id: Uuid,
        request: UpsertAvailabilityRequest,
        auth_token: &str,
    ) -> Result<Vec<AvailabilityWindow>, TherapistError> {
        debug!("Replacing availability for therapist: {}", therapist_id);

        for day in &request.days {
            if day.day_of_week < 0 || day.day_of_week > 6 {
                return Err(TherapistError::ValidationError(
                    "Day of week must be between 0 (Sunday) and 6 (Saturday)".to_string(),
                ));
            }
            for window in &day.windows {
                if window.start_time >= window.end_time {
                    return Err(TherapistError::ValidationError(
                        "Start time must be before end time".to_string(),
                    ));
                }
            }
        }

        self.verify_expert_role(therapist_id, auth_token).await?;

        let mut saved = Vec::new();
        for day in &request.days {
            // Whole-day overwrite: clear the day's rows, then insert the new set
            let delete_path = format!(
                "/rest/v1/availability?therapist_id=eq.{}&day_of_week=eq.{}",
                therapist_id, day.day_of_week
            );
            self.supabase
                .request_no_content(Method::DELETE, &delete_path, Some(auth_token), None, None)
                .await
                .map_err(|e| TherapistError::DatabaseError(e.to_string()))?;

            if day.windows.is_empty() {
                continue;
            }

            let rows: Vec<Value> = day
                .windows
                .iter()
                .map(|window| {
                    json!({
                        "therapist_id": therapist_id,
                        "day_of_week": day.day_of_week,
                        "start_time": window.start_time.format("%H:%M:%S").to_string(),
                        "end_time": window.end_time.format("%H:%M:%S").to_string(),
                        "is_available": window.is_available,
                        "created_at": Utc::now().to_rfc3339(),
                        "updated_at": Utc::now().to_rfc3339()
                    })
                })
                .collect();

            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                "Prefer",
                reqwest::header::HeaderValue::from_static("return=representation"),
            );

            let result: Vec<Value> = self
                .supabase
                .request_with_headers(
                    Method::POST,
                    "/rest/v1/availability",
                    Some(auth_token),
                    Some(Value::Array(rows)),
                    Some(headers),
                )
                .await
                .map_err(|e| TherapistError::DatabaseError(e.to_string()))?;

            let mut windows: Vec<AvailabilityWindow> = result
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<Vec<AvailabilityWindow>, _>>()
                .map_err(|e| {
                    TherapistError::DatabaseError(format!("Failed to parse availability: {}", e))
                })?;
            saved.append(&mut windows);
        }

        Ok(saved)
    }

    /// Expanded week view: per weekday, the sorted union of one-hour slot
    /// starts plus the next date that weekday falls on.
    pub async fn get_week_schedule(
        &self,
        therapist_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Vec<DaySchedule>, TherapistError> {
        let windows = self.get_availability(therapist_id, auth_token).await?;
        let today = Utc::now().date_naive();
        Ok(build_week_schedule(&windows, today))
    }

    async fn verify_expert_role(
        &self,
        therapist_id: Uuid,
        auth_token: &str,
    ) -> Result<(), TherapistError> {
        let path = format!("/rest/v1/profiles?id=eq.{}&select=id,role", therapist_id);
        let result: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| TherapistError::DatabaseError(e.to_string()))?;

        let row = result.first().ok_or(TherapistError::NotFound)?;
        let role = row["role"]
            .as_str()
            .and_then(|r| r.parse::<UserRole>().ok())
            .ok_or_else(|| TherapistError::DatabaseError("Profile has no role".to_string()))?;

        if !role.is_expert() {
            return Err(TherapistError::AuthorizationError(
                "Only expert accounts can configure availability".to_string(),
            ));
        }

        Ok(())
    }
}

/// One-hour slot starts inside a window: consecutive starts from
/// `start_time` while a full hour still fits before `end_time`.
pub fn expand_window(start_time: NaiveTime, end_time: NaiveTime) -> Vec<NaiveTime> {
    if start_time >= end_time {
        warn!(
            "Availability window with start {} not before end {}, yielding no slots",
            start_time, end_time
        );
        return Vec::new();
    }

    let mut slots = Vec::new();
    let mut current = start_time;
    while end_time.signed_duration_since(current) >= slot_duration() {
        slots.push(current);
        current += slot_duration();
    }
    slots
}

/// Sorted, de-duplicated union of slot starts across one weekday's windows.
/// Windows flagged unavailable contribute nothing.
pub fn expand_day(windows: &[&AvailabilityWindow]) -> Vec<NaiveTime> {
    let mut starts = BTreeSet::new();
    for window in windows {
        if !window.is_available {
            continue;
        }
        starts.extend(expand_window(window.start_time, window.end_time));
    }
    starts.into_iter().collect()
}

/// The next calendar date falling on `day_of_week` (0 = Sunday): today if
/// today already is that weekday, else the next future occurrence.
pub fn next_occurrence(today: NaiveDate, day_of_week: i32) -> NaiveDate {
    let today_index = weekday_to_day_of_week(today.weekday());
    let days_ahead = (day_of_week - today_index).rem_euclid(7);
    today + Duration::days(days_ahead as i64)
}

pub fn weekday_to_day_of_week(weekday: Weekday) -> i32 {
    match weekday {
        Weekday::Sun => 0,
        Weekday::Mon => 1,
        Weekday::Tue => 2,
        Weekday::Wed => 3,
        Weekday::Thu => 4,
        Weekday::Fri => 5,
        Weekday::Sat => 6,
    }
}

pub fn day_of_week_label(day_of_week: i32) -> &'static str {
    match day_of_week {
        0 => "Sunday",
        1 => "Monday",
        2 => "Tuesday",
        3 => "Wednesday",
        4 => "Thursday",
        5 => "Friday",
        6 => "Saturday",
        _ => "Unknown",
    }
}

/// Group windows by weekday, expand each day, and attach the next
/// occurrence date. Days without bookable slots are omitted.
pub fn build_week_schedule(windows: &[AvailabilityWindow], today: NaiveDate) -> Vec<DaySchedule> {
    let mut schedule = Vec::new();

    for day_of_week in 0..7 {
        let day_windows: Vec<&AvailabilityWindow> = windows
            .iter()
            .filter(|w| w.day_of_week == day_of_week)
            .collect();
        if day_windows.is_empty() {
            continue;
        }

        let slot_starts = expand_day(&day_windows);
        if slot_starts.is_empty() {
            continue;
        }

        schedule.push(DaySchedule {
            day: day_of_week_label(day_of_week).to_string(),
            day_of_week,
            date: next_occurrence(today, day_of_week),
            slot_starts,
        });
    }

    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn window(day_of_week: i32, start: NaiveTime, end: NaiveTime) -> AvailabilityWindow {
        AvailabilityWindow {
            id: Uuid::new_v4(),
            therapist_id: Uuid::new_v4(),
            day_of_week,
            start_time: start,
            end_time: end,
            is_available: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn three_hour_window_expands_to_three_slots() {
        let slots = expand_window(time(9, 0), time(12, 0));
        assert_eq!(slots, vec![time(9, 0), time(10, 0), time(11, 0)]);
    }

    #[test]
    fn slot_count_is_the_floor_of_the_span_in_hours() {
        let start = time(9, 0);
        let end = time(17, 30);
        let slots = expand_window(start, end);

        assert_eq!(slots.len(), 8);
        for slot in &slots {
            assert!(*slot >= start && *slot < end);
        }
    }

    #[test]
    fn window_shorter_than_an_hour_yields_no_slots() {
        assert!(expand_window(time(10, 0), time(10, 30)).is_empty());
    }

    #[test]
    fn inverted_window_yields_no_slots() {
        assert!(expand_window(time(12, 0), time(9, 0)).is_empty());
        assert!(expand_window(time(9, 0), time(9, 0)).is_empty());
    }

    #[test]
    fn late_evening_window_stays_within_the_day() {
        let slots = expand_window(time(22, 30), time(23, 59));
        assert_eq!(slots, vec![time(22, 30)]);
    }

    #[test]
    fn overlapping_windows_union_without_duplicates() {
        let a = window(1, time(9, 0), time(12, 0));
        let b = window(1, time(11, 0), time(14, 0));
        let slots = expand_day(&[&a, &b]);

        assert_eq!(
            slots,
            vec![time(9, 0), time(10, 0), time(11, 0), time(12, 0), time(13, 0)]
        );
    }

    #[test]
    fn expansion_is_idempotent() {
        let a = window(1, time(9, 0), time(12, 0));
        let b = window(1, time(11, 0), time(14, 0));

        let first = expand_day(&[&a, &b]);
        let second = expand_day(&[&a, &b]);
        assert_eq!(first, second);
    }

    #[test]
    fn unavailable_windows_contribute_nothing() {
        let mut w = window(2, time(9, 0), time(12, 0));
        w.is_available = false;
        assert!(expand_day(&[&w]).is_empty());
    }

    #[test]
    fn next_occurrence_is_today_when_the_weekday_matches() {
        // 2025-06-02 is a Monday
        let monday = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        assert_eq!(next_occurrence(monday, 1), monday);
    }

    #[test]
    fn next_occurrence_rolls_forward_to_the_coming_week() {
        // 2025-06-03 is a Tuesday; the next Monday is 2025-06-09
        let tuesday = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();
        assert_eq!(
            next_occurrence(tuesday, 1),
            NaiveDate::from_ymd_opt(2025, 6, 9).unwrap()
        );
        // Sunday of the same week is 2025-06-08
        assert_eq!(
            next_occurrence(tuesday, 0),
            NaiveDate::from_ymd_opt(2025, 6, 8).unwrap()
        );
    }

    #[test]
    fn monday_morning_schedule_lands_on_next_monday() {
        let windows = vec![window(1, time(9, 0), time(12, 0))];
        // 2025-06-03 is a Tuesday
        let today = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();

        let schedule = build_week_schedule(&windows, today);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].day, "Monday");
        assert_eq!(schedule[0].date, NaiveDate::from_ymd_opt(2025, 6, 9).unwrap());
        assert_eq!(
            schedule[0].slot_starts,
            vec![time(9, 0), time(10, 0), time(11, 0)]
        );
    }

    #[test]
    fn week_schedule_skips_days_without_slots() {
        let windows = vec![
            window(1, time(9, 0), time(12, 0)),
            // too short to fit a slot
            window(3, time(10, 0), time(10, 45)),
        ];
        let today = NaiveDate::from_ymd_opt(2025, 6, 3).unwrap();

        let schedule = build_week_schedule(&windows, today);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[0].day_of_week, 1);
    }
}

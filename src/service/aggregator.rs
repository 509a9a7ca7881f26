use crate::model::attendance::{AttendanceRecord, AttendanceStatus};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

pub const WEEK_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailyAttendance {
    /// Abbreviated weekday, e.g. `Mon`.
    #[schema(example = "Fri")]
    pub label: String,
    #[schema(value_type = String, format = "date", example = "2026-10-16")]
    pub date: NaiveDate,
    #[schema(example = 9)]
    pub present_count: i64,
    /// Roster size minus `present_count`; not clamped at zero.
    #[schema(example = 1)]
    pub absent_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct DashboardSummary {
    #[schema(example = 10)]
    pub total_students: usize,
    #[schema(example = 4)]
    pub total_classes: usize,
    #[schema(example = 4)]
    pub present_today: usize,
    /// Percentage with one decimal.
    #[schema(example = 40.0)]
    pub attendance_rate: f64,
    pub weekly: Vec<DailyAttendance>,
}

/// First day of the seven-day window ending on `now`'s day.
pub fn window_start(now: NaiveDateTime) -> NaiveDate {
    now.date() - Duration::days(WEEK_DAYS - 1)
}

// Every record on a day counts, whatever its status. Only `present` is ever
// written today; anything else shows up in the logs.
fn count_on(records: &[AttendanceRecord], day: NaiveDate) -> usize {
    records
        .iter()
        .filter(|r| r.date == day)
        .inspect(|r| {
            if r.status != AttendanceStatus::Present {
                warn!(record_id = %r.id, status = %r.status, "Non-present record counted as attendance");
            }
        })
        .count()
}

pub fn todays_attendance_rate(
    total_students: usize,
    records: &[AttendanceRecord],
    now: NaiveDateTime,
) -> f64 {
    if total_students == 0 {
        return 0.0;
    }
    count_on(records, now.date()) as f64 / total_students as f64 * 100.0
}

/// Seven entries, oldest first, ending on `now`'s day.
pub fn weekly_series(
    total_students: usize,
    records: &[AttendanceRecord],
    now: NaiveDateTime,
) -> Vec<DailyAttendance> {
    let start = window_start(now);

    (0..WEEK_DAYS)
        .map(|offset| {
            let day = start + Duration::days(offset);
            let present = count_on(records, day) as i64;
            DailyAttendance {
                label: day.format("%a").to_string(),
                date: day,
                present_count: present,
                absent_count: total_students as i64 - present,
            }
        })
        .collect()
}

pub fn dashboard_summary(
    total_students: usize,
    total_classes: usize,
    records: &[AttendanceRecord],
    now: NaiveDateTime,
) -> DashboardSummary {
    let rate = todays_attendance_rate(total_students, records, now);

    DashboardSummary {
        total_students,
        total_classes,
        present_today: count_on(records, now.date()),
        attendance_rate: (rate * 10.0).round() / 10.0,
        weekly: weekly_series(total_students, records, now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    fn now() -> NaiveDateTime {
        // a Friday
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap()
    }

    fn record(n: usize, date: NaiveDate) -> AttendanceRecord {
        AttendanceRecord {
            id: format!("att-{n}"),
            student_id: format!("student-{n}"),
            class_id: "class-1".into(),
            date,
            time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            status: AttendanceStatus::Present,
            recorded_by: "user-2".into(),
        }
    }

    fn days_ago(n: i64) -> NaiveDate {
        now().date() - Duration::days(n)
    }

    #[test]
    fn rate_is_todays_records_over_roster() {
        let records: Vec<_> = (0..4).map(|n| record(n, days_ago(0))).collect();
        assert_eq!(todays_attendance_rate(10, &records, now()), 40.0);
    }

    #[test]
    fn rate_ignores_other_days() {
        let records = vec![record(1, days_ago(0)), record(2, days_ago(1)), record(3, days_ago(8))];
        assert_eq!(todays_attendance_rate(4, &records, now()), 25.0);
    }

    #[test]
    fn empty_roster_rate_is_zero() {
        let records = vec![record(1, days_ago(0))];
        assert_eq!(todays_attendance_rate(0, &records, now()), 0.0);
    }

    #[test]
    fn weekly_series_is_seven_days_oldest_first() {
        let series = weekly_series(3, &[], now());

        assert_eq!(series.len(), 7);
        assert_eq!(series.first().unwrap().date, days_ago(6));
        assert_eq!(series.last().unwrap().date, now().date());
        assert_eq!(series.last().unwrap().label, "Fri");
        assert_eq!(series[0].label, "Sat");
        assert!(series.windows(2).all(|w| w[0].date < w[1].date));
        assert!(series.iter().all(|d| d.present_count == 0 && d.absent_count == 3));
    }

    #[test]
    fn weekly_present_sums_to_records_in_window() {
        let records = vec![
            record(1, days_ago(0)),
            record(2, days_ago(0)),
            record(3, days_ago(3)),
            record(4, days_ago(6)),
            record(5, days_ago(7)),
            record(6, days_ago(0) + Duration::days(1)),
        ];

        let series = weekly_series(5, &records, now());
        let total: i64 = series.iter().map(|d| d.present_count).sum();

        assert_eq!(total, 4);
        assert_eq!(series[6].present_count, 2);
        assert_eq!(series[6].absent_count, 3);
        assert_eq!(series[3].present_count, 1);
        assert_eq!(series[0].present_count, 1);
    }

    #[test]
    fn absent_count_is_not_clamped() {
        let records: Vec<_> = (0..3).map(|n| record(n, days_ago(2))).collect();
        let series = weekly_series(2, &records, now());
        assert_eq!(series[4].absent_count, -1);
    }

    #[test]
    fn non_present_records_still_count() {
        let mut sick = record(1, days_ago(0));
        sick.status = AttendanceStatus::Sick;

        let series = weekly_series(2, &[sick], now());
        assert_eq!(series[6].present_count, 1);
    }

    #[test]
    fn summary_rounds_rate_to_one_decimal() {
        let records = vec![record(1, days_ago(0))];
        let summary = dashboard_summary(3, 4, &records, now());

        assert_eq!(summary.total_students, 3);
        assert_eq!(summary.total_classes, 4);
        assert_eq!(summary.present_today, 1);
        assert_eq!(summary.attendance_rate, 33.3);
        assert_eq!(summary.weekly.len(), 7);
    }
}

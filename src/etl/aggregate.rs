use super::gap::AnalyzedCall;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

// Every agent-day is entitled to one unpaid hour of break: a gap total above
// an hour is reduced by exactly one hour once, and the same hour is added
// back into login time as paid.
pub(crate) const UNPAID_BREAK_SECS: i64 = 3600;

// Grace allowance of idle seconds granted per dialed call before leftover
// gap time counts against the agent.
pub(crate) const GAP_LEVERAGE_PER_CALL_SECS: i64 = 45;

const CONNECTED_STATUS: &str = "connected";
const LONG_CALL_TALK_SECS: i64 = 30;

/// Attendance state derived from login hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Attendance {
    Absent,
    HalfDay,
    Warning,
    Present,
}

impl Attendance {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Absent => "Absent",
            Self::HalfDay => "Half Day",
            Self::Warning => "Warning",
            Self::Present => "Present",
        }
    }
}

/// Buckets login seconds into an attendance state. Thresholds are exclusive
/// upper bounds, so exactly 4h30m is already a half day and exactly 8h30m is
/// present.
pub fn mark_attendance(login_secs: i64) -> Attendance {
    if login_secs < 4 * 3600 + 30 * 60 {
        Attendance::Absent
    } else if login_secs < 6 * 3600 {
        Attendance::HalfDay
    } else if login_secs < 8 * 3600 + 30 * 60 {
        Attendance::Warning
    } else {
        Attendance::Present
    }
}

/// Per-agent per-day activity rollup.
#[derive(Debug, Clone)]
pub struct DailyAggregate {
    pub crm_id: String,
    pub date: NaiveDate,
    pub total_dialed_calls: u64,
    pub unique_dialed_numbers: u64,
    pub total_connected_calls: u64,
    pub total_call_gaps: u64,
    pub total_calls_gt30: u64,
    pub total_duration_secs: i64,
    pub total_talk_secs: i64,
    pub total_talk_gt30_secs: i64,
    pub total_connected_hold_secs: i64,
    pub total_gap_secs: i64,
    pub avg_gap_per_call: f64,
    pub gap_after_leverage_secs: i64,
    pub login_secs: i64,
    pub attendance: Attendance,
}

#[derive(Default)]
struct GroupTotals {
    dialed: u64,
    numbers: HashSet<String>,
    connected: u64,
    gaps: u64,
    long_calls: u64,
    duration_secs: i64,
    talk_secs: i64,
    talk_gt30_secs: i64,
    hold_secs: i64,
    gap_secs: i64,
}

/// Groups analyzed calls by (crm id, date) and computes the daily metric
/// set. Rows whose date never parsed carry no calendar day and are skipped;
/// they are already surfaced on the null-date diagnostic.
pub fn aggregate(calls: &[AnalyzedCall]) -> Vec<DailyAggregate> {
    let mut groups: BTreeMap<(String, NaiveDate), GroupTotals> = BTreeMap::new();

    for call in calls {
        let Some(date) = call.date else { continue };
        let totals = groups.entry((call.crm_id.clone(), date)).or_default();

        totals.dialed += 1;
        totals.numbers.insert(call.number.clone());
        totals.duration_secs += call.total_secs;
        totals.gap_secs += call.gap_secs;
        if call.call_gap {
            totals.gaps += 1;
        }

        if call.call_status == CONNECTED_STATUS {
            totals.connected += 1;
            totals.talk_secs += call.talk_secs;
            totals.hold_secs += call.hold_secs;
            if call.talk_secs > LONG_CALL_TALK_SECS {
                totals.long_calls += 1;
                totals.talk_gt30_secs += call.talk_secs;
            }
        }
    }

    groups
        .into_iter()
        .map(|((crm_id, date), totals)| finalize(crm_id, date, totals))
        .collect()
}

fn finalize(crm_id: String, date: NaiveDate, totals: GroupTotals) -> DailyAggregate {
    // The unpaid break hour comes off the gap total at most once.
    let gap_secs = if totals.gap_secs > UNPAID_BREAK_SECS {
        totals.gap_secs - UNPAID_BREAK_SECS
    } else {
        totals.gap_secs
    };

    let avg_gap_per_call = if totals.dialed > 0 {
        gap_secs as f64 / totals.dialed as f64
    } else {
        0.0
    };
    let gap_after_leverage_secs =
        (gap_secs - totals.dialed as i64 * GAP_LEVERAGE_PER_CALL_SECS).max(0);
    let login_secs = totals.duration_secs + gap_secs + UNPAID_BREAK_SECS;

    DailyAggregate {
        crm_id,
        date,
        total_dialed_calls: totals.dialed,
        unique_dialed_numbers: totals.numbers.len() as u64,
        total_connected_calls: totals.connected,
        total_call_gaps: totals.gaps,
        total_calls_gt30: totals.long_calls,
        total_duration_secs: totals.duration_secs,
        total_talk_secs: totals.talk_secs,
        total_talk_gt30_secs: totals.talk_gt30_secs,
        total_connected_hold_secs: totals.hold_secs,
        total_gap_secs: gap_secs,
        avg_gap_per_call,
        gap_after_leverage_secs,
        login_secs,
        attendance: mark_attendance(login_secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzed(
        crm_id: &str,
        day: u32,
        number: &str,
        status: &str,
        talk_secs: i64,
        total_secs: i64,
        gap_secs: i64,
        call_gap: bool,
    ) -> AnalyzedCall {
        let date = NaiveDate::from_ymd_opt(2025, 8, day);
        AnalyzedCall {
            crm_id: crm_id.to_string(),
            date,
            start: date.and_then(|d| d.and_hms_opt(10, 0, 0)),
            number: number.to_string(),
            call_status: status.to_string(),
            call_gap,
            talk_secs,
            hold_secs: 5,
            total_secs,
            gap_secs,
        }
    }

    #[test]
    fn groups_by_agent_and_day_with_the_full_metric_set() {
        let calls = vec![
            analyzed("a@x.com", 20, "111", "connected", 40, 60, 0, false),
            analyzed("a@x.com", 20, "111", "connected", 20, 30, 120, true),
            analyzed("a@x.com", 20, "222", "missed", 0, 10, 30, false),
            analyzed("a@x.com", 21, "333", "connected", 50, 70, 0, false),
        ];

        let aggregates = aggregate(&calls);
        assert_eq!(aggregates.len(), 2);

        let day_one = &aggregates[0];
        assert_eq!(day_one.date, NaiveDate::from_ymd_opt(2025, 8, 20).expect("date"));
        assert_eq!(day_one.total_dialed_calls, 3);
        assert_eq!(day_one.unique_dialed_numbers, 2);
        assert_eq!(day_one.total_connected_calls, 2);
        assert_eq!(day_one.total_call_gaps, 1);
        assert_eq!(day_one.total_calls_gt30, 1);
        assert_eq!(day_one.total_duration_secs, 100);
        assert_eq!(day_one.total_talk_secs, 60);
        assert_eq!(day_one.total_talk_gt30_secs, 40);
        assert_eq!(day_one.total_connected_hold_secs, 10);
        assert_eq!(day_one.total_gap_secs, 150);
    }

    #[test]
    fn break_hour_is_subtracted_once_even_for_large_gap_totals() {
        let calls = vec![
            analyzed("a@x.com", 20, "111", "connected", 40, 0, 3600, true),
            analyzed("a@x.com", 20, "222", "connected", 40, 0, 3600, true),
        ];

        let aggregates = aggregate(&calls);
        // Raw sum 7200 corrects to 3600, not to zero.
        assert_eq!(aggregates[0].total_gap_secs, 3600);
    }

    #[test]
    fn gap_totals_at_or_below_an_hour_are_untouched() {
        let calls = vec![analyzed("a@x.com", 20, "111", "connected", 40, 0, 3600, true)];
        assert_eq!(aggregate(&calls)[0].total_gap_secs, 3600);
    }

    #[test]
    fn leverage_grants_forty_five_seconds_per_dialed_call() {
        let calls = vec![
            analyzed("a@x.com", 20, "111", "connected", 40, 0, 100, true),
            analyzed("a@x.com", 20, "222", "connected", 40, 0, 20, false),
        ];

        let aggregates = aggregate(&calls);
        assert_eq!(aggregates[0].gap_after_leverage_secs, 120 - 2 * 45);
    }

    #[test]
    fn leverage_never_goes_negative() {
        let calls = vec![analyzed("a@x.com", 20, "111", "connected", 40, 0, 10, false)];
        assert_eq!(aggregate(&calls)[0].gap_after_leverage_secs, 0);
    }

    #[test]
    fn login_hours_add_duration_gap_and_break_hour() {
        let calls = vec![analyzed("a@x.com", 20, "111", "connected", 40, 1800, 600, true)];
        assert_eq!(aggregate(&calls)[0].login_secs, 1800 + 600 + 3600);
    }

    #[test]
    fn attendance_boundaries_are_inclusive_going_up() {
        assert_eq!(mark_attendance(4 * 3600 + 30 * 60 - 1), Attendance::Absent);
        assert_eq!(mark_attendance(4 * 3600 + 30 * 60), Attendance::HalfDay);
        assert_eq!(mark_attendance(6 * 3600 - 1), Attendance::HalfDay);
        assert_eq!(mark_attendance(6 * 3600), Attendance::Warning);
        assert_eq!(mark_attendance(8 * 3600 + 30 * 60 - 1), Attendance::Warning);
        assert_eq!(mark_attendance(8 * 3600 + 30 * 60), Attendance::Present);
    }

    #[test]
    fn null_date_rows_never_reach_an_aggregate() {
        let mut call = analyzed("a@x.com", 20, "111", "connected", 40, 60, 0, false);
        call.date = None;
        assert!(aggregate(&[call]).is_empty());
    }
}

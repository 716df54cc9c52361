use super::duration::{format_hhmmss, parse_clock, tolerant_seconds};
use super::roster::MatchedCall;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

// Business window for flagging idle time; gaps touching either side of it do
// not count against the agent.
const WINDOW_OPEN_SECS: u32 = 9 * 3600 + 30 * 60;
const WINDOW_CLOSE_SECS: u32 = 18 * 3600 + 30 * 60;

// A gap is only flagged once it exceeds a minute.
const GAP_FLAG_THRESHOLD_SECS: i64 = 60;

/// A matched call with its start timestamp reconstructed, its inter-call gap
/// computed, and all duration columns flattened to integer seconds.
#[derive(Debug, Clone)]
pub struct AnalyzedCall {
    pub crm_id: String,
    pub date: Option<NaiveDate>,
    pub start: Option<NaiveDateTime>,
    pub number: String,
    pub call_status: String,
    pub call_gap: bool,
    pub talk_secs: i64,
    pub hold_secs: i64,
    pub total_secs: i64,
    pub gap_secs: i64,
}

impl AnalyzedCall {
    pub fn gap_label(&self) -> String {
        format_hhmmss(self.gap_secs)
    }

    pub fn call_gap_label(&self) -> &'static str {
        if self.call_gap {
            "Yes"
        } else {
            "No"
        }
    }
}

#[derive(Debug, Default)]
pub struct GapAnalysis {
    pub calls: Vec<AnalyzedCall>,
    /// Duration values no parser understood. Data-quality signal; the rows
    /// stay in the analysis with those values contributing zero seconds.
    pub invalid_durations: Vec<String>,
}

// Carried accumulator state for the fold: just enough of the previous call
// to decide whether the current one continues the same agent-day run.
struct PreviousCall {
    crm_id: String,
    date: Option<NaiveDate>,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
}

/// Computes inter-call gaps per agent per day. Only matched calls with a
/// talk-time value participate. Records are sorted by (date, crm id, start);
/// each record's gap is measured against its immediate predecessor in that
/// order, and only when both belong to the same agent and the same parsed
/// date. Overlapping calls clamp to a zero gap.
pub fn analyze(matched: &[MatchedCall]) -> GapAnalysis {
    let mut invalid = Vec::new();
    let mut calls: Vec<AnalyzedCall> = matched
        .iter()
        .filter(|matched| matched.call.talk_time.is_some())
        .map(|matched| prepare(matched, &mut invalid))
        .collect();

    calls.sort_by(|a, b| {
        a.date
            .cmp(&b.date)
            .then_with(|| a.crm_id.cmp(&b.crm_id))
            .then_with(|| a.start.cmp(&b.start))
    });

    let mut previous: Option<PreviousCall> = None;
    for call in &mut calls {
        if let Some(prev) = &previous {
            let same_agent = prev.crm_id == call.crm_id;
            let same_day = matches!((prev.date, call.date), (Some(a), Some(b)) if a == b);
            if same_agent && same_day {
                if let (Some(prev_start), Some(prev_end), Some(start)) =
                    (prev.start, prev.end, call.start)
                {
                    let gap = (start - prev_end).max(Duration::zero());
                    call.gap_secs = gap.num_seconds();
                    call.call_gap = within_business_window(prev_start.time())
                        && within_business_window(start.time())
                        && call.gap_secs > GAP_FLAG_THRESHOLD_SECS;
                }
            }
        }

        previous = Some(PreviousCall {
            crm_id: call.crm_id.clone(),
            date: call.date,
            start: call.start,
            end: call.start.map(|start| start + Duration::seconds(call.total_secs)),
        });
    }

    GapAnalysis {
        calls,
        invalid_durations: invalid,
    }
}

fn prepare(matched: &MatchedCall, invalid: &mut Vec<String>) -> AnalyzedCall {
    let call = &matched.call;
    let total_secs = parse_clock(&call.total_call_duration)
        .unwrap_or_else(Duration::zero)
        .num_seconds();

    AnalyzedCall {
        crm_id: matched.crm_id.clone(),
        date: call.date,
        start: call
            .call_start_time
            .map(|time| call.date.unwrap_or_else(fallback_date).and_time(time)),
        number: call.number.clone(),
        call_status: call.call_status.clone(),
        call_gap: false,
        talk_secs: seconds_or_flag(call.talk_time.as_deref().unwrap_or_default(), invalid),
        hold_secs: seconds_or_flag(call.hold_time.as_deref().unwrap_or_default(), invalid),
        total_secs,
        gap_secs: 0,
    }
}

// Placeholder date for rows whose date column failed to parse; their start
// timestamps still order within the day but carry no cross-day meaning.
fn fallback_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or_default()
}

fn within_business_window(time: NaiveTime) -> bool {
    (WINDOW_OPEN_SECS..=WINDOW_CLOSE_SECS).contains(&time.num_seconds_from_midnight())
}

fn seconds_or_flag(value: &str, invalid: &mut Vec<String>) -> i64 {
    match tolerant_seconds(value) {
        Some(seconds) => seconds,
        None => {
            invalid.push(value.to_string());
            0
        }
    }
}

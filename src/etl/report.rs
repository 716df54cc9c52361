use super::aggregate::{Attendance, DailyAggregate};
use super::duration::format_hhmmss;
use super::roster::RosterRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// One row of the final summary. Field order is the report's column order;
/// serde renames carry the published column names for both CSV and JSON.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "Date")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "Pool")]
    pub pool: String,
    #[serde(rename = "TL")]
    pub tl: String,
    #[serde(rename = "CRM ID")]
    pub crm_id: String,
    #[serde(rename = "Employee code")]
    pub employee_code: String,
    #[serde(rename = "Full Name")]
    pub full_name: String,
    #[serde(rename = "Vertical")]
    pub vertical: String,
    #[serde(rename = "Total Dialed Calls")]
    pub total_dialed_calls: u64,
    #[serde(rename = "Unique Dialed Numbers")]
    pub unique_dialed_numbers: u64,
    #[serde(rename = "Total Connected Calls")]
    pub total_connected_calls: u64,
    #[serde(rename = "Total Number of Call Gap")]
    pub total_call_gaps: u64,
    #[serde(rename = "Total Call GT 30")]
    pub total_calls_gt30: u64,
    #[serde(rename = "Total Duration")]
    pub total_duration_secs: i64,
    #[serde(rename = "Total Talk Time")]
    pub total_talk_secs: i64,
    #[serde(rename = "Total Talk Time GT 30")]
    pub total_talk_gt30_secs: i64,
    #[serde(rename = "Total Connected Hold Time")]
    pub total_connected_hold_secs: i64,
    #[serde(rename = "Total Gap Duration")]
    pub total_gap_secs: i64,
    #[serde(rename = "Avg Gap Per Call")]
    pub avg_gap_per_call: f64,
    #[serde(rename = "Gap Duration After Leverage")]
    pub gap_after_leverage_secs: i64,
    #[serde(rename = "Login Hours")]
    pub login_hours: String,
    #[serde(rename = "Attendance")]
    pub attendance: String,
}

/// Expands the aggregates over the full roster: every deduped agent appears
/// on every observed date, zero-filled where no activity was recorded, so
/// absences are explicit rows rather than missing ones. With no observed
/// dates at all, each agent still gets one dateless zero row.
pub fn assemble(
    aggregates: &[DailyAggregate],
    agents: &[RosterRecord],
) -> Vec<SummaryRow> {
    let by_key: HashMap<(&str, NaiveDate), &DailyAggregate> = aggregates
        .iter()
        .map(|aggregate| ((aggregate.crm_id.as_str(), aggregate.date), aggregate))
        .collect();
    let observed_dates: BTreeSet<NaiveDate> =
        aggregates.iter().map(|aggregate| aggregate.date).collect();

    if observed_dates.is_empty() {
        return agents.iter().map(|agent| zero_row(agent, None)).collect();
    }

    let mut rows = Vec::with_capacity(observed_dates.len() * agents.len());
    for date in &observed_dates {
        for agent in agents {
            match by_key.get(&(agent.crm_id.as_str(), *date)) {
                Some(aggregate) => rows.push(filled_row(agent, aggregate)),
                None => rows.push(zero_row(agent, Some(*date))),
            }
        }
    }

    rows
}

fn filled_row(agent: &RosterRecord, aggregate: &DailyAggregate) -> SummaryRow {
    SummaryRow {
        date: Some(aggregate.date),
        pool: agent.pool.clone(),
        tl: agent.tl.clone(),
        crm_id: agent.crm_id.clone(),
        employee_code: agent.employee_code.clone(),
        full_name: agent.full_name.clone(),
        vertical: agent.vertical.clone(),
        total_dialed_calls: aggregate.total_dialed_calls,
        unique_dialed_numbers: aggregate.unique_dialed_numbers,
        total_connected_calls: aggregate.total_connected_calls,
        total_call_gaps: aggregate.total_call_gaps,
        total_calls_gt30: aggregate.total_calls_gt30,
        total_duration_secs: aggregate.total_duration_secs,
        total_talk_secs: aggregate.total_talk_secs,
        total_talk_gt30_secs: aggregate.total_talk_gt30_secs,
        total_connected_hold_secs: aggregate.total_connected_hold_secs,
        total_gap_secs: aggregate.total_gap_secs,
        avg_gap_per_call: aggregate.avg_gap_per_call,
        gap_after_leverage_secs: aggregate.gap_after_leverage_secs,
        login_hours: format_hhmmss(aggregate.login_secs),
        attendance: aggregate.attendance.label().to_string(),
    }
}

fn zero_row(agent: &RosterRecord, date: Option<NaiveDate>) -> SummaryRow {
    SummaryRow {
        date,
        pool: agent.pool.clone(),
        tl: agent.tl.clone(),
        crm_id: agent.crm_id.clone(),
        employee_code: agent.employee_code.clone(),
        full_name: agent.full_name.clone(),
        vertical: agent.vertical.clone(),
        total_dialed_calls: 0,
        unique_dialed_numbers: 0,
        total_connected_calls: 0,
        total_call_gaps: 0,
        total_calls_gt30: 0,
        total_duration_secs: 0,
        total_talk_secs: 0,
        total_talk_gt30_secs: 0,
        total_connected_hold_secs: 0,
        total_gap_secs: 0,
        avg_gap_per_call: 0.0,
        gap_after_leverage_secs: 0,
        login_hours: format_hhmmss(0),
        attendance: Attendance::Absent.label().to_string(),
    }
}

use super::vendor::CallRecord;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Read;

/// One active agent from the roster reference file. `crm_id` is the roster
/// email and is the join key for all attendance reporting; `dialer_name` is
/// stored normalized.
#[derive(Debug, Clone, Serialize)]
pub struct RosterRecord {
    pub crm_id: String,
    pub dialer_name: String,
    pub employee_code: String,
    pub full_name: String,
    pub pool: String,
    pub tl: String,
    pub vertical: String,
}

#[derive(Debug, Deserialize)]
struct RosterRow {
    #[serde(rename = "Email")]
    email: String,
    #[serde(rename = "Dialer Name")]
    dialer_name: String,
    #[serde(rename = "Employee code", default)]
    employee_code: String,
    #[serde(rename = "Full Name", default)]
    full_name: String,
    #[serde(rename = "Pool", default)]
    pool: String,
    #[serde(rename = "TL", default)]
    tl: String,
    #[serde(rename = "Vertical", default)]
    vertical: String,
}

/// Normalizes a free-text agent name so variant spellings across dialers and
/// the roster collapse to one key: lowercase, drop anything from `@` or `;`
/// onward, drop parenthetical suffixes, collapse whitespace. Idempotent.
pub fn normalize_dialer_name(value: &str) -> String {
    let lowered = value.to_lowercase();
    let head = lowered.split(['@', ';']).next().unwrap_or_default();

    let mut kept = String::with_capacity(head.len());
    let mut depth = 0usize;
    for ch in head.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth == 0 => kept.push(ch),
            _ => {}
        }
    }

    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reads the roster, dropping rows whose email marks the agent inactive and
/// deduplicating on (normalized dialer name, crm id).
pub fn read_roster<R: Read>(reader: R) -> Result<Vec<RosterRecord>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut records = Vec::new();

    for row in csv_reader.deserialize::<RosterRow>() {
        let row = row?;
        if row.email.to_lowercase().contains("inactive") {
            continue;
        }

        let crm_id = row.email.trim().to_string();
        let dialer_name = normalize_dialer_name(&row.dialer_name);
        if !seen.insert((dialer_name.clone(), crm_id.clone())) {
            continue;
        }

        records.push(RosterRecord {
            crm_id,
            dialer_name,
            employee_code: row.employee_code,
            full_name: row.full_name,
            pool: row.pool,
            tl: row.tl,
            vertical: row.vertical,
        });
    }

    Ok(records)
}

/// Second dedup, by crm id alone: the one-row-per-agent roster used for
/// date expansion in the final report.
pub fn unique_agents(roster: &[RosterRecord]) -> Vec<RosterRecord> {
    let mut seen: HashSet<&str> = HashSet::new();
    roster
        .iter()
        .filter(|agent| seen.insert(agent.crm_id.as_str()))
        .cloned()
        .collect()
}

/// A call record joined to its roster agent.
#[derive(Debug, Clone)]
pub struct MatchedCall {
    pub crm_id: String,
    pub call: CallRecord,
}

#[derive(Debug, Default)]
pub struct MatchOutcome {
    pub matched: Vec<MatchedCall>,
    pub unmatched: Vec<CallRecord>,
}

/// Left join of the merged call log against the roster on normalized dialer
/// name. Call records expect their names already normalized. Unmatched rows
/// are diagnostic output, not errors; when two roster agents share a
/// normalized name the first occurrence wins.
pub fn match_calls(calls: &[CallRecord], roster: &[RosterRecord]) -> MatchOutcome {
    let mut by_name: HashMap<&str, &RosterRecord> = HashMap::with_capacity(roster.len());
    for agent in roster {
        by_name.entry(agent.dialer_name.as_str()).or_insert(agent);
    }

    let mut outcome = MatchOutcome::default();
    for call in calls {
        match by_name.get(call.dialer_name.as_str()) {
            Some(agent) => outcome.matched.push(MatchedCall {
                crm_id: agent.crm_id.clone(),
                call: call.clone(),
            }),
            None => outcome.unmatched.push(call.clone()),
        }
    }

    outcome
}

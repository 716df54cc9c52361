//! Batch ETL pipeline turning raw dialer exports plus a roster into the
//! attendance summary and its diagnostic side-tables. Pure with respect to
//! the supplied readers: no other I/O, single pass, single thread.

mod aggregate;
mod duration;
mod gap;
mod report;
mod roster;
mod vendor;

pub use aggregate::{aggregate, mark_attendance, Attendance, DailyAggregate};
pub use gap::{analyze, AnalyzedCall, GapAnalysis};
pub use report::{assemble, SummaryRow};
pub use roster::{
    match_calls, normalize_dialer_name, read_roster, unique_agents, MatchOutcome, MatchedCall,
    RosterRecord,
};
pub use vendor::{read_records, CallRecord, Vendor};

use std::io::Read;
use std::path::Path;

#[derive(Debug)]
pub enum EtlError {
    /// No vendor table was supplied at all; at least one is mandatory.
    NoInputData,
    Csv(csv::Error),
    Io(std::io::Error),
}

impl std::fmt::Display for EtlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EtlError::NoInputData => {
                write!(f, "no dialer exports supplied; at least one vendor file is required")
            }
            EtlError::Csv(err) => write!(f, "invalid dialer CSV data: {}", err),
            EtlError::Io(err) => write!(f, "failed to read dialer export: {}", err),
        }
    }
}

impl std::error::Error for EtlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EtlError::NoInputData => None,
            EtlError::Csv(err) => Some(err),
            EtlError::Io(err) => Some(err),
        }
    }
}

impl From<csv::Error> for EtlError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

/// Data-quality findings surfaced as first-class outputs, not logs.
#[derive(Debug, Default)]
pub struct Diagnostics {
    /// Merged rows whose date column failed its vendor's format.
    pub null_dates: Vec<CallRecord>,
    /// Duration values no parser understood, passed through as zero seconds.
    pub invalid_durations: Vec<String>,
}

/// Everything one pipeline run produces.
#[derive(Debug)]
pub struct PipelineOutput {
    pub summary: Vec<SummaryRow>,
    /// The merged canonical call log, dialer names normalized.
    pub dialer_raw: Vec<CallRecord>,
    /// Call records with no roster match, excluded from attendance.
    pub not_found: Vec<CallRecord>,
    pub diagnostics: Diagnostics,
}

pub struct AttendancePipeline;

impl AttendancePipeline {
    /// Convenience wrapper opening files for [`Self::from_readers`]. The
    /// roster path is mandatory; each vendor export is optional to the
    /// caller, which simply omits absent vendors from `exports`.
    pub fn from_paths<P: AsRef<Path>>(
        exports: &[(Vendor, P)],
        roster: P,
    ) -> Result<PipelineOutput, EtlError> {
        let mut readers = Vec::with_capacity(exports.len());
        for (vendor, path) in exports {
            readers.push((*vendor, std::fs::File::open(path)?));
        }
        let roster_file = std::fs::File::open(roster)?;
        Self::from_readers(readers, roster_file)
    }

    /// Runs the full pipeline: normalize each vendor table, merge in vendor
    /// precedence order, match against the roster, analyze gaps, aggregate
    /// per agent-day, and assemble the summary.
    pub fn from_readers<R: Read, S: Read>(
        exports: Vec<(Vendor, R)>,
        roster: S,
    ) -> Result<PipelineOutput, EtlError> {
        if exports.is_empty() {
            return Err(EtlError::NoInputData);
        }

        let mut tables = Vec::with_capacity(exports.len());
        for (vendor, reader) in exports {
            tables.push((vendor, vendor::read_records(vendor, reader)?));
        }

        // Vendor blocks merge in fixed precedence order, each block keeping
        // its original row order.
        tables.sort_by_key(|(vendor, _)| vendor.precedence());
        let mut merged: Vec<CallRecord> = tables
            .into_iter()
            .flat_map(|(_, records)| records)
            .collect();
        for record in &mut merged {
            record.dialer_name = roster::normalize_dialer_name(&record.dialer_name);
        }

        let roster_records = roster::read_roster(roster)?;
        let outcome = roster::match_calls(&merged, &roster_records);
        let analysis = gap::analyze(&outcome.matched);
        let aggregates = aggregate::aggregate(&analysis.calls);
        let agents = roster::unique_agents(&roster_records);
        let summary = report::assemble(&aggregates, &agents);

        let null_dates = merged
            .iter()
            .filter(|record| record.date.is_none())
            .cloned()
            .collect();

        Ok(PipelineOutput {
            summary,
            dialer_raw: merged,
            not_found: outcome.unmatched,
            diagnostics: Diagnostics {
                null_dates,
                invalid_durations: analysis.invalid_durations,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const ROSTER_CSV: &str = "Email,Dialer Name,Employee code,Full Name,Pool,TL,Vertical\n\
        john.doe@tradex.com,John Doe,E001,John Doe,Pool A,Lead One,Sales\n";

    #[test]
    fn zero_vendor_tables_is_fatal() {
        let exports: Vec<(Vendor, Cursor<&[u8]>)> = Vec::new();
        let error = AttendancePipeline::from_readers(exports, Cursor::new(ROSTER_CSV))
            .expect_err("expected NoInputData");

        assert!(matches!(error, EtlError::NoInputData));
    }

    #[test]
    fn merge_emits_vendor_blocks_in_precedence_order() {
        let voiso = "Date and time,Agent(s),DNIS/To,Disposition,Talk time,Duration\n\
            08/20/2025 10:00:00,John Doe,111,connected,00:01:00,00:01:00\n";
        let tata = "Call Start Date,Connected to Agent,Customer Number,Call Status,Call Start Time,Total Call Duration (HH:MM:SS),Answer Duration (HH:MM:SS),Hold Duration (HH:MM:SS)\n\
            2025-08-20,John Doe,222,connected,11:00:00,00:01:00,00:01:00,00:00:00\n";

        // Supplied Voiso-first; Tata still leads the merged log.
        let output = AttendancePipeline::from_readers(
            vec![
                (Vendor::Voiso, Cursor::new(voiso)),
                (Vendor::Tata, Cursor::new(tata)),
            ],
            Cursor::new(ROSTER_CSV),
        )
        .expect("pipeline runs");

        assert_eq!(output.dialer_raw.len(), 2);
        assert_eq!(output.dialer_raw[0].source, Vendor::Tata);
        assert_eq!(output.dialer_raw[1].source, Vendor::Voiso);
    }

    #[test]
    fn from_paths_propagates_io_errors() {
        let error = AttendancePipeline::from_paths(
            &[(Vendor::Tata, "./does-not-exist.csv")],
            "./also-missing.csv",
        )
        .expect_err("expected io error");

        assert!(matches!(error, EtlError::Io(_)));
    }

    #[test]
    fn null_date_rows_surface_on_the_diagnostic() {
        let knowlarity = "Date and Time,Agent Name,Customer,Call Status,Talk Time (hh:mm:ss),Hold Time (hh:mm:ss),Total Call Duration (hh:mm:ss)\n\
            not a timestamp,John Doe,111,connected,00:01:00,00:00:00,00:01:00\n";

        let output = AttendancePipeline::from_readers(
            vec![(Vendor::Knowlarity, Cursor::new(knowlarity))],
            Cursor::new(ROSTER_CSV),
        )
        .expect("pipeline runs");

        assert_eq!(output.diagnostics.null_dates.len(), 1);
        // Retained in the raw log, absent from the dated summary.
        assert_eq!(output.dialer_raw.len(), 1);
        assert!(output.summary.iter().all(|row| row.total_dialed_calls == 0));
    }
}

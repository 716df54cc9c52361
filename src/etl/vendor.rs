use super::duration::{format_hhmmss, parse_clock};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::io::Read;

/// Telephony vendors whose dialer exports the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vendor {
    Tata,
    Knowlarity,
    Voiso,
    Qkonnect,
    Stringee,
}

impl Vendor {
    /// Merge precedence: vendor blocks appear in this order in the combined
    /// call log, whichever subset is present.
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Tata,
            Self::Knowlarity,
            Self::Voiso,
            Self::Qkonnect,
            Self::Stringee,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Tata => "Tata",
            Self::Knowlarity => "Knowlarity",
            Self::Voiso => "Voiso",
            Self::Qkonnect => "Qkonnect",
            Self::Stringee => "Stringee",
        }
    }

    pub(crate) fn precedence(self) -> usize {
        match self {
            Self::Tata => 0,
            Self::Knowlarity => 1,
            Self::Voiso => 2,
            Self::Qkonnect => 3,
            Self::Stringee => 4,
        }
    }

    /// Format of the combined date+time column, for vendors that have one.
    /// Tata ships pre-split date and time fields instead.
    const fn timestamp_format(self) -> Option<&'static str> {
        match self {
            Self::Tata => None,
            Self::Knowlarity | Self::Qkonnect => Some("%Y-%m-%d %H:%M:%S"),
            Self::Voiso => Some("%m/%d/%Y %H:%M:%S"),
            Self::Stringee => Some("%m/%d/%Y %I:%M:%S %p"),
        }
    }
}

/// One call in the canonical shape shared by every vendor. Duration columns
/// stay as the vendor's clock strings until the gap analyzer flattens them;
/// `hold_time` is `None` for vendors without a hold concept.
#[derive(Debug, Clone, Serialize)]
pub struct CallRecord {
    #[serde(rename = "Source")]
    pub source: Vendor,
    #[serde(rename = "Date")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "Dialer Name")]
    pub dialer_name: String,
    #[serde(rename = "Number")]
    pub number: String,
    #[serde(rename = "Call Status")]
    pub call_status: String,
    #[serde(rename = "Call Start Time")]
    pub call_start_time: Option<NaiveTime>,
    #[serde(rename = "Total Call Duration")]
    pub total_call_duration: String,
    #[serde(rename = "Talk Time")]
    pub talk_time: Option<String>,
    #[serde(rename = "Hold Time")]
    pub hold_time: Option<String>,
}

/// Reads one vendor export and normalizes every row to [`CallRecord`].
/// Unparseable timestamps surface as a null date, never an error.
pub fn read_records<R: Read>(
    vendor: Vendor,
    reader: R,
) -> Result<Vec<CallRecord>, csv::Error> {
    match vendor {
        Vendor::Tata => collect_rows(reader, TataRow::into_record),
        Vendor::Knowlarity => collect_rows(reader, KnowlarityRow::into_record),
        Vendor::Voiso => collect_rows(reader, VoisoRow::into_record),
        Vendor::Qkonnect => collect_rows(reader, QkonnectRow::into_record),
        Vendor::Stringee => collect_rows(reader, StringeeRow::into_record),
    }
}

fn collect_rows<R, T, F>(reader: R, convert: F) -> Result<Vec<CallRecord>, csv::Error>
where
    R: Read,
    T: DeserializeOwned,
    F: Fn(T) -> CallRecord,
{
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();

    for row in csv_reader.deserialize::<T>() {
        records.push(convert(row?));
    }

    Ok(records)
}

fn split_timestamp(raw: &str, format: &str) -> (Option<NaiveDate>, Option<NaiveTime>) {
    match NaiveDateTime::parse_from_str(raw.trim(), format) {
        Ok(timestamp) => (Some(timestamp.date()), Some(timestamp.time())),
        Err(_) => (None, None),
    }
}

// Tata hands us a bare date column; the upstream report format has drifted
// between exports, so a small set of observed formats is tried in order.
const SPLIT_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y", "%d-%b-%Y"];

fn parse_split_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    SPLIT_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

fn parse_split_time(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S").ok()
}

pub(crate) fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

#[derive(Debug, Deserialize)]
struct TataRow {
    #[serde(rename = "Call Start Date")]
    call_start_date: String,
    #[serde(rename = "Connected to Agent")]
    connected_to_agent: String,
    #[serde(rename = "Customer Number")]
    customer_number: String,
    #[serde(rename = "Call Status")]
    call_status: String,
    #[serde(rename = "Call Start Time")]
    call_start_time: String,
    #[serde(rename = "Total Call Duration (HH:MM:SS)", default)]
    total_call_duration: String,
    #[serde(
        rename = "Answer Duration (HH:MM:SS)",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    answer_duration: Option<String>,
    #[serde(
        rename = "Hold Duration (HH:MM:SS)",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    hold_duration: Option<String>,
}

impl TataRow {
    fn into_record(self) -> CallRecord {
        CallRecord {
            source: Vendor::Tata,
            date: parse_split_date(&self.call_start_date),
            dialer_name: self.connected_to_agent,
            number: self.customer_number,
            call_status: self.call_status,
            call_start_time: parse_split_time(&self.call_start_time),
            total_call_duration: self.total_call_duration,
            talk_time: self.answer_duration,
            hold_time: self.hold_duration,
        }
    }
}

#[derive(Debug, Deserialize)]
struct KnowlarityRow {
    #[serde(rename = "Date and Time")]
    date_and_time: String,
    #[serde(rename = "Agent Name")]
    agent_name: String,
    #[serde(rename = "Customer")]
    customer: String,
    #[serde(rename = "Call Status")]
    call_status: String,
    #[serde(rename = "Total Call Duration (hh:mm:ss)", default)]
    total_call_duration: String,
    #[serde(
        rename = "Talk Time (hh:mm:ss)",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    talk_time: Option<String>,
    #[serde(
        rename = "Hold Time (hh:mm:ss)",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    hold_time: Option<String>,
}

impl KnowlarityRow {
    fn into_record(self) -> CallRecord {
        let format = Vendor::Knowlarity
            .timestamp_format()
            .unwrap_or_default();
        let (date, call_start_time) = split_timestamp(&self.date_and_time, format);
        CallRecord {
            source: Vendor::Knowlarity,
            date,
            dialer_name: self.agent_name,
            number: self.customer,
            call_status: self.call_status,
            call_start_time,
            total_call_duration: self.total_call_duration,
            talk_time: self.talk_time,
            hold_time: self.hold_time,
        }
    }
}

#[derive(Debug, Deserialize)]
struct VoisoRow {
    #[serde(rename = "Date and time")]
    date_and_time: String,
    #[serde(rename = "Agent(s)")]
    agents: String,
    #[serde(rename = "DNIS/To")]
    dnis_to: String,
    #[serde(rename = "Disposition")]
    disposition: String,
    #[serde(rename = "Duration", default)]
    duration: String,
    #[serde(
        rename = "Talk time",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    talk_time: Option<String>,
}

impl VoisoRow {
    fn into_record(self) -> CallRecord {
        let format = Vendor::Voiso.timestamp_format().unwrap_or_default();
        let (date, call_start_time) = split_timestamp(&self.date_and_time, format);
        CallRecord {
            source: Vendor::Voiso,
            date,
            dialer_name: self.agents,
            number: self.dnis_to,
            call_status: self.disposition,
            call_start_time,
            total_call_duration: self.duration,
            talk_time: self.talk_time,
            hold_time: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct QkonnectRow {
    #[serde(rename = "Date time")]
    date_time: String,
    #[serde(rename = "Agent Mobile")]
    agent_mobile: String,
    #[serde(rename = "User Mobile")]
    user_mobile: String,
    #[serde(rename = "Call Event")]
    call_event: String,
    #[serde(rename = "Duration", default)]
    duration: String,
    #[serde(
        rename = "Transfer Duration",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    transfer_duration: Option<String>,
}

impl QkonnectRow {
    fn into_record(self) -> CallRecord {
        let format = Vendor::Qkonnect.timestamp_format().unwrap_or_default();
        let (date, call_start_time) = split_timestamp(&self.date_time, format);
        CallRecord {
            source: Vendor::Qkonnect,
            date,
            dialer_name: self.agent_mobile,
            number: self.user_mobile,
            call_status: self.call_event,
            call_start_time,
            total_call_duration: self.duration,
            // Qkonnect reports the post-transfer leg as "Transfer Duration";
            // upstream treats it as talk time, matched here.
            talk_time: self.transfer_duration,
            hold_time: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StringeeRow {
    #[serde(rename = "Start time")]
    start_time: String,
    #[serde(rename = "Account")]
    account: String,
    #[serde(rename = "Customer number")]
    customer_number: String,
    #[serde(rename = "Call status")]
    call_status: String,
    #[serde(rename = "Queue duration", default)]
    queue_duration: String,
    #[serde(
        rename = "Answer duration",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    answer_duration: Option<String>,
    #[serde(
        rename = "Hold duration",
        default,
        deserialize_with = "empty_string_as_none"
    )]
    hold_duration: Option<String>,
}

impl StringeeRow {
    /// Stringee has no total-duration column; it is synthesized as queue
    /// wait plus answered time, malformed components counting as zero.
    fn total_duration(&self) -> String {
        let queue = parse_clock(&self.queue_duration).unwrap_or_else(Duration::zero);
        let answer = self
            .answer_duration
            .as_deref()
            .and_then(parse_clock)
            .unwrap_or_else(Duration::zero);
        format_hhmmss((queue + answer).num_seconds())
    }

    fn into_record(self) -> CallRecord {
        let format = Vendor::Stringee.timestamp_format().unwrap_or_default();
        let (date, call_start_time) = split_timestamp(&self.start_time, format);
        let total_call_duration = self.total_duration();
        CallRecord {
            source: Vendor::Stringee,
            date,
            dialer_name: self.account,
            number: self.customer_number,
            call_status: self.call_status,
            call_start_time,
            total_call_duration,
            talk_time: self.answer_duration,
            hold_time: self.hold_duration,
        }
    }
}

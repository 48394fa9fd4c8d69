// src/issue_ledger.rs
//! Urgent issues embedded in a report.
//!
//! The ledger is persisted as one JSON array in a single text column. Rows written
//! before the array format existed hold free text instead, so loading goes through
//! an explicit decode step ([`StoredLedger`]) before records are normalised into
//! [`UrgentIssue`] values whose completion state cannot contradict their status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::LedgerError;

pub const UNKNOWN_ACTOR: &str = "Unknown";
const LEGACY_ID_PREFIX: &str = "legacy-";
const ID_SUFFIX_LEN: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueStatus {
    Pending,
    Noted,
    Completed,
}

impl fmt::Display for IssueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IssueStatus::Pending => "Pending",
            IssueStatus::Noted => "Noted",
            IssueStatus::Completed => "Completed",
        };
        f.write_str(name)
    }
}

impl FromStr for IssueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(IssueStatus::Pending),
            "noted" => Ok(IssueStatus::Noted),
            "completed" => Ok(IssueStatus::Completed),
            other => Err(format!("unknown issue status '{other}'")),
        }
    }
}

/// Lifecycle state. Completion details only exist on the `Completed` variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueState {
    Pending,
    Noted,
    Completed { at: DateTime<Utc>, by: String },
}

impl IssueState {
    pub fn status(&self) -> IssueStatus {
        match self {
            IssueState::Pending => IssueStatus::Pending,
            IssueState::Noted => IssueStatus::Noted,
            IssueState::Completed { .. } => IssueStatus::Completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrgentIssue {
    pub id: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub requires_action: bool,
    pub state: IssueState,
    pub submitted_by: String,
}

impl UrgentIssue {
    /// A fresh `Pending` issue with a generated id.
    pub fn new(
        description: &str,
        requires_action: bool,
        submitted_by: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(LedgerError::BlankDescription);
        }
        Ok(Self {
            id: generate_issue_id(now),
            description: description.to_string(),
            timestamp: now,
            requires_action,
            state: IssueState::Pending,
            submitted_by: actor_or_unknown(submitted_by),
        })
    }

    pub fn status(&self) -> IssueStatus {
        self.state.status()
    }

    /// Derived from the state; there is no separate flag to drift.
    pub fn is_completed(&self) -> bool {
        matches!(self.state, IssueState::Completed { .. })
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match &self.state {
            IssueState::Completed { at, .. } => Some(*at),
            _ => None,
        }
    }

    pub fn completed_by(&self) -> Option<&str> {
        match &self.state {
            IssueState::Completed { by, .. } => Some(by),
            _ => None,
        }
    }

    /// Action-required and not yet completed.
    pub fn is_open_priority(&self) -> bool {
        self.requires_action && !self.is_completed()
    }

    pub fn aging_days(&self, now: DateTime<Utc>) -> i64 {
        aging_days(self, now)
    }
}

/// Whole days since the issue was raised, floored and never negative.
pub fn aging_days(issue: &UrgentIssue, now: DateTime<Utc>) -> i64 {
    now.signed_duration_since(issue.timestamp).num_days().max(0)
}

/// Persisted JSON shape of one issue.
///
/// Every field is optional on read so older rows still load; [`IssueLedger`]
/// fills the gaps. `isCompleted` is written for older readers and ignored
/// whenever `status` is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UrgentIssueRecord {
    pub id: Option<String>,
    pub description: Option<String>,
    pub timestamp: Option<String>,
    pub requires_action: Option<bool>,
    pub status: Option<String>,
    pub is_completed: Option<bool>,
    pub completed_at: Option<String>,
    pub completed_by: Option<String>,
    pub submitted_by: Option<String>,
}

impl From<&UrgentIssue> for UrgentIssueRecord {
    fn from(issue: &UrgentIssue) -> Self {
        Self {
            id: Some(issue.id.clone()),
            description: Some(issue.description.clone()),
            timestamp: Some(format_timestamp(issue.timestamp)),
            requires_action: Some(issue.requires_action),
            status: Some(issue.status().to_string()),
            is_completed: Some(issue.is_completed()),
            completed_at: issue.completed_at().map(format_timestamp),
            completed_by: issue.completed_by().map(str::to_string),
            submitted_by: Some(issue.submitted_by.clone()),
        }
    }
}

/// The three shapes an issue column can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredLedger {
    Empty,
    Records(Vec<UrgentIssueRecord>),
    LegacyText(String),
}

impl StoredLedger {
    pub fn decode(raw: Option<&str>) -> Self {
        let text = match raw.map(str::trim) {
            None | Some("") | Some("null") => return StoredLedger::Empty,
            Some(text) => text,
        };

        if !(text.starts_with('[') && text.ends_with(']')) {
            debug!("Issue column holds legacy free text");
            return StoredLedger::LegacyText(text.to_string());
        }

        match serde_json::from_str::<Vec<UrgentIssueRecord>>(text) {
            Ok(records) => StoredLedger::Records(records),
            Err(e) => {
                warn!(error = %e, "Failed to parse urgent issue array, treating it as legacy text");
                StoredLedger::LegacyText(text.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LedgerEntry {
    issue: UrgentIssue,
    /// Loaded from storage; such entries cannot be removed.
    persisted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueLedger {
    entries: Vec<LedgerEntry>,
}

impl IssueLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a stored issue column.
    ///
    /// `submitted_by` and `fallback_time` stand in for fields that older rows lack;
    /// callers pass the parent report's submitter and submission time.
    pub fn from_stored(raw: Option<&str>, submitted_by: &str, fallback_time: DateTime<Utc>) -> Self {
        let issues = match StoredLedger::decode(raw) {
            StoredLedger::Empty => Vec::new(),
            StoredLedger::LegacyText(text) => vec![UrgentIssue {
                id: legacy_id(0),
                description: text,
                timestamp: fallback_time,
                requires_action: false,
                state: IssueState::Pending,
                submitted_by: actor_or_unknown(submitted_by),
            }],
            StoredLedger::Records(records) => records
                .into_iter()
                .enumerate()
                .map(|(index, record)| {
                    normalize(record, || legacy_id(index), submitted_by, fallback_time)
                })
                .collect(),
        };
        Self {
            entries: issues
                .into_iter()
                .map(|issue| LedgerEntry {
                    issue,
                    persisted: true,
                })
                .collect(),
        }
    }

    /// Builds an unsaved ledger from submitted records. Records without an id get a new one.
    ///
    /// Descriptions are trimmed and every record goes through [`IssueLedger::append`],
    /// so blank descriptions and repeated ids are rejected.
    pub fn from_submitted(
        records: Vec<UrgentIssueRecord>,
        submitted_by: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        let mut ledger = Self::new();
        for record in records {
            let mut issue = normalize(record, || generate_issue_id(now), submitted_by, now);
            issue.description = issue.description.trim().to_string();
            ledger.append(issue)?;
        }
        Ok(ledger)
    }

    /// Serialises the ledger as a JSON array of [`UrgentIssueRecord`].
    pub fn to_stored(&self) -> Result<String, serde_json::Error> {
        let records: Vec<UrgentIssueRecord> = self.iter().map(UrgentIssueRecord::from).collect();
        serde_json::to_string(&records)
    }

    pub fn to_records(&self) -> Vec<UrgentIssueRecord> {
        self.iter().map(UrgentIssueRecord::from).collect()
    }

    pub fn append(&mut self, issue: UrgentIssue) -> Result<(), LedgerError> {
        if issue.description.trim().is_empty() {
            return Err(LedgerError::BlankDescription);
        }
        if self.get(&issue.id).is_some() {
            return Err(LedgerError::DuplicateIssue { id: issue.id });
        }
        self.entries.push(LedgerEntry {
            issue,
            persisted: false,
        });
        Ok(())
    }

    /// Removes an issue that has not been saved yet.
    pub fn remove(&mut self, id: &str) -> Result<UrgentIssue, LedgerError> {
        let index = self.position(id)?;
        if self.entries[index].persisted {
            return Err(LedgerError::PersistedIssue { id: id.to_string() });
        }
        Ok(self.entries.remove(index).issue)
    }

    /// Moves an issue along `Pending -> Noted -> Completed` (or straight to `Completed`).
    ///
    /// Moving to the current status is a no-op. `Completed` is terminal.
    pub fn transition(
        &mut self,
        id: &str,
        to: IssueStatus,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<&UrgentIssue, LedgerError> {
        let index = self.position(id)?;
        let issue = &mut self.entries[index].issue;
        let from = issue.status();

        let allowed = matches!(
            (from, to),
            (IssueStatus::Pending, _)
                | (IssueStatus::Noted, IssueStatus::Noted)
                | (IssueStatus::Noted, IssueStatus::Completed)
                | (IssueStatus::Completed, IssueStatus::Completed)
        );
        if !allowed {
            return Err(LedgerError::InvalidTransition {
                id: id.to_string(),
                from,
                to,
            });
        }

        if from != to {
            issue.state = match to {
                IssueStatus::Pending => IssueState::Pending,
                IssueStatus::Noted => IssueState::Noted,
                IssueStatus::Completed => IssueState::Completed {
                    at: now,
                    by: actor_or_unknown(actor),
                },
            };
        }
        Ok(&self.entries[index].issue)
    }

    /// Marks every entry as saved.
    pub fn mark_persisted(&mut self) {
        for entry in &mut self.entries {
            entry.persisted = true;
        }
    }

    pub fn get(&self, id: &str) -> Option<&UrgentIssue> {
        self.iter().find(|issue| issue.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &UrgentIssue> {
        self.entries.iter().map(|entry| &entry.issue)
    }

    pub fn issues(&self) -> Vec<UrgentIssue> {
        self.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, id: &str) -> Result<usize, LedgerError> {
        self.entries
            .iter()
            .position(|entry| entry.issue.id == id)
            .ok_or_else(|| LedgerError::IssueNotFound { id: id.to_string() })
    }
}

/// Turns a loosely typed record into an issue whose state matches its status.
fn normalize(
    record: UrgentIssueRecord,
    fallback_id: impl FnOnce() -> String,
    submitted_by: &str,
    fallback_time: DateTime<Utc>,
) -> UrgentIssue {
    let timestamp = record
        .timestamp
        .as_deref()
        .and_then(parse_timestamp)
        .unwrap_or(fallback_time);
    let completed_by = non_blank(record.completed_by.as_deref());

    let status = match record.status.as_deref().map(str::parse::<IssueStatus>) {
        Some(Ok(status)) => status,
        Some(Err(e)) => {
            warn!(error = %e, "Deriving issue status from legacy fields");
            legacy_status(&record, completed_by.is_some())
        }
        None => legacy_status(&record, completed_by.is_some()),
    };

    let state = match status {
        IssueStatus::Pending => IssueState::Pending,
        IssueStatus::Noted => IssueState::Noted,
        IssueStatus::Completed => IssueState::Completed {
            at: record
                .completed_at
                .as_deref()
                .and_then(parse_timestamp)
                .unwrap_or(timestamp),
            by: completed_by.unwrap_or_else(|| UNKNOWN_ACTOR.to_string()),
        },
    };

    UrgentIssue {
        id: non_blank(record.id.as_deref()).unwrap_or_else(fallback_id),
        description: record.description.unwrap_or_default(),
        timestamp,
        requires_action: record.requires_action.unwrap_or(false),
        state,
        submitted_by: non_blank(record.submitted_by.as_deref())
            .unwrap_or_else(|| actor_or_unknown(submitted_by)),
    }
}

fn legacy_status(record: &UrgentIssueRecord, has_completed_by: bool) -> IssueStatus {
    if record.is_completed == Some(true) {
        IssueStatus::Completed
    } else if has_completed_by {
        IssueStatus::Noted
    } else {
        IssueStatus::Pending
    }
}

/// RFC 3339, a naive date-time taken as UTC, or a bare date at midnight UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc())
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn actor_or_unknown(actor: &str) -> String {
    non_blank(Some(actor)).unwrap_or_else(|| UNKNOWN_ACTOR.to_string())
}

fn legacy_id(index: usize) -> String {
    format!("{LEGACY_ID_PREFIX}{index}")
}

fn generate_issue_id(now: DateTime<Utc>) -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{}{}", now.timestamp_millis(), suffix)
}

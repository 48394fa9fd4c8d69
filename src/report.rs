// src/report.rs
//! Report data model and the merge applied on submission.

use chrono::{DateTime, Utc};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};

use crate::error::{ReportError, StorageError};
use crate::issue_ledger::{IssueLedger, UrgentIssueRecord};
use crate::period_key::PeriodKey;
use crate::repository::{RawReport, ReportFields};
use crate::week_math::CustomWeek;

/// The natural key of a report.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportKey {
    pub business_unit: String,
    pub division: String,
    pub week: PeriodKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: u64,
    #[serde(flatten)]
    pub key: ReportKey,
    pub highlight_of_week: String,
    pub business_development: String,
    pub planned_activities: String,
    #[serde(serialize_with = "serialize_ledger")]
    pub urgent_issues: IssueLedger,
    pub submitted_by: String,
    pub submitted_at: DateTime<Utc>,
}

impl Report {
    /// Decodes a stored row. The issue column goes through the legacy-tolerant loader.
    pub fn from_raw(raw: &RawReport) -> Result<Self, StorageError> {
        let week = CustomWeek::new(raw.year, raw.week).map_err(|e| StorageError::CorruptRecord {
            id: raw.id,
            detail: e.to_string(),
        })?;
        let submitted_by = raw.submitted_by.clone().unwrap_or_default();
        let urgent_issues =
            IssueLedger::from_stored(raw.urgent.as_deref(), &submitted_by, raw.submitted_at);

        Ok(Self {
            id: raw.id,
            key: ReportKey {
                business_unit: raw.business_unit.clone(),
                division: raw.division.clone(),
                week: PeriodKey::new(week),
            },
            highlight_of_week: raw.highlight.clone().unwrap_or_default(),
            business_development: raw.biz_dev.clone().unwrap_or_default(),
            planned_activities: raw.planned_next.clone().unwrap_or_default(),
            urgent_issues,
            submitted_by,
            submitted_at: raw.submitted_at,
        })
    }
}

fn serialize_ledger<S: Serializer>(ledger: &IssueLedger, serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(ledger.len()))?;
    for record in ledger.to_records() {
        seq.serialize_element(&record)?;
    }
    seq.end()
}

/// Submitted form content. Every field may be left blank.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportDraft {
    pub highlight_of_week: Option<String>,
    pub business_development: Option<String>,
    pub planned_activities: Option<String>,
    pub urgent_issues: Vec<UrgentIssueRecord>,
}

impl ReportDraft {
    pub fn is_blank(&self) -> bool {
        blank(self.highlight_of_week.as_deref())
            && blank(self.business_development.as_deref())
            && blank(self.planned_activities.as_deref())
            && self.urgent_issues.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Nothing would change; the stored row stands as is.
    Unchanged(RawReport),
    Write(ReportFields),
}

/// Combines a draft with the stored row.
///
/// Blank text keeps the stored value and an empty issue list keeps the stored
/// issue column untouched, legacy text included. Submitted issues with a blank
/// description or a repeated id fail with a ledger error.
pub fn merge(
    stored: Option<&RawReport>,
    draft: &ReportDraft,
    actor: &str,
    now: DateTime<Utc>,
) -> Result<MergeOutcome, ReportError> {
    let keep = |column: fn(&RawReport) -> Option<String>| stored.and_then(column);

    let urgent = if draft.urgent_issues.is_empty() {
        keep(|raw| raw.urgent.clone())
    } else {
        let ledger = IssueLedger::from_submitted(draft.urgent_issues.clone(), actor, now)?;
        Some(ledger.to_stored().map_err(StorageError::from)?)
    };

    let fields = ReportFields {
        highlight: pick(draft.highlight_of_week.as_deref(), keep(|raw| raw.highlight.clone())),
        biz_dev: pick(draft.business_development.as_deref(), keep(|raw| raw.biz_dev.clone())),
        planned_next: pick(
            draft.planned_activities.as_deref(),
            keep(|raw| raw.planned_next.clone()),
        ),
        urgent,
        submitted_by: Some(actor.trim().to_string()),
        submitted_at: now,
    };

    match stored {
        Some(raw) if raw.fields().same_content(&fields) => Ok(MergeOutcome::Unchanged(raw.clone())),
        _ => Ok(MergeOutcome::Write(fields)),
    }
}

fn pick(submitted: Option<&str>, stored: Option<String>) -> Option<String> {
    match submitted.map(str::trim) {
        Some(text) if !text.is_empty() => Some(text.to_string()),
        _ => stored,
    }
}

fn blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

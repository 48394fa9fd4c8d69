// src/resolver.rs
//! Finds "the report" for a (business unit, division, week) and applies submissions to it.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::directory::{OrgDirectory, ResolvedUnit};
use crate::edit_window::{EditDecision, EditWindowPolicy};
use crate::error::{ReportError, StorageError};
use crate::issue_ledger::{IssueLedger, IssueStatus};
use crate::period_key::PeriodKey;
use crate::report::{self, MergeOutcome, Report, ReportDraft};
use crate::repository::{RawReport, ReportRepository};
use crate::week_math::CalendarDate;

#[derive(Clone)]
pub struct ReportResolver {
    repository: Arc<dyn ReportRepository>,
    directory: Arc<OrgDirectory>,
    clock: Arc<dyn Clock>,
    policy: EditWindowPolicy,
}

impl ReportResolver {
    pub fn new(
        repository: Arc<dyn ReportRepository>,
        directory: Arc<OrgDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            directory,
            clock,
            policy: EditWindowPolicy::default(),
        }
    }

    pub fn directory(&self) -> &OrgDirectory {
        &self.directory
    }

    pub fn policy(&self) -> &EditWindowPolicy {
        &self.policy
    }

    pub fn today(&self) -> CalendarDate {
        self.clock.today()
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Whether `period` may currently be written.
    pub fn edit_decision(&self, period: PeriodKey) -> Result<EditDecision, ReportError> {
        Ok(self.policy.classify(self.today(), period.week())?)
    }

    /// The stored report for the triple, if any. Locked weeks can always be read.
    pub async fn resolve(
        &self,
        business_unit: &str,
        division: &str,
        period: PeriodKey,
    ) -> Result<Option<Report>, ReportError> {
        let unit = self.directory.resolve(business_unit, division)?;
        let raw = self.find(&unit, period).await?;
        raw.as_ref().map(Report::from_raw).transpose().map_err(Into::into)
    }

    /// Merges `draft` into the stored report, creating it on first submission.
    ///
    /// When the merge changes nothing, no write happens and the stored report is returned.
    pub async fn submit(
        &self,
        business_unit: &str,
        division: &str,
        period: PeriodKey,
        draft: ReportDraft,
        actor: &str,
    ) -> Result<Report, ReportError> {
        if actor.trim().is_empty() {
            return Err(ReportError::MissingSubmitter);
        }
        let unit = self.directory.resolve(business_unit, division)?;

        let decision = self.edit_decision(period)?;
        if !decision.is_editable() {
            warn!(
                "Rejected submission for {} / {} in locked week {} ({:?})",
                unit.business_unit, unit.division, period, decision
            );
            return Err(ReportError::WeekLocked {
                period: period.to_string(),
                decision,
            });
        }

        let stored = self.find(&unit, period).await?;
        let raw = match report::merge(stored.as_ref(), &draft, actor, self.clock.now())? {
            MergeOutcome::Unchanged(raw) => {
                debug!(
                    "Submission for {} / {} in {} changed nothing",
                    unit.business_unit, unit.division, period
                );
                raw
            }
            MergeOutcome::Write(fields) => {
                let raw = self
                    .repository
                    .upsert(&unit.business_unit, &unit.division, period.week(), fields)
                    .await
                    .map_err(|e| storage_failure("saving", &unit, period, e))?;
                info!(
                    "Report {} saved for {} / {} in {} by {}",
                    raw.id,
                    unit.business_unit,
                    unit.division,
                    period,
                    actor.trim()
                );
                raw
            }
        };
        Ok(Report::from_raw(&raw)?)
    }

    /// Every report filed for a week.
    pub async fn reports_for_week(&self, period: PeriodKey) -> Result<Vec<Report>, ReportError> {
        let rows = self.repository.list_week(period.week()).await?;
        decode_rows(&rows)
    }

    /// Every report on record, oldest week first.
    pub async fn all_reports(&self) -> Result<Vec<Report>, ReportError> {
        let rows = self.repository.list_all().await?;
        decode_rows(&rows)
    }

    /// Manager transition of one urgent issue. Only the issue column is rewritten.
    ///
    /// Not gated by the edit window: issues raised in past weeks stay actionable.
    pub async fn update_issue_status(
        &self,
        business_unit: &str,
        division: &str,
        period: PeriodKey,
        issue_id: &str,
        status: IssueStatus,
        actor: &str,
    ) -> Result<Report, ReportError> {
        let unit = self.directory.resolve(business_unit, division)?;
        let raw = self
            .find(&unit, period)
            .await?
            .ok_or_else(|| ReportError::ReportNotFound {
                business_unit: unit.business_unit.clone(),
                division: unit.division.clone(),
                period: period.to_string(),
            })?;

        let submitted_by = raw.submitted_by.clone().unwrap_or_default();
        let mut ledger =
            IssueLedger::from_stored(raw.urgent.as_deref(), &submitted_by, raw.submitted_at);
        let before = ledger.get(issue_id).map(|issue| issue.status());
        ledger.transition(issue_id, status, actor, self.clock.now())?;

        if before == Some(status) {
            return Ok(Report::from_raw(&raw)?);
        }

        let mut fields = raw.fields();
        fields.urgent = Some(ledger.to_stored().map_err(StorageError::from)?);
        let saved = self
            .repository
            .upsert(&unit.business_unit, &unit.division, period.week(), fields)
            .await
            .map_err(|e| storage_failure("updating", &unit, period, e))?;
        info!(
            "Issue {} in {} / {} ({}) moved to {} by {}",
            issue_id, unit.business_unit, unit.division, period, status, actor
        );
        Ok(Report::from_raw(&saved)?)
    }

    async fn find(
        &self,
        unit: &ResolvedUnit,
        period: PeriodKey,
    ) -> Result<Option<RawReport>, ReportError> {
        self.repository
            .find(&unit.business_unit, &unit.division, period.week())
            .await
            .map_err(|e| storage_failure("loading", unit, period, e))
    }
}

fn decode_rows(rows: &[RawReport]) -> Result<Vec<Report>, ReportError> {
    rows.iter()
        .map(|raw| Report::from_raw(raw).map_err(Into::into))
        .collect()
}

fn storage_failure(
    action: &str,
    unit: &ResolvedUnit,
    period: PeriodKey,
    e: StorageError,
) -> ReportError {
    error!(
        "Failed {} report for {} / {} in {}: {}",
        action, unit.business_unit, unit.division, period, e
    );
    ReportError::Storage(e)
}

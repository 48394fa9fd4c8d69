// src/priority.rs
//! Cross-report views: the priority-issue board and the per-week overview.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::OrgDirectory;
use crate::edit_window::EditDecision;
use crate::error::DateError;
use crate::issue_ledger::IssueStatus;
use crate::period_key::PeriodKey;
use crate::report::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    #[default]
    Aging,
    Created,
    BusinessUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// An action-required, not yet completed issue with its report context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityIssue {
    pub issue_number: String,
    pub id: String,
    pub description: String,
    pub category: &'static str,
    pub status: IssueStatus,
    pub business_unit: String,
    pub division: String,
    pub week: PeriodKey,
    pub timestamp: DateTime<Utc>,
    pub aging_days: i64,
    pub submitted_by: String,
}

// Keyword buckets, checked in order; the first hit wins.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("Security", &["security", "vulnerability", "breach", "hack"]),
    ("Infrastructure", &["server", "downtime", "infrastructure", "network"]),
    ("Human Resources", &["staff", "employee", "resignation", "hiring", "hr"]),
    ("Client Relations", &["client", "customer", "contract", "delivery"]),
    ("Financial", &["financial", "budget", "cost", "expense"]),
    ("Technical", &["system", "software", "bug", "error"]),
    ("Compliance", &["compliance", "audit", "regulation", "legal"]),
    ("Performance", &["performance", "slow", "optimization"]),
];

/// Buckets an issue by keywords in its description.
pub fn categorize(description: &str) -> &'static str {
    let text = description.to_lowercase();
    CATEGORIES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(name, _)| *name)
        .unwrap_or("General")
}

/// Collects open priority issues, numbered `PI-0001`.. in report order.
///
/// Numbering happens before the business-unit filter so an issue keeps its number.
pub fn priority_board(
    reports: &[Report],
    now: DateTime<Utc>,
    business_unit: Option<&str>,
) -> Vec<PriorityIssue> {
    let open = reports.iter().flat_map(|report| {
        report
            .urgent_issues
            .iter()
            .filter(|issue| issue.is_open_priority())
            .map(move |issue| (report, issue))
    });

    open.enumerate()
        .map(|(index, (report, issue))| PriorityIssue {
            issue_number: format!("PI-{:04}", index + 1),
            id: issue.id.clone(),
            description: issue.description.clone(),
            category: categorize(&issue.description),
            status: issue.status(),
            business_unit: report.key.business_unit.clone(),
            division: report.key.division.clone(),
            week: report.key.week,
            timestamp: issue.timestamp,
            aging_days: issue.aging_days(now),
            submitted_by: issue.submitted_by.clone(),
        })
        .filter(|item| {
            business_unit.map_or(true, |wanted| item.business_unit.eq_ignore_ascii_case(wanted))
        })
        .collect()
}

pub fn sort_board(issues: &mut [PriorityIssue], key: SortKey, order: SortOrder) {
    issues.sort_by(|a, b| {
        let ordering: Ordering = match key {
            SortKey::Aging => a.aging_days.cmp(&b.aging_days),
            SortKey::Created => a.timestamp.cmp(&b.timestamp),
            SortKey::BusinessUnit => a.business_unit.cmp(&b.business_unit),
        };
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitOverview {
    pub business_unit: String,
    pub divisions_reported: usize,
    pub divisions_total: usize,
    pub missing_divisions: Vec<String>,
    pub open_priority_issues: usize,
    pub reports: Vec<Report>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekOverview {
    pub week: PeriodKey,
    pub label: String,
    pub decision: EditDecision,
    pub total_reports: usize,
    pub units: Vec<UnitOverview>,
}

/// Groups a week's reports by business unit, in catalogue order.
///
/// Reports filed under a unit the catalogue no longer lists are kept at the end.
pub fn week_overview(
    directory: &OrgDirectory,
    week: PeriodKey,
    decision: EditDecision,
    reports: Vec<Report>,
) -> Result<WeekOverview, DateError> {
    let total_reports = reports.len();
    let mut remaining = reports;
    let mut units = Vec::new();

    for unit in directory.units() {
        let (mine, rest): (Vec<Report>, Vec<Report>) = remaining
            .into_iter()
            .partition(|r| r.key.business_unit == unit.name);
        remaining = rest;

        let missing_divisions = unit
            .divisions
            .iter()
            .filter(|d| !mine.iter().any(|r| r.key.division == d.name))
            .map(|d| d.name.clone())
            .collect();
        units.push(summarize(&unit.name, unit.divisions.len(), missing_divisions, mine));
    }

    while let Some(first) = remaining.first() {
        let name = first.key.business_unit.clone();
        let (mine, rest): (Vec<Report>, Vec<Report>) = remaining
            .into_iter()
            .partition(|r| r.key.business_unit == name);
        remaining = rest;
        units.push(summarize(&name, 0, Vec::new(), mine));
    }

    Ok(WeekOverview {
        week,
        label: week.label()?,
        decision,
        total_reports,
        units,
    })
}

fn summarize(
    business_unit: &str,
    divisions_total: usize,
    missing_divisions: Vec<String>,
    reports: Vec<Report>,
) -> UnitOverview {
    let open_priority_issues = reports
        .iter()
        .flat_map(|r| r.urgent_issues.iter())
        .filter(|issue| issue.is_open_priority())
        .count();
    UnitOverview {
        business_unit: business_unit.to_string(),
        divisions_reported: reports.len(),
        divisions_total,
        missing_divisions,
        open_priority_issues,
        reports,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RawReport;
    use chrono::TimeZone;

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, d, h, 0, 0).unwrap()
    }

    fn report(id: u64, unit: &str, division: &str, urgent: &str) -> Report {
        Report::from_raw(&RawReport {
            id,
            business_unit: unit.to_string(),
            division: division.to_string(),
            year: 2025,
            week: 26,
            highlight: None,
            biz_dev: None,
            planned_next: None,
            urgent: Some(urgent.to_string()),
            submitted_by: Some("alice".to_string()),
            submitted_at: at(22, 8),
        })
        .unwrap()
    }

    fn sample() -> Vec<Report> {
        vec![
            report(
                1,
                "Sales",
                "Jordan Sales",
                r#"[{"id":"s1","description":"Customer contract at risk","timestamp":"2025-06-20T09:00:00Z","requiresAction":true,"status":"Pending"},
                    {"id":"s2","description":"FYI only","timestamp":"2025-06-20T09:00:00Z","requiresAction":false,"status":"Pending"},
                    {"id":"s3","description":"Closed out","timestamp":"2025-06-10T09:00:00Z","requiresAction":true,"status":"Completed","completedBy":"m"}]"#,
            ),
            report(
                2,
                "ERP",
                "Oracle Fusion",
                r#"[{"id":"e1","description":"Server downtime overnight","timestamp":"2025-06-15T09:00:00Z","requiresAction":true,"status":"Noted"}]"#,
            ),
            report(3, "ERP", "Oracle Technologies & DB", "Legacy note, no action"),
        ]
    }

    #[test]
    fn board_lists_open_action_items_in_report_order() {
        let board = priority_board(&sample(), at(24, 10), None);
        let numbers: Vec<(&str, &str)> = board
            .iter()
            .map(|i| (i.issue_number.as_str(), i.id.as_str()))
            .collect();
        assert_eq!(numbers, vec![("PI-0001", "s1"), ("PI-0002", "e1")]);

        assert_eq!(board[0].aging_days, 4);
        assert_eq!(board[0].category, "Client Relations");
        assert_eq!(board[1].status, IssueStatus::Noted);
        assert_eq!(board[1].week.to_string(), "W26-2025");
    }

    #[test]
    fn business_unit_filter_keeps_issue_numbers() {
        let board = priority_board(&sample(), at(24, 10), Some("erp"));
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].issue_number, "PI-0002");
    }

    #[test]
    fn board_sorts_by_each_key_in_both_directions() {
        let mut board = priority_board(&sample(), at(24, 10), None);

        sort_board(&mut board, SortKey::Aging, SortOrder::Desc);
        assert_eq!(board[0].id, "e1");
        sort_board(&mut board, SortKey::Created, SortOrder::Desc);
        assert_eq!(board[0].id, "s1");
        sort_board(&mut board, SortKey::BusinessUnit, SortOrder::Asc);
        assert_eq!(board[0].business_unit, "ERP");
        sort_board(&mut board, SortKey::BusinessUnit, SortOrder::Desc);
        assert_eq!(board[0].business_unit, "Sales");
    }

    #[test]
    fn categories_follow_keyword_priority() {
        assert_eq!(categorize("Possible security breach on server"), "Security");
        assert_eq!(categorize("Budget overrun"), "Financial");
        assert_eq!(categorize("Office plants need water"), "General");
    }

    #[test]
    fn overview_groups_by_unit_and_counts_coverage() {
        let directory = OrgDirectory::default();
        let week = PeriodKey::parse("W26-2025").unwrap();
        let overview = week_overview(&directory, week, EditDecision::Editable, sample()).unwrap();

        assert_eq!(overview.total_reports, 3);
        assert_eq!(overview.label, "Jun 22 - Jun 26, 2025");
        assert_eq!(overview.units.len(), 6);

        let erp = overview.units.iter().find(|u| u.business_unit == "ERP").unwrap();
        assert_eq!(erp.divisions_reported, 2);
        assert_eq!(erp.divisions_total, 2);
        assert!(erp.missing_divisions.is_empty());
        assert_eq!(erp.open_priority_issues, 1);

        let sales = overview.units.iter().find(|u| u.business_unit == "Sales").unwrap();
        assert_eq!(sales.missing_divisions, vec!["Saudi Sales".to_string()]);
        assert_eq!(sales.open_priority_issues, 1);
    }

    #[test]
    fn overview_keeps_reports_for_units_outside_the_catalogue() {
        let directory = OrgDirectory::default();
        let week = PeriodKey::parse("W26-2025").unwrap();
        let reports = vec![report(9, "Retired Unit", "Old Division", "")];
        let overview = week_overview(&directory, week, EditDecision::LockedPast, reports).unwrap();
        let last = overview.units.last().unwrap();
        assert_eq!(last.business_unit, "Retired Unit");
        assert_eq!(last.divisions_reported, 1);
        assert_eq!(last.divisions_total, 0);
    }
}

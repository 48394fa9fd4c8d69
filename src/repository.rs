// src/repository.rs
//! The report store collaborator and its two implementations.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::error::{io_context, StorageError};
use crate::week_math::CustomWeek;

/// One stored report row, column for column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReport {
    pub id: u64,
    pub business_unit: String,
    pub division: String,
    pub year: i32,
    pub week: u32,
    #[serde(default)]
    pub highlight: Option<String>,
    #[serde(default)]
    pub biz_dev: Option<String>,
    #[serde(default)]
    pub planned_next: Option<String>,
    /// Urgent issues: a JSON array, legacy free text, or nothing.
    #[serde(default)]
    pub urgent: Option<String>,
    #[serde(default)]
    pub submitted_by: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl RawReport {
    pub fn fields(&self) -> ReportFields {
        ReportFields {
            highlight: self.highlight.clone(),
            biz_dev: self.biz_dev.clone(),
            planned_next: self.planned_next.clone(),
            urgent: self.urgent.clone(),
            submitted_by: self.submitted_by.clone(),
            submitted_at: self.submitted_at,
        }
    }

    fn matches(&self, business_unit: &str, division: &str, period: CustomWeek) -> bool {
        self.business_unit == business_unit
            && self.division == division
            && self.year == period.year()
            && self.week == period.week()
    }
}

/// The writable columns of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFields {
    pub highlight: Option<String>,
    pub biz_dev: Option<String>,
    pub planned_next: Option<String>,
    pub urgent: Option<String>,
    pub submitted_by: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl ReportFields {
    /// True when the report content (not the submitter stamp) is identical.
    pub fn same_content(&self, other: &ReportFields) -> bool {
        self.highlight == other.highlight
            && self.biz_dev == other.biz_dev
            && self.planned_next == other.planned_next
            && self.urgent == other.urgent
    }
}

/// Keyed store of reports. At most one row exists per (business unit, division, week).
#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn find(
        &self,
        business_unit: &str,
        division: &str,
        period: CustomWeek,
    ) -> Result<Option<RawReport>, StorageError>;

    /// Inserts the row, or overwrites the columns of the existing row for the same key.
    async fn upsert(
        &self,
        business_unit: &str,
        division: &str,
        period: CustomWeek,
        fields: ReportFields,
    ) -> Result<RawReport, StorageError>;

    /// Rows for one week, ordered by business unit then division.
    async fn list_week(&self, period: CustomWeek) -> Result<Vec<RawReport>, StorageError>;

    /// Every row, oldest week first.
    async fn list_all(&self) -> Result<Vec<RawReport>, StorageError>;
}

/// Row storage shared by both repositories.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ReportTable {
    next_id: u64,
    rows: BTreeMap<u64, RawReport>,
}

impl ReportTable {
    fn find(&self, business_unit: &str, division: &str, period: CustomWeek) -> Option<&RawReport> {
        self.rows
            .values()
            .find(|row| row.matches(business_unit, division, period))
    }

    fn upsert(
        &mut self,
        business_unit: &str,
        division: &str,
        period: CustomWeek,
        fields: ReportFields,
    ) -> RawReport {
        let id = match self.find(business_unit, division, period) {
            Some(existing) => existing.id,
            None => {
                self.next_id += 1;
                self.next_id
            }
        };
        let row = RawReport {
            id,
            business_unit: business_unit.to_string(),
            division: division.to_string(),
            year: period.year(),
            week: period.week(),
            highlight: fields.highlight,
            biz_dev: fields.biz_dev,
            planned_next: fields.planned_next,
            urgent: fields.urgent,
            submitted_by: fields.submitted_by,
            submitted_at: fields.submitted_at,
        };
        self.rows.insert(id, row.clone());
        row
    }

    fn list_week(&self, period: CustomWeek) -> Vec<RawReport> {
        let mut rows: Vec<RawReport> = self
            .rows
            .values()
            .filter(|row| row.year == period.year() && row.week == period.week())
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (&a.business_unit, &a.division).cmp(&(&b.business_unit, &b.division))
        });
        rows
    }

    fn list_all(&self) -> Vec<RawReport> {
        let mut rows: Vec<RawReport> = self.rows.values().cloned().collect();
        rows.sort_by(|a, b| (a.year, a.week, a.id).cmp(&(b.year, b.week, b.id)));
        rows
    }
}

// --- In-memory ---

#[derive(Debug, Default)]
pub struct InMemoryReportRepository {
    table: Mutex<ReportTable>,
}

impl InMemoryReportRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds rows as they would be read back from storage. Ids are kept.
    pub fn with_rows(rows: Vec<RawReport>) -> Self {
        let next_id = rows.iter().map(|row| row.id).max().unwrap_or(0);
        let rows = rows.into_iter().map(|row| (row.id, row)).collect();
        Self {
            table: Mutex::new(ReportTable { next_id, rows }),
        }
    }
}

#[async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn find(
        &self,
        business_unit: &str,
        division: &str,
        period: CustomWeek,
    ) -> Result<Option<RawReport>, StorageError> {
        let table = self.table.lock().await;
        Ok(table.find(business_unit, division, period).cloned())
    }

    async fn upsert(
        &self,
        business_unit: &str,
        division: &str,
        period: CustomWeek,
        fields: ReportFields,
    ) -> Result<RawReport, StorageError> {
        let mut table = self.table.lock().await;
        Ok(table.upsert(business_unit, division, period, fields))
    }

    async fn list_week(&self, period: CustomWeek) -> Result<Vec<RawReport>, StorageError> {
        Ok(self.table.lock().await.list_week(period))
    }

    async fn list_all(&self) -> Result<Vec<RawReport>, StorageError> {
        Ok(self.table.lock().await.list_all())
    }
}

// --- JSON file ---

/// Keeps the whole table in memory and rewrites the file after every upsert.
#[derive(Debug)]
pub struct JsonFileReportRepository {
    path: PathBuf,
    table: Mutex<ReportTable>,
}

impl JsonFileReportRepository {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let table = Self::load_table(&path)?.unwrap_or_default();
        info!(
            "Report store {} opened with {} report(s)",
            path.display(),
            table.rows.len()
        );
        Ok(Self {
            path,
            table: Mutex::new(table),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_table(path: &Path) -> Result<Option<ReportTable>, StorageError> {
        if !path.exists() {
            info!("Report store {} not found, starting empty.", path.display());
            return Ok(None);
        }
        let json_string = fs::read_to_string(path)
            .map_err(|e| io_context(e, format!("reading report store {}", path.display())))?;
        match serde_json::from_str::<ReportTable>(&json_string) {
            Ok(table) => Ok(Some(table)),
            Err(e) => {
                error!("Failed to parse report store {}: {}", path.display(), e);
                Err(StorageError::Json(e))
            }
        }
    }

    /// Sibling file the table is written to before it replaces the store.
    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Writes the table next to the store and renames it into place, so the
    /// store on disk is always either the previous table or the new one.
    fn save_table(&self, table: &ReportTable) -> Result<(), StorageError> {
        let json_string = serde_json::to_string_pretty(table)?;
        let staging = self.staging_path();
        let mut file = File::create(&staging)
            .map_err(|e| io_context(e, format!("creating {}", staging.display())))?;
        file.write_all(json_string.as_bytes())
            .and_then(|()| file.sync_all())
            .map_err(|e| io_context(e, format!("writing {}", staging.display())))?;
        fs::rename(&staging, &self.path).map_err(|e| {
            io_context(e, format!("replacing report store {}", self.path.display()))
        })?;
        debug!("Report store saved to {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl ReportRepository for JsonFileReportRepository {
    async fn find(
        &self,
        business_unit: &str,
        division: &str,
        period: CustomWeek,
    ) -> Result<Option<RawReport>, StorageError> {
        let table = self.table.lock().await;
        Ok(table.find(business_unit, division, period).cloned())
    }

    async fn upsert(
        &self,
        business_unit: &str,
        division: &str,
        period: CustomWeek,
        fields: ReportFields,
    ) -> Result<RawReport, StorageError> {
        let mut table = self.table.lock().await;
        // Write a copy first so a failed save leaves memory and disk in agreement.
        let mut updated = table.clone();
        let row = updated.upsert(business_unit, division, period, fields);
        self.save_table(&updated)?;
        *table = updated;
        Ok(row)
    }

    async fn list_week(&self, period: CustomWeek) -> Result<Vec<RawReport>, StorageError> {
        Ok(self.table.lock().await.list_week(period))
    }

    async fn list_all(&self) -> Result<Vec<RawReport>, StorageError> {
        Ok(self.table.lock().await.list_all())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn week(year: i32, week: u32) -> CustomWeek {
        CustomWeek::new(year, week).unwrap()
    }

    fn fields(highlight: &str) -> ReportFields {
        ReportFields {
            highlight: Some(highlight.to_string()),
            biz_dev: None,
            planned_next: None,
            urgent: None,
            submitted_by: Some("alice".to_string()),
            submitted_at: Utc.with_ymd_and_hms(2025, 6, 23, 9, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn upsert_updates_in_place_and_keeps_the_row_id() {
        let repo = InMemoryReportRepository::new();
        let first = repo.upsert("ERP", "Oracle Fusion", week(2025, 26), fields("one")).await.unwrap();
        let second = repo.upsert("ERP", "Oracle Fusion", week(2025, 26), fields("two")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(repo.list_all().await.unwrap().len(), 1);
        let found = repo.find("ERP", "Oracle Fusion", week(2025, 26)).await.unwrap().unwrap();
        assert_eq!(found.highlight.as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn rows_are_keyed_by_unit_division_and_week() {
        let repo = InMemoryReportRepository::new();
        repo.upsert("ERP", "Oracle Fusion", week(2025, 26), fields("a")).await.unwrap();
        repo.upsert("ERP", "Oracle Fusion", week(2025, 27), fields("b")).await.unwrap();
        repo.upsert("ERP", "Oracle Technologies & DB", week(2025, 26), fields("c")).await.unwrap();
        repo.upsert("Sales", "Jordan Sales", week(2025, 26), fields("d")).await.unwrap();

        assert!(repo.find("ERP", "Oracle Fusion", week(2025, 28)).await.unwrap().is_none());
        let w26 = repo.list_week(week(2025, 26)).await.unwrap();
        let names: Vec<(&str, &str)> = w26
            .iter()
            .map(|r| (r.business_unit.as_str(), r.division.as_str()))
            .collect();
        assert_eq!(
            names,
            vec![
                ("ERP", "Oracle Fusion"),
                ("ERP", "Oracle Technologies & DB"),
                ("Sales", "Jordan Sales")
            ]
        );
        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(all.last().unwrap().week, 27);
    }

    #[tokio::test]
    async fn json_file_store_survives_a_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports.json");

        let repo = JsonFileReportRepository::open(&path).unwrap();
        assert!(repo.list_all().await.unwrap().is_empty());
        let saved = repo.upsert("ERP", "Oracle Fusion", week(2025, 26), fields("kept")).await.unwrap();
        drop(repo);

        let reopened = JsonFileReportRepository::open(&path).unwrap();
        let found = reopened.find("ERP", "Oracle Fusion", week(2025, 26)).await.unwrap().unwrap();
        assert_eq!(found, saved);

        // Ids keep counting from where the previous process stopped.
        let next = reopened.upsert("Sales", "Saudi Sales", week(2025, 26), fields("new")).await.unwrap();
        assert_eq!(next.id, saved.id + 1);
    }

    #[test]
    fn malformed_store_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            JsonFileReportRepository::open(&path),
            Err(StorageError::Json(_))
        ));
    }

    #[tokio::test]
    async fn interrupted_save_never_corrupts_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports.json");
        let staging = dir.path().join("reports.json.tmp");

        let repo = JsonFileReportRepository::open(&path).unwrap();
        let saved = repo.upsert("ERP", "Oracle Fusion", week(2025, 26), fields("kept")).await.unwrap();
        assert!(!staging.exists());
        drop(repo);

        // A process killed mid-write leaves only a truncated staging file behind.
        fs::write(&staging, "[{\"id\": 1, \"busin").unwrap();
        let reopened = JsonFileReportRepository::open(&path).unwrap();
        let found = reopened.find("ERP", "Oracle Fusion", week(2025, 26)).await.unwrap().unwrap();
        assert_eq!(found, saved);

        reopened.upsert("Sales", "Saudi Sales", week(2025, 26), fields("new")).await.unwrap();
        assert!(!staging.exists());
        assert_eq!(JsonFileReportRepository::open(&path).unwrap().list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn failed_save_leaves_the_table_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("reports.json");
        let repo = JsonFileReportRepository::open(&path).unwrap();

        let result = repo.upsert("ERP", "Oracle Fusion", week(2025, 26), fields("x")).await;
        assert!(matches!(result, Err(StorageError::Io { .. })));
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn seeded_rows_keep_their_ids() {
        let mut row = InMemoryReportRepository::new()
            .upsert("ERP", "Oracle Fusion", week(2025, 26), fields("seed"))
            .await
            .unwrap();
        row.id = 41;
        let repo = InMemoryReportRepository::with_rows(vec![row]);
        let next = repo.upsert("Sales", "Jordan Sales", week(2025, 26), fields("n")).await.unwrap();
        assert_eq!(next.id, 42);
    }
}

// src/lib.rs
//! Weekly business-unit reports over a Sunday-Thursday business week.

pub mod api;
pub mod clock;
pub mod config;
pub mod directory;
pub mod edit_window;
pub mod error;
pub mod issue_ledger;
pub mod period_key;
pub mod priority;
pub mod report;
pub mod repository;
pub mod resolver;
pub mod week_math;


pub use clock::{Clock, SystemClock, TestClock};
pub use edit_window::{EditDecision, EditWindowPolicy};
pub use error::{DateError, LedgerError, ParseError, ReportError, ResolutionError, StorageError};
pub use issue_ledger::{IssueLedger, IssueStatus, UrgentIssue};
pub use period_key::PeriodKey;
pub use report::{Report, ReportDraft};
pub use repository::{InMemoryReportRepository, JsonFileReportRepository, ReportRepository};
pub use resolver::ReportResolver;
pub use week_math::{CalendarDate, CustomWeek};

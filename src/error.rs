// src/error.rs

use chrono::NaiveDate;
use thiserror::Error;

use crate::edit_window::EditDecision;
use crate::issue_ledger::IssueStatus;

// --- Week arithmetic ---

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("Invalid date: '{input}' (expected YYYY-MM-DD)")]
    Unparseable { input: String },

    #[error("Week {week} is out of range for {year} (valid weeks: 1-{max})")]
    WeekOutOfRange { year: i32, week: u32, max: u32 },

    #[error("Year {year} is outside the supported calendar")]
    YearOutOfRange { year: i32 },

    #[error("Date calculation overflow near {date}")]
    Overflow { date: NaiveDate },
}

// --- Period keys ---

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Invalid week selection: '{input}' (expected Wnn-YYYY, YYYY-Wnn or YYYY-MM-DD)")]
    UnrecognizedFormat { input: String },

    #[error("Invalid week selection: '{input}': {source}")]
    InvalidWeek {
        input: String,
        #[source]
        source: DateError,
    },
}

impl ParseError {
    /// The string that failed to parse.
    pub fn input(&self) -> &str {
        match self {
            ParseError::UnrecognizedFormat { input } | ParseError::InvalidWeek { input, .. } => {
                input
            }
        }
    }
}

// --- Directory lookups ---

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Business unit not found: '{name}'")]
    UnknownBusinessUnit { name: String },

    #[error("Division '{division}' not found in business unit '{business_unit}'")]
    UnknownDivision {
        business_unit: String,
        division: String,
    },
}

// --- Repository I/O ---

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    #[error("Storage JSON processing error")]
    Json(#[from] serde_json::Error),

    #[error("Stored report {id} is corrupt: {detail}")]
    CorruptRecord { id: u64, detail: String },
}

// Helper to create context-aware IO errors
pub(crate) fn io_context<S: Into<String>>(source: std::io::Error, context: S) -> StorageError {
    StorageError::Io {
        source,
        context: context.into(),
    }
}

// --- Urgent issue ledger ---

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Urgent issue not found: {id}")]
    IssueNotFound { id: String },

    #[error("Urgent issue {id} already exists in this report")]
    DuplicateIssue { id: String },

    #[error("Urgent issue {id} cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: String,
        from: IssueStatus,
        to: IssueStatus,
    },

    #[error("Urgent issue {id} has already been saved and cannot be removed")]
    PersistedIssue { id: String },

    #[error("Urgent issue description must not be blank")]
    BlankDescription,
}

// --- Resolver operations ---

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Date(#[from] DateError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Week {period} is read-only ({decision:?})")]
    WeekLocked {
        period: String,
        decision: EditDecision,
    },

    #[error("No report exists for {business_unit} / {division} in {period}")]
    ReportNotFound {
        business_unit: String,
        division: String,
        period: String,
    },

    #[error("A report must name who submitted it")]
    MissingSubmitter,
}

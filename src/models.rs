use serde::Deserialize;

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub date_order: DateOrder,
}

/// Header row plus ordered data rows, as parsed from a CSV or spreadsheet.
/// Ephemeral: lives only for the duration of one import attempt.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxType {
    Income,
    Expense,
}

impl TxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }

}

/// Normalized representation of one financial event, independent of source
/// format. `amount` is a positive magnitude; the sign lives in `tx_type`.
#[derive(Debug, Clone)]
pub struct CanonicalTransaction {
    pub id: Option<i64>,
    pub project_id: i64,
    pub date: String,
    pub description: String,
    pub amount: f64,
    pub tx_type: TxType,
    pub category: Option<String>,
    pub source_file: String,
    pub external_id: Option<String>,
    pub payment_source_id: Option<i64>,
}

/// The intermediate row shape platform API clients hand to the builder.
/// The client is responsible for a stable per-platform `id`; refunds arrive
/// as `refund:<id>` so the prefixed external id stays unique.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceRow {
    pub id: String,
    pub date: String,
    pub description: String,
    pub amount: String,
    #[serde(default)]
    pub category: Option<String>,
}

/// Which component comes first in an ambiguous numeric date like `03/04/24`.
/// A component greater than 12 always disambiguates on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    DayFirst,
    MonthFirst,
}

impl DateOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DayFirst => "dmy",
            Self::MonthFirst => "mdy",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "dmy" => Some(Self::DayFirst),
            "mdy" => Some(Self::MonthFirst),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Partial,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct ImportRun {
    pub id: i64,
    pub source_type: String,
    pub source_name: String,
    pub triggered_by: String,
    pub status: String,
    pub rows_imported: i64,
    pub rows_skipped: i64,
    pub rows_errored: i64,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        }
    }
}

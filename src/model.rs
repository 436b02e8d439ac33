use clap::ValueEnum;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "easy" => Some(Self::Easy),
            "medium" => Some(Self::Medium),
            "hard" => Some(Self::Hard),
            _ => None,
        }
    }
}

/// Event lifecycle. Transitions only move forward: draft, active, completed.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Draft,
    Active,
    Completed,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }

    pub fn from_db(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(Self::Draft),
            "active" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }

    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Active) | (Self::Active, Self::Completed)
        ) || self == next
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionStatus {
    Active,
    Flagged,
    Deleted,
}

impl QuestionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Flagged => "flagged",
            Self::Deleted => "deleted",
        }
    }
}

/// The columns of a `staging_records` row that normalization consumes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagingRecord {
    pub id: i64,
    pub round: Option<i16>,
    pub clue_value: Option<i16>,
    pub category: Option<String>,
    pub comments: Option<String>,
    pub answer: Option<String>,
    pub question: Option<String>,
    pub air_date: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunPaths {
    pub cache_root: String,
    pub manifest_dir: String,
    pub db_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportFileEntry {
    pub path: String,
    pub sha256: Option<String>,
    pub status: String,
    pub lines_read: usize,
    pub rows_staged: usize,
    pub encoding_skipped: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportTotals {
    pub files_loaded: usize,
    pub files_aborted: usize,
    pub rows_staged: usize,
    pub encoding_skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub scope: String,
    pub source_encoding: String,
    pub paths: RunPaths,
    pub files: Vec<ImportFileEntry>,
    pub totals: ImportTotals,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TransformCounts {
    pub staged_records: usize,
    pub categories_inserted: usize,
    pub questions_inserted: usize,
    pub skipped_missing_text: usize,
    pub skipped_unresolved_category: usize,
    pub easy: usize,
    pub medium: usize,
    pub hard: usize,
    pub null_air_dates: usize,
    pub staging_rows_discarded: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransformRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub scope: String,
    pub paths: RunPaths,
    pub counts: TransformCounts,
}

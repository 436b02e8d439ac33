use std::ffi::c_int;

use rusqlite::ffi;
use thiserror::Error;

pub type CompositionResult<T> = std::result::Result<T, CompositionError>;

/// Rejected composition writes, kept apart from storage faults so callers can
/// report them as user errors.
#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{entity} {id} is deleted")]
    Deleted { entity: &'static str, id: i64 },

    #[error("event {event_id} already has round number {round_number}")]
    DuplicateRoundNumber { event_id: i64, round_number: i64 },

    #[error("round {round_id} already has question number {question_number}")]
    DuplicateQuestionNumber { round_id: i64, question_number: i64 },

    #[error(
        "a round slot must reference exactly one question source (preset: {preset:?}, user: {user:?})"
    )]
    InvalidSlotReference {
        preset: Option<i64>,
        user: Option<i64>,
    },

    #[error("event {event_id} cannot move from {from} to {to}")]
    InvalidTransition {
        event_id: i64,
        from: &'static str,
        to: &'static str,
    },

    #[error("user question {id} is still referenced by a round slot")]
    QuestionReferenced { id: i64 },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub(super) fn is_constraint(err: &rusqlite::Error, extended_code: c_int) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _) if failure.extended_code == extended_code
    )
}

pub(super) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    is_constraint(err, ffi::SQLITE_CONSTRAINT_UNIQUE)
}

/// SQLite raises `ON DELETE RESTRICT` failures with the trigger constraint code,
/// not the foreign key one.
pub(super) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    is_constraint(err, ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
        || is_constraint(err, ffi::SQLITE_CONSTRAINT_TRIGGER)
}

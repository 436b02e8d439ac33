use rusqlite::types::Type;
use rusqlite::{Connection, Row, params};
use serde::Serialize;

use super::error::CompositionResult;
use super::slots::QuestionRef;
use crate::model::Difficulty;

/// One row of `normalized_questions_view`: a round slot merged with whichever
/// question table it references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedSlot {
    pub round_question_id: i64,
    pub round_id: i64,
    pub question_number: i64,
    pub source: QuestionRef,
    pub question: String,
    pub answer: String,
    pub difficulty: Difficulty,
    pub category_id: Option<i64>,
    pub category_name: String,
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}

fn slot_from_row(row: &Row<'_>) -> rusqlite::Result<NormalizedSlot> {
    let kind: String = row.get(4)?;
    let source = QuestionRef::from_view(&kind, row.get(3)?)
        .ok_or_else(|| conversion_error(4, format!("unknown question type {kind:?}")))?;

    let raw_difficulty: String = row.get(7)?;
    let difficulty = Difficulty::from_db(&raw_difficulty)
        .ok_or_else(|| conversion_error(7, format!("unknown difficulty {raw_difficulty:?}")))?;

    Ok(NormalizedSlot {
        round_question_id: row.get(0)?,
        round_id: row.get(1)?,
        question_number: row.get(2)?,
        source,
        question: row.get(5)?,
        answer: row.get(6)?,
        difficulty,
        category_id: row.get(8)?,
        category_name: row.get(9)?,
    })
}

const VIEW_COLUMNS: &str = "
    round_question_id, round_id, question_number, question_id, question_type,
    question, answer, difficulty, category_id, category_name
";

pub fn round_questions(
    connection: &Connection,
    round_id: i64,
) -> CompositionResult<Vec<NormalizedSlot>> {
    let sql = format!(
        "SELECT {VIEW_COLUMNS} FROM normalized_questions_view WHERE round_id = ?1 ORDER BY question_number"
    );
    let mut statement = connection.prepare(&sql)?;
    let rows = statement.query_map(params![round_id], slot_from_row)?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

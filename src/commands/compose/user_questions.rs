use rusqlite::{Connection, TransactionBehavior, params};

use super::error::{CompositionError, CompositionResult, is_foreign_key_violation};
use crate::model::{Difficulty, QuestionStatus};
use crate::util::now_utc_string;

#[derive(Debug, Clone)]
pub struct NewUserQuestion {
    pub question: String,
    pub answer: String,
    pub difficulty: Difficulty,
    pub category_id: Option<i64>,
    pub created_by: Option<i64>,
    pub notes: Option<String>,
}

pub fn create_user_question(
    connection: &Connection,
    new_question: &NewUserQuestion,
) -> CompositionResult<i64> {
    connection
        .execute(
            "
            INSERT INTO user_generated_questions(
              question, answer, category_id, difficulty, created_by, created_at, status, notes
            )
            VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
            params![
                new_question.question,
                new_question.answer,
                new_question.category_id,
                new_question.difficulty.as_str(),
                new_question.created_by,
                now_utc_string(),
                QuestionStatus::Active.as_str(),
                new_question.notes,
            ],
        )
        .map_err(|err| {
            if is_foreign_key_violation(&err) {
                CompositionError::NotFound {
                    entity: "category",
                    id: new_question.category_id.unwrap_or_default(),
                }
            } else {
                err.into()
            }
        })?;

    Ok(connection.last_insert_rowid())
}

/// Moderation only moves the status; a `deleted` question stays in place for the
/// rounds that already use it.
pub fn moderate_user_question(
    connection: &Connection,
    question_id: i64,
    status: QuestionStatus,
) -> CompositionResult<()> {
    let changed = connection.execute(
        "UPDATE user_generated_questions SET status = ?1 WHERE id = ?2",
        params![status.as_str(), question_id],
    )?;
    if changed == 0 {
        return Err(CompositionError::NotFound {
            entity: "user question",
            id: question_id,
        });
    }
    Ok(())
}

/// Hard-deletes a user question. Rejected while any round slot still points at it.
pub fn purge_user_question(connection: &mut Connection, question_id: i64) -> CompositionResult<()> {
    let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let referenced: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM round_questions WHERE user_question_id = ?1)",
        params![question_id],
        |row| row.get(0),
    )?;
    if referenced {
        return Err(CompositionError::QuestionReferenced { id: question_id });
    }

    let changed = tx
        .execute(
            "DELETE FROM user_generated_questions WHERE id = ?1",
            params![question_id],
        )
        .map_err(|err| {
            if is_foreign_key_violation(&err) {
                CompositionError::QuestionReferenced { id: question_id }
            } else {
                err.into()
            }
        })?;
    if changed == 0 {
        return Err(CompositionError::NotFound {
            entity: "user question",
            id: question_id,
        });
    }

    tx.commit()?;
    Ok(())
}

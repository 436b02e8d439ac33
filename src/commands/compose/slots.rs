use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde::Serialize;

use super::error::{CompositionError, CompositionResult, is_unique_violation};
use super::rounds::ensure_round_writable;
use crate::util::now_utc_string;

/// The question a round slot points at. Storage keeps two nullable columns; in
/// memory a slot can only ever hold one source.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum QuestionRef {
    Preset(i64),
    User(i64),
}

impl QuestionRef {
    pub fn from_columns(preset: Option<i64>, user: Option<i64>) -> CompositionResult<Self> {
        match (preset, user) {
            (Some(id), None) => Ok(Self::Preset(id)),
            (None, Some(id)) => Ok(Self::User(id)),
            (preset, user) => Err(CompositionError::InvalidSlotReference { preset, user }),
        }
    }

    pub fn to_columns(self) -> (Option<i64>, Option<i64>) {
        match self {
            Self::Preset(id) => (Some(id), None),
            Self::User(id) => (None, Some(id)),
        }
    }

    pub fn id(self) -> i64 {
        match self {
            Self::Preset(id) | Self::User(id) => id,
        }
    }

    pub fn kind(self) -> &'static str {
        match self {
            Self::Preset(_) => "preset",
            Self::User(_) => "user",
        }
    }

    pub fn from_view(kind: &str, id: i64) -> Option<Self> {
        match kind {
            "preset" => Some(Self::Preset(id)),
            "user" => Some(Self::User(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundSlot {
    pub id: i64,
    pub round_id: i64,
    pub question_number: i64,
    pub question: QuestionRef,
}

pub fn load_slot(connection: &Connection, slot_id: i64) -> CompositionResult<RoundSlot> {
    let row = connection
        .query_row(
            "
            SELECT id, round_id, question_number, preset_question_id, user_question_id
            FROM round_questions
            WHERE id = ?1
            ",
            params![slot_id],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                ))
            },
        )
        .optional()?;

    let Some((id, round_id, question_number, preset, user)) = row else {
        return Err(CompositionError::NotFound {
            entity: "round slot",
            id: slot_id,
        });
    };

    Ok(RoundSlot {
        id,
        round_id,
        question_number,
        question: QuestionRef::from_columns(preset, user)?,
    })
}

/// Adds a numbered slot to a round. The round, the referenced question and the
/// insert are checked under one write lock, so two writers cannot both pass the
/// checks and then collide.
pub fn add_slot(
    connection: &mut Connection,
    round_id: i64,
    question_number: i64,
    question: QuestionRef,
) -> CompositionResult<RoundSlot> {
    let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
    ensure_round_writable(&tx, round_id)?;
    ensure_question_available(&tx, question)?;

    let (preset, user) = question.to_columns();
    tx.execute(
        "
        INSERT INTO round_questions(
          round_id, question_number, preset_question_id, user_question_id, created_at
        )
        VALUES(?1, ?2, ?3, ?4, ?5)
        ",
        params![round_id, question_number, preset, user, now_utc_string()],
    )
    .map_err(|err| {
        if is_unique_violation(&err) {
            CompositionError::DuplicateQuestionNumber {
                round_id,
                question_number,
            }
        } else {
            err.into()
        }
    })?;

    let slot = RoundSlot {
        id: tx.last_insert_rowid(),
        round_id,
        question_number,
        question,
    };
    tx.commit()?;

    Ok(slot)
}

/// Points an existing slot at a different question, clearing the other source.
pub fn replace_slot_question(
    connection: &mut Connection,
    slot_id: i64,
    question: QuestionRef,
) -> CompositionResult<RoundSlot> {
    let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let current = load_slot(&tx, slot_id)?;
    ensure_round_writable(&tx, current.round_id)?;
    ensure_question_available(&tx, question)?;

    let (preset, user) = question.to_columns();
    tx.execute(
        "
        UPDATE round_questions
        SET preset_question_id = ?1, user_question_id = ?2
        WHERE id = ?3
        ",
        params![preset, user, slot_id],
    )?;
    tx.commit()?;

    Ok(RoundSlot {
        question,
        ..current
    })
}

pub fn remove_slot(connection: &Connection, slot_id: i64) -> CompositionResult<()> {
    let changed = connection.execute(
        "DELETE FROM round_questions WHERE id = ?1",
        params![slot_id],
    )?;
    if changed == 0 {
        return Err(CompositionError::NotFound {
            entity: "round slot",
            id: slot_id,
        });
    }
    Ok(())
}

fn ensure_question_available(connection: &Connection, question: QuestionRef) -> CompositionResult<()> {
    match question {
        QuestionRef::Preset(id) => {
            let exists: Option<i64> = connection
                .query_row(
                    "SELECT id FROM trivia_questions WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                return Err(CompositionError::NotFound {
                    entity: "trivia question",
                    id,
                });
            }
        }
        QuestionRef::User(id) => {
            let status: Option<String> = connection
                .query_row(
                    "SELECT status FROM user_generated_questions WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            match status.as_deref() {
                None => {
                    return Err(CompositionError::NotFound {
                        entity: "user question",
                        id,
                    });
                }
                Some("deleted") => {
                    return Err(CompositionError::Deleted {
                        entity: "user question",
                        id,
                    });
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde::Serialize;

use super::error::{
    CompositionError, CompositionResult, is_foreign_key_violation, is_unique_violation,
};
use super::events::load_event;
use crate::util::now_utc_string;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Round {
    pub id: i64,
    pub event_id: i64,
    pub round_number: i64,
    pub name: Option<String>,
    pub category_id: Option<i64>,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NewRound {
    pub round_number: Option<i64>,
    pub name: Option<String>,
    pub category_id: Option<i64>,
}

/// Adds a round to an event. Without an explicit number the round is appended
/// after the event's highest round number and named `Round N`.
pub fn create_round(
    connection: &mut Connection,
    event_id: i64,
    new_round: &NewRound,
) -> CompositionResult<Round> {
    let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let event = load_event(&tx, event_id)?;
    if event.is_deleted {
        return Err(CompositionError::Deleted {
            entity: "event",
            id: event_id,
        });
    }

    let round_number = match new_round.round_number {
        Some(number) => number,
        None => tx.query_row(
            "SELECT COALESCE(MAX(round_number), 0) + 1 FROM rounds WHERE event_id = ?1",
            params![event_id],
            |row| row.get(0),
        )?,
    };
    let name = new_round
        .name
        .clone()
        .unwrap_or_else(|| format!("Round {round_number}"));

    tx.execute(
        "
        INSERT INTO rounds(event_id, category_id, round_number, name, created_at)
        VALUES(?1, ?2, ?3, ?4, ?5)
        ",
        params![
            event_id,
            new_round.category_id,
            round_number,
            name,
            now_utc_string()
        ],
    )
    .map_err(|err| {
        if is_unique_violation(&err) {
            CompositionError::DuplicateRoundNumber {
                event_id,
                round_number,
            }
        } else if is_foreign_key_violation(&err) {
            CompositionError::NotFound {
                entity: "category",
                id: new_round.category_id.unwrap_or_default(),
            }
        } else {
            err.into()
        }
    })?;

    let round = Round {
        id: tx.last_insert_rowid(),
        event_id,
        round_number,
        name: Some(name),
        category_id: new_round.category_id,
        is_deleted: false,
    };
    tx.commit()?;

    Ok(round)
}

pub fn soft_delete_round(connection: &Connection, round_id: i64) -> CompositionResult<()> {
    let changed = connection.execute(
        "UPDATE rounds SET is_deleted = 1 WHERE id = ?1",
        params![round_id],
    )?;
    if changed == 0 {
        return Err(CompositionError::NotFound {
            entity: "round",
            id: round_id,
        });
    }
    Ok(())
}

/// A round accepts slot writes only while it and its event are live.
pub(super) fn ensure_round_writable(connection: &Connection, round_id: i64) -> CompositionResult<()> {
    let flags: Option<(bool, i64, bool)> = connection
        .query_row(
            "
            SELECT r.is_deleted, e.id, e.is_deleted
            FROM rounds r
            JOIN events e ON e.id = r.event_id
            WHERE r.id = ?1
            ",
            params![round_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()?;

    match flags {
        None => Err(CompositionError::NotFound {
            entity: "round",
            id: round_id,
        }),
        Some((true, _, _)) => Err(CompositionError::Deleted {
            entity: "round",
            id: round_id,
        }),
        Some((false, event_id, true)) => Err(CompositionError::Deleted {
            entity: "event",
            id: event_id,
        }),
        Some((false, _, false)) => Ok(()),
    }
}

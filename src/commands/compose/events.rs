use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior, params};
use serde::Serialize;

use super::error::{CompositionError, CompositionResult};
use crate::model::EventStatus;
use crate::util::now_utc_string;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Event {
    pub id: i64,
    pub name: String,
    pub creator_id: i64,
    pub event_date: Option<NaiveDate>,
    pub created_at: String,
    pub status: EventStatus,
    pub description: Option<String>,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NewEvent {
    pub name: String,
    pub creator_id: i64,
    pub event_date: Option<NaiveDate>,
    pub description: Option<String>,
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    let raw_status: String = row.get(5)?;
    let status = EventStatus::from_db(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            5,
            Type::Text,
            format!("unknown event status {raw_status:?}").into(),
        )
    })?;

    Ok(Event {
        id: row.get(0)?,
        name: row.get(1)?,
        creator_id: row.get(2)?,
        event_date: row.get(3)?,
        created_at: row.get(4)?,
        status,
        description: row.get(6)?,
        is_deleted: row.get(7)?,
    })
}

pub fn create_event(connection: &Connection, new_event: &NewEvent) -> CompositionResult<Event> {
    connection.execute(
        "
        INSERT INTO events(name, creator_id, event_date, created_at, status, description)
        VALUES(?1, ?2, ?3, ?4, ?5, ?6)
        ",
        params![
            new_event.name,
            new_event.creator_id,
            new_event.event_date,
            now_utc_string(),
            EventStatus::Draft.as_str(),
            new_event.description,
        ],
    )?;

    load_event(connection, connection.last_insert_rowid())
}

pub fn load_event(connection: &Connection, event_id: i64) -> CompositionResult<Event> {
    connection
        .query_row(
            "
            SELECT id, name, creator_id, event_date, created_at, status, description, is_deleted
            FROM events
            WHERE id = ?1
            ",
            params![event_id],
            event_from_row,
        )
        .optional()?
        .ok_or(CompositionError::NotFound {
            entity: "event",
            id: event_id,
        })
}

/// Moves an event forward through draft, active, completed. Repeating the
/// current status is a no-op; deleted events are frozen.
pub fn transition_event(
    connection: &mut Connection,
    event_id: i64,
    next: EventStatus,
) -> CompositionResult<Event> {
    let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let event = load_event(&tx, event_id)?;

    if event.is_deleted {
        return Err(CompositionError::Deleted {
            entity: "event",
            id: event_id,
        });
    }
    if !event.status.can_transition_to(next) {
        return Err(CompositionError::InvalidTransition {
            event_id,
            from: event.status.as_str(),
            to: next.as_str(),
        });
    }

    tx.execute(
        "UPDATE events SET status = ?1 WHERE id = ?2",
        params![next.as_str(), event_id],
    )?;
    let updated = load_event(&tx, event_id)?;
    tx.commit()?;

    Ok(updated)
}

/// Sets the soft-delete flag. Status is left as it was.
pub fn soft_delete_event(connection: &Connection, event_id: i64) -> CompositionResult<()> {
    let changed = connection.execute(
        "UPDATE events SET is_deleted = 1 WHERE id = ?1",
        params![event_id],
    )?;
    if changed == 0 {
        return Err(CompositionError::NotFound {
            entity: "event",
            id: event_id,
        });
    }
    Ok(())
}

/// Removes the event row; its rounds and their slots go with it.
pub fn purge_event(connection: &Connection, event_id: i64) -> CompositionResult<()> {
    let changed = connection.execute("DELETE FROM events WHERE id = ?1", params![event_id])?;
    if changed == 0 {
        return Err(CompositionError::NotFound {
            entity: "event",
            id: event_id,
        });
    }
    Ok(())
}
